//! Network probes: HTTPS status and TCP connect.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::domain::ports::{NetworkProbe, ProbeStatus};

/// Probe backed by a blocking reqwest client.
///
/// Control planes serve self-signed certificates, so verification is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProbe;

impl HttpProbe {
    pub fn new() -> Self {
        Self
    }
}

impl NetworkProbe for HttpProbe {
    fn http_status(&self, url: &str, timeout: Duration) -> ProbeStatus {
        let client = match reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => return ProbeStatus::Unreachable(e.to_string()),
        };
        match client.get(url).send() {
            Ok(response) => ProbeStatus::from_code(response.status().as_u16()),
            Err(e) => ProbeStatus::Unreachable(e.to_string()),
        }
    }

    fn tcp_reachable(&self, host: &str, port: u16, timeout: Duration) -> bool {
        let Ok(addrs) = (host, port).to_socket_addrs() else {
            return false;
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
    }
}
