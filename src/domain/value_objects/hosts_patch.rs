//! Hosts patch set value object.

use std::collections::BTreeSet;

/// One idempotent hosts-table transaction: every hostname maps to `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostsPatchSet {
    hostnames: BTreeSet<String>,
    address: String,
}

impl HostsPatchSet {
    pub fn new<I, S>(hostnames: I, address: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hostnames: hostnames
                .into_iter()
                .map(Into::into)
                .map(|h: String| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            address: address.into().trim().to_string(),
        }
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.hostnames.iter().map(String::as_str)
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.hostnames.contains(hostname)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty() || self.address.is_empty()
    }

    /// The single line this patch set contributes to the table
    pub fn entry_line(&self) -> String {
        let names: Vec<&str> = self.hostnames().collect();
        format!("{}\t{}", self.address, names.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_line_lists_names_in_stable_order() {
        let set = HostsPatchSet::new(["rancher.local", "argocd.local"], "10.0.0.9");
        assert_eq!(set.entry_line(), "10.0.0.9\targocd.local rancher.local");
    }

    #[test]
    fn blank_names_are_dropped() {
        let set = HostsPatchSet::new(["", "  ", "app.local"], "10.0.0.9");
        assert_eq!(set.hostnames().count(), 1);
        assert!(!set.is_empty());
    }
}
