//! Hosts table patching
//!
//! Pure text transformation behind the hosts patcher. The first line that
//! maps any hostname of the patch set is replaced, in place, by one line
//! mapping the address to every hostname; later such lines are dropped.
//! Without a match the line is appended. Comments and blank lines are kept
//! as-is, so re-applying a patch set never reorders the table.

use crate::domain::value_objects::HostsPatchSet;

/// Result of patching one hosts table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostsTablePatch {
    pub content: String,
    /// Whether `content` differs from the input
    pub changed: bool,
}

/// Apply `set` to the hosts table text `current`
pub fn patch_hosts_table(current: &str, set: &HostsPatchSet) -> HostsTablePatch {
    if set.is_empty() {
        return HostsTablePatch {
            content: current.to_string(),
            changed: false,
        };
    }

    let entry = set.entry_line();
    let mut placed = false;
    let mut content = String::with_capacity(current.len() + 64);
    for line in current.lines() {
        if !mentions_any(line, set) {
            content.push_str(line);
            content.push('\n');
        } else if !placed {
            content.push_str(&entry);
            content.push('\n');
            placed = true;
        }
    }
    if !placed {
        content.push_str(&entry);
        content.push('\n');
    }

    HostsTablePatch {
        changed: content != current,
        content,
    }
}

/// A mapping line names a hostname of `set` (comments ignored)
fn mentions_any(line: &str, set: &HostsPatchSet) -> bool {
    let data = line.split('#').next().unwrap_or_default();
    data.split_whitespace().skip(1).any(|token| set.contains(token))
}

/// Standalone script that applies `set` to `hosts_path` with root privileges.
///
/// Re-running it leaves the table unchanged.
pub fn remediation_script(hosts_path: &str, set: &HostsPatchSet) -> String {
    let names: Vec<&str> = set.hostnames().collect();
    let names = names.join(" ");
    SCRIPT_TEMPLATE
        .replace("@HOSTS@", &shell_quote(hosts_path))
        .replace("@NAMES@", &shell_quote(&names))
        .replace("@ADDR@", &shell_quote(set.address()))
}

const SCRIPT_TEMPLATE: &str = r#"#!/bin/sh
# Map @NAMES@ to @ADDR@ in @HOSTS@.
# Run with root privileges: sudo sh <this file>
set -eu

HOSTS=@HOSTS@
NAMES=@NAMES@
ADDR=@ADDR@
TMP=$(mktemp)
trap 'rm -f "$TMP"' EXIT

awk -v names="$NAMES" -v addr="$ADDR" '
BEGIN {
    n = split(names, h, " "); for (i = 1; i <= n; i++) want[h[i]] = 1
    entry = addr "\t" names
}
/^[[:space:]]*#/ || NF == 0 { print; next }
{
    line = $0; sub(/#.*/, "", line)
    m = split(line, f, /[[:space:]]+/); hit = 0
    for (i = 2; i <= m; i++) if (f[i] in want) hit = 1
    if (!hit) print
    else if (!done) { print entry; done = 1 }
}
END { if (!done) print entry }' "$HOSTS" > "$TMP"
cat "$TMP" > "$HOSTS"
echo "updated $HOSTS"
"#;

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
