//! Property tests for hosts table patching.

use proptest::prelude::*;

use shipwright::domain::services::patch_hosts_table;
use shipwright::domain::value_objects::HostsPatchSet;

fn hostname() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9-]{0,10}\\.(local|internal)").unwrap()
}

fn address() -> impl Strategy<Value = String> {
    (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
        .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d))
}

/// Hosts-file-ish lines: mappings, comments, blanks, noise
fn table_line(names: Vec<String>) -> impl Strategy<Value = String> {
    let max_picked = names.len().min(2);
    let mapping = (address(), proptest::sample::subsequence(names, 0..=max_picked)).prop_map(
        |(addr, picked)| {
            if picked.is_empty() {
                format!("{}\tother.example", addr)
            } else {
                format!("{}\t{}", addr, picked.join(" "))
            }
        },
    );
    prop_oneof![
        mapping,
        Just("# managed by hand".to_string()),
        Just(String::new()),
        Just("127.0.0.1\tlocalhost".to_string()),
        proptest::string::string_regex("[ -~]{0,40}").unwrap(),
    ]
}

fn scenario() -> impl Strategy<Value = (Vec<String>, String, String)> {
    proptest::collection::vec(hostname(), 1..4).prop_flat_map(|names| {
        let lines = proptest::collection::vec(table_line(names.clone()), 0..12);
        (Just(names), address(), lines.prop_map(|l| {
            let mut text = l.join("\n");
            if !text.is_empty() {
                text.push('\n');
            }
            text
        }))
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Patching twice equals patching once.
    #[test]
    fn property_patch_is_idempotent((names, addr, table) in scenario()) {
        let set = HostsPatchSet::new(names, addr);
        let once = patch_hosts_table(&table, &set);
        let twice = patch_hosts_table(&once.content, &set);

        prop_assert!(!twice.changed);
        prop_assert_eq!(twice.content, once.content);
    }

    /// PROPERTY: After patching, each hostname is mapped by exactly one line,
    /// and that line uses the patch address.
    #[test]
    fn property_each_hostname_mapped_once((names, addr, table) in scenario()) {
        let set = HostsPatchSet::new(names.clone(), addr.clone());
        let patched = patch_hosts_table(&table, &set);

        for name in &names {
            let mapping: Vec<&str> = patched
                .content
                .lines()
                .filter(|line| {
                    let data = line.split('#').next().unwrap_or_default();
                    data.split_whitespace().skip(1).any(|t| t == name)
                })
                .collect();
            prop_assert_eq!(mapping.len(), 1, "{} in:\n{}", name, patched.content);
            prop_assert!(mapping[0].starts_with(&addr));
        }
    }

    /// PROPERTY: Lines unrelated to the patch set survive in order.
    #[test]
    fn property_unrelated_lines_preserved((names, addr, table) in scenario()) {
        let set = HostsPatchSet::new(names, addr);
        let patched = patch_hosts_table(&table, &set);
        let entry = set.entry_line();

        let unrelated: Vec<&str> = table
            .lines()
            .filter(|line| {
                let data = line.split('#').next().unwrap_or_default();
                !data.split_whitespace().skip(1).any(|t| set.contains(t))
            })
            .collect();
        let kept: Vec<&str> = patched.content.lines().filter(|l| *l != entry).collect();

        prop_assert_eq!(&kept[..], &unrelated[..]);
        prop_assert_eq!(patched.content.lines().count(), unrelated.len() + 1);
    }

    /// PROPERTY: Re-applying a set that is already mapped leaves a table
    /// holding other managed entries untouched.
    #[test]
    fn property_reapply_keeps_neighbours_in_place(
        (names, addr, table) in scenario(),
        other in hostname(),
        other_addr in address(),
    ) {
        prop_assume!(!names.contains(&other));
        let set = HostsPatchSet::new(names, addr);
        let neighbour = HostsPatchSet::new([other], other_addr);

        let first = patch_hosts_table(&table, &set);
        let both = patch_hosts_table(&first.content, &neighbour);
        let again = patch_hosts_table(&both.content, &set);

        prop_assert!(!again.changed);
        prop_assert_eq!(again.content, both.content);
    }

    /// PROPERTY: Patching never panics on arbitrary text.
    #[test]
    fn property_patch_never_panics(table in "(?s).{0,512}", name in hostname(), addr in address()) {
        let set = HostsPatchSet::new([name], addr);
        let _ = patch_hosts_table(&table, &set);
    }
}
