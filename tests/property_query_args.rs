use std::collections::{BTreeMap, BTreeSet};

use buck_rpc::orchestrator::query::fill_missing_args;
use proptest::prelude::*;

// Targets look like `//pkg:name`; keep the alphabet small so generated
// argument lists and query results overlap often.
fn target_strategy() -> impl Strategy<Value = String> {
    ("[a-c]{1,2}", "[x-z]{1,2}").prop_map(|(pkg, name)| format!("//{}:{}", pkg, name))
}

fn result_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<String>>> {
    proptest::collection::btree_map(
        target_strategy(),
        proptest::collection::vec(target_strategy(), 0..4),
        0..6,
    )
}

proptest! {
    #[test]
    fn every_argument_gets_an_entry(
        raw in result_strategy(),
        args in proptest::collection::vec(target_strategy(), 0..6),
    ) {
        let filled = fill_missing_args(raw.clone(), &args);

        for arg in &args {
            prop_assert!(filled.contains_key(arg));
        }

        // Existing entries are untouched; new ones are empty.
        for (key, value) in &filled {
            match raw.get(key) {
                Some(original) => prop_assert_eq!(value, original),
                None => prop_assert!(value.is_empty()),
            }
        }

        let expected: BTreeSet<&String> = raw.keys().chain(args.iter()).collect();
        let actual: BTreeSet<&String> = filled.keys().collect();
        prop_assert_eq!(actual, expected);
    }
}
