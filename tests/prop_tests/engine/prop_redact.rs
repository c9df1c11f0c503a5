use bson::{Bson, Document as BsonDocument};
use querygate::query::{FieldSpec, redact_document, removal_set};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c"]).prop_map(str::to_string)
}

fn path() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment(), 1..=3).prop_map(|s| s.join("."))
}

fn tree(depth: u32) -> BoxedStrategy<BsonDocument> {
    let leaf = any::<i32>().prop_map(Bson::Int32);
    let value = if depth == 0 {
        leaf.boxed()
    } else {
        prop_oneof![
            leaf,
            tree(depth - 1).prop_map(Bson::Document),
            proptest::collection::vec(tree(depth - 1).prop_map(Bson::Document), 0..3).prop_map(Bson::Array),
        ]
        .boxed()
    };
    proptest::collection::vec((segment(), value), 0..4)
        .prop_map(|kvs| {
            let mut d = BsonDocument::new();
            for (k, v) in kvs {
                d.insert(k, v);
            }
            d
        })
        .boxed()
}

fn reachable(doc: &BsonDocument, segs: &[&str]) -> bool {
    match segs {
        [] => false,
        [last] => doc.contains_key(*last),
        [head, rest @ ..] => match doc.get(*head) {
            Some(Bson::Document(d)) => reachable(d, rest),
            Some(Bson::Array(items)) => items.iter().any(|i| matches!(i, Bson::Document(d) if reachable(d, rest))),
            _ => false,
        },
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 256,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_restricted_paths_absent_for_non_privileged(mut doc in tree(3), restricted in proptest::collection::vec(path(), 1..4)) {
        let paths = removal_set(&FieldSpec::default(), &restricted, false);
        redact_document(&mut doc, &paths);
        for p in &restricted {
            let segs: Vec<&str> = p.split('.').collect();
            prop_assert!(!reachable(&doc, &segs), "{} still reachable in {}", p, doc);
        }
    }

    #[test]
    fn prop_privileged_keeps_everything(doc in tree(3), restricted in proptest::collection::vec(path(), 1..4)) {
        let paths = removal_set(&FieldSpec::default(), &restricted, true);
        let mut copy = doc.clone();
        prop_assert_eq!(redact_document(&mut copy, &paths), 0);
        prop_assert_eq!(copy, doc);
    }
}
