use crate::integration_tests::support::{ADMIN, engine_over, product_engine, products, restricted_config};
use bson::doc;
use querygate::{RawRequest, WildcardPolicy};
use std::sync::Arc;

fn abc(limit: i32) -> RawRequest {
    RawRequest::new().filter(doc! {"code": "abc"}).limit(limit)
}

#[tokio::test]
async fn non_privileged_never_sees_restricted_paths() {
    let e = product_engine();
    for credential in [None, Some("Bearer wrong"), Some("")] {
        let page = e.find(Some(abc(5)), true, credential).await.unwrap();
        for d in &page.data {
            assert!(!d.data().contains_key("secret"));
            assert!(!d.has_path("owner.email"));
            assert!(!d.has_path("owner.auth.hash"));
            assert!(d.has_path("owner.auth.salt"));
            assert!(d.has_path("owner.name"));
            let history = d.data().get_array("history").unwrap();
            for h in history {
                let h = h.as_document().unwrap();
                assert!(!h.contains_key("ip"));
                assert!(h.contains_key("by"));
            }
        }
    }
}

#[tokio::test]
async fn privileged_sees_restricted_unless_excluded() {
    let e = product_engine();
    let page = e.find(Some(abc(2)), false, Some(ADMIN)).await.unwrap();
    for d in &page.data {
        assert!(d.data().contains_key("secret"));
        assert!(d.has_path("owner.email"));
        assert!(d.has_path("owner.auth.hash"));
    }

    let excluded = abc(2).structure(doc! {"secret": 0, "owner.name": 0});
    let page = e.find(Some(excluded), false, Some(ADMIN)).await.unwrap();
    for d in &page.data {
        assert!(!d.data().contains_key("secret"));
        assert!(!d.has_path("owner.name"));
        assert!(d.has_path("owner.email"));
    }
}

#[tokio::test]
async fn requested_restricted_fields_are_still_removed() {
    let e = product_engine();
    let raw = abc(3).structure(doc! {"secret": 1, "owner": 1, "name": 1});
    let page = e.find(Some(raw), true, None).await.unwrap();
    for d in &page.data {
        assert!(!d.data().contains_key("secret"));
        assert!(d.has_path("owner.name"));
        assert!(!d.has_path("owner.email"));
    }
}

#[tokio::test]
async fn wildcard_redacts_by_default_and_bypasses_when_configured() {
    let raw = || abc(1).structure("*");
    let e = product_engine();
    let d = &e.find(Some(raw()), true, None).await.unwrap().data[0];
    assert!(!d.data().contains_key("secret"));

    let cfg = restricted_config().with_wildcard_policy(WildcardPolicy::Bypass);
    let e = engine_over(Arc::new(products()), cfg);
    let d = &e.find(Some(raw()), true, None).await.unwrap().data[0];
    assert!(d.data().contains_key("secret"));
}

#[tokio::test]
async fn deep_restricted_paths_are_a_silent_no_op() {
    let cfg = restricted_config().with_restricted_fields(["a.b.c.d"]);
    let c = querygate::MemoryCollection::new("deep");
    c.insert(doc! {"a": {"b": {"c": {"d": 1}}}, "k": "v"});
    let e = engine_over(Arc::new(c), cfg);
    let d = e.find_one(Some(RawRequest::new().filter(doc! {"k": "v"})), true, None).await.unwrap().unwrap();
    assert!(d.has_path("a.b.c.d"));
}

#[tokio::test]
async fn documents_missing_restricted_paths_are_fine() {
    let c = querygate::MemoryCollection::new("sparse");
    c.insert(doc! {"k": "v", "owner": "not a document"});
    let e = engine_over(Arc::new(c), restricted_config());
    let d = e.find_one(Some(RawRequest::new().filter(doc! {"k": "v"})), true, None).await.unwrap().unwrap();
    assert_eq!(d.data().get_str("owner").unwrap(), "not a document");
}
