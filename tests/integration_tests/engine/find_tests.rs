use crate::integration_tests::support::{
    ADMIN, RecordingStore, engine_over, product_engine, products, restricted_config,
};
use bson::{Bson, doc};
use querygate::{QueryError, RawRequest};
use std::sync::Arc;

#[tokio::test]
async fn scenario_limit_clamped_and_page_recomputes_skip() {
    let e = product_engine();
    let raw = RawRequest::new().filter(doc! {"code": "abc"}).limit(200).page(2).sort(doc! {"n": 1});
    let page = e.find(Some(raw), true, None).await.unwrap();
    assert_eq!(page.count, 120);
    assert_eq!(page.data.len(), 50);
    let ns: Vec<i32> = page.data.iter().map(|d| d.data().get_i32("n").unwrap()).collect();
    assert_eq!(ns.first(), Some(&50));
    assert_eq!(ns.last(), Some(&99));
    assert!(page.data.iter().all(|d| !d.data().contains_key("secret")));
}

#[tokio::test]
async fn count_ignores_window() {
    let e = product_engine();
    let raw = RawRequest::new().filter(doc! {"code": "abc"}).limit(3).skip(110);
    let page = e.find(Some(raw), true, None).await.unwrap();
    assert_eq!(page.count, 120);
    assert_eq!(page.data.len(), 3);
}

#[tokio::test]
async fn missing_request_is_rejected_before_storage() {
    let store = Arc::new(RecordingStore::new(products()));
    let e = engine_over(store.clone(), restricted_config());
    assert!(matches!(e.find(None, true, None).await, Err(QueryError::RequestMissing)));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn envelope_payload_is_used() {
    let e = product_engine();
    let body = serde_json::json!({"PostBody": {"filter": {"code": "xyz"}, "limit": 10}});
    let raw = RawRequest::from_json_value(body).unwrap();
    let page = e.find(Some(raw), true, None).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.data[0].data().get_str("code").unwrap(), "xyz");
}

#[tokio::test]
async fn lean_and_hydrated_return_the_same_fields() {
    let e = product_engine();
    let raw = || RawRequest::new().filter(doc! {"code": "xyz"});
    let lean = e.find(Some(raw()), true, None).await.unwrap();
    let hydrated = e.find(Some(raw()), false, None).await.unwrap();
    assert!(lean.data[0].is_lean());
    assert!(hydrated.data[0].metadata().is_some());
    assert_eq!(lean.data[0].data(), hydrated.data[0].data());
}

#[tokio::test]
async fn structure_projects_requested_fields_only() {
    let e = product_engine();
    let raw = RawRequest::new()
        .filter(doc! {"code": "abc", "n": 7})
        .structure(doc! {"name": 1, "secret": 1});
    let page = e.find(Some(raw), true, Some(ADMIN)).await.unwrap();
    let d = page.data[0].data();
    assert_eq!(d.get_str("name").unwrap(), "product 7");
    assert!(d.contains_key("_id"));
    // restricted fields are never projected, even for admins
    assert!(!d.contains_key("secret"));
    assert!(!d.contains_key("owner"));
}

#[tokio::test]
async fn string_structure_and_sort() {
    let e = product_engine();
    let raw = RawRequest::new()
        .filter(doc! {"code": "abc", "n": {"$lt": 5}})
        .structure("name n")
        .sort(doc! {"n": -1})
        .limit(2);
    let page = e.find(Some(raw), true, None).await.unwrap();
    let ns: Vec<i32> = page.data.iter().map(|d| d.data().get_i32("n").unwrap()).collect();
    assert_eq!(ns, vec![4, 3]);
    assert_eq!(page.count, 5);
}

#[tokio::test]
async fn json_request_round_trip_to_response() {
    let e = product_engine();
    let raw = RawRequest::from_json_str(r#"{"filter":{"code":"X1"},"limit":"5","page":"x"}"#).unwrap();
    let page = e.find(Some(raw), true, None).await.unwrap();
    let json = page.to_json();
    assert_eq!(json["count"], 1);
    assert_eq!(json["data"][0]["code"], "X1");
    assert!(json["data"][0].get("secret").is_none());
}

#[tokio::test]
async fn text_search_sorted_by_relevance() {
    let c = querygate::MemoryCollection::new("notes");
    c.insert(doc! {"body": "rust rust rust", "secret": 1});
    c.insert(doc! {"body": "rust and go", "secret": 2});
    c.insert(doc! {"body": "go only", "secret": 3});
    let e = engine_over(Arc::new(c), restricted_config());
    let raw = RawRequest::new()
        .filter(doc! {"$text": {"$search": "rust"}})
        .structure("*")
        .sort(doc! {"score": {"$meta": "textScore"}})
        .limit(10);
    let page = e.find(Some(raw), true, None).await.unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(page.data[0].data().get("score"), Some(&Bson::Double(3.0)));
    assert!(page.data.iter().all(|d| !d.data().contains_key("secret")));
}

#[cfg(feature = "regex")]
#[tokio::test]
async fn json_regex_filter_reaches_the_store() {
    let e = product_engine();
    let raw = RawRequest::from_json_str(
        r#"{"filter": {"code": {"$regex": "^x", "$options": "i"}}, "limit": 10, "sort": "code"}"#,
    )
    .unwrap();
    let page = e.find(Some(raw), true, None).await.unwrap();
    assert_eq!(page.count, 3);
    let codes: Vec<&str> = page.data.iter().map(|d| d.data().get_str("code").unwrap()).collect();
    assert_eq!(codes, vec!["X1", "X2", "xyz"]);
    assert!(page.data.iter().all(|d| d.data().get("secret").is_none()));

    let raw = RawRequest::from_json_str(r#"{"filter": {"code": {"$regex": "^X\\d", "$options": ""}}}"#).unwrap();
    assert_eq!(e.find(Some(raw), true, None).await.unwrap().count, 2);
}

#[cfg(not(feature = "regex"))]
#[tokio::test]
async fn json_regex_filter_without_feature_is_a_store_error() {
    let raw = RawRequest::from_json_str(r#"{"filter": {"code": {"$regex": "^x", "$options": "i"}}}"#).unwrap();
    let err = product_engine().find(Some(raw), true, None).await.unwrap_err();
    assert!(matches!(err, QueryError::Store(querygate::StoreError::UnsupportedOperator(_))));
}
