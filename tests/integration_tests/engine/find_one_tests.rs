use crate::integration_tests::support::{RecordingStore, engine_over, product_engine, products, restricted_config};
use bson::doc;
use querygate::{QueryError, RawRequest};
use std::sync::Arc;

#[tokio::test]
async fn empty_or_missing_filter_fails() {
    let store = Arc::new(RecordingStore::new(products()));
    let e = engine_over(store.clone(), restricted_config());
    assert!(matches!(e.find_one(None, true, None).await, Err(QueryError::RequestMissing)));
    let empty = RawRequest::new().filter(doc! {});
    assert!(matches!(e.find_one(Some(empty), true, None).await, Err(QueryError::FilterMissing)));
    let none = RawRequest::new().limit(3);
    assert!(matches!(e.find_one(Some(none), true, None).await, Err(QueryError::FilterMissing)));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn no_match_is_absence_not_error() {
    let e = product_engine();
    let raw = RawRequest::new().filter(doc! {"code": "X"});
    assert!(e.find_one(Some(raw), true, None).await.unwrap().is_none());
}

#[tokio::test]
async fn match_is_redacted() {
    let e = product_engine();
    let raw = RawRequest::new().filter(doc! {"code": "X2"});
    let d = e.find_one(Some(raw), false, None).await.unwrap().unwrap();
    assert_eq!(d.data().get_str("code").unwrap(), "X2");
    assert!(!d.data().contains_key("secret"));
    assert!(!d.has_path("owner.email"));
}

#[tokio::test]
async fn enveloped_filter_counts_as_present() {
    let e = product_engine();
    let raw = RawRequest::new().filter(doc! {"code": "X1"}).enveloped();
    assert!(e.find_one(Some(raw), true, None).await.unwrap().is_some());
}
