use crate::integration_tests::support::{ADMIN, RecordingStore, engine_over, products, restricted_config};
use bson::doc;
use querygate::{DocumentId, QueryError, RawRequest};
use std::sync::Arc;

#[tokio::test]
async fn invalid_ids_never_reach_storage() {
    let store = Arc::new(RecordingStore::new(products()));
    let e = engine_over(store.clone(), restricted_config());
    for bad in ["not-a-valid-id", "", "507f1f77bcf86cd79943901", "507f1f77bcf86cd79943901z"] {
        let err = e.find_by_id(bad, None, true, None).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier(_)), "{bad}");
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn lookup_ignores_request_filter() {
    let c = products();
    let id = c.insert(doc! {"code": "target", "secret": "s", "name": "t"}).unwrap();
    let e = engine_over(Arc::new(c), restricted_config());
    let raw = RawRequest::new().filter(doc! {"code": "something else"}).structure(doc! {"name": 1});
    let d = e.find_by_id(&id.to_string(), Some(raw), true, None).await.unwrap().unwrap();
    assert_eq!(d.id(), Some(id));
    assert_eq!(d.data().get_str("name").unwrap(), "t");
    assert!(!d.data().contains_key("code"));
}

#[tokio::test]
async fn privileged_lookup_keeps_restricted() {
    let c = products();
    let id = c.insert(doc! {"code": "target", "secret": "s"}).unwrap();
    let e = engine_over(Arc::new(c), restricted_config());
    let d = e.find_by_id(&id.to_string(), None, false, Some(ADMIN)).await.unwrap().unwrap();
    assert_eq!(d.data().get_str("secret").unwrap(), "s");
}

#[tokio::test]
async fn unknown_id_is_absence() {
    let e = engine_over(Arc::new(products()), restricted_config());
    let id = DocumentId::new().to_string();
    assert!(e.find_by_id(&id, None, true, None).await.unwrap().is_none());
}
