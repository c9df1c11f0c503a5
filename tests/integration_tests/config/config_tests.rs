use crate::integration_tests::support::products;
use querygate::{DefaultField, EngineConfig, NoPrivilege, QueryEngine, QueryError, RawRequest};
use std::sync::Arc;

#[test]
fn try_new_rejects_unusable_config() {
    let cfg = EngineConfig::default().with_max_limit(0);
    let err = QueryEngine::try_new(Arc::new(products()), Arc::new(NoPrivilege), cfg).unwrap_err();
    assert!(matches!(err, QueryError::Config(_)));
    let cfg = EngineConfig::default().with_restricted_operators([""]);
    assert!(QueryEngine::try_new(Arc::new(products()), Arc::new(NoPrivilege), cfg).is_err());
}

#[test]
fn engine_settings_share_a_file_with_other_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("querygate.toml");
    std::fs::write(
        &path,
        r#"
collection = "products"
admin_tokens = ["t1"]
restricted_fields = ["secret", "owner.email"]
restricted_operators = ["$where", "$function"]
max_limit = 25
"#,
    )
    .unwrap();
    let cfg = EngineConfig::load(&path).unwrap();
    assert_eq!(cfg.max_limit, 25);
    assert_eq!(cfg.restricted_operators, vec!["$where", "$function"]);
    assert!(cfg.default_fields.is_empty());
}

#[tokio::test]
async fn configured_operators_are_blocked() {
    let cfg = EngineConfig::default().with_restricted_operators(["$where", "$regex"]);
    let e = QueryEngine::try_new(Arc::new(products()), Arc::new(NoPrivilege), cfg).unwrap();
    let raw = RawRequest::new().filter(bson::doc! {"name": {"$regex": "^p"}});
    let err = e.find(Some(raw), true, None).await.unwrap_err();
    assert!(matches!(err, QueryError::RestrictedOperatorUsed(ref op) if op == "$regex"));
}

#[tokio::test]
async fn default_fields_are_always_projected() {
    let cfg = EngineConfig::default().with_default_fields(["code"]);
    let e = QueryEngine::try_new(Arc::new(products()), Arc::new(NoPrivilege), cfg).unwrap();
    assert_eq!(e.config().default_fields, vec![DefaultField::Field("code".into())]);
    let raw = RawRequest::new().filter(bson::doc! {"code": "xyz"}).structure(bson::doc! {"n": 1});
    let d = e.find_one(Some(raw), true, None).await.unwrap().unwrap();
    let keys: Vec<&str> = d.data().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["_id", "code", "n"]);
}
