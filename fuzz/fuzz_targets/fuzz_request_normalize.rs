#![no_main]
use libfuzzer_sys::fuzz_target;
use querygate::query::normalize;
use querygate::{EngineConfig, RawRequest, RequestKind};

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(raw) = RawRequest::from_json_str(s) else { return };
    let cfg = EngineConfig::default().with_restricted_fields(["secret"]).with_max_limit(50);
    for kind in [RequestKind::Find, RequestKind::FindOne, RequestKind::FindById] {
        // Must never panic; accepted specs stay within bounds
        if let Ok(spec) = normalize(Some(raw.clone()), kind, &cfg, "fuzz") {
            assert!(spec.limit <= 50);
            if kind != RequestKind::Find {
                assert_eq!((spec.limit, spec.skip), (1, 0));
            }
        }
    }
});
