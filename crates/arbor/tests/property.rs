use arbor::path::resolve;
use arbor::{Entity, SetOptions};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn resolved_paths_display_back_to_their_input(
        base in "[a-z][a-z0-9_]{0,8}",
        index in proptest::option::of(0usize..10_000),
        sub in proptest::option::of("[a-z]{1,6}(\\.[a-z]{1,6}){0,2}"),
    ) {
        let mut path = base.clone();
        if let Some(index) = index {
            path.push_str(&format!("[{index}]"));
        }
        if let Some(sub) = &sub {
            path.push('.');
            path.push_str(sub);
        }

        let resolved = resolve(&path);
        prop_assert_eq!(resolved.base, base.as_str());
        prop_assert_eq!(resolved.index, index);
        prop_assert_eq!(resolved.sub, sub.as_deref());
        prop_assert_eq!(resolved.to_string(), path);
    }

    #[test]
    fn resolve_never_panics(path in ".*") {
        let resolved = resolve(&path);
        prop_assert!(path.starts_with(resolved.base));
    }

    #[test]
    fn plain_entity_stores_any_key_verbatim(key in "[a-z.\\[\\]0-9]{1,12}", value in any::<i64>()) {
        let entity = Entity::new();
        entity.set_with(&key, value, SetOptions::default()).unwrap();
        prop_assert_eq!(entity.value(&key).unwrap(), Some(json!(value)));
    }
}
