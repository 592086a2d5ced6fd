pub mod fixtures;

use arbor::{Attr, Entity, Policy, SetOptions, StructError, ToJson};
use fixtures::*;
use serde_json::json;

#[test]
fn test_plain_entity_keeps_dotted_keys_flat() {
    let model = Entity::from_value(json!({ "a": 1, "b": 2, "c.a": 3, "c.a[1]": 4 })).unwrap();

    assert_eq!(model.value("a").unwrap(), Some(json!(1)));
    assert_eq!(model.value("b").unwrap(), Some(json!(2)));
    assert_eq!(model.value("c.a").unwrap(), Some(json!(3)));
    assert_eq!(model.value("c.a[1]").unwrap(), Some(json!(4)));
}

#[test]
fn test_construction_builds_nested_children() {
    let model = structured(json!({
        "model": { "attr": 1 },
        "collection": [{ "attr": 1 }, { "attr": 2 }],
    }));

    let child = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();
    assert_eq!(child.value("attr").unwrap(), Some(json!(1)));

    let collection = model.get("collection").unwrap().and_then(Attr::into_collection).unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.at(0).unwrap().value("attr").unwrap(), Some(json!(1)));
    assert_eq!(collection.at(1).unwrap().value("attr").unwrap(), Some(json!(2)));
}

#[test]
fn test_dotted_set_initializes_child() {
    let model = structured(json!(null));
    assert!(!model.is_initialized("model"));

    model.set("model.attr", 2).unwrap();

    assert!(model.is_initialized("model"));
    assert_eq!(model.value("model.attr").unwrap(), Some(json!(2)));
}

#[test]
fn test_index_on_entity_child_is_rejected() {
    let model = structured(json!(null));

    assert!(model.set("model.attr", 2).is_ok());
    let err = model.set("model[1]", 2).unwrap_err();
    assert!(matches!(err, StructError::UnsupportedIndex { .. }), "{err}");
}

#[test]
fn test_index_past_the_end_is_rejected() {
    let model = structured(json!({ "collection": [{}, {}] }));

    assert!(model.set("collection[1]", json!({})).is_ok());
    let err = model.set("collection[2]", json!({})).unwrap_err();
    assert!(matches!(err, StructError::IndexOutOfBounds { .. }), "{err}");
    assert!(err.to_string().contains("length is 2"), "{err}");
}

#[test]
fn test_sub_path_on_collection_requires_an_index() {
    let model = structured(json!({ "collection": [{}] }));
    let err = model.set("collection.attr", 1).unwrap_err();
    assert_eq!(err.kind(), "InvalidPath");
}

#[test]
fn test_dotted_set_updates_existing_child() {
    let model = structured(json!({ "model": { "attr": 1 } }));

    model.set("model.attr", 2).unwrap();

    assert_eq!(model.value("model.attr").unwrap(), Some(json!(2)));
}

#[test]
fn test_indexed_set_updates_element() {
    let model = structured(json!({ "collection": [{ "attr": 1 }] }));

    model.set("collection[0]", json!({ "attr": 2 })).unwrap();
    assert_eq!(model.value("collection[0].attr").unwrap(), Some(json!(2)));

    model.set("collection[0].attr", 3).unwrap();
    assert_eq!(model.value("collection[0].attr").unwrap(), Some(json!(3)));
}

#[test]
fn test_object_write_keeps_child_identity() {
    let model = structured(json!({ "model": { "attr": 1 } }));
    let sub = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();

    model.set_many(json!({ "model": { "attr": 2 } }), SetOptions::default()).unwrap();
    let after = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();
    assert!(after.ptr_eq(&sub));
    assert_eq!(sub.value("attr").unwrap(), Some(json!(2)));

    let foreign = Entity::from_value(json!({ "attr": 3 })).unwrap();
    model.set_from("model", &foreign).unwrap();
    let after = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();
    assert!(after.ptr_eq(&sub));
    assert!(!after.ptr_eq(&foreign));
    assert_eq!(sub.value("attr").unwrap(), Some(json!(3)));
}

#[test]
fn test_object_write_merges_into_child() {
    let model = structured(json!({ "model": { "attr": 1, "keep": true } }));

    model.set("model", json!({ "attr": 2 })).unwrap();

    assert_eq!(model.value("model").unwrap(), Some(json!({ "attr": 2, "keep": true })));
}

#[test]
fn test_array_write_resets_collection() {
    let model = structured(json!({ "collection": [{ "attr": 1 }, { "attr": 2 }] }));
    let collection = model.get("collection").unwrap().and_then(Attr::into_collection).unwrap();

    model.set("collection", json!([{ "attr": 3 }, { "attr": 4 }])).unwrap();

    let after = model.get("collection").unwrap().and_then(Attr::into_collection).unwrap();
    assert!(after.ptr_eq(&collection));
    assert_eq!(model.value("collection[0].attr").unwrap(), Some(json!(3)));
    assert_eq!(model.value("collection[1].attr").unwrap(), Some(json!(4)));
}

#[test]
fn test_array_of_entities_resets_collection() {
    let model = structured(json!({ "collection": [{ "attr": 1 }, { "attr": 2 }] }));
    let replacement = arbor::Collection::new();
    replacement.add(json!({ "attr": 3 })).unwrap();
    replacement.add(json!({ "attr": 4 })).unwrap();

    model.set_from("collection", &replacement).unwrap();

    assert_eq!(model.value("collection").unwrap(), Some(json!([{ "attr": 3 }, { "attr": 4 }])));
    assert!(!model.get("collection[0]").unwrap().and_then(Attr::into_entity).unwrap().ptr_eq(
        &replacement.at(0).unwrap()
    ));
}

#[test]
fn test_shape_mismatch_is_rejected() {
    let model = structured(json!(null));

    let err = model.set("model", 5).unwrap_err();
    assert!(matches!(err, StructError::UnexpectedValue { .. }), "{err}");

    let err = model.set("collection", "nope").unwrap_err();
    assert!(matches!(err, StructError::UnexpectedValue { .. }), "{err}");

    let err = model.set_many(json!([1, 2]), SetOptions::default()).unwrap_err();
    assert!(matches!(err, StructError::UnexpectedValue { .. }), "{err}");
}

#[test]
fn test_single_object_resets_collection_to_one_element() {
    let model = structured(json!({ "collection": [{}, {}, {}] }));

    model.set("collection", json!({ "attr": 9 })).unwrap();

    assert_eq!(model.value("collection").unwrap(), Some(json!([{ "attr": 9 }])));
}

#[test]
fn test_unset_by_path() {
    let model = structured(json!({
        "model": { "attr": 1 },
        "collection": [{ "attr": 1 }, { "attr": 2 }],
    }));

    model.unset("model.attr").unwrap();
    assert_eq!(model.value("model.attr").unwrap(), None);

    model.unset("collection[0].attr").unwrap();
    assert_eq!(model.value("collection[0].attr").unwrap(), None);
    assert_eq!(model.value("collection[1].attr").unwrap(), Some(json!(2)));
}

#[test]
fn test_clear_empties_children_but_keeps_them() {
    let model = structured(json!({
        "flat": true,
        "model": { "attr": 1 },
        "collection": [{ "attr": 1 }, { "attr": 2 }],
    }));
    let sub = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();

    model.clear().unwrap();

    assert_eq!(model.value("flat").unwrap(), None);
    let after = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();
    assert!(after.ptr_eq(&sub));
    assert_eq!(after.value("attr").unwrap(), None);
    assert_eq!(model.get("collection").unwrap().and_then(Attr::into_collection).unwrap().len(), 0);
}

#[test]
fn test_uninitialized_paths_read_as_none() {
    let model = structured(json!({ "collection": [{}] }));

    assert!(model.get("model").unwrap().is_none());
    assert!(model.get("model.attr").unwrap().is_none());
    assert!(model.get("collection[1]").unwrap().is_none());
    assert!(model.get("collection[1].attr").unwrap().is_none());
    assert!(!model.is_initialized("model"), "reads must not create children");
}

#[test]
fn test_get_resolves_nested_paths() {
    let model = structured(json!({
        "model": { "attr": 1 },
        "collection": [{ "attr": 1 }, { "attr": 2 }],
    }));

    assert_eq!(model.value("model.attr").unwrap(), Some(json!(1)));
    assert!(matches!(model.get("collection").unwrap(), Some(Attr::Collection(_))));
    assert!(matches!(model.get("collection[0]").unwrap(), Some(Attr::Entity(_))));
    assert!(matches!(model.get("collection[1]").unwrap(), Some(Attr::Entity(_))));
    assert_eq!(model.value("collection[0].attr").unwrap(), Some(json!(1)));
    assert_eq!(model.value("collection[1].attr").unwrap(), Some(json!(2)));
    assert!(model.get("model[0]").unwrap().is_none());
}

#[test]
fn test_auto_initialize_materializes_declared_children_only() {
    let policy = Policy { auto_initialize: true, ..Policy::default() };
    let model = structured_with(policy, json!(null));

    assert!(matches!(model.get("model").unwrap(), Some(Attr::Entity(_))));
    assert!(matches!(model.get("collection").unwrap(), Some(Attr::Collection(_))));
    assert!(model.get("modelA").unwrap().is_none());
    assert!(model.get("collectionA").unwrap().is_none());
}

#[test]
fn test_has_checks_presence_by_path() {
    let model = structured(json!({
        "model": { "attr": 1, "empty": null },
        "collection": [{ "attr": 1 }, { "attr": 2 }],
    }));

    assert!(model.has("model").unwrap());
    assert!(model.has("model.attr").unwrap());
    assert!(!model.has("model.nothing").unwrap());
    assert!(!model.has("model.empty").unwrap());

    assert!(model.has("collection").unwrap());
    assert!(model.has("collection[0]").unwrap());
    assert!(model.has("collection[0].attr").unwrap());
    assert!(!model.has("collection[0].nothing").unwrap());
    assert!(!model.has("collection[2]").unwrap());
    assert!(!model.has("collection[2].attr").unwrap());
}

#[test]
fn test_defaults_fill_gaps_at_construction() {
    let registry = arbor::Registry::builder()
        .register(
            arbor::Schema::builder("order")
                .default_value("status", "draft")
                .default_value("customer", json!({ "name": "anonymous" }))
                .entity("customer", arbor::PLAIN_TYPE),
        )
        .build()
        .unwrap();

    let fresh = registry.create("order").unwrap();
    assert_eq!(
        fresh.to_json().unwrap(),
        json!({ "status": "draft", "customer": { "name": "anonymous" } })
    );

    let given = registry.create_with("order", json!({ "status": "paid" })).unwrap();
    assert_eq!(given.value("status").unwrap(), Some(json!("paid")));
    assert_eq!(given.value("customer.name").unwrap(), Some(json!("anonymous")));
}

#[test]
fn test_recursive_type_nests_arbitrarily_deep() {
    let registry = arbor::Registry::builder()
        .register(arbor::Schema::builder("node").collection("children", "node"))
        .build()
        .unwrap();

    let root = registry.create("node").unwrap();
    root.set("children", json!([{ "name": "a", "children": [{ "name": "a1" }] }])).unwrap();
    root.set("children[0].children[0].name", "renamed").unwrap();

    assert_eq!(root.value("children[0].children[0].name").unwrap(), Some(json!("renamed")));
    assert_eq!(
        root.get("children[0].children[0]").unwrap().and_then(Attr::into_entity).unwrap().type_name(),
        "node"
    );
}

#[test]
fn test_entities_serialize_through_serde() {
    let model = structured(json!({ "model": { "attr": 1 }, "collection": [{ "x": 1 }] }));

    let text = serde_json::to_string(&model).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(parsed, json!({ "model": { "attr": 1 }, "collection": [{ "x": 1 }] }));
}

#[test]
fn test_repeated_access_keeps_the_same_child() {
    let model = structured_with(Policy { auto_initialize: true, ..Policy::default() }, json!(null));

    let first = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();
    model.set("model.attr", 1).unwrap();
    model.set("model", json!({ "attr": 2 })).unwrap();
    let again = model.get("model").unwrap().and_then(Attr::into_entity).unwrap();

    assert!(first.ptr_eq(&again));

    let list = model.get("collection").unwrap().and_then(Attr::into_collection).unwrap();
    model.set("collection", json!([{}])).unwrap();
    assert!(list.ptr_eq(&model.get("collection").unwrap().and_then(Attr::into_collection).unwrap()));
}

#[test]
fn test_bulk_write_routes_each_sub_object_to_its_child() {
    let registry = arbor::Registry::builder()
        .register(arbor::Schema::builder("pair").entity("a", "model").entity("b", "model"))
        .build()
        .unwrap();
    let pair = registry.create("pair").unwrap();

    pair.set_many(json!({ "a": { "x": 1 }, "b": { "y": 2 } }), SetOptions::default()).unwrap();

    assert_eq!(pair.value("a").unwrap(), Some(json!({ "x": 1 })));
    assert_eq!(pair.value("b").unwrap(), Some(json!({ "y": 2 })));
}

#[test]
fn test_failed_batch_keeps_the_parts_written_before_the_error() {
    let model = structured(json!({ "collection": [{}] }));

    let err = model
        .set_many(
            json!({ "a": 1, "collection[5]": { "x": 1 }, "model": { "y": 2 } }),
            SetOptions::default(),
        )
        .unwrap_err();

    assert!(matches!(err, StructError::IndexOutOfBounds { .. }), "{err}");
    assert_eq!(model.value("a").unwrap(), Some(json!(1)));
    assert!(!model.is_initialized("model"), "parts after the error are not reached");
    assert_eq!(model.value("collection[0]").unwrap(), Some(json!({})));
}
