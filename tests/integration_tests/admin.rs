use crate::common::fixture;
use mongo_search::{ALLOWED_FIELDS_KEY, AdminConfig, AllowList, CallerContext, CollectionKind, SearchError};
use serde_json::json;

#[test]
fn default_round_trip_ignores_updates() {
    let fx = fixture();
    let admin = AdminConfig::new(fx.gateway.allow_list().clone());
    let root = CallerContext::administrator("root");

    let before = admin.get_allowed(&root, true).unwrap();
    admin.set_allowed(&root, &json!({"user": ["login"]})).unwrap();
    admin.set_allowed(&root, &json!({"folder": ["name", "size"]})).unwrap();

    assert_eq!(admin.get_allowed(&root, true).unwrap(), before);
    assert_eq!(*before, AllowList::builtin_default());
    let current = admin.get_allowed(&root, false).unwrap();
    assert_eq!(current.kinds().collect::<Vec<_>>(), [CollectionKind::Folder]);
}

#[test]
fn updates_are_persisted_in_settings() {
    let fx = fixture();
    let admin = AdminConfig::new(fx.gateway.allow_list().clone());
    admin.set_allowed(&CallerContext::administrator("root"), &json!({"item": ["size", "name"]})).unwrap();
    assert_eq!(fx.settings.get(ALLOWED_FIELDS_KEY).unwrap(), Some(json!({"item": ["size", "name"]})));
}

#[test]
fn validation_messages_name_the_problem() {
    let fx = fixture();
    let admin = AdminConfig::new(fx.gateway.allow_list().clone());
    let root = CallerContext::administrator("root");
    let message = |v| match admin.set_allowed(&root, &v) {
        Err(SearchError::Validation { message, .. }) => message,
        other => panic!("expected a validation error, got {other:?}"),
    };
    assert!(message(json!(["item"])).contains("must be an object"));
    assert!(message(json!({"widget": []})).contains("are valid keywords"));
    assert!(message(json!({"item": {"name": 1}})).contains("must be lists"));
    assert_eq!(message(json!({"item": ["bogusField"]})), "Invalid key \"bogusField\" for \"item\".");
}

#[test]
fn signed_in_non_admins_are_forbidden() {
    let fx = fixture();
    let admin = AdminConfig::new(fx.gateway.allow_list().clone());
    let staff = CallerContext::user("bob").with_groups(["staff"]);
    assert!(matches!(admin.get_allowed(&staff, true), Err(SearchError::Authorization(_))));
    assert!(matches!(admin.set_allowed(&staff, &json!({})), Err(SearchError::Authorization(_))));
    assert_eq!(*fx.gateway.allow_list().get(), AllowList::builtin_default());
}
