use crate::common::{fixture, folder, seed_folders, seed_items};
use mongo_search::query::Order;
use mongo_search::{CallerContext, SearchError, SearchRequest};
use serde_json::json;

#[test]
fn item_size_query_returns_only_allow_listed_fields() {
    let fx = fixture();
    seed_items(&fx.engine, 200);
    fx.gateway.allow_list().set(&json!({"item": ["name", "size"]})).unwrap();

    let out = fx
        .gateway
        .search(&CallerContext::anonymous(), &SearchRequest::new("item", r#"{"size": {"$gt": 100}}"#))
        .unwrap();

    assert_eq!(out.len(), 50);
    for d in &out {
        assert!(d.keys().all(|k| k == "name" || k == "size"), "{d}");
        assert!(d.get_i64("size").unwrap() > 100);
    }
    // default sort is by name
    assert_eq!(out[0].get_str("name").unwrap(), "item-101");
    assert_eq!(out[49].get_str("name").unwrap(), "item-150");
}

#[test]
fn unknown_kind_is_rejected() {
    let fx = fixture();
    let err = fx.gateway.search(&CallerContext::anonymous(), &SearchRequest::new("widget", "{}")).unwrap_err();
    assert!(matches!(err, SearchError::UnknownCollection(ref k) if k == "widget"));
    assert_eq!(err.to_string(), "Invalid resource type: widget");
}

#[test]
fn non_object_queries_are_malformed() {
    let fx = fixture();
    for q in ["not-json", "[1, 2]", "42", "\"text\"", "{\"a\": 1} trailing"] {
        let err = fx.gateway.search(&CallerContext::anonymous(), &SearchRequest::new("item", q)).unwrap_err();
        assert!(matches!(err, SearchError::MalformedQuery(_)), "{q}: {err:?}");
    }
}

#[test]
fn kind_check_happens_before_query_parsing() {
    let fx = fixture();
    let err =
        fx.gateway.search(&CallerContext::anonymous(), &SearchRequest::new("widget", "not-json")).unwrap_err();
    assert!(matches!(err, SearchError::UnknownCollection(_)));
}

#[test]
fn rejected_update_keeps_serving_the_prior_mapping() {
    let fx = fixture();
    seed_items(&fx.engine, 3);
    fx.gateway.allow_list().set(&json!({"item": ["name"]})).unwrap();
    let err = fx.gateway.allow_list().set(&json!({"item": ["name", "bogusField"]})).unwrap_err();
    assert!(matches!(err, SearchError::Validation { ref field, .. } if field == "value"));

    let out = fx.gateway.search(&CallerContext::anonymous(), &SearchRequest::new("item", "{}")).unwrap();
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|d| d.keys().eq(["name"])));
}

#[test]
fn private_folders_need_a_grant() {
    let fx = fixture();
    seed_folders(
        &fx.engine,
        [
            folder("a-public", true, &[], &[]),
            folder("b-alice", false, &["alice"], &[]),
            folder("c-staff", false, &[], &["staff"]),
        ],
    );
    let names = |caller: &CallerContext| -> Vec<String> {
        fx.gateway
            .search(caller, &SearchRequest::new("folder", "{}"))
            .unwrap()
            .iter()
            .map(|d| d.get_str("name").unwrap().to_string())
            .collect()
    };
    assert_eq!(names(&CallerContext::anonymous()), ["a-public"]);
    assert_eq!(names(&CallerContext::user("alice")), ["a-public", "b-alice"]);
    assert_eq!(names(&CallerContext::user("bob").with_groups(["staff"])), ["a-public", "c-staff"]);
    assert_eq!(names(&CallerContext::administrator("root")), ["a-public", "b-alice", "c-staff"]);
}

#[test]
fn permission_offset_counts_permitted_documents_only() {
    let fx = fixture();
    seed_folders(
        &fx.engine,
        (0..10).map(|i| folder(&format!("f{i}"), i % 3 == 0, &[], &[])),
    );
    // public: f0 f3 f6 f9
    let req = SearchRequest::new("folder", "{}").with_offset(1).with_limit(2);
    let out = fx.gateway.search(&CallerContext::anonymous(), &req).unwrap();
    let names: Vec<&str> = out.iter().map(|d| d.get_str("name").unwrap()).collect();
    assert_eq!(names, ["f3", "f6"]);
    assert!(out.iter().all(|d| !d.contains_key("public") && !d.contains_key("access")));
}

#[test]
fn zero_limit_returns_everything() {
    let fx = fixture();
    seed_items(&fx.engine, 120);
    let out = fx
        .gateway
        .search(&CallerContext::anonymous(), &SearchRequest::new("item", "{}").with_limit(0))
        .unwrap();
    assert_eq!(out.len(), 120);
}

#[test]
fn sort_direction_and_field_are_honored() {
    let fx = fixture();
    seed_items(&fx.engine, 5);
    fx.gateway.allow_list().set(&json!({"item": ["name", "size"]})).unwrap();
    let req = SearchRequest::new("item", "{}").with_sort("size", Order::Desc).with_limit(2);
    let out = fx.gateway.search(&CallerContext::anonymous(), &req).unwrap();
    let sizes: Vec<i64> = out.iter().map(|d| d.get_i64("size").unwrap()).collect();
    assert_eq!(sizes, [4, 3]);
}

#[test]
fn items_have_no_permission_model() {
    // Items carry no access fields; the allow-list is their only protection.
    let fx = fixture();
    seed_items(&fx.engine, 2);
    let out = fx.gateway.search(&CallerContext::anonymous(), &SearchRequest::new("item", "{}")).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|d| !d.contains_key("secret")));
}

#[test]
fn search_emits_a_bench_line() {
    let _sink = mongo_search::utils::devlog::enable_thread_sink();
    let fx = fixture();
    seed_items(&fx.engine, 3);
    fx.gateway.search(&CallerContext::anonymous(), &SearchRequest::new("item", "{}")).unwrap();
    let lines = mongo_search::utils::devlog::lines_for_op("search");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\"result_count\":3"), "{}", lines[0]);
}

#[test]
fn permitted_documents_past_ten_thousand_private_ones_are_found() {
    let fx = fixture();
    seed_folders(
        &fx.engine,
        (0..10_000).map(|i| folder(&format!("a{i:05}"), false, &[], &[])).chain([folder("zzz", true, &[], &[])]),
    );
    let out = fx.gateway.search(&CallerContext::anonymous(), &SearchRequest::new("folder", "{}")).unwrap();
    let names: Vec<&str> = out.iter().map(|d| d.get_str("name").unwrap()).collect();
    assert_eq!(names, ["zzz"]);

    let admin = fx
        .gateway
        .search(&CallerContext::administrator("root"), &SearchRequest::new("folder", "{}").with_offset(10_000))
        .unwrap();
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].get_str("name").unwrap(), "zzz");
}

#[test]
fn large_pages_concatenate_like_one_double_page() {
    let fx = fixture();
    seed_items(&fx.engine, 12_000);
    let page = |offset: usize, limit: usize| {
        let req = SearchRequest::new("item", "{}").with_offset(offset).with_limit(limit);
        fx.gateway.search(&CallerContext::anonymous(), &req).unwrap()
    };
    let mut joined = page(0, 6_000);
    joined.extend(page(6_000, 6_000));
    assert_eq!(joined.len(), 12_000);
    assert_eq!(joined, page(0, 12_000));
}
