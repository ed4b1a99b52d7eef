use crate::common::{fixture, folder, seed_folders, seed_items};
use mongo_search::{AllowList, CallerContext, CollectionRegistry, SearchError, SearchRequest};
use proptest::prelude::*;
use serde_json::{Value, json};

const ITEM_FIELDS: &[&str] = &["_id", "name", "size", "description", "folderId", "meta", "created"];
const FOLDER_FIELDS: &[&str] = &["_id", "name", "description", "public", "creatorId", "size"];

fn subset(pool: &'static [&'static str]) -> impl Strategy<Value = Vec<String>> {
    proptest::sample::subsequence(pool, 0..=pool.len()).prop_map(|v| v.into_iter().map(String::from).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // No returned document ever carries a field outside the current allow-list.
    #[test]
    fn prop_results_stay_inside_allow_list(
        item_fields in subset(ITEM_FIELDS),
        folder_fields in subset(FOLDER_FIELDS),
        admin in any::<bool>(),
    ) {
        let fx = fixture();
        seed_items(&fx.engine, 10);
        seed_folders(&fx.engine, (0..6).map(|i| folder(&format!("f{i}"), i % 2 == 0, &["u1"], &[])));
        fx.gateway.allow_list().set(&json!({"item": item_fields, "folder": folder_fields})).unwrap();

        let caller = if admin { CallerContext::administrator("root") } else { CallerContext::user("u1") };
        for (kind, allowed) in [("item", &item_fields), ("folder", &folder_fields)] {
            let out = fx.gateway.search(&caller, &SearchRequest::new(kind, "{}")).unwrap();
            for d in &out {
                prop_assert!(!d.contains_key("public") && !d.contains_key("access"), "{} leaked permissions", kind);
                for k in d.keys() {
                    prop_assert!(allowed.contains(k), "{} leaked {} (allowed {:?})", kind, k, allowed);
                }
            }
        }
    }

    // Any value that is accepted only names readable fields; a rejected value changes nothing.
    #[test]
    fn prop_updates_are_validated_atomically(
        entries in proptest::collection::btree_map(
            prop_oneof![Just("item"), Just("user"), Just("folder"), Just("collection"), Just("widget")],
            proptest::collection::vec(
                prop_oneof![Just("name"), Just("login"), Just("size"), Just("bogusField"), Just("public")],
                0..4,
            ),
            0..4,
        ),
    ) {
        let fx = fixture();
        let store = fx.gateway.allow_list();
        let before = store.get();
        let value: Value = json!(entries);
        let registry = CollectionRegistry::standard();
        match store.set(&value) {
            Ok(list) => {
                prop_assert_eq!(&store.get(), &list);
                for kind in list.kinds() {
                    let adapter = registry.get(kind).unwrap();
                    for f in list.get(kind).unwrap() {
                        prop_assert!(adapter.is_readable(f));
                    }
                }
            }
            Err(e) => {
                prop_assert!(matches!(e, SearchError::Validation { .. }), "{:?}", e);
                prop_assert_eq!(store.get(), before);
            }
        }
        prop_assert_eq!(&*store.get_default(), &AllowList::builtin_default());
    }
}
