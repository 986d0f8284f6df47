mod common;

use common::{fields, service_with, user_schema};
use entity_core::{EntityId, Filter, Store, ViewerContext};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

// ── store invariants ─────────────────────────────────────────────

proptest! {
    /// Whatever the insert sequence, each distinct username lands exactly once
    /// and the unique index mirrors the stored rows.
    #[test]
    fn unique_index_tracks_rows(names in prop::collection::vec("[a-d]{1,2}", 1..40)) {
        let store = Store::new();
        let schema = user_schema();
        let mut accepted = BTreeSet::new();
        for n in &names {
            let res = store.create(&schema, fields(json!({"username": n, "password": "p"})));
            prop_assert_eq!(res.is_ok(), accepted.insert(n.clone()));
        }
        prop_assert_eq!(store.len(&schema).unwrap(), accepted.len());
        prop_assert_eq!(store.unique_index_len(&schema, "username").unwrap(), Some(accepted.len()));
    }

    /// Cursor output is strictly ascending and equals the surviving ids.
    #[test]
    fn cursor_is_ascending_after_deletes(n in 1usize..30, deletes in prop::collection::vec(any::<prop::sample::Index>(), 0..10)) {
        let store = Store::new();
        let schema = Arc::new(user_schema());
        for i in 0..n {
            store.create(&schema, fields(json!({"username": format!("u{i}"), "password": "p"}))).unwrap();
        }
        let mut alive: BTreeSet<u64> = (1..=n as u64).collect();
        for d in deletes {
            let id = d.index(n) as u64 + 1;
            let res = store.delete(&schema, EntityId::new(id));
            prop_assert_eq!(res.is_ok(), alive.remove(&id));
        }
        let seen: Vec<u64> = store
            .cursor(schema, Filter::All)
            .unwrap()
            .to_array()
            .unwrap()
            .iter()
            .map(|r| r.id.get())
            .collect();
        prop_assert_eq!(seen, alive.into_iter().collect::<Vec<_>>());
    }

    /// A hidden value never appears anywhere in an outward record.
    #[test]
    fn hidden_values_never_leak(secret in "[A-Za-z0-9]{12,24}") {
        let service = service_with(vec![user_schema()]);
        let id = service
            .create("User", fields(json!({"username": "someone", "password": secret.clone()})))
            .unwrap();
        let out = service.get("User", id, &ViewerContext::anonymous()).unwrap().unwrap();
        prop_assert!(!out.to_json().to_string().contains(&secret));
        let listed = service
            .cursor("User", Filter::All, ViewerContext::anonymous())
            .unwrap()
            .to_array()
            .unwrap();
        prop_assert!(listed.iter().all(|r| !r.contains_key("password")));
    }

    /// Stored values come back unchanged for unlabeled fields.
    #[test]
    fn unlabeled_values_round_trip(name in "\\PC{1,32}") {
        let service = service_with(vec![user_schema()]);
        let id = service
            .create("User", fields(json!({"username": name.clone(), "password": "p"})))
            .unwrap();
        let out = service.get("User", id, &ViewerContext::anonymous()).unwrap().unwrap();
        prop_assert_eq!(out.get("username"), Some(&json!(name)));
    }
}
