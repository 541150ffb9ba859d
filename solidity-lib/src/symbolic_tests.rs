use super::symbolic::*;
use super::value::Value;
use analysis::domains::*;

#[test]
fn fresh_ids_skip_reserved_ones() {
    let mut ids = IdentityManager::new(SymbolKind::Address, 1000);
    ids.register_fixed_id(1001, None);
    assert_eq!(ids.fresh_id(), 1000);
    assert_eq!(ids.fresh_id(), 1002);
    ids.bind_var("x", 1003);
    assert_eq!(ids.fresh_id(), 1004);
}

#[test]
fn bound_names_are_aliases() {
    let mut ids = IdentityManager::new(SymbolKind::Address, 1000);
    ids.register_fixed_id(101, Some("msg.sender"));
    ids.bind_var("owner", 101);
    ids.bind_var("owner", 7);
    assert_eq!(ids.aliases(101), vec!["msg.sender".to_owned(), "owner".to_owned()]);
    assert_eq!(ids.ids_of("owner"), vec![7, 101]);

    ids.unbind_var("owner");
    assert_eq!(ids.aliases(101), vec!["msg.sender".to_owned()]);
    assert!(ids.ids_of("owner").is_empty());
}

#[test]
fn values_of_identities() {
    let addresses = IdentityManager::new(SymbolKind::Address, 1000);
    assert_eq!(addresses.value_of(101), Value::address(101));
    assert_eq!(addresses.kind(), SymbolKind::Address);

    let bytes = IdentityManager::new(SymbolKind::Bytes(4), 1000);
    assert_eq!(bytes.value_of(3), Value::Bytes(BytesSet::of(4, 3u64)));
}

#[test]
fn reset_keeps_fixed_identities() {
    let mut ids = IdentityManager::new(SymbolKind::Address, 100);
    ids.register_fixed_id(100, Some("tx.origin"));
    let id = ids.fresh_id();
    ids.bind_var("a", id);
    ids.reset();
    assert!(ids.aliases(100).is_empty());
    assert!(ids.ids_of("a").is_empty());
    // Still reserved, so the first fresh identity moves past it.
    assert_eq!(ids.fresh_id(), 101);
}
