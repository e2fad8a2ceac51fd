//! Integration tests for the DN model.
//!
//! These check the properties that sorted DN lists and entry matching rely
//! on, using the public API only.

use std::cmp::Ordering;
use std::sync::Arc;

use proptest::prelude::*;

use ldapkit_core::{Dn, Error, Rdn, ResultCode, Schema, SearchScope};

#[test]
fn test_case_insensitive_names_preserve_text() {
    let upper = Dn::parse("CN=Bob,OU=People,DC=ex,DC=com").unwrap();
    let lower = Dn::parse("cn=Bob,ou=People,dc=ex,dc=com").unwrap();
    assert_eq!(upper, lower);
    assert_eq!(upper.to_string(), "CN=Bob,OU=People,DC=ex,DC=com");
    assert_eq!(lower.to_string(), "cn=Bob,ou=People,dc=ex,dc=com");
}

#[test]
fn test_null_dn_is_universal_ancestor() {
    let null = Dn::parse("").unwrap();
    for s in ["dc=com", "ou=People,dc=com", "cn=a+sn=b,dc=org"] {
        let d = Dn::parse(s).unwrap();
        assert!(null.is_ancestor_of(&d, false), "{s}");
        assert!(d.is_descendant_of(&null, true), "{s}");
    }
    assert!(null.is_descendant_of(&null, true));
}

#[test]
fn test_sorted_list_ancestors_first() {
    let mut dns: Vec<Dn> = ["cn=Bob,ou=People,dc=com", "dc=com", "ou=People,dc=com"]
        .iter()
        .map(|s| Dn::parse(s).unwrap())
        .collect();
    dns.sort();
    let sorted: Vec<String> = dns.iter().map(ToString::to_string).collect();
    assert_eq!(sorted, ["dc=com", "ou=People,dc=com", "cn=Bob,ou=People,dc=com"]);
}

#[test]
fn test_multi_valued_rdn_order_independent() {
    let a = Dn::parse("cn=Bob+uid=bob,dc=com").unwrap();
    let b = Dn::parse("uid=bob+cn=Bob,dc=com").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.cmp(&b), Ordering::Equal);
}

#[test]
fn test_syntax_errors_carry_position_and_code() {
    let err = Dn::parse("cn=Bob,ou=People,").unwrap_err();
    assert!(matches!(err, Error::InvalidDnSyntax { position: 16, .. }));
    assert_eq!(err.result_code(), ResultCode::INVALID_DN_SYNTAX);

    let err = Rdn::parse("cn").unwrap_err();
    assert!(matches!(err, Error::InvalidDnSyntax { position: 2, .. }));
}

#[test]
fn test_schema_aware_equality() {
    let schema = Arc::new(Schema::standard());
    let a = Dn::parse_with_schema("commonName=Bob,domainComponent=com", schema.clone()).unwrap();
    let b = Dn::parse_with_schema("cn=bob,dc=com", schema).unwrap();
    assert_eq!(a, b);
    assert!(a.schema().is_some());
}

#[test]
fn test_hex_and_escaped_forms_equal() {
    let hex = Dn::parse("cn=#0403426f62,dc=com").unwrap();
    let plain = Dn::parse("cn=Bob,dc=com").unwrap();
    let escaped = Dn::parse(r"cn=\42ob,dc=com").unwrap();
    assert_eq!(hex, plain);
    assert_eq!(escaped, plain);
}

#[test]
fn test_binary_value_minimal_encoding_round_trips() {
    let d = Dn::parse(r"cn=\ff\fe,dc=com").unwrap();
    let minimal = d.to_minimally_encoded_string();
    assert_eq!(minimal, "cn=#0402fffe,dc=com");
    assert_eq!(Dn::parse(&minimal).unwrap(), d);
}

#[test]
fn test_scope_matching_rejects_unknown_scope() {
    let base = Dn::parse("dc=com").unwrap();
    let err = base
        .matches_base_and_scope(&base, SearchScope::new(42))
        .unwrap_err();
    assert!(matches!(err, Error::Param(_)));
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_dn_as_string() {
    let d = Dn::parse("cn=Bob,dc=com").unwrap();
    let json = serde_json::to_string(&d).unwrap();
    assert_eq!(json, "\"cn=Bob,dc=com\"");
    let back: Dn = serde_json::from_str(&json).unwrap();
    assert_eq!(back, d);
    assert!(serde_json::from_str::<Dn>("\"cn=\"").is_err());
}

fn value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[ -~]{1,12}").unwrap()
}

fn rdn_strategy() -> impl Strategy<Value = Rdn> {
    (proptest::sample::select(vec!["cn", "ou", "dc", "uid", "o"]), value_strategy())
        .prop_map(|(name, value)| Rdn::new(name, value.into_bytes()))
}

proptest! {
    #[test]
    fn prop_display_reparses_equal(rdns in proptest::collection::vec(rdn_strategy(), 0..5)) {
        let d = Dn::from_rdns(rdns);
        let reparsed = Dn::parse(&d.to_string()).unwrap();
        prop_assert_eq!(&reparsed, &d);
        let minimal = Dn::parse(&d.to_minimally_encoded_string()).unwrap();
        prop_assert_eq!(&minimal, &d);
    }

    #[test]
    fn prop_normalize_idempotent(rdns in proptest::collection::vec(rdn_strategy(), 0..5)) {
        let d = Dn::from_rdns(rdns);
        let once = d.to_normalized_string().to_string();
        let twice = Dn::normalize(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_parent_is_ancestor(rdns in proptest::collection::vec(rdn_strategy(), 2..6)) {
        let d = Dn::from_rdns(rdns);
        let parent = d.parent().unwrap();
        prop_assert!(parent.is_ancestor_of(&d, false));
        prop_assert!(parent < d);
        prop_assert!(d.matches_base_and_scope(&parent, SearchScope::ONE).unwrap());
    }
}
