//! Integration tests for the message layer.
//!
//! Messages are built with the public constructors, pushed through the
//! encoder and read back the way a connection reads them off a stream.

use proptest::prelude::*;

use ldapkit_asn1::{Element, StreamReader};
use ldapkit_core::{ResultCode, SearchScope};
use ldapkit_protocol::control::{
    self, AnyControl, DirSync, ServerSideSortRequest, ServerSideSortResponse, SimplePagedResults,
    SortKey, SyncInfo,
};
use ldapkit_protocol::op::{
    AddRequest, CompareRequest, ExtendedResponse, IntermediateResponse, ModifyDnRequest,
};
use ldapkit_protocol::{
    Attribute, Control, DecodableControl, Error, Filter, LdapMessage, LdapResponse,
    ModificationType, ModifyRequest, OperationResult, OperationType, ProtocolOp, SearchRequest,
    SearchResultEntry,
};

fn round_trip(message: &LdapMessage) -> LdapMessage {
    LdapMessage::decode(&message.encode()).unwrap()
}

#[test]
fn test_search_with_paged_control() {
    let filter = Filter::parse("(&(objectClass=person)(|(cn=Bob*)(mail=*@example.com)))").unwrap();
    let search = SearchRequest::new("dc=example,dc=com", SearchScope::SUB, filter)
        .with_attributes(["cn", "mail"])
        .with_size_limit(50);
    let message = LdapMessage::new(3, search)
        .with_controls(vec![SimplePagedResults::new(500).to_control()]);
    let decoded = round_trip(&message);
    assert_eq!(decoded, message);

    let ProtocolOp::SearchRequest(request) = &decoded.op else {
        panic!("expected a search request, got {}", decoded.op);
    };
    assert_eq!(request.scope, SearchScope::SUB);
    assert_eq!(
        request.filter.to_string(),
        "(&(objectClass=person)(|(cn=Bob*)(mail=*@example.com)))"
    );
    match control::decode_any(decoded.controls[0].clone()) {
        AnyControl::SimplePagedResults(paged) => assert_eq!(paged.size, 500),
        other => panic!("unexpected control {other:?}"),
    }
}

#[test]
fn test_update_ops_round_trip() {
    let ops: Vec<ProtocolOp> = vec![
        AddRequest {
            dn: "cn=new,dc=example,dc=com".into(),
            attributes: vec![
                Attribute::from_strings("objectClass", ["top", "person"]),
                Attribute::from_strings("sn", ["New"]),
            ],
        }
        .into(),
        ModifyRequest {
            dn: "cn=new,dc=example,dc=com".into(),
            changes: vec![ldapkit_protocol::Modification::new(
                ModificationType::REPLACE,
                Attribute::from_strings("mail", ["new@example.com"]),
            )],
        }
        .into(),
        ModifyDnRequest {
            dn: "cn=new,dc=example,dc=com".into(),
            new_rdn: "cn=renamed".into(),
            delete_old_rdn: true,
            new_superior: Some("ou=people,dc=example,dc=com".into()),
        }
        .into(),
        CompareRequest::new("cn=new,dc=example,dc=com", "sn", "New").into(),
    ];
    for (id, op) in ops.into_iter().enumerate() {
        let message = LdapMessage::new(i32::try_from(id).unwrap() + 1, op);
        assert_eq!(round_trip(&message), message);
    }
}

#[test]
fn test_extended_response_members_in_any_order() {
    // ExtendedResponse { success, "", "", [11] value, [10] name }
    let element = Element::sequence_tagged(
        0x78,
        [
            Element::enumerated(0),
            Element::octet_string(""),
            Element::octet_string(""),
            Element::octet_string_tagged(0x8B, "dn:cn=me"),
            Element::octet_string_tagged(0x8A, "1.3.6.1.4.1.4203.1.11.3"),
        ],
    );
    let response = ExtendedResponse::decode(&element).unwrap();
    assert_eq!(response.oid.as_deref(), Some("1.3.6.1.4.1.4203.1.11.3"));
    assert_eq!(response.value.as_deref(), Some(&b"dn:cn=me"[..]));
    assert_eq!(response.response.diagnostic_message, None);
}

#[test]
fn test_extended_response_rejects_unknown_member() {
    let element = Element::sequence_tagged(
        0x78,
        [
            Element::enumerated(0),
            Element::octet_string(""),
            Element::octet_string(""),
            Element::octet_string_tagged(0x8C, "?"),
        ],
    );
    let err = ExtendedResponse::decode(&element).unwrap_err();
    assert!(matches!(err, Error::UnknownTag { tag: 0x8C, .. }));
    assert!(err.to_string().contains("invalid element type"));
}

#[test]
fn test_sort_response_element_count() {
    let value = Element::sequence([
        Element::enumerated(0),
        Element::octet_string_tagged(0x80, "cn"),
        Element::octet_string("extra"),
    ]);
    let control = Control::with_element(ServerSideSortResponse::OID, false, &value);
    let err = ServerSideSortResponse::decode_control(&control).unwrap_err();
    assert!(matches!(
        err,
        Error::ElementCount {
            min: 1,
            max: 2,
            actual: 3,
            ..
        }
    ));
    // The registry keeps the control rather than failing.
    assert!(matches!(control::decode_any(control), AnyControl::Raw(_)));
}

#[test]
fn test_dirsync_defaults() {
    let dirsync = DirSync::new(DirSync::FLAG_OBJECT_SECURITY, 0, None);
    let control = dirsync.to_control();
    assert!(control.critical);
    let decoded = DirSync::decode_control(&control).unwrap();
    assert!(decoded.cookie.is_empty());
    assert!(decoded.has_flag(DirSync::FLAG_OBJECT_SECURITY));
}

#[test]
fn test_unknown_control_is_raw() {
    let control = Control::new("1.2.3.4.5", true, Some(vec![1, 2, 3]));
    assert!(!control::is_registered("1.2.3.4.5"));
    let any = control::decode_any(control.clone());
    assert_eq!(any.name(), None);
    assert_eq!(Control::from(any), control);
}

#[test]
fn test_search_done_builds_result_with_controls() {
    let sort = ServerSideSortRequest::new(vec![SortKey::new("sn"), SortKey::reversed("cn")]);
    let request = LdapMessage::new(8, ProtocolOp::UnbindRequest)
        .with_controls(vec![sort.to_control()]);
    assert_eq!(round_trip(&request), request);

    let done = LdapMessage::new(
        8,
        ProtocolOp::SearchResultDone(
            LdapResponse::new(ResultCode::SIZE_LIMIT_EXCEEDED)
                .with_diagnostic_message("too many"),
        ),
    )
    .with_controls(vec![
        SimplePagedResults::new(0)
            .with_cookie(b"next".to_vec())
            .to_control(),
    ]);
    let decoded = round_trip(&done);
    let entry = SearchResultEntry::new("cn=a,dc=example,dc=com", vec![]);
    let result = OperationResult::from_message(&decoded, 1, 0, Some((vec![entry], vec![]))).unwrap();
    let search = result.as_search().unwrap();
    assert_eq!(search.operation_type(), OperationType::Search);
    assert_eq!(search.diagnostic_message(), Some("too many"));
    let paged = SimplePagedResults::get(search).unwrap().unwrap();
    assert!(paged.more_results_to_return());
    assert_eq!(
        search.to_string(),
        "SearchResult(resultCode=4 (sizeLimitExceeded), entriesReturned=1, referencesReturned=0)"
    );
}

#[test]
fn test_sync_info_in_intermediate_response() {
    let info = SyncInfo::RefreshPresent {
        cookie: Some(b"c1".to_vec()),
        refresh_done: true,
    };
    let message = LdapMessage::new(
        4,
        ProtocolOp::IntermediateResponse(info.to_intermediate_response()),
    );
    let decoded = round_trip(&message);
    let ProtocolOp::IntermediateResponse(response) = &decoded.op else {
        panic!("expected an intermediate response");
    };
    assert_eq!(SyncInfo::decode(response).unwrap(), info);
    assert!(SyncInfo::decode(&IntermediateResponse {
        oid: None,
        value: None,
    }).is_err());
}

#[test]
fn test_stream_overrun_is_framing_error() {
    let mut bytes = LdapMessage::new(1, ProtocolOp::UnbindRequest).encode().to_vec();
    // Shrink the envelope length so the op runs past it.
    bytes[1] -= 1;
    bytes.push(0x00);
    let mut reader = StreamReader::new(&bytes[..]);
    let err = LdapMessage::read_from(&mut reader).unwrap_err();
    assert!(err.is_framing());
    assert_eq!(err.message_id(), Some(1));
    assert_eq!(err.result_code(), ResultCode::DECODING_ERROR);
}

fn attribute_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9-]{0,8}"
}

fn value() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..8)
}

fn non_empty_value() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..8)
}

fn item() -> impl Strategy<Value = Filter> {
    prop_oneof![
        (attribute_name(), value()).prop_map(|(a, v)| Filter::equality(a, v)),
        (attribute_name(), value()).prop_map(|(a, v)| Filter::greater_or_equal(a, v)),
        (attribute_name(), value()).prop_map(|(a, v)| Filter::less_or_equal(a, v)),
        (attribute_name(), value()).prop_map(|(a, v)| Filter::approximate(a, v)),
        attribute_name().prop_map(Filter::present),
        (
            attribute_name(),
            non_empty_value(),
            prop::collection::vec(non_empty_value(), 0..3),
            prop::option::of(non_empty_value()),
        )
            .prop_map(|(a, initial, any, last)| {
                let any: Vec<&[u8]> = any.iter().map(Vec::as_slice).collect();
                Filter::substring(a, Some(initial.as_slice()), &any, last.as_deref())
            }),
        (attribute_name(), "[0-9]\\.[0-9]{1,3}", value(), any::<bool>()).prop_map(
            |(a, rule, v, dn)| Filter::extensible(Some(a.as_str()), Some(rule.as_str()), v, dn)
        ),
    ]
}

fn filter() -> impl Strategy<Value = Filter> {
    item().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Filter::and),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Filter::or),
            inner.prop_map(Filter::not),
        ]
    })
}

proptest! {
    #[test]
    fn test_filter_string_round_trip(filter in filter()) {
        let text = filter.to_string();
        prop_assert_eq!(Filter::parse(&text).unwrap(), filter.clone());
        prop_assert_eq!(Filter::decode(&filter.encode()).unwrap(), filter);
    }

    #[test]
    fn test_search_message_round_trip(
        id in 1..i32::MAX,
        base in "(cn=[a-z]{1,6},)?dc=[a-z]{1,6}",
        filter in filter(),
        size_limit in 0..1000i32,
    ) {
        let message = LdapMessage::new(
            id,
            SearchRequest::new(base, SearchScope::ONE, filter).with_size_limit(size_limit),
        );
        prop_assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_control_round_trip(
        oid in "[1-2](\\.[0-9]{1,4}){1,6}",
        critical in any::<bool>(),
        value in prop::option::of(value()),
    ) {
        let control = Control::new(oid, critical, value);
        prop_assert_eq!(Control::decode(&control.encode()).unwrap(), control);
    }

    #[test]
    fn test_paged_control_round_trip(size in 0..i32::MAX, cookie in value()) {
        let paged = SimplePagedResults::new(size).with_cookie(cookie);
        let decoded = SimplePagedResults::decode_control(&paged.to_control()).unwrap();
        prop_assert_eq!(decoded, paged);
    }
}
