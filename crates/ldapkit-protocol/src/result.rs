//! Completed-operation results.
//!
//! Every operation that gets a response ends in an [`LdapResult`]. Search,
//! compare, extended and bind operations wrap it with their extra fields;
//! [`OperationResult`] holds any of them.

use std::fmt;

use ldapkit_core::ResultCode;

use crate::control::Control;
use crate::message::LdapMessage;
use crate::op::{
    LdapResponse, OperationType, ProtocolOp, SearchResultEntry, SearchResultReference,
};

/// The outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapResult {
    message_id: i32,
    operation_type: OperationType,
    result_code: ResultCode,
    matched_dn: Option<String>,
    diagnostic_message: Option<String>,
    referrals: Vec<String>,
    response_controls: Vec<Control>,
}

impl LdapResult {
    /// Creates a result.
    #[must_use]
    pub const fn new(
        message_id: i32,
        operation_type: OperationType,
        result_code: ResultCode,
        matched_dn: Option<String>,
        diagnostic_message: Option<String>,
        referrals: Vec<String>,
        response_controls: Vec<Control>,
    ) -> Self {
        Self {
            message_id,
            operation_type,
            result_code,
            matched_dn,
            diagnostic_message,
            referrals,
            response_controls,
        }
    }

    /// Creates a result produced on the client side, e.g. for a timeout.
    #[must_use]
    pub fn client_side(
        message_id: i32,
        operation_type: OperationType,
        result_code: ResultCode,
        diagnostic_message: impl Into<String>,
    ) -> Self {
        Self::new(
            message_id,
            operation_type,
            result_code,
            None,
            Some(diagnostic_message.into()),
            Vec::new(),
            Vec::new(),
        )
    }

    /// Creates a result from a response op.
    #[must_use]
    pub fn from_response(
        message_id: i32,
        operation_type: OperationType,
        response: &LdapResponse,
        response_controls: Vec<Control>,
    ) -> Self {
        Self::new(
            message_id,
            operation_type,
            response.result_code,
            response.matched_dn.clone(),
            response.diagnostic_message.clone(),
            response.referrals.clone(),
            response_controls,
        )
    }

    /// Returns the message ID of the request.
    #[must_use]
    pub const fn message_id(&self) -> i32 {
        self.message_id
    }

    /// Returns the kind of operation.
    #[must_use]
    pub const fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Returns the result code.
    #[must_use]
    pub const fn result_code(&self) -> ResultCode {
        self.result_code
    }

    /// Returns the matched DN.
    #[must_use]
    pub fn matched_dn(&self) -> Option<&str> {
        self.matched_dn.as_deref()
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn diagnostic_message(&self) -> Option<&str> {
        self.diagnostic_message.as_deref()
    }

    /// Returns the referral URLs.
    #[must_use]
    pub fn referrals(&self) -> &[String] {
        &self.referrals
    }

    /// Returns the response controls.
    #[must_use]
    pub fn response_controls(&self) -> &[Control] {
        &self.response_controls
    }

    /// Returns the first response control with the given OID.
    #[must_use]
    pub fn response_control(&self, oid: &str) -> Option<&Control> {
        self.response_controls.iter().find(|c| c.oid == oid)
    }

    /// Returns true if a response control with the given OID is present.
    #[must_use]
    pub fn has_response_control(&self, oid: &str) -> bool {
        self.response_control(oid).is_some()
    }
}

impl AsRef<Self> for LdapResult {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl fmt::Display for LdapResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LDAPResult(resultCode={}, messageID={}, opType='{}'",
            self.result_code, self.message_id, self.operation_type
        )?;
        if let Some(message) = &self.diagnostic_message {
            write!(f, ", diagnosticMessage='{message}'")?;
        }
        if let Some(dn) = &self.matched_dn {
            write!(f, ", matchedDN='{dn}'")?;
        }
        if !self.referrals.is_empty() {
            write!(f, ", referralURLs={{{}}}", self.referrals.join(", "))?;
        }
        if !self.response_controls.is_empty() {
            let oids: Vec<&str> = self.response_controls.iter().map(|c| c.oid.as_str()).collect();
            write!(f, ", responseControls={{{}}}", oids.join(", "))?;
        }
        f.write_str(")")
    }
}

/// The outcome of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    result: LdapResult,
    entries_returned: usize,
    references_returned: usize,
    entries: Option<Vec<SearchResultEntry>>,
    references: Option<Vec<SearchResultReference>>,
}

impl SearchResult {
    /// Creates a search result whose entries went to a listener.
    #[must_use]
    pub const fn new(result: LdapResult, entries_returned: usize, references_returned: usize) -> Self {
        Self {
            result,
            entries_returned,
            references_returned,
            entries: None,
            references: None,
        }
    }

    /// Creates a search result holding the returned entries and references.
    #[must_use]
    pub fn with_entries(
        result: LdapResult,
        entries: Vec<SearchResultEntry>,
        references: Vec<SearchResultReference>,
    ) -> Self {
        Self {
            result,
            entries_returned: entries.len(),
            references_returned: references.len(),
            entries: Some(entries),
            references: Some(references),
        }
    }

    /// Returns the number of entries the server sent.
    #[must_use]
    pub const fn entries_returned(&self) -> usize {
        self.entries_returned
    }

    /// Returns the number of references the server sent.
    #[must_use]
    pub const fn references_returned(&self) -> usize {
        self.references_returned
    }

    /// Returns the entries, if they were collected.
    #[must_use]
    pub fn entries(&self) -> Option<&[SearchResultEntry]> {
        self.entries.as_deref()
    }

    /// Returns the references, if they were collected.
    #[must_use]
    pub fn references(&self) -> Option<&[SearchResultReference]> {
        self.references.as_deref()
    }

    /// Returns the entries, consuming the result.
    #[must_use]
    pub fn into_entries(self) -> Vec<SearchResultEntry> {
        self.entries.unwrap_or_default()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SearchResult(resultCode={}, entriesReturned={}, referencesReturned={})",
            self.result.result_code, self.entries_returned, self.references_returned
        )
    }
}

/// The outcome of a compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareResult {
    result: LdapResult,
}

impl CompareResult {
    /// Wraps a result.
    #[must_use]
    pub const fn new(result: LdapResult) -> Self {
        Self { result }
    }

    /// Returns whether the assertion matched, or `None` if the compare
    /// failed.
    #[must_use]
    pub fn compare_matched(&self) -> Option<bool> {
        match self.result.result_code {
            ResultCode::COMPARE_TRUE => Some(true),
            ResultCode::COMPARE_FALSE => Some(false),
            _ => None,
        }
    }
}

/// The outcome of an extended operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedResult {
    result: LdapResult,
    oid: Option<String>,
    value: Option<Vec<u8>>,
}

impl ExtendedResult {
    /// Creates an extended result.
    #[must_use]
    pub const fn new(result: LdapResult, oid: Option<String>, value: Option<Vec<u8>>) -> Self {
        Self { result, oid, value }
    }

    /// Returns the response OID.
    #[must_use]
    pub fn oid(&self) -> Option<&str> {
        self.oid.as_deref()
    }

    /// Returns the response value.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }
}

/// The outcome of a bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindResult {
    result: LdapResult,
    server_sasl_credentials: Option<Vec<u8>>,
}

impl BindResult {
    /// Creates a bind result.
    #[must_use]
    pub const fn new(result: LdapResult, server_sasl_credentials: Option<Vec<u8>>) -> Self {
        Self {
            result,
            server_sasl_credentials,
        }
    }

    /// Returns the server's SASL credentials.
    #[must_use]
    pub fn server_sasl_credentials(&self) -> Option<&[u8]> {
        self.server_sasl_credentials.as_deref()
    }
}

macro_rules! wraps_result {
    ($($ty:ident),*) => {
        $(
            impl AsRef<LdapResult> for $ty {
                fn as_ref(&self) -> &LdapResult {
                    &self.result
                }
            }

            impl std::ops::Deref for $ty {
                type Target = LdapResult;

                fn deref(&self) -> &LdapResult {
                    &self.result
                }
            }

            impl From<$ty> for LdapResult {
                fn from(value: $ty) -> Self {
                    value.result
                }
            }
        )*
    };
}

wraps_result!(SearchResult, CompareResult, ExtendedResult, BindResult);

/// Any completed-operation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Add, delete, modify or modify DN.
    Generic(LdapResult),
    /// Search.
    Search(SearchResult),
    /// Compare.
    Compare(CompareResult),
    /// Extended operation.
    Extended(ExtendedResult),
    /// Bind.
    Bind(BindResult),
}

impl OperationResult {
    /// Wraps a bare result in the variant that fits its operation type.
    ///
    /// Used for results the client builds itself, such as timeouts.
    #[must_use]
    pub fn for_operation(result: LdapResult, entries_returned: usize, references_returned: usize) -> Self {
        match result.operation_type {
            OperationType::Search => {
                Self::Search(SearchResult::new(result, entries_returned, references_returned))
            }
            OperationType::Compare => Self::Compare(CompareResult::new(result)),
            OperationType::Extended => Self::Extended(ExtendedResult::new(result, None, None)),
            OperationType::Bind => Self::Bind(BindResult::new(result, None)),
            _ => Self::Generic(result),
        }
    }

    /// Builds the result for a final response message.
    ///
    /// Search entries and references seen earlier are passed in; when
    /// `collected` is `None` only their counts are recorded. Returns `None`
    /// if the message is not a final response.
    #[must_use]
    pub fn from_message(
        message: &LdapMessage,
        entries_returned: usize,
        references_returned: usize,
        collected: Option<(Vec<SearchResultEntry>, Vec<SearchResultReference>)>,
    ) -> Option<Self> {
        let op = &message.op;
        let response = op.response()?;
        let operation_type = op.operation_type()?;
        let result = LdapResult::from_response(
            message.message_id,
            operation_type,
            response,
            message.controls.clone(),
        );
        Some(match op {
            ProtocolOp::SearchResultDone(_) => Self::Search(match collected {
                Some((entries, references)) => {
                    SearchResult::with_entries(result, entries, references)
                }
                None => SearchResult::new(result, entries_returned, references_returned),
            }),
            ProtocolOp::CompareResponse(_) => Self::Compare(CompareResult::new(result)),
            ProtocolOp::ExtendedResponse(extended) => Self::Extended(ExtendedResult::new(
                result,
                extended.oid.clone(),
                extended.value.clone(),
            )),
            ProtocolOp::BindResponse(bind) => {
                Self::Bind(BindResult::new(result, bind.server_sasl_credentials.clone()))
            }
            _ => Self::Generic(result),
        })
    }

    /// Returns the result code.
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        self.as_ref().result_code
    }

    /// Returns the search result, if this is one.
    #[must_use]
    pub const fn as_search(&self) -> Option<&SearchResult> {
        match self {
            Self::Search(result) => Some(result),
            _ => None,
        }
    }
}

impl AsRef<LdapResult> for OperationResult {
    fn as_ref(&self) -> &LdapResult {
        match self {
            Self::Generic(result) => result,
            Self::Search(result) => &result.result,
            Self::Compare(result) => &result.result,
            Self::Extended(result) => &result.result,
            Self::Bind(result) => &result.result,
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(result) => fmt::Display::fmt(result, f),
            other => fmt::Display::fmt(other.as_ref(), f),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::control::{DecodableControl, DirSync, SimplePagedResults};

    fn done(code: ResultCode) -> LdapResult {
        LdapResult::new(7, OperationType::Search, code, None, None, vec![], vec![])
    }

    #[test]
    fn test_search_result_display() {
        let result = SearchResult::new(done(ResultCode::SUCCESS), 3, 1);
        assert_eq!(
            result.to_string(),
            "SearchResult(resultCode=0 (success), entriesReturned=3, referencesReturned=1)"
        );
    }

    #[test]
    fn test_compare_matched() {
        let compare = |code| {
            CompareResult::new(LdapResult::client_side(1, OperationType::Compare, code, "x"))
        };
        assert_eq!(compare(ResultCode::COMPARE_TRUE).compare_matched(), Some(true));
        assert_eq!(compare(ResultCode::COMPARE_FALSE).compare_matched(), Some(false));
        assert_eq!(compare(ResultCode::NO_SUCH_OBJECT).compare_matched(), None);
    }

    #[test]
    fn test_get_control_from_result() {
        let dirsync = DirSync::new(0, 0, Some(b"cookie".to_vec()));
        let result = SearchResult::new(
            LdapResult::new(
                2,
                OperationType::Search,
                ResultCode::SUCCESS,
                None,
                None,
                vec![],
                vec![dirsync.to_control()],
            ),
            0,
            0,
        );
        assert!(result.has_response_control(DirSync::OID));
        assert_eq!(DirSync::get(&result).unwrap(), Some(dirsync));
        assert_eq!(SimplePagedResults::get(&result).unwrap(), None);
    }

    #[test]
    fn test_for_operation_keeps_counts() {
        let result = OperationResult::for_operation(
            LdapResult::client_side(4, OperationType::Search, ResultCode::TIMEOUT, "late"),
            5,
            2,
        );
        let search = result.as_search().unwrap();
        assert_eq!(search.entries_returned(), 5);
        assert_eq!(search.references_returned(), 2);
        assert_eq!(result.result_code(), ResultCode::TIMEOUT);
        assert!(search.entries().is_none());
    }

    #[test]
    fn test_from_message_collects_entries() {
        let message = LdapMessage::new(
            9,
            ProtocolOp::SearchResultDone(LdapResponse::success()),
        );
        let entry = SearchResultEntry::new("cn=a", vec![]);
        let result =
            OperationResult::from_message(&message, 1, 0, Some((vec![entry.clone()], vec![])))
                .unwrap();
        let search = result.as_search().unwrap();
        assert_eq!(search.entries(), Some(&[entry][..]));
        assert_eq!(search.message_id(), 9);

        let entry_message = LdapMessage::new(9, ProtocolOp::SearchResultEntry(search.entries().unwrap()[0].clone()));
        assert!(OperationResult::from_message(&entry_message, 0, 0, None).is_none());
    }

    #[test]
    fn test_ldap_result_display() {
        let result = LdapResult::client_side(3, OperationType::Modify, ResultCode::TIMEOUT, "slow");
        assert_eq!(
            result.to_string(),
            "LDAPResult(resultCode=85 (timeout), messageID=3, opType='MODIFY', diagnosticMessage='slow')"
        );
    }
}
