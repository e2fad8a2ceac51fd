//! LDAP result codes.
//!
//! RFC 4511 leaves the result code space open, so [`ResultCode`] is a
//! newtype over `i32` rather than a closed enum. Codes 81 through 97 never
//! travel on the wire; the client synthesizes them for local failures.

use std::fmt;

/// An LDAP result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ResultCode(i32);

macro_rules! result_codes {
    ($($(#[$doc:meta])* $name:ident = $value:literal, $text:literal;)*) => {
        impl ResultCode {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($value);
            )*

            /// Returns the symbolic name, or `None` for an undefined code.
            #[must_use]
            pub const fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some($text),)*
                    _ => None,
                }
            }

            /// Every code with a symbolic name, in ascending order.
            pub const DEFINED: &'static [Self] = &[$(Self::$name),*];
        }
    };
}

result_codes! {
    /// 0: the operation completed successfully.
    SUCCESS = 0, "success";
    /// 1: the operation was not properly sequenced.
    OPERATIONS_ERROR = 1, "operationsError";
    /// 2: the server received malformed data.
    PROTOCOL_ERROR = 2, "protocolError";
    /// 3: the time limit was exceeded.
    TIME_LIMIT_EXCEEDED = 3, "timeLimitExceeded";
    /// 4: the size limit was exceeded.
    SIZE_LIMIT_EXCEEDED = 4, "sizeLimitExceeded";
    /// 5: a compare assertion did not match.
    COMPARE_FALSE = 5, "compareFalse";
    /// 6: a compare assertion matched.
    COMPARE_TRUE = 6, "compareTrue";
    /// 7: the authentication method is not supported.
    AUTH_METHOD_NOT_SUPPORTED = 7, "authMethodNotSupported";
    /// 8: stronger authentication is required.
    STRONGER_AUTH_REQUIRED = 8, "strongerAuthRequired";
    /// 10: the server returned a referral.
    REFERRAL = 10, "referral";
    /// 11: an administrative limit was exceeded.
    ADMIN_LIMIT_EXCEEDED = 11, "adminLimitExceeded";
    /// 12: a critical control is not recognized.
    UNAVAILABLE_CRITICAL_EXTENSION = 12, "unavailableCriticalExtension";
    /// 13: confidentiality is required.
    CONFIDENTIALITY_REQUIRED = 13, "confidentialityRequired";
    /// 14: a multi-step SASL bind is in progress.
    SASL_BIND_IN_PROGRESS = 14, "saslBindInProgress";
    /// 16: the attribute does not exist.
    NO_SUCH_ATTRIBUTE = 16, "noSuchAttribute";
    /// 17: the attribute type is not defined.
    UNDEFINED_ATTRIBUTE_TYPE = 17, "undefinedAttributeType";
    /// 18: the matching rule is not appropriate.
    INAPPROPRIATE_MATCHING = 18, "inappropriateMatching";
    /// 19: a constraint was violated.
    CONSTRAINT_VIOLATION = 19, "constraintViolation";
    /// 20: the attribute value already exists.
    ATTRIBUTE_OR_VALUE_EXISTS = 20, "attributeOrValueExists";
    /// 21: the attribute syntax is invalid.
    INVALID_ATTRIBUTE_SYNTAX = 21, "invalidAttributeSyntax";
    /// 32: the target entry does not exist.
    NO_SUCH_OBJECT = 32, "noSuchObject";
    /// 33: an alias problem occurred.
    ALIAS_PROBLEM = 33, "aliasProblem";
    /// 34: the DN syntax is invalid.
    INVALID_DN_SYNTAX = 34, "invalidDNSyntax";
    /// 36: an alias could not be dereferenced.
    ALIAS_DEREFERENCING_PROBLEM = 36, "aliasDereferencingProblem";
    /// 48: the authentication is inappropriate.
    INAPPROPRIATE_AUTHENTICATION = 48, "inappropriateAuthentication";
    /// 49: the credentials are invalid.
    INVALID_CREDENTIALS = 49, "invalidCredentials";
    /// 50: access was denied.
    INSUFFICIENT_ACCESS_RIGHTS = 50, "insufficientAccessRights";
    /// 51: the server is busy.
    BUSY = 51, "busy";
    /// 52: the server is unavailable.
    UNAVAILABLE = 52, "unavailable";
    /// 53: the server is unwilling to perform the operation.
    UNWILLING_TO_PERFORM = 53, "unwillingToPerform";
    /// 54: a loop was detected.
    LOOP_DETECT = 54, "loopDetect";
    /// 60: a VLV request lacked a sort control.
    SORT_CONTROL_MISSING = 60, "sortControlMissing";
    /// 61: a VLV offset was out of range.
    OFFSET_RANGE_ERROR = 61, "offsetRangeError";
    /// 64: a naming rule was violated.
    NAMING_VIOLATION = 64, "namingViolation";
    /// 65: an object class rule was violated.
    OBJECT_CLASS_VIOLATION = 65, "objectClassViolation";
    /// 66: the operation is not allowed on a non-leaf entry.
    NOT_ALLOWED_ON_NON_LEAF = 66, "notAllowedOnNonLeaf";
    /// 67: the operation is not allowed on an RDN attribute.
    NOT_ALLOWED_ON_RDN = 67, "notAllowedOnRDN";
    /// 68: the entry already exists.
    ENTRY_ALREADY_EXISTS = 68, "entryAlreadyExists";
    /// 69: object class modifications are prohibited.
    OBJECT_CLASS_MODS_PROHIBITED = 69, "objectClassModsProhibited";
    /// 71: the operation affects multiple DSAs.
    AFFECTS_MULTIPLE_DSAS = 71, "affectsMultipleDSAs";
    /// 76: a VLV error occurred.
    VIRTUAL_LIST_VIEW_ERROR = 76, "virtualListViewError";
    /// 80: an unspecified error occurred.
    OTHER = 80, "other";
    /// 81: the connection to the server was lost.
    SERVER_DOWN = 81, "serverDown";
    /// 82: a local error occurred.
    LOCAL_ERROR = 82, "localError";
    /// 83: a request could not be encoded.
    ENCODING_ERROR = 83, "encodingError";
    /// 84: a response could not be decoded.
    DECODING_ERROR = 84, "decodingError";
    /// 85: no response arrived within the allowed time.
    TIMEOUT = 85, "timeout";
    /// 86: the authentication method is unknown.
    AUTH_UNKNOWN = 86, "authUnknown";
    /// 87: a search filter is invalid.
    FILTER_ERROR = 87, "filterError";
    /// 88: the user canceled the operation.
    USER_CANCELED = 88, "userCanceled";
    /// 89: a parameter was invalid.
    PARAM_ERROR = 89, "paramError";
    /// 90: memory could not be allocated.
    NO_MEMORY = 90, "noMemory";
    /// 91: the connection could not be established.
    CONNECT_ERROR = 91, "connectError";
    /// 92: the requested feature is not supported.
    NOT_SUPPORTED = 92, "notSupported";
    /// 93: an expected control was not found.
    CONTROL_NOT_FOUND = 93, "controlNotFound";
    /// 94: no results were returned.
    NO_RESULTS_RETURNED = 94, "noResultsReturned";
    /// 95: more results remain.
    MORE_RESULTS_TO_RETURN = 95, "moreResultsToReturn";
    /// 96: a referral loop was detected.
    CLIENT_LOOP = 96, "clientLoop";
    /// 97: the referral hop limit was exceeded.
    REFERRAL_LIMIT_EXCEEDED = 97, "referralLimitExceeded";
    /// 118: the operation was canceled.
    CANCELED = 118, "canceled";
    /// 119: the operation to cancel does not exist.
    NO_SUCH_OPERATION = 119, "noSuchOperation";
    /// 120: it is too late to cancel the operation.
    TOO_LATE = 120, "tooLate";
    /// 121: the operation cannot be canceled.
    CANNOT_CANCEL = 121, "cannotCancel";
    /// 122: an assertion control did not match.
    ASSERTION_FAILED = 122, "assertionFailed";
    /// 123: proxied authorization was denied.
    AUTHORIZATION_DENIED = 123, "authorizationDenied";
    /// 4096: the sync session must be refreshed.
    E_SYNC_REFRESH_REQUIRED = 4096, "e-syncRefreshRequired";
    /// 16654: the no-op control suppressed the change.
    NO_OPERATION = 16654, "noOperation";
}

impl ResultCode {
    /// Creates a result code from its numeric value.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns true for SUCCESS.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns true for codes the client synthesizes itself (81 through 97).
    #[must_use]
    pub const fn is_client_side(self) -> bool {
        self.0 >= 81 && self.0 <= 97
    }

    /// Returns true if the connection should be considered unusable.
    #[must_use]
    pub const fn is_connection_usable(self) -> bool {
        !matches!(self.0, 81 | 84 | 91)
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}
