//! Simple paged results (RFC 2696).

use ldapkit_asn1::Element;

use super::{Control, DecodableControl};
use crate::Result;

/// Paging state, used for both the request and the response.
///
/// In a request `size` is the page size; in a response it is the server's
/// estimate of the total result count. An empty cookie in a response means
/// there are no more pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimplePagedResults {
    /// Page size or total estimate.
    pub size: i32,
    /// Opaque server cookie.
    pub cookie: Vec<u8>,
    /// Criticality.
    pub critical: bool,
}

impl SimplePagedResults {
    /// Creates a first-page request.
    #[must_use]
    pub const fn new(size: i32) -> Self {
        Self {
            size,
            cookie: Vec::new(),
            critical: false,
        }
    }

    /// Sets the cookie from a previous response.
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<Vec<u8>>) -> Self {
        self.cookie = cookie.into();
        self
    }

    /// Returns true if the server has more pages.
    #[must_use]
    pub fn more_results_to_return(&self) -> bool {
        !self.cookie.is_empty()
    }
}

impl DecodableControl for SimplePagedResults {
    const OID: &'static str = "1.2.840.113556.1.4.319";
    const NAME: &'static str = "Simple Paged Results";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("paged results value", 2, 2)?;
        Ok(Self {
            size: members[0].decode_as_i32()?,
            cookie: members[1].decode_as_octet_string()?.to_vec(),
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(
            Self::OID,
            self.critical,
            &Element::sequence([
                Element::integer(i64::from(self.size)),
                Element::octet_string(&self.cookie),
            ]),
        )
    }
}
