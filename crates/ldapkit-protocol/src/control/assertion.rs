//! Assertion (RFC 4528) and matched values (RFC 3876) controls.

use ldapkit_asn1::Element;

use super::{Control, DecodableControl};
use crate::{Error, Filter, Result};

/// Performs the operation only if the target entry matches a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssertionRequest {
    /// Condition the entry must satisfy.
    pub filter: Filter,
    /// Criticality.
    pub critical: bool,
}

impl AssertionRequest {
    /// Creates a critical assertion.
    #[must_use]
    pub const fn new(filter: Filter) -> Self {
        Self {
            filter,
            critical: true,
        }
    }
}

impl DecodableControl for AssertionRequest {
    const OID: &'static str = "1.3.6.1.1.12";
    const NAME: &'static str = "Assertion";

    fn decode_control(control: &Control) -> Result<Self> {
        Ok(Self {
            filter: Filter::decode(&control.value_element()?)?,
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(Self::OID, self.critical, &self.filter.encode())
    }
}

/// Restricts returned attribute values to those matching simple filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchedValuesRequest {
    /// Value filters; a value is returned if any of them matches.
    pub filters: Vec<Filter>,
    /// Criticality.
    pub critical: bool,
}

impl MatchedValuesRequest {
    /// Creates a non-critical request.
    ///
    /// # Errors
    ///
    /// Returns an error if `filters` is empty or holds a filter that is not
    /// a simple item (see [`Filter::is_simple_item`]).
    pub fn new(filters: Vec<Filter>) -> Result<Self> {
        check_value_filters(&filters)?;
        Ok(Self {
            filters,
            critical: false,
        })
    }
}

fn check_value_filters(filters: &[Filter]) -> Result<()> {
    if filters.is_empty() {
        return Err(Error::Decoding(
            "matched values control needs at least one filter".to_string(),
        ));
    }
    if let Some(bad) = filters.iter().find(|f| !f.is_simple_item()) {
        return Err(Error::Decoding(format!(
            "filter {bad} is not allowed in a matched values control"
        )));
    }
    Ok(())
}

impl DecodableControl for MatchedValuesRequest {
    const OID: &'static str = "1.2.826.0.1.3344810.2.3";
    const NAME: &'static str = "Matched Values";

    fn decode_control(control: &Control) -> Result<Self> {
        let filters = control
            .value_element()?
            .decode_as_sequence()?
            .iter()
            .map(Filter::decode)
            .collect::<Result<Vec<_>>>()?;
        check_value_filters(&filters)?;
        Ok(Self {
            filters,
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(
            Self::OID,
            self.critical,
            &Element::sequence(self.filters.iter().map(Filter::encode)),
        )
    }
}
