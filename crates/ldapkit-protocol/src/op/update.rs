//! Requests that change or test a single entry, plus abandon.

use ldapkit_asn1::Element;

use super::tags;
use crate::attribute::{Attribute, Modification};
use crate::error::check_count;
use crate::{Error, Result};

const NEW_SUPERIOR: u8 = 0x80;

/// A ModifyRequest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModifyRequest {
    /// Entry to change.
    pub dn: String,
    /// Changes, applied in order.
    pub changes: Vec<Modification>,
}

impl ModifyRequest {
    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::sequence_tagged(
            tags::MODIFY_REQUEST,
            [
                Element::octet_string(&self.dn),
                Element::sequence(self.changes.iter().map(Modification::encode)),
            ],
        )
    }

    /// Decodes a ModifyRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a well-formed modify request.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::MODIFY_REQUEST)?;
        check_count("modify request", members.len(), 2, 2)?;
        Ok(Self {
            dn: members[0].decode_as_string()?,
            changes: members[1]
                .decode_as_sequence()?
                .iter()
                .map(Modification::decode)
                .collect::<Result<_>>()?,
        })
    }
}

/// An AddRequest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddRequest {
    /// DN of the new entry.
    pub dn: String,
    /// Attributes of the new entry.
    pub attributes: Vec<Attribute>,
}

impl AddRequest {
    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::sequence_tagged(
            tags::ADD_REQUEST,
            [
                Element::octet_string(&self.dn),
                Element::sequence(self.attributes.iter().map(Attribute::encode)),
            ],
        )
    }

    /// Decodes an AddRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a well-formed add request.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::ADD_REQUEST)?;
        check_count("add request", members.len(), 2, 2)?;
        Ok(Self {
            dn: members[0].decode_as_string()?,
            attributes: members[1]
                .decode_as_sequence()?
                .iter()
                .map(Attribute::decode)
                .collect::<Result<_>>()?,
        })
    }
}

/// A DeleteRequest. The op is a bare octet string holding the DN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteRequest {
    /// Entry to remove.
    pub dn: String,
}

impl DeleteRequest {
    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::octet_string_tagged(tags::DELETE_REQUEST, &self.dn)
    }

    /// Decodes a DeleteRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or a DN that is not UTF-8.
    pub fn decode(element: &Element) -> Result<Self> {
        Ok(Self {
            dn: element.decode_as_string_tagged(tags::DELETE_REQUEST)?,
        })
    }
}

/// A ModifyDNRequest: rename or move an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModifyDnRequest {
    /// Entry to rename.
    pub dn: String,
    /// New RDN.
    pub new_rdn: String,
    /// Remove the old RDN values from the entry.
    pub delete_old_rdn: bool,
    /// New parent, when moving.
    pub new_superior: Option<String>,
}

impl ModifyDnRequest {
    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        let mut members = vec![
            Element::octet_string(&self.dn),
            Element::octet_string(&self.new_rdn),
            Element::boolean(self.delete_old_rdn),
        ];
        if let Some(superior) = &self.new_superior {
            members.push(Element::octet_string_tagged(NEW_SUPERIOR, superior));
        }
        Element::sequence_tagged(tags::MODIFY_DN_REQUEST, members)
    }

    /// Decodes a ModifyDNRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a well-formed modify DN request.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::MODIFY_DN_REQUEST)?;
        check_count("modify DN request", members.len(), 3, 4)?;
        Ok(Self {
            dn: members[0].decode_as_string()?,
            new_rdn: members[1].decode_as_string()?,
            delete_old_rdn: members[2].decode_as_boolean()?,
            new_superior: members
                .get(3)
                .map(|e| e.decode_as_string_tagged(NEW_SUPERIOR))
                .transpose()?,
        })
    }
}

/// A CompareRequest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompareRequest {
    /// Entry to test.
    pub dn: String,
    /// Attribute description.
    pub attribute: String,
    /// Value to compare against.
    pub assertion_value: Vec<u8>,
}

impl CompareRequest {
    /// Creates a compare request.
    #[must_use]
    pub fn new(
        dn: impl Into<String>,
        attribute: impl Into<String>,
        assertion_value: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            dn: dn.into(),
            attribute: attribute.into(),
            assertion_value: assertion_value.as_ref().to_vec(),
        }
    }

    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::sequence_tagged(
            tags::COMPARE_REQUEST,
            [
                Element::octet_string(&self.dn),
                Element::sequence([
                    Element::octet_string(&self.attribute),
                    Element::octet_string(&self.assertion_value),
                ]),
            ],
        )
    }

    /// Decodes a CompareRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a well-formed compare request.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::COMPARE_REQUEST)?;
        check_count("compare request", members.len(), 2, 2)?;
        let ava = members[1].decode_as_sequence()?;
        check_count("compare assertion", ava.len(), 2, 2)?;
        Ok(Self {
            dn: members[0].decode_as_string()?,
            attribute: ava[0].decode_as_string()?,
            assertion_value: ava[1].decode_as_octet_string()?.to_vec(),
        })
    }
}

/// An AbandonRequest. The op is a bare integer holding the message ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbandonRequest {
    /// ID of the operation to abandon.
    pub message_id: i32,
}

impl AbandonRequest {
    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::integer_tagged(tags::ABANDON_REQUEST, i64::from(self.message_id))
    }

    /// Decodes an AbandonRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or a negative message ID.
    pub fn decode(element: &Element) -> Result<Self> {
        let message_id = element.decode_as_i32_tagged(tags::ABANDON_REQUEST)?;
        if message_id < 0 {
            return Err(Error::Decoding(format!(
                "abandon request names negative message ID {message_id}"
            )));
        }
        Ok(Self { message_id })
    }
}
