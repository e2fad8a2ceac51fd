//! Netscape password expiration controls.

use super::{Control, DecodableControl};
use crate::{Error, Result};

/// The password has expired and must be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PasswordExpired;

impl DecodableControl for PasswordExpired {
    const OID: &'static str = "2.16.840.1.113730.3.4.4";
    const NAME: &'static str = "Password Expired";

    /// Servers disagree on the value, so it is not checked.
    fn decode_control(_control: &Control) -> Result<Self> {
        Ok(Self)
    }

    fn to_control(&self) -> Control {
        Control::new(Self::OID, false, Some(b"0".to_vec()))
    }
}

/// The password will expire soon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasswordExpiring {
    /// Seconds until the password expires.
    pub seconds_until_expiration: i32,
}

impl DecodableControl for PasswordExpiring {
    const OID: &'static str = "2.16.840.1.113730.3.4.5";
    const NAME: &'static str = "Password Expiring";

    fn decode_control(control: &Control) -> Result<Self> {
        let value = control.value.as_deref().ok_or_else(|| Error::MissingValue {
            oid: control.oid.clone(),
        })?;
        let seconds_until_expiration = std::str::from_utf8(value)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| {
                Error::Decoding(format!(
                    "password expiring value {:?} is not a number of seconds",
                    String::from_utf8_lossy(value)
                ))
            })?;
        Ok(Self {
            seconds_until_expiration,
        })
    }

    fn to_control(&self) -> Control {
        Control::new(
            Self::OID,
            false,
            Some(self.seconds_until_expiration.to_string().into_bytes()),
        )
    }
}
