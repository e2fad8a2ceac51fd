//! Attribute value escaping for DN strings.

use std::fmt::Write;

use ldapkit_asn1::Element;

/// Characters that RFC 4514 §2.4 requires to be escaped anywhere in a value.
const MANDATORY: &[u8] = b"\"+,;<>\\";

/// How aggressively a value is escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Escaping {
    /// Also escape `=` and control characters.
    Full,
    /// Only the RFC 4514 §2.4 mandatory characters.
    Minimal,
}

/// Renders a value for use in a DN string.
///
/// Values that are not valid UTF-8 are rendered in `#hex` form as the BER
/// encoding of an OCTET STRING so that parsing the output yields the same
/// bytes.
pub(crate) fn escape_value(value: &[u8], escaping: Escaping) -> String {
    let Ok(text) = std::str::from_utf8(value) else {
        return hex_form(value);
    };
    let mut out = String::with_capacity(text.len() + 4);
    let last = text.len().saturating_sub(1);
    for (i, c) in text.char_indices() {
        let needs_escape = match c {
            ' ' => i == 0 || i == last,
            '#' => i == 0,
            '\0' => true,
            '=' => escaping == Escaping::Full,
            c if c.is_ascii_control() => escaping == Escaping::Full,
            c if c.is_ascii() => MANDATORY.contains(&(c as u8)),
            _ => false,
        };
        if !needs_escape {
            out.push(c);
        } else if c == '\0' || c.is_ascii_control() {
            let _ = write!(out, "\\{:02x}", c as u8);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// Renders bytes as `#` followed by the hex of their BER OCTET STRING form.
pub(crate) fn hex_form(value: &[u8]) -> String {
    let encoded = Element::octet_string(value).encode();
    let mut out = String::with_capacity(1 + encoded.len() * 2);
    out.push('#');
    for b in encoded.iter() {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Normalizes a value: case folding unless `case_exact`, trimming, and
/// collapsing runs of interior spaces, followed by full escaping.
pub(crate) fn normalize_value(value: &[u8], case_exact: bool) -> String {
    let Ok(text) = std::str::from_utf8(value) else {
        return hex_form(value);
    };
    let folded = if case_exact {
        text.to_string()
    } else {
        text.to_lowercase()
    };
    let mut collapsed = String::with_capacity(folded.len());
    for word in folded.split(' ').filter(|w| !w.is_empty()) {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }
    if collapsed.is_empty() && !folded.is_empty() {
        collapsed.push(' ');
    }
    escape_value(collapsed.as_bytes(), Escaping::Full)
}
