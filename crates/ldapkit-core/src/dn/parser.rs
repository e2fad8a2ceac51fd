//! Single-pass RFC 4514 scanner for DN and RDN strings.
//!
//! The scanner walks the input bytes left to right, keeping the byte offset
//! so every syntax error can name the position where parsing stopped.

use ldapkit_asn1::Element;
use ldapkit_asn1::tag::TagClass;

use crate::{Error, Result};

/// One `type=value` pair as read from the input.
#[derive(Debug)]
pub(crate) struct ParsedComponent {
    pub name: String,
    pub value: Vec<u8>,
}

/// One RDN as read from the input.
#[derive(Debug)]
pub(crate) struct ParsedRdn {
    pub components: Vec<ParsedComponent>,
    /// Byte range of the RDN text, without trailing unescaped spaces.
    pub start: usize,
    pub end: usize,
}

struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

/// Parses a full DN into its RDNs. The empty string yields no RDNs.
pub(crate) fn parse_dn(input: &str) -> Result<Vec<ParsedRdn>> {
    let mut s = Scanner::new(input);
    let mut rdns = Vec::new();
    s.skip_spaces();
    if s.at_end() {
        return Ok(rdns);
    }
    loop {
        let rdn = s.read_rdn()?;
        rdns.push(rdn);
        match s.peek() {
            None => return Ok(rdns),
            Some(b',' | b';') => {
                let separator = s.pos;
                s.pos += 1;
                s.skip_spaces();
                if s.at_end() {
                    return Err(s.error(separator, "DN ends with a trailing separator"));
                }
            }
            Some(c) => return Err(s.unexpected(c)),
        }
    }
}

/// Parses a string that must contain exactly one RDN.
pub(crate) fn parse_rdn(input: &str) -> Result<ParsedRdn> {
    let mut s = Scanner::new(input);
    s.skip_spaces();
    if s.at_end() {
        return Err(s.error(s.pos, "RDN is empty"));
    }
    let rdn = s.read_rdn()?;
    match s.peek() {
        None => Ok(rdn),
        Some(b',' | b';') => Err(s.error(s.pos, "RDN contains an unescaped separator")),
        Some(c) => Err(s.unexpected(c)),
    }
}

impl<'a> Scanner<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn error(&self, position: usize, message: impl Into<String>) -> Error {
        Error::InvalidDnSyntax {
            value: self.input.to_string(),
            position,
            message: message.into(),
        }
    }

    fn unexpected(&self, c: u8) -> Error {
        self.error(
            self.pos,
            format!("unexpected character '{}'", char::from(c)),
        )
    }

    /// Reads `type=value` pairs joined by `+`. Stops at a separator or the
    /// end of input, leaving trailing spaces consumed.
    fn read_rdn(&mut self) -> Result<ParsedRdn> {
        let start = self.pos;
        let mut components = Vec::new();
        let mut end;
        loop {
            let (component, value_end) = self.read_component()?;
            components.push(component);
            end = value_end;
            self.skip_spaces();
            if self.peek() != Some(b'+') {
                break;
            }
            let plus = self.pos;
            self.pos += 1;
            self.skip_spaces();
            if self.at_end() {
                return Err(self.error(plus, "RDN ends with an unterminated '+'"));
            }
        }
        Ok(ParsedRdn {
            components,
            start,
            end,
        })
    }

    fn read_component(&mut self) -> Result<(ParsedComponent, usize)> {
        self.skip_spaces();
        let name_start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'=' => break,
                b',' | b';' | b'+' => return Err(self.unexpected(c)),
                c if c.is_ascii_alphanumeric() || c == b'-' || c == b'.' || c == b'_' => {
                    self.pos += 1;
                }
                _ => {
                    return Err(self.error(
                        self.pos,
                        "invalid character in attribute name".to_string(),
                    ));
                }
            }
        }
        let name = &self.input[name_start..self.pos];
        if name.is_empty() {
            return Err(self.error(self.pos, "no attribute name"));
        }
        self.skip_spaces();
        if self.peek() != Some(b'=') {
            return Err(self.error(
                self.pos,
                format!("no equal sign follows attribute name '{name}'"),
            ));
        }
        self.pos += 1;
        self.skip_spaces();
        let value_end;
        let value = match self.peek() {
            None | Some(b',' | b';' | b'+') => {
                return Err(self.error(self.pos, format!("no value for attribute '{name}'")));
            }
            Some(b'#') => {
                let v = self.read_hex_value()?;
                value_end = self.pos;
                v
            }
            Some(b'"') => {
                let v = self.read_quoted_value()?;
                value_end = self.pos;
                v
            }
            Some(_) => {
                let (v, end) = self.read_string_value()?;
                value_end = end;
                v
            }
        };
        Ok((
            ParsedComponent {
                name: name.to_string(),
                value,
            },
            value_end,
        ))
    }

    fn read_hex_value(&mut self) -> Result<Vec<u8>> {
        let hash = self.pos;
        self.pos += 1;
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits = &self.bytes[digits_start..self.pos];
        match self.peek() {
            None | Some(b' ' | b',' | b';' | b'+') => {}
            Some(_) => {
                return Err(self.error(self.pos, "invalid character in hex-encoded value"));
            }
        }
        if digits.is_empty() {
            return Err(self.error(hash, "hex-encoded value has no digits"));
        }
        if digits.len() % 2 != 0 {
            return Err(self.error(self.pos, "hex-encoded value has an odd number of digits"));
        }
        let raw: Vec<u8> = digits
            .chunks(2)
            .map(|pair| (hex_digit(pair[0]) << 4) | hex_digit(pair[1]))
            .collect();
        // A single complete universal primitive element contributes its
        // content; anything else is taken as the raw bytes.
        Ok(match Element::decode(&raw) {
            Ok(element)
                if TagClass::of(element.tag()) == TagClass::Universal
                    && !element.is_constructed() =>
            {
                element.value().to_vec()
            }
            _ => raw,
        })
    }

    fn read_quoted_value(&mut self) -> Result<Vec<u8>> {
        let open = self.pos;
        self.pos += 1;
        let mut value = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error(open, "unterminated quoted value")),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some(b'\\') => self.read_escape(&mut value)?,
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// Returns the value and the offset just past its last significant
    /// character.
    fn read_string_value(&mut self) -> Result<(Vec<u8>, usize)> {
        let mut value = Vec::new();
        let mut significant = 0;
        let mut end = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b',' | b';' | b'+' => break,
                b'\\' => {
                    self.read_escape(&mut value)?;
                    significant = value.len();
                    end = self.pos;
                }
                b'"' | b'<' | b'>' => {
                    return Err(self.error(
                        self.pos,
                        format!("unescaped '{}' in attribute value", char::from(c)),
                    ));
                }
                b' ' => {
                    value.push(c);
                    self.pos += 1;
                }
                _ => {
                    value.push(c);
                    self.pos += 1;
                    significant = value.len();
                    end = self.pos;
                }
            }
        }
        value.truncate(significant);
        Ok((value, end))
    }

    /// Consumes a backslash escape and appends the byte it denotes.
    fn read_escape(&mut self, value: &mut Vec<u8>) -> Result<()> {
        let backslash = self.pos;
        self.pos += 1;
        let Some(first) = self.peek() else {
            return Err(self.error(backslash, "value ends with an incomplete escape"));
        };
        if first.is_ascii_hexdigit() {
            if let Some(second) = self.bytes.get(self.pos + 1).copied()
                && second.is_ascii_hexdigit()
            {
                value.push((hex_digit(first) << 4) | hex_digit(second));
                self.pos += 2;
                return Ok(());
            }
            return Err(self.error(backslash, "invalid hex escape"));
        }
        if b",+\"\\<>;= #".contains(&first) {
            value.push(first);
            self.pos += 1;
            return Ok(());
        }
        Err(self.error(
            backslash,
            format!("invalid escape of '{}'", char::from(first)),
        ))
    }
}

const fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn position(result: Result<Vec<ParsedRdn>>) -> usize {
        match result.unwrap_err() {
            Error::InvalidDnSyntax { position, .. } => position,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_simple_dn() {
        let rdns = parse_dn("cn=Bob,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(rdns.len(), 4);
        assert_eq!(rdns[0].components[0].name, "cn");
        assert_eq!(rdns[0].components[0].value, b"Bob");
        assert_eq!((rdns[1].start, rdns[1].end), (7, 16));
    }

    #[test]
    fn test_empty_and_spaces() {
        assert!(parse_dn("").unwrap().is_empty());
        assert!(parse_dn("   ").unwrap().is_empty());
    }

    #[test]
    fn test_semicolon_and_spaces() {
        let rdns = parse_dn(" cn = Bob ; dc = com ").unwrap();
        assert_eq!(rdns.len(), 2);
        assert_eq!(rdns[0].components[0].value, b"Bob");
        assert_eq!(rdns[1].components[0].value, b"com");
    }

    #[test]
    fn test_multi_valued() {
        let rdns = parse_dn("cn=Bob+uid=bob,dc=com").unwrap();
        assert_eq!(rdns[0].components.len(), 2);
        assert_eq!(rdns[0].components[1].name, "uid");
    }

    #[test]
    fn test_escapes() {
        let rdns = parse_dn(r"cn=Doe\, John\2B\20,dc=com").unwrap();
        assert_eq!(rdns[0].components[0].value, b"Doe, John+ ");
        let rdns = parse_dn(r"cn=caf\C3\A9").unwrap();
        assert_eq!(rdns[0].components[0].value, "caf\u{e9}".as_bytes());
    }

    #[test]
    fn test_trailing_spaces_trimmed_but_escaped_kept() {
        let rdns = parse_dn(r"cn=a\  ,dc=com").unwrap();
        assert_eq!(rdns[0].components[0].value, b"a ");
        let rdns = parse_dn("cn=a   b   ,dc=com").unwrap();
        assert_eq!(rdns[0].components[0].value, b"a   b");
        assert_eq!(rdns[0].end, 8);
    }

    #[test]
    fn test_quoted() {
        let rdns = parse_dn(r#"cn="Doe, John",dc=com"#).unwrap();
        assert_eq!(rdns[0].components[0].value, b"Doe, John");
    }

    #[test]
    fn test_hex_value() {
        // 04 02 48 69 is an OCTET STRING containing "Hi".
        let rdns = parse_dn("cn=#04024869,dc=com").unwrap();
        assert_eq!(rdns[0].components[0].value, b"Hi");
        let rdns = parse_dn("cn=#ff00").unwrap();
        assert_eq!(rdns[0].components[0].value, vec![0xFF, 0x00]);
    }

    #[test]
    fn test_error_positions() {
        assert_eq!(position(parse_dn("cn=Bob,")), 6);
        assert_eq!(position(parse_dn("cn=Bob;  ")), 6);
        assert_eq!(position(parse_dn("cn=Bob+")), 6);
        assert_eq!(position(parse_dn("=Bob")), 0);
        assert_eq!(position(parse_dn("cn Bob")), 3);
        assert_eq!(position(parse_dn("cn=")), 3);
        assert_eq!(position(parse_dn("cn=,dc=com")), 3);
        assert_eq!(position(parse_dn("cn=+sn=x")), 3);
        assert_eq!(position(parse_dn("dc=com,ou= ;dc=x")), 11);
        assert_eq!(position(parse_dn("cn=a<b")), 4);
        assert_eq!(position(parse_dn("cn,dc=com")), 2);
        assert_eq!(position(parse_dn("cn=#abc")), 7);
        assert_eq!(position(parse_dn("cn=#zz")), 4);
        assert_eq!(position(parse_dn(r"cn=a\")), 4);
        assert_eq!(position(parse_dn(r"cn=a\q")), 4);
        assert_eq!(position(parse_dn(r#"cn="open"#)), 3);
        assert_eq!(position(parse_dn(r#"cn="a"b"#)), 6);
    }

    #[test]
    fn test_error_message() {
        let err = parse_dn("cn=Bob,").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid DN 'cn=Bob,': DN ends with a trailing separator at position 6"
        );
    }

    #[test]
    fn test_rdn_only() {
        let rdn = parse_rdn("cn=a+sn=b").unwrap();
        assert_eq!(rdn.components.len(), 2);
        assert!(parse_rdn("cn=a,dc=com").is_err());
        assert!(parse_rdn("").is_err());
    }
}
