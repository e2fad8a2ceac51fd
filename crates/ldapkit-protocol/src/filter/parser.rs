//! RFC 4515 filter string scanner.

use super::{Filter, MAX_DEPTH};
use crate::{Error, Result};

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

/// A value split on unescaped `*`, plus the position of each `*`.
struct Value {
    segments: Vec<Vec<u8>>,
    stars: Vec<usize>,
}

pub(super) fn parse(input: &str) -> Result<Filter> {
    let mut c = Cursor {
        input,
        bytes: input.as_bytes(),
        pos: 0,
    };
    let filter = match c.peek() {
        None => return Err(c.error(0, "filter is empty")),
        Some(b'(') => c.read_filter(0)?,
        Some(_) => c.read_item(false)?,
    };
    if !c.at_end() {
        return Err(c.error(c.pos, "unexpected data after filter"));
    }
    Ok(filter)
}

const fn is_description_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b';' | b'_')
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn error(&self, position: usize, message: impl Into<String>) -> Error {
        Error::InvalidFilter {
            filter: self.input.to_string(),
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

    /// Reads `( filtercomp )`.
    fn read_filter(&mut self, depth: usize) -> Result<Filter> {
        if depth > MAX_DEPTH {
            return Err(self.error(self.pos, "filter nesting too deep"));
        }
        let open = self.pos;
        match self.peek() {
            Some(b'(') => self.pos += 1,
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(self.error(self.pos, "expected '('")),
        }
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.read_list(depth)?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.read_list(depth)?)
            }
            Some(b'!') => {
                self.pos += 1;
                if self.peek() != Some(b'(') {
                    return Err(self.error(self.pos, "'!' must be followed by a filter"));
                }
                Filter::not(self.read_filter(depth + 1)?)
            }
            None => return Err(self.error(open, "missing closing parenthesis")),
            Some(_) => self.read_item(true)?,
        };
        match self.peek() {
            Some(b')') => {
                self.pos += 1;
                Ok(filter)
            }
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.error(open, "missing closing parenthesis")),
        }
    }

    fn read_list(&mut self, depth: usize) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        while self.peek() == Some(b'(') {
            filters.push(self.read_filter(depth + 1)?);
        }
        Ok(filters)
    }

    /// Reads a simple or extensible item, stopping before `)` or the end.
    fn read_item(&mut self, parenthesized: bool) -> Result<Filter> {
        let start = self.pos;
        while self.peek().is_some_and(is_description_char) {
            self.pos += 1;
        }
        let attribute = self.input[start..self.pos].to_string();
        if self.peek() == Some(b':') {
            return self.read_extensible(attribute, start, parenthesized);
        }
        if attribute.is_empty() {
            return Err(self.error(start, "no attribute description"));
        }

        let operator = self.pos;
        let kind = match (self.peek(), self.peek_at(1)) {
            (Some(b'='), _) => b'=',
            (Some(op @ (b'~' | b'>' | b'<')), Some(b'=')) => op,
            (Some(op @ (b'~' | b'>' | b'<')), _) => {
                return Err(self.error(
                    operator,
                    format!("expected '=' after '{}'", char::from(op)),
                ));
            }
            (Some(c), _) => return Err(self.unexpected(c)),
            (None, _) => {
                return Err(self.error(
                    operator,
                    format!("no filter type follows attribute '{attribute}'"),
                ));
            }
        };
        self.pos += if kind == b'=' { 1 } else { 2 };

        let mut value = self.read_value(parenthesized)?;
        if kind != b'=' {
            if let Some(&star) = value.stars.first() {
                return Err(self.error(star, "unescaped '*' in value"));
            }
            let value = value.segments.pop().unwrap_or_default();
            return Ok(match kind {
                b'~' => Filter::Approximate { attribute, value },
                b'>' => Filter::GreaterOrEqual { attribute, value },
                _ => Filter::LessOrEqual { attribute, value },
            });
        }

        let count = value.segments.len();
        if count == 1 {
            let value = value.segments.pop().unwrap_or_default();
            return Ok(Filter::Equality { attribute, value });
        }
        if count == 2 && value.segments.iter().all(Vec::is_empty) {
            return Ok(Filter::Present { attribute });
        }
        for (i, segment) in value.segments.iter().enumerate().take(count - 1).skip(1) {
            if segment.is_empty() {
                return Err(self.error(value.stars[i], "empty substring component"));
            }
        }
        let mut segments = value.segments.into_iter();
        let subinitial = segments.next().filter(|s| !s.is_empty());
        let mut subany: Vec<Vec<u8>> = segments.collect();
        let subfinal = subany.pop().filter(|s| !s.is_empty());
        Ok(Filter::Substring {
            attribute,
            subinitial,
            subany,
            subfinal,
        })
    }

    /// Reads `[:dn][:rule]:=value` after the attribute description.
    fn read_extensible(
        &mut self,
        attribute: String,
        start: usize,
        parenthesized: bool,
    ) -> Result<Filter> {
        let mut dn_attributes = false;
        let mut matching_rule: Option<String> = None;
        loop {
            // At a ':'.
            self.pos += 1;
            if self.peek() == Some(b'=') {
                self.pos += 1;
                break;
            }
            let token_start = self.pos;
            while self.peek().is_some_and(is_description_char) {
                self.pos += 1;
            }
            let token = &self.input[token_start..self.pos];
            if token.is_empty() || self.peek() != Some(b':') {
                return Err(self.error(self.pos, "expected ':=' in extensible match"));
            }
            if token.eq_ignore_ascii_case("dn") && !dn_attributes && matching_rule.is_none() {
                dn_attributes = true;
            } else if matching_rule.is_none() {
                matching_rule = Some(token.to_string());
            } else {
                return Err(self.error(
                    token_start,
                    "extensible match has more than one matching rule",
                ));
            }
        }
        if attribute.is_empty() && matching_rule.is_none() {
            return Err(self.error(
                start,
                "extensible match needs an attribute or a matching rule",
            ));
        }
        let mut value = self.read_value(parenthesized)?;
        if let Some(&star) = value.stars.first() {
            return Err(self.error(star, "unescaped '*' in value"));
        }
        Ok(Filter::Extensible {
            matching_rule,
            attribute: (!attribute.is_empty()).then_some(attribute),
            value: value.segments.pop().unwrap_or_default(),
            dn_attributes,
        })
    }

    fn read_value(&mut self, parenthesized: bool) -> Result<Value> {
        let mut segments = Vec::new();
        let mut stars = Vec::new();
        let mut current = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some(b')') if parenthesized => break,
                Some(b'(' | b')') => {
                    return Err(self.error(
                        self.pos,
                        format!(
                            "unescaped '{}' in value",
                            char::from(self.bytes[self.pos])
                        ),
                    ));
                }
                Some(b'*') => {
                    stars.push(self.pos);
                    segments.push(std::mem::take(&mut current));
                    self.pos += 1;
                }
                Some(b'\\') => current.push(self.read_escape()?),
                Some(b) => {
                    current.push(b);
                    self.pos += 1;
                }
            }
        }
        segments.push(current);
        Ok(Value { segments, stars })
    }

    /// Reads `\XX`, or the older `\*` style escape of a special character.
    fn read_escape(&mut self) -> Result<u8> {
        let backslash = self.pos;
        let hex = |b: Option<u8>| b.and_then(|b| char::from(b).to_digit(16));
        if let (Some(hi), Some(lo)) = (hex(self.peek_at(1)), hex(self.peek_at(2))) {
            self.pos += 3;
            // Two hex digits always fit in a byte.
            return Ok(u8::try_from(hi * 16 + lo).unwrap_or_default());
        }
        match self.peek_at(1) {
            Some(b @ (b'*' | b'(' | b')' | b'\\')) => {
                self.pos += 2;
                Ok(b)
            }
            _ => Err(self.error(backslash, "invalid escape sequence")),
        }
    }
}
