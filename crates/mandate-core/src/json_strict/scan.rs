//! Single-pass structural scan of a JSON document.
//!
//! Member names are decoded before they are compared, so `"a"` and
//! `"\u0061"` collide. Scalars are only delimited here; serde_json parses
//! them once the scan succeeds.

use std::iter::Peekable;
use std::str::CharIndices;

use super::dupkeys::KeyScopes;
use super::errors::{StrictJsonError, MAX_NESTING_DEPTH, MAX_STRING_LENGTH};

pub(crate) struct Scanner<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
    scopes: KeyScopes,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            len: input.len(),
            scopes: KeyScopes::default(),
        }
    }

    /// Scan exactly one document; anything after it is an error.
    pub fn run(mut self) -> Result<(), StrictJsonError> {
        self.value(0, "")?;
        self.skip_ws();
        match self.chars.next() {
            None => Ok(()),
            Some((pos, _)) => Err(syntax(pos, "trailing characters after document")),
        }
    }

    fn value(&mut self, depth: usize, pointer: &str) -> Result<(), StrictJsonError> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some((_, '{')) => self.object(depth + 1, pointer),
            Some((_, '[')) => self.array(depth + 1, pointer),
            Some((_, '"')) => self.string().map(drop),
            Some((pos, _)) => self.scalar(pos),
            None => Err(self.eof()),
        }
    }

    fn object(&mut self, depth: usize, pointer: &str) -> Result<(), StrictJsonError> {
        check_depth(depth)?;
        self.chars.next();
        self.scopes.open(pointer.to_string());
        self.skip_ws();
        if !self.eat('}') {
            loop {
                self.skip_ws();
                let key = self.string()?;
                self.scopes.insert(&key)?;
                self.skip_ws();
                self.expect_char(':')?;
                self.value(depth, &format!("{pointer}/{}", escape_pointer(&key)))?;
                self.skip_ws();
                match self.chars.next() {
                    Some((_, ',')) => {}
                    Some((_, '}')) => break,
                    Some((pos, c)) => {
                        return Err(syntax(pos, format!("expected ',' or '}}', found '{c}'")))
                    }
                    None => return Err(self.eof()),
                }
            }
        }
        self.scopes.close();
        Ok(())
    }

    fn array(&mut self, depth: usize, pointer: &str) -> Result<(), StrictJsonError> {
        check_depth(depth)?;
        self.chars.next();
        self.skip_ws();
        if self.eat(']') {
            return Ok(());
        }
        let mut index = 0usize;
        loop {
            self.value(depth, &format!("{pointer}/{index}"))?;
            index += 1;
            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => {}
                Some((_, ']')) => return Ok(()),
                Some((pos, c)) => {
                    return Err(syntax(pos, format!("expected ',' or ']', found '{c}'")))
                }
                None => return Err(self.eof()),
            }
        }
    }

    /// Number, `true`, `false` or `null`.
    fn scalar(&mut self, start: usize) -> Result<(), StrictJsonError> {
        let mut consumed = 0usize;
        while let Some(&(_, c)) = self.chars.peek() {
            if is_delimiter(c) {
                break;
            }
            self.chars.next();
            consumed += 1;
        }
        if consumed == 0 {
            return Err(syntax(start, "expected a value"));
        }
        Ok(())
    }

    /// Consume a string literal and return its decoded content.
    fn string(&mut self) -> Result<String, StrictJsonError> {
        match self.chars.next() {
            Some((_, '"')) => {}
            Some((pos, c)) => return Err(syntax(pos, format!("expected string, found '{c}'"))),
            None => return Err(self.eof()),
        }

        let mut out = String::new();
        let mut decoded = 0usize;
        let mut pending_high: Option<(usize, u32)> = None;

        loop {
            let Some((pos, c)) = self.chars.next() else {
                return Err(self.eof());
            };
            let ch = match c {
                '"' => {
                    if let Some((high_pos, _)) = pending_high {
                        return Err(lone(high_pos, "unpaired high surrogate at end of string"));
                    }
                    return Ok(out);
                }
                '\\' => match self.chars.next() {
                    Some((_, 'u')) => {
                        let unit = self.hex4(pos)?;
                        match (pending_high.take(), unit) {
                            (None, 0xD800..=0xDBFF) => {
                                pending_high = Some((pos, unit));
                                continue;
                            }
                            (Some((_, high)), 0xDC00..=0xDFFF) => {
                                let combined = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                                char::from_u32(combined)
                                    .ok_or(StrictJsonError::InvalidUnicodeEscape { position: pos })?
                            }
                            (Some((high_pos, _)), _) => {
                                return Err(lone(high_pos, "high surrogate not followed by low"))
                            }
                            (None, 0xDC00..=0xDFFF) => {
                                return Err(lone(pos, format!("\\u{unit:04X}")))
                            }
                            (None, _) => char::from_u32(unit)
                                .ok_or(StrictJsonError::InvalidUnicodeEscape { position: pos })?,
                        }
                    }
                    Some((_, 'n')) => '\n',
                    Some((_, 'r')) => '\r',
                    Some((_, 't')) => '\t',
                    Some((_, 'b')) => '\x08',
                    Some((_, 'f')) => '\x0C',
                    Some((_, '\\')) => '\\',
                    Some((_, '/')) => '/',
                    Some((_, '"')) => '"',
                    Some((_, e)) => return Err(syntax(pos, format!("invalid escape '\\{e}'"))),
                    None => return Err(self.eof()),
                },
                other => other,
            };

            if let Some((high_pos, _)) = pending_high {
                return Err(lone(high_pos, "high surrogate not followed by low"));
            }
            decoded += 1;
            if decoded > MAX_STRING_LENGTH {
                return Err(StrictJsonError::StringTooLong { length: decoded });
            }
            out.push(ch);
        }
    }

    fn hex4(&mut self, start: usize) -> Result<u32, StrictJsonError> {
        let mut unit = 0u32;
        for _ in 0..4 {
            let digit = self
                .chars
                .next()
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or(StrictJsonError::InvalidUnicodeEscape { position: start })?;
            unit = unit * 16 + digit;
        }
        Ok(unit)
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, ' ' | '\t' | '\n' | '\r'))) {
            self.chars.next();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.chars.next();
            return true;
        }
        false
    }

    fn expect_char(&mut self, expected: char) -> Result<(), StrictJsonError> {
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((pos, c)) => Err(syntax(pos, format!("expected '{expected}', found '{c}'"))),
            None => Err(self.eof()),
        }
    }

    fn eof(&self) -> StrictJsonError {
        syntax(self.len, "unexpected end of input")
    }
}

fn check_depth(depth: usize) -> Result<(), StrictJsonError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(StrictJsonError::NestingTooDeep { depth });
    }
    Ok(())
}

fn is_delimiter(c: char) -> bool {
    matches!(
        c,
        ',' | ':' | '[' | ']' | '{' | '}' | '"' | ' ' | '\t' | '\n' | '\r'
    )
}

/// RFC 6901 reference token.
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn syntax(position: usize, message: impl Into<String>) -> StrictJsonError {
    StrictJsonError::Syntax {
        position,
        message: message.into(),
    }
}

fn lone(position: usize, detail: impl Into<String>) -> StrictJsonError {
    StrictJsonError::LoneSurrogate {
        position,
        detail: detail.into(),
    }
}
