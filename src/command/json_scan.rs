// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lightweight structural JSON validity scan.
//!
//! Command tokens arriving on the bus are usually plain keywords, so the
//! normalizer first checks whether a token even looks like JSON before
//! handing it to `serde_json`. The scan walks the bytes once, accepts any
//! syntactically valid JSON value (object, array, string, number, literal)
//! and rejects everything else. It never panics on malformed input.

/// Returns `true` if `text` is a syntactically valid JSON value.
#[must_use]
pub fn is_json(text: &str) -> bool {
    let mut scanner = Scanner {
        bytes: text.as_bytes(),
        pos: 0,
    };
    scanner.skip_whitespace();
    if !scanner.value() {
        return false;
    }
    scanner.skip_whitespace();
    scanner.at_end()
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Scanner<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> bool {
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => self.string(),
            Some(b't') => self.literal(b"true"),
            Some(b'f') => self.literal(b"false"),
            Some(b'n') => self.literal(b"null"),
            Some(b'-' | b'0'..=b'9') => self.number(),
            _ => false,
        }
    }

    fn literal(&mut self, word: &[u8]) -> bool {
        if self.bytes[self.pos..].starts_with(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn object(&mut self) -> bool {
        self.pos += 1; // '{'
        self.skip_whitespace();
        if self.eat(b'}') {
            return true;
        }
        loop {
            self.skip_whitespace();
            if !self.string() {
                return false;
            }
            self.skip_whitespace();
            if !self.eat(b':') {
                return false;
            }
            self.skip_whitespace();
            if !self.value() {
                return false;
            }
            self.skip_whitespace();
            if self.eat(b',') {
                continue;
            }
            return self.eat(b'}');
        }
    }

    fn array(&mut self) -> bool {
        self.pos += 1; // '['
        self.skip_whitespace();
        if self.eat(b']') {
            return true;
        }
        loop {
            self.skip_whitespace();
            if !self.value() {
                return false;
            }
            self.skip_whitespace();
            if self.eat(b',') {
                continue;
            }
            return self.eat(b']');
        }
    }

    fn string(&mut self) -> bool {
        if !self.eat(b'"') {
            return false;
        }
        loop {
            match self.bump() {
                Some(b'"') => return true,
                Some(b'\\') => match self.bump() {
                    Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {}
                    Some(b'u') => {
                        for _ in 0..4 {
                            if !self.bump().is_some_and(|b| b.is_ascii_hexdigit()) {
                                return false;
                            }
                        }
                    }
                    _ => return false,
                },
                // Raw control characters are not allowed inside strings.
                Some(byte) if byte < 0x20 => return false,
                Some(_) => {}
                None => return false,
            }
        }
    }

    fn number(&mut self) -> bool {
        self.eat(b'-');
        // Integer part: a single zero or a nonzero digit run.
        if self.eat(b'0') {
            // no leading zeros
        } else if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.digits();
        } else {
            return false;
        }
        if self.eat(b'.') && !self.digits() {
            return false;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !self.digits() {
                return false;
            }
        }
        true
    }

    fn digits(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos > start
    }
}
