//! Safe parser for the `args=` mapping literal.
//!
//! Models are asked for JSON, but frequently answer with Python-flavoured
//! literals (`'single quotes'`, `True`, `None`, trailing commas). This parser
//! accepts both spellings and nothing else: there are no identifiers,
//! operators or calls, so model output is never evaluated.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

/// A literal that could not be parsed, with the byte offset of the problem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parse a mapping literal such as `{"query": "capital of France"}`.
///
/// The top-level value must be a mapping with quoted string keys.
pub fn parse_mapping(input: &str) -> Result<Map<String, Value>, LiteralError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.peek() != Some(b'{') {
        return Err(parser.error("expected '{' to open the argument mapping"));
    }
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(LiteralError {
            offset: 0,
            message: "argument literal is not a mapping".to_string(),
        }),
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("literal nested too deeply"));
        }
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.parse_object(depth),
            Some(b'[') => self.parse_array(depth),
            Some(b'"') | Some(b'\'') => self.parse_string().map(Value::String),
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(),
            Some(b) if b.is_ascii_alphabetic() => self.parse_keyword(),
            Some(b) => Err(self.error(&format!("unexpected character '{}'", b as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                Some(b'"') | Some(b'\'') => {}
                _ => return Err(self.error("expected a quoted key")),
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            self.expect(b':')?;
            let value = self.parse_value(depth + 1)?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value(depth + 1)?);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(c) = rest.chars().next() else {
                return Err(self.error("unterminated string"));
            };
            self.pos += c.len_utf8();

            match c {
                c if c as u32 == quote as u32 => return Ok(out),
                '\\' => out.push(self.parse_escape()?),
                '\n' => return Err(self.error("newline inside string")),
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, LiteralError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += 1;
        let c = match b {
            b'"' => '"',
            b'\'' => '\'',
            b'\\' => '\\',
            b'/' => '/',
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'u' => return self.parse_unicode_escape(),
            other => return Err(self.error(&format!("invalid escape '\\{}'", other as char))),
        };
        Ok(c)
    }

    fn parse_unicode_escape(&mut self) -> Result<char, LiteralError> {
        let high = self.parse_hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            // Surrogate pair: a second \uXXXX must follow.
            if self.bytes.get(self.pos..self.pos + 2) != Some(b"\\u") {
                return Err(self.error("unpaired surrogate in escape"));
            }
            self.pos += 2;
            let low = self.parse_hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error("invalid low surrogate in escape"));
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"));
        }
        char::from_u32(high).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn parse_hex4(&mut self) -> Result<u32, LiteralError> {
        let digits = self
            .src
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos += 4;
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let int_start = self.pos;
        self.consume_digits();
        if self.pos == int_start {
            return Err(self.error("expected digits"));
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            let frac_start = self.pos;
            self.consume_digits();
            if self.pos == frac_start {
                return Err(self.error("expected digits after decimal point"));
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            self.consume_digits();
            if self.pos == exp_start {
                return Err(self.error("expected exponent digits"));
            }
        }

        let text = &self.src[start..self.pos];
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid number '{}'", text),
            })
    }

    fn consume_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "None" => Ok(Value::Null),
            word => Err(LiteralError {
                offset: start,
                message: format!("unquoted value '{}'", word),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_mapping() {
        let map = parse_mapping(r#"{"query": "capital of France", "limit": 5}"#).unwrap();
        assert_eq!(Value::Object(map), json!({"query": "capital of France", "limit": 5}));
    }

    #[test]
    fn test_empty_mapping_is_valid() {
        assert!(parse_mapping("{}").unwrap().is_empty());
        assert!(parse_mapping("  { }  ").unwrap().is_empty());
    }

    #[test]
    fn test_python_spellings() {
        let map = parse_mapping("{'flag': True, 'other': False, 'nothing': None, 'items': [1, 2,],}").unwrap();
        assert_eq!(
            Value::Object(map),
            json!({"flag": true, "other": false, "nothing": null, "items": [1, 2]})
        );
    }

    #[test]
    fn test_nested_values() {
        let map = parse_mapping(r#"{"a": {"b": [1.5, -2, "x", {"c": null}]}, "e": 1e3}"#).unwrap();
        assert_eq!(
            Value::Object(map),
            json!({"a": {"b": [1.5, -2, "x", {"c": null}]}, "e": 1000.0})
        );
    }

    #[test]
    fn test_escapes() {
        let map = parse_mapping(r#"{"s": "line\nbreak \"quoted\" é 😀", 'p': 'it\'s'}"#).unwrap();
        assert_eq!(map["s"], json!("line\nbreak \"quoted\" é 😀"));
        assert_eq!(map["p"], json!("it's"));
    }

    #[test]
    fn test_unquoted_value_rejected() {
        let err = parse_mapping("{\"query\": capital of France}").unwrap_err();
        assert!(err.message.contains("unquoted value 'capital'"));
        assert_eq!(err.offset, 10);
    }

    #[test]
    fn test_unquoted_key_rejected() {
        assert!(parse_mapping("{query: \"x\"}").is_err());
    }

    #[test]
    fn test_code_is_not_evaluated() {
        assert!(parse_mapping("{\"q\": __import__('os').system('ls')}").is_err());
        assert!(parse_mapping("{\"q\": 1 + 1}").is_err());
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        assert!(parse_mapping("[1, 2]").is_err());
        assert!(parse_mapping("\"text\"").is_err());
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_mapping("{} extra").is_err());
        assert!(parse_mapping("{\"a\": 1}}").is_err());
    }

    #[test]
    fn test_unterminated_inputs_rejected() {
        assert!(parse_mapping("{\"a\": \"open").is_err());
        assert!(parse_mapping("{\"a\": [1, 2").is_err());
        assert!(parse_mapping("{").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{{\"a\": {}1{}}}", "[".repeat(100), "]".repeat(100));
        let err = parse_mapping(&deep).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
    }
}
