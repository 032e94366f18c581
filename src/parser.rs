use log::error;

use crate::dictionary::Dictionary;
use crate::error::{ParseError, Result};
use crate::object::{Object, Stream, StringFormat};
use crate::tokenizer::Tokenizer;

/// Unescape a literal-string token body (without the outer parentheses).
fn unescape_literal(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body[i] == b'\\' {
            i += 1;
            if i >= body.len() {
                break;
            }
            let start = i;
            if body[i].is_ascii_digit() && (b'0'..=b'7').contains(&body[i]) {
                let mut n = 0;
                while i < body.len() && i < start + 3 && (b'0'..=b'7').contains(&body[i]) {
                    i += 1;
                }
                if let Ok(text) = std::str::from_utf8(&body[start..i]) {
                    if let Ok(value) = u32::from_str_radix(text, 8) {
                        n = value;
                    }
                }
                out.push((n & 0xFF) as u8);
                continue;
            }
            match body[i] {
                b'n' => out.push(b'\n'),
                b'r' => out.push(b'\r'),
                b't' => out.push(b'\t'),
                b'b' => out.push(0x08),
                b'f' => out.push(0x0C),
                b'(' => out.push(b'('),
                b')' => out.push(b')'),
                b'\\' => out.push(b'\\'),
                b'\r' => {
                    // line continuation: \CR or \CRLF produces nothing
                    i += 1;
                    if i < body.len() && body[i] == b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'\n' => {}
                other => out.push(other),
            }
            i += 1;
        } else {
            out.push(body[i]);
            i += 1;
        }
    }
    out
}

fn unescape_name(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body[i] == b'#' && i + 2 < body.len() {
            if let Ok(text) = std::str::from_utf8(&body[i + 1..i + 3]) {
                if let Ok(value) = u8::from_str_radix(text, 16) {
                    out.push(value);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(body[i]);
        i += 1;
    }
    out
}

fn decode_hex_string(body: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = body.iter().copied().filter(u8::is_ascii_hexdigit).collect();
    let mut out = Vec::with_capacity(digits.len().div_ceil(2));
    let mut iter = digits.chunks(2);
    for pair in &mut iter {
        let hi = hex_value(pair[0]);
        let lo = if pair.len() == 2 { hex_value(pair[1]) } else { 0 };
        out.push((hi << 4) | lo);
    }
    out
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

/// Parse a single PDF object from the tokenizer's current position. Only
/// an unterminated stream envelope is a fatal error; every other malformed
/// input degrades to `Object::Null`.
pub fn parse_object(tk: &mut Tokenizer) -> Result<Object> {
    let token = tk.next().to_vec();

    if token.as_slice() == b"null" {
        return Ok(Object::Null);
    }
    if token.as_slice() == b"true" {
        return Ok(Object::Boolean(true));
    }
    if token.as_slice() == b"false" {
        return Ok(Object::Boolean(false));
    }
    if token.starts_with(b"(") {
        let body = if token.len() >= 2 { &token[1..token.len() - 1] } else { &[] };
        return Ok(Object::String(unescape_literal(body), StringFormat::Literal));
    }
    if token.starts_with(b"<") && token.ends_with(b">") && token.as_slice() != b"<<" {
        let body = &token[1..token.len() - 1];
        return Ok(Object::String(decode_hex_string(body), StringFormat::Hexadecimal));
    }
    if token.as_slice() == b"/" {
        let name = tk.next().to_vec();
        return Ok(Object::Name(unescape_name(&name)));
    }
    if token.as_slice() == b"[" {
        let mut items = Vec::new();
        loop {
            if tk.is_end() {
                break;
            }
            if tk.peek().as_slice() == b"]" {
                tk.next();
                break;
            }
            items.push(parse_object(tk)?);
        }
        return Ok(Object::Array(items));
    }
    if token.as_slice() == b"<<" {
        let mut dict = Dictionary::new();
        loop {
            if tk.is_end() {
                break;
            }
            if tk.peek().as_slice() == b">>" {
                tk.next();
                break;
            }
            let key = parse_object(tk)?;
            let value = parse_object(tk)?;
            if let Object::Name(name) = key {
                dict.set(name, value);
            }
        }
        if tk.peek().as_slice() == b"stream" {
            tk.next();
            skip_stream_line_terminator(tk);
            let length = dict.get(b"Length").ok().and_then(|o| o.as_i64().ok()).ok_or_else(|| {
                error!("stream dictionary is missing a numeric /Length entry");
                ParseError::MissingStreamLength
            })?;
            let length = length.max(0) as usize;
            let start = tk.pos;
            let content = tk.view().slice(start, start + length).to_vec();
            tk.seek((start + length) as i64);
            if tk.next() != b"endstream" {
                return Err(ParseError::UnterminatedStream.into());
            }
            return Ok(Object::Stream(Stream::new(dict, content)));
        }
        return Ok(Object::Dictionary(dict));
    }

    // Numeric-looking token, or an IndRef of the form "<int> <int> R".
    if let Ok(n) = parse_int(&token) {
        let checkpoint = tk.pos;
        let second = tk.next().to_vec();
        if let Ok(g) = parse_int(&second) {
            let third = tk.next();
            if third == b"R" {
                return Ok(Object::Reference((n as u32, g as u16)));
            }
        }
        tk.pos = checkpoint;
        return Ok(Object::Integer(n));
    }
    if let Ok(f) = std::str::from_utf8(&token).unwrap_or("").parse::<f64>() {
        if !token.is_empty() {
            return Ok(Object::Real(f));
        }
    }
    Ok(Object::Null)
}

fn parse_int(token: &[u8]) -> std::result::Result<i64, ()> {
    if token.is_empty() {
        return Err(());
    }
    std::str::from_utf8(token).ok().and_then(|s| s.parse::<i64>().ok()).ok_or(())
}

/// Parses a bare integer token, for callers outside object-grammar parsing
/// (xref table rows, object-stream headers, object envelopes).
pub(crate) fn parse_int_token(token: &[u8]) -> Result<i64> {
    parse_int(token).map_err(|_| ParseError::ExpectedKeyword { expected: "integer" }.into())
}

fn skip_stream_line_terminator(tk: &mut Tokenizer) {
    let view = tk.view().clone();
    let pos = tk.pos;
    if view.get(pos) == Some(b'\r') {
        tk.pos += 1;
        if view.get(tk.pos) == Some(b'\n') {
            tk.pos += 1;
        }
    } else if view.get(pos) == Some(b'\n') || view.get(pos) == Some(b'\r') {
        tk.pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_view::ByteView;

    fn parse(bytes: &[u8]) -> Object {
        let mut tk = Tokenizer::new(ByteView::new(bytes.to_vec()));
        parse_object(&mut tk).unwrap()
    }

    #[test]
    fn nested_literal_string() {
        let obj = parse(br"( abc (def\) \n )");
        assert_eq!(obj, Object::String(b" abc (def) \n ".to_vec(), StringFormat::Literal));
    }

    #[test]
    fn hex_string_odd_length() {
        let obj = parse(b"<A>");
        assert_eq!(obj, Object::String(vec![0xA0], StringFormat::Hexadecimal));
    }

    #[test]
    fn name_with_escape() {
        let obj = parse(b"/foo#20bar#2Fbaz");
        assert_eq!(obj, Object::Name(b"foo bar/baz".to_vec()));
    }

    #[test]
    fn integer_vs_reference() {
        assert_eq!(parse(b"42"), Object::Integer(42));
        assert_eq!(parse(b"1 0 R"), Object::Reference((1, 0)));
    }

    #[test]
    fn float_and_null_fallback() {
        assert_eq!(parse(b"3.14"), Object::Real(3.14));
        assert_eq!(parse(b"garbage$$$"), Object::Null);
    }

    #[test]
    fn array_and_dict() {
        assert_eq!(
            parse(b"[1 2 3]"),
            Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)])
        );
        let Object::Dictionary(dict) = parse(b"<< /Size 4 >>") else {
            panic!("expected dict");
        };
        assert_eq!(dict.get(b"Size").unwrap(), &Object::Integer(4));
    }

    #[test]
    fn stream_round_trip() {
        let bytes = b"<< /Length 5 >>\nstream\nHELLO\nendstream";
        let Object::Stream(stream) = parse(bytes) else {
            panic!("expected stream");
        };
        assert_eq!(stream.content, b"HELLO");
    }

    #[test]
    fn unterminated_stream_is_fatal() {
        let bytes = b"<< /Length 5 >>\nstream\nHELLOnotend";
        let mut tk = Tokenizer::new(ByteView::new(bytes.to_vec()));
        assert!(parse_object(&mut tk).is_err());
    }
}
