use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// `(object number, generation)` — a pointer into a document's xref table.
pub type ObjectId = (u32, u16);

/// How a [`Object::String`] was written in the source (or should be
/// written back out). Affects serialization only; equality is over the
/// decoded bytes regardless of this flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// A stream's metadata dictionary plus its raw (still filter-encoded)
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        let mut dict = dict;
        dict.set(b"Length".to_vec(), Object::Integer(content.len() as i64));
        Stream { dict, content }
    }

    /// Replace the raw payload, keeping `/Length` in sync the way the
    /// original's `Stream.__setattr__` hook does.
    pub fn set_content(&mut self, content: Vec<u8>) {
        self.dict.set(b"Length".to_vec(), Object::Integer(content.len() as i64));
        self.content = content;
    }

    /// The stream's `/Length` entry, kept in sync by [`Stream::new`] and
    /// [`Stream::set_content`] rather than trusted blindly from disk.
    pub fn length(&self) -> Result<i64> {
        self.dict.get(b"Length").and_then(Object::as_i64)
    }

    /// The stream's `/DL` entry (the decoded length, for progressive
    /// display of an as-yet-partially-received stream). Absent on most
    /// streams, so this returns `None` rather than an error.
    pub fn dl(&self) -> Option<i64> {
        self.dict.get(b"DL").ok().and_then(|o| o.as_i64().ok())
    }

    pub fn filters(&self) -> Vec<Vec<u8>> {
        match self.dict.get(b"Filter") {
            Ok(Object::Name(name)) => vec![name.clone()],
            Ok(Object::Array(arr)) => arr
                .iter()
                .filter_map(|o| if let Object::Name(n) = o { Some(n.clone()) } else { None })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn decode_params(&self) -> Vec<Dictionary> {
        match self.dict.get(b"DecodeParms").or_else(|_| self.dict.get(b"DecodeParams")) {
            Ok(Object::Dictionary(d)) => vec![d.clone()],
            Ok(Object::Array(arr)) => arr
                .iter()
                .map(|o| match o {
                    Object::Dictionary(d) => d.clone(),
                    _ => Dictionary::new(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A typed PDF object, tagged by variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Vec<u8>, StringFormat),
    Name(Vec<u8>),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(..) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            other => Err(other.mismatch("Boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(n) => Ok(*n),
            Object::Real(f) => Ok(*f as i64),
            other => Err(other.mismatch("Integer")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(n) => Ok(*n as f64),
            Object::Real(f) => Ok(*f),
            other => Err(other.mismatch("Real")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            other => Err(other.mismatch("Name")),
        }
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            other => Err(other.mismatch("String")),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            other => Err(other.mismatch("Array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            other => Err(other.mismatch("Array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            other => Err(other.mismatch("Dictionary")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            other => Err(other.mismatch("Dictionary")),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            other => Err(other.mismatch("Stream")),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            other => Err(other.mismatch("Stream")),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            other => Err(other.mismatch("Reference")),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i64> for Object {
    fn from(n: i64) -> Self {
        Object::Integer(n)
    }
}

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Object::Real(f)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

/// `/` + body, with non-regular bytes `#XX`-escaped; `parse(serialize(n))`
/// recovers the original body.
pub fn serialize_name(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(b'/');
    for &b in body {
        let needs_escape = !(33..=126).contains(&b) || matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#');
        if needs_escape {
            out.push(b'#');
            out.extend_from_slice(format!("{:02X}", b).as_bytes());
        } else {
            out.push(b);
        }
    }
    out
}

/// `(` + backslash-escaped body + `)`.
pub fn serialize_literal_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &b in bytes {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0C => out.extend_from_slice(b"\\f"),
            _ => out.push(b),
        }
    }
    out.push(b')');
    out
}

pub fn serialize_hex_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 2 + 2);
    out.push(b'<');
    for &b in bytes {
        out.extend_from_slice(format!("{:02X}", b).as_bytes());
    }
    out.push(b'>');
    out
}

/// Canonical decimal form: integer as-is, float trimmed of a trailing `.0`
/// only when exactly representable, otherwise minimal decimal digits.
pub fn serialize_number(object: &Object) -> Vec<u8> {
    match object {
        Object::Integer(n) => {
            let mut buf = itoa::Buffer::new();
            buf.format(*n).as_bytes().to_vec()
        }
        Object::Real(f) => format_real(*f).into_bytes(),
        _ => Vec::new(),
    }
}

fn format_real(f: f64) -> String {
    if f == f.trunc() && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        let mut s = format!("{}", f);
        if !s.contains('.') {
            s.push_str(".0");
        }
        s
    }
}

/// Serialize any object to its canonical on-disk byte form.
pub fn serialize(object: &Object) -> Vec<u8> {
    match object {
        Object::Null => b"null".to_vec(),
        Object::Boolean(true) => b"true".to_vec(),
        Object::Boolean(false) => b"false".to_vec(),
        Object::Integer(_) | Object::Real(_) => serialize_number(object),
        Object::String(bytes, StringFormat::Hexadecimal) => serialize_hex_string(bytes),
        Object::String(bytes, StringFormat::Literal) => serialize_literal_string(bytes),
        Object::Name(body) => serialize_name(body),
        Object::Array(items) => {
            let mut out = Vec::new();
            out.extend_from_slice(b"[ ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                out.extend(serialize(item));
            }
            out.extend_from_slice(b" ]");
            out
        }
        Object::Dictionary(dict) => dict.to_bytes(),
        Object::Stream(stream) => {
            let mut out = stream.dict.to_bytes();
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
            out
        }
        Object::Reference((n, g)) => format!("{n} {g} R").into_bytes(),
    }
}
