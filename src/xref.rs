use std::cell::RefCell;
use std::collections::HashMap;

use log::{error, warn};

use crate::byte_view::ByteView;
use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result, XrefError};
use crate::object::{Object, ObjectId};
use crate::parser;
use crate::tokenizer::Tokenizer;

/// How an xref entry produces its object.
pub enum RefSource {
    /// Already materialized, either freshly authored or previously
    /// resolved from an offset.
    InMemory(Object),
    /// Not yet read. First read seeks to `offset`, optionally validates the
    /// `N G obj … endobj` envelope, parses, and caches the result.
    FromOffset {
        view: ByteView,
        offset: usize,
        obj_wrap: bool,
        cache: RefCell<Option<Object>>,
    },
    /// Packed inside an object stream (cross-reference stream type 2
    /// entries); resolved by `XrefTable::resolve`, which has table access.
    Compressed { container: u32, index_in_stream: u32 },
}

impl std::fmt::Debug for RefSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefSource::InMemory(obj) => f.debug_tuple("InMemory").field(obj).finish(),
            RefSource::FromOffset { offset, obj_wrap, .. } => f
                .debug_struct("FromOffset")
                .field("offset", offset)
                .field("obj_wrap", obj_wrap)
                .finish(),
            RefSource::Compressed { container, index_in_stream } => f
                .debug_struct("Compressed")
                .field("container", container)
                .field("index_in_stream", index_in_stream)
                .finish(),
        }
    }
}

impl RefSource {
    fn read(&self, id: ObjectId) -> Result<Object> {
        match self {
            RefSource::InMemory(obj) => Ok(obj.clone()),
            RefSource::FromOffset { view, offset, obj_wrap, cache } => {
                if let Some(obj) = cache.borrow().as_ref() {
                    return Ok(obj.clone());
                }
                let mut tk = Tokenizer::new(view.clone());
                tk.seek(*offset as i64);
                if *obj_wrap {
                    let n = parser::parse_int_token(tk.next())?;
                    let g = parser::parse_int_token(tk.next())?;
                    if n as u32 != id.0 || g as u16 != id.1 {
                        error!("object envelope at offset {offset} does not match expected id {} {}", id.0, id.1);
                        return Err(ParseError::ObjectEnvelopeMismatch {
                            expected: id.0,
                            generation: id.1,
                            offset: *offset,
                        }
                        .into());
                    }
                    if tk.next() != b"obj" {
                        error!("object at offset {offset} is missing its 'obj' keyword");
                        return Err(ParseError::ExpectedKeyword { expected: "obj" }.into());
                    }
                }
                let obj = parser::parse_object(&mut tk)?;
                if *obj_wrap && tk.next() != b"endobj" {
                    return Err(ParseError::ExpectedKeyword { expected: "endobj" }.into());
                }
                *cache.borrow_mut() = Some(obj.clone());
                Ok(obj)
            }
            RefSource::Compressed { .. } => unreachable!("resolved via XrefTable::resolve"),
        }
    }
}

pub struct XrefEntry {
    pub id: ObjectId,
    pub source: RefSource,
    /// True for classical `f` rows and cross-reference-stream type-0 rows:
    /// the slot is on the free list rather than holding a live object.
    pub free: bool,
}

/// An integer-keyed mapping from object number to [`RefSource`], seeded
/// with the free-list head at index 0.
pub struct XrefTable {
    pub size: u32,
    entries: HashMap<u32, XrefEntry>,
}

impl Default for XrefTable {
    fn default() -> Self {
        Self::new()
    }
}

impl XrefTable {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            0,
            XrefEntry {
                id: (0, 65535),
                source: RefSource::InMemory(Object::Null),
                free: true,
            },
        );
        XrefTable { size: 1, entries }
    }

    pub fn get(&self, num: u32) -> Option<&XrefEntry> {
        self.entries.get(&num)
    }

    pub fn contains(&self, num: u32) -> bool {
        self.entries.contains_key(&num)
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Object numbers (and their generation) currently holding a live
    /// object, excluding the free-list head and freed slots. Used when
    /// writing out every object a document still owns.
    pub fn live_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.values().filter(|e| !e.free && e.id.0 != 0).map(|e| e.id)
    }

    /// Replaces (or creates) the entry at `num` with a directly-held
    /// in-memory object, bumping the generation unconditionally. Used for
    /// both newly authored objects and in-place mutation of existing ones.
    pub fn set_in_memory(&mut self, num: u32, generation: u16, object: Object) {
        self.update(num, XrefEntry { id: (num, generation), source: RefSource::InMemory(object), free: false }, true);
    }

    /// Marks `num` as freed: generation still advances so a later reference
    /// to the stale generation correctly misses.
    pub fn free_entry(&mut self, num: u32, generation: u16) {
        self.update(num, XrefEntry { id: (num, generation), source: RefSource::InMemory(Object::Null), free: true }, true);
    }

    /// Installs `entry` iff the entry is new, has a strictly higher
    /// generation than the existing one, or `equal_update` is set and the
    /// generation matches exactly. Returns whether the install happened.
    pub fn update(&mut self, num: u32, entry: XrefEntry, equal_update: bool) -> bool {
        let installed = match self.entries.get(&num) {
            None => true,
            Some(existing) => entry.id.1 > existing.id.1 || (equal_update && entry.id.1 == existing.id.1),
        };
        if installed {
            self.entries.insert(num, entry);
            self.size = self.size.max(num + 1);
        }
        installed
    }

    /// Merges entries from an earlier (lower-precedence) xref section: the
    /// first (most recent) entry for a given number always wins.
    pub fn merge(&mut self, other: XrefTable) {
        for (num, entry) in other.entries {
            self.entries.entry(num).or_insert(entry);
        }
        self.size = self.size.max(other.size);
    }

    /// Returns `Object::Null` for an unknown or wrong-generation reference;
    /// otherwise reads through the `RefSource` (recursing through object
    /// streams for compressed entries) and caches the result.
    pub fn resolve(&self, reference: ObjectId) -> Result<Object> {
        let Some(entry) = self.entries.get(&reference.0) else {
            return Ok(Object::Null);
        };
        if entry.id.1 != reference.1 {
            return Ok(Object::Null);
        }
        match &entry.source {
            RefSource::Compressed { container, index_in_stream } => {
                self.resolve_compressed(*container, *index_in_stream)
            }
            source => source.read(entry.id),
        }
    }

    fn resolve_compressed(&self, container: u32, index_in_stream: u32) -> Result<Object> {
        let container_obj = self.resolve((container, 0))?;
        let stream = container_obj.as_stream()?;
        let decoded = crate::filter::decode_stream(stream)?;
        let n = stream.dict.get(b"N").and_then(Object::as_i64).unwrap_or(0) as usize;
        let first = stream.dict.get(b"First").and_then(Object::as_i64).unwrap_or(0) as usize;

        let mut header = Tokenizer::new(ByteView::new(decoded.clone()));
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let num = parser::parse_int_token(header.next())?;
            let off = parser::parse_int_token(header.next())?;
            offsets.push((num as u32, off as usize));
        }
        let Some(&(_, rel_offset)) = offsets.get(index_in_stream as usize) else {
            return Ok(Object::Null);
        };
        let mut body = Tokenizer::new(ByteView::new(decoded));
        body.seek((first + rel_offset) as i64);
        parser::parse_object(&mut body)
    }
}

/// Drives discovery of a classical xref table or an xref stream starting at
/// an absolute offset.
pub fn parse_xref_and_trailer(view: &ByteView, offset: usize) -> Result<(XrefTable, Dictionary)> {
    let mut tk = Tokenizer::new(view.clone());
    tk.seek(offset as i64);
    if tk.peek().as_slice() == b"xref" {
        parse_xref_table(&mut tk, view)
    } else {
        parse_xref_stream(&mut tk, view)
    }
}

fn parse_xref_table(tk: &mut Tokenizer, view: &ByteView) -> Result<(XrefTable, Dictionary)> {
    tk.next(); // "xref"
    let mut xref = XrefTable::new();

    loop {
        if tk.is_end() || tk.peek().as_slice() == b"trailer" {
            break;
        }
        let start = parser::parse_int_token(tk.next())?;
        let length = parser::parse_int_token(tk.next())?;
        for i in start..start + length {
            let off = parser::parse_int_token(tk.next())?;
            let gen = parser::parse_int_token(tk.next())?;
            let kind = tk.next().to_vec();
            let id = (i as u32, gen as u16);
            let free = kind.as_slice() != b"n";
            let source = if free {
                RefSource::InMemory(Object::Null)
            } else {
                RefSource::FromOffset {
                    view: view.clone(),
                    offset: off as usize,
                    obj_wrap: true,
                    cache: RefCell::new(None),
                }
            };
            xref.update(i as u32, XrefEntry { id, source, free }, false);
        }
    }
    tk.next(); // "trailer"
    let trailer = match parser::parse_object(tk)? {
        Object::Dictionary(dict) => dict,
        _ => Dictionary::new(),
    };
    Ok((xref, trailer))
}

/// Typed view over a cross-reference stream's governing dictionary:
/// `Type`, `Size`, `Index`, `Prev`. Used while decoding the stream itself;
/// `Prev`-chasing across xref sections happens one level up, over the
/// plain merged trailer `Dictionary`.
struct XrefStreamDict<'a>(&'a Dictionary);

impl<'a> XrefStreamDict<'a> {
    fn kind(&self) -> Result<&[u8]> {
        self.0.get(b"Type").and_then(Object::as_name)
    }

    fn size(&self) -> Result<i64> {
        self.0.get(b"Size").and_then(Object::as_i64)
    }

    fn index(&self) -> Vec<(i64, i64)> {
        match self.0.get(b"Index") {
            Ok(Object::Array(arr)) => arr
                .chunks(2)
                .filter(|c| c.len() == 2)
                .map(|c| (c[0].as_i64().unwrap_or(0), c[1].as_i64().unwrap_or(0)))
                .collect(),
            _ => vec![(0, self.size().unwrap_or(0))],
        }
    }

    fn prev(&self) -> Option<i64> {
        self.0.get(b"Prev").ok().and_then(|o| o.as_i64().ok())
    }
}

fn parse_xref_stream(tk: &mut Tokenizer, view: &ByteView) -> Result<(XrefTable, Dictionary)> {
    tk.next(); // object number
    tk.next(); // generation
    if tk.next() != b"obj" {
        return Err(ParseError::ExpectedKeyword { expected: "obj" }.into());
    }
    let obj = parser::parse_object(tk)?;
    if tk.next() != b"endobj" {
        return Err(ParseError::ExpectedKeyword { expected: "endobj" }.into());
    }
    let Object::Stream(stream) = obj else {
        return Err(Error::TypeMismatch { expected: "Stream", found: "other" });
    };

    let decoded = crate::filter::decode_stream(&stream)?;
    let widths: Vec<usize> = stream
        .dict
        .get(b"W")
        .and_then(Object::as_array)?
        .iter()
        .map(|o| o.as_i64().map(|n| n as usize))
        .collect::<Result<_>>()?;
    if widths.len() != 3 {
        return Err(XrefError::InvalidWidths.into());
    }

    let governing = XrefStreamDict(&stream.dict);
    if matches!(governing.kind(), Ok(kind) if kind != b"XRef") {
        warn!("cross-reference stream has /Type {:?}, expected /XRef", governing.kind().unwrap());
    }
    let index = governing.index();

    let mut xref = XrefTable::new();
    let row_width: usize = widths.iter().sum();
    let mut pos = 0usize;
    for (first, count) in index {
        for k in 0..count {
            if row_width == 0 || pos + row_width > decoded.len() {
                break;
            }
            let row = &decoded[pos..pos + row_width];
            pos += row_width;

            let mut fields = [0u64; 3];
            let mut off = 0usize;
            for (field_index, &w) in widths.iter().enumerate() {
                if w == 0 {
                    fields[field_index] = if field_index == 0 { 1 } else { 0 };
                    continue;
                }
                let mut v = 0u64;
                for &b in &row[off..off + w] {
                    v = (v << 8) | b as u64;
                }
                fields[field_index] = v;
                off += w;
            }

            let num = (first + k) as u32;
            match fields[0] {
                0 => {
                    let id = (num, fields[2] as u16);
                    xref.update(num, XrefEntry { id, source: RefSource::InMemory(Object::Null), free: true }, false);
                }
                1 => {
                    let id = (num, fields[2] as u16);
                    let source = RefSource::FromOffset {
                        view: view.clone(),
                        offset: fields[1] as usize,
                        obj_wrap: true,
                        cache: RefCell::new(None),
                    };
                    xref.update(num, XrefEntry { id, source, free: false }, false);
                }
                2 => {
                    let id = (num, 0);
                    let source = RefSource::Compressed {
                        container: fields[1] as u32,
                        index_in_stream: fields[2] as u32,
                    };
                    xref.update(num, XrefEntry { id, source, free: false }, false);
                }
                _ => {}
            }
        }
    }

    Ok((xref, stream.dict))
}
