use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::Path;

use log::warn;

use crate::byte_view::ByteView;
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectId, Stream, StringFormat};
use crate::reader;
use crate::xref::XrefTable;

/// Confirms a caller-initiated overwrite of an existing file when saving
/// in place. Lets batch/CLI callers substitute their own policy for the
/// library's conservative default.
pub trait Confirm {
    fn confirm_overwrite(&self, path: &Path) -> bool;
}

/// Always declines: the safe default for library callers that never meant
/// to clobber an existing file without being asked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm_overwrite(&self, _path: &Path) -> bool {
        false
    }
}

/// Prompts on stdin; for CLI tools built on top of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm_overwrite(&self, path: &Path) -> bool {
        eprint!("{} already exists, overwrite? [y/N] ", path.display());
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// A read-only view over the trailer dictionary's well-known keys.
pub struct Trailer<'a>(&'a Dictionary);

impl<'a> Trailer<'a> {
    pub fn size(&self) -> Option<i64> {
        self.0.get(b"Size").ok().and_then(|o| o.as_i64().ok())
    }

    pub fn root(&self) -> Option<ObjectId> {
        self.0.get(b"Root").ok().and_then(|o| o.as_reference().ok())
    }

    pub fn info(&self) -> Option<ObjectId> {
        self.0.get(b"Info").ok().and_then(|o| o.as_reference().ok())
    }

    pub fn prev(&self) -> Option<i64> {
        self.0.get(b"Prev").ok().and_then(|o| o.as_i64().ok())
    }

    pub fn encrypt(&self) -> Option<ObjectId> {
        self.0.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok())
    }

    pub fn id(&self) -> Option<&[Object]> {
        self.0.get(b"ID").ok().and_then(|o| o.as_array().ok())
    }
}

/// A mutable view over the trailer's well-known keys, borrowing the whole
/// [`Document`] rather than just its trailer dictionary: setting `/Root`
/// from a bare [`Dictionary`] needs [`Document::add_object`] to promote it
/// to an indirect reference first.
pub struct TrailerMut<'a> {
    document: &'a mut Document,
}

impl<'a> TrailerMut<'a> {
    pub fn set_size(&mut self, size: i64) {
        self.document.trailer.set(b"Size".to_vec(), Object::Integer(size));
    }

    /// Sets `/Root`. A bare [`Dictionary`] is promoted to its own indirect
    /// object first, mirroring the original's auto-promotion of an inline
    /// catalog into a reference.
    pub fn set_root(&mut self, root: Object) -> Result<()> {
        let reference = match root {
            Object::Reference(id) => id,
            Object::Dictionary(_) => self.document.add_object(root),
            other => {
                return Err(Error::TypeMismatch {
                    expected: "Dictionary or Reference",
                    found: other.type_name(),
                })
            }
        };
        self.document.trailer.set(b"Root".to_vec(), Object::Reference(reference));
        Ok(())
    }

    pub fn set_info(&mut self, info: Option<ObjectId>) {
        match info {
            Some(id) => {
                self.document.trailer.set(b"Info".to_vec(), Object::Reference(id));
            }
            None => {
                self.document.trailer.remove(b"Info");
            }
        }
    }

    /// `None` deletes the key rather than writing a null, matching the
    /// original's `Prev` setter.
    pub fn set_prev(&mut self, prev: Option<i64>) {
        match prev {
            Some(offset) => {
                self.document.trailer.set(b"Prev".to_vec(), Object::Integer(offset));
            }
            None => {
                self.document.trailer.remove(b"Prev");
            }
        }
    }

    pub fn set_encrypt(&mut self, encrypt: Option<ObjectId>) {
        match encrypt {
            Some(id) => {
                self.document.trailer.set(b"Encrypt".to_vec(), Object::Reference(id));
            }
            None => {
                self.document.trailer.remove(b"Encrypt");
            }
        }
    }

    /// `None` deletes `/ID` rather than writing a null, matching the
    /// original's `ID` setter.
    pub fn set_id(&mut self, ids: Option<[Vec<u8>; 2]>) {
        match ids {
            Some([a, b]) => {
                let array = Object::Array(vec![
                    Object::String(a, StringFormat::Literal),
                    Object::String(b, StringFormat::Literal),
                ]);
                self.document.trailer.set(b"ID".to_vec(), array);
            }
            None => {
                self.document.trailer.remove(b"ID");
            }
        }
    }
}

/// An in-memory PDF document: the byte buffer it was parsed from, its
/// merged cross-reference table, trailer, and the set of object numbers
/// touched since load.
pub struct Document {
    buffer: ByteView,
    xref: XrefTable,
    trailer: Dictionary,
    dirty: BTreeSet<u32>,
    max_id: u32,
    prev_startxref: Option<usize>,
}

impl Document {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let buffer = ByteView::new(bytes);
        let discovery = reader::discover(&buffer)?;
        let max_id = discovery.xref.max_id();
        Ok(Document {
            buffer,
            xref: discovery.xref,
            trailer: discovery.trailer,
            dirty: BTreeSet::new(),
            max_id,
            prev_startxref: Some(discovery.startxref),
        })
    }

    /// A document with no backing bytes and an empty xref table, for
    /// building a PDF up from scratch with [`Document::add_object`].
    pub fn empty() -> Self {
        Document {
            buffer: ByteView::new(Vec::new()),
            xref: XrefTable::new(),
            trailer: Dictionary::new(),
            dirty: BTreeSet::new(),
            max_id: 0,
            prev_startxref: None,
        }
    }

    pub fn trailer(&self) -> Trailer<'_> {
        Trailer(&self.trailer)
    }

    pub fn trailer_mut(&mut self) -> TrailerMut<'_> {
        TrailerMut { document: self }
    }

    /// Looks an object number/generation up directly, without following a
    /// reference chain. `Object::Null` if absent or generation-mismatched.
    pub fn resolve(&self, id: ObjectId) -> Result<Object> {
        self.xref.resolve(id)
    }

    /// Resolves `id`, then keeps following while the result is itself an
    /// `Object::Reference` (a malformed but occasionally-seen producer
    /// quirk). Bails with [`Error::ReferenceCycle`] past a depth that no
    /// legitimate document needs.
    pub fn get_object(&self, id: ObjectId) -> Result<Object> {
        self.dereference_chain(self.xref.resolve(id)?, id, 0)
    }

    fn dereference_chain(&self, object: Object, origin: ObjectId, depth: u8) -> Result<Object> {
        match object {
            Object::Reference(next) if depth < 32 => self.dereference_chain(self.xref.resolve(next)?, origin, depth + 1),
            Object::Reference(_) => {
                warn!("reference cycle detected resolving object {} {}", origin.0, origin.1);
                Err(Error::ReferenceCycle(origin))
            }
            other => Ok(other),
        }
    }

    pub fn get_dictionary(&self, id: ObjectId) -> Result<Dictionary> {
        Ok(self.get_object(id)?.as_dict()?.clone())
    }

    pub fn get_stream(&self, id: ObjectId) -> Result<Stream> {
        Ok(self.get_object(id)?.as_stream()?.clone())
    }

    pub fn decode_stream(&self, stream: &Stream) -> Result<Vec<u8>> {
        crate::filter::decode_stream(stream)
    }

    pub fn catalog(&self) -> Result<Dictionary> {
        let root = self.trailer.get(b"Root")?.as_reference()?;
        self.get_dictionary(root)
    }

    /// Overwrites (or creates) the object at `id` with `object`, advancing
    /// its generation and marking the number dirty for the next save.
    pub fn mark_updated(&mut self, id: ObjectId, object: Object) {
        self.xref.set_in_memory(id.0, id.1, object);
        self.dirty.insert(id.0);
        self.max_id = self.max_id.max(id.0);
    }

    /// Appends a brand-new indirect object at generation 0 and returns its
    /// id.
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        self.max_id += 1;
        let id = (self.max_id, 0);
        self.xref.set_in_memory(id.0, id.1, object);
        self.dirty.insert(id.0);
        id
    }

    /// Reads `id`, applies `f` to a private copy, then writes it back via
    /// [`Document::mark_updated`] — the copy-on-write pattern this crate
    /// uses in place of returning a `&mut Object` into the xref table.
    pub fn with_object_mut<F>(&mut self, id: ObjectId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Object),
    {
        let mut object = self.get_object(id)?;
        f(&mut object);
        self.mark_updated(id, object);
        Ok(())
    }

    /// Marks `id` as freed. The generation bump ensures a stale reference
    /// to the old value resolves to `Null` rather than the free-list
    /// sentinel.
    pub fn free_object(&mut self, id: ObjectId) {
        self.xref.free_entry(id.0, id.1.wrapping_add(1));
        self.dirty.insert(id.0);
    }

    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    /// Full rewrite: every live object, a fresh classical xref table, and
    /// a trailer with no `/Prev`.
    pub fn save_to<P: AsRef<Path>>(&self, path: P, confirm: &dyn Confirm) -> Result<()> {
        let path = path.as_ref();
        if path.exists() && !confirm.confirm_overwrite(path) {
            return Err(Error::OverwriteDeclined);
        }
        std::fs::write(path, self.save_bytes()?)?;
        Ok(())
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.7\n");
        out.extend_from_slice(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n']);

        let mut ids: Vec<ObjectId> = self.xref.live_ids().collect();
        ids.sort_unstable();

        let mut offsets: HashMap<u32, (u16, usize)> = HashMap::new();
        for id in ids {
            let object = self.xref.resolve(id)?;
            offsets.insert(id.0, (id.1, out.len()));
            out.extend_from_slice(format!("{} {} obj\n", id.0, id.1).as_bytes());
            out.extend(crate::object::serialize(&object));
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        write_full_xref(&mut out, &offsets, self.max_id);

        let mut trailer = self.trailer.clone();
        trailer.set(b"Size".to_vec(), Object::Integer(self.max_id as i64 + 1));
        trailer.remove(b"Prev");
        out.extend_from_slice(b"trailer\n");
        out.extend(trailer.to_bytes());
        out.extend_from_slice(format!("\nstartxref\n{xref_offset}\n%%EOF").as_bytes());
        Ok(out)
    }

    /// Incremental update: appends only the dirty objects plus a new xref
    /// section chained to the previous one via `/Prev`. The original bytes
    /// are never touched.
    pub fn save_incremental<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.save_incremental_bytes()?)?;
        Ok(())
    }

    pub fn save_incremental_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.buffer.as_slice().to_vec();
        if !out.ends_with(b"\n") {
            out.push(b'\n');
        }

        let mut offsets: HashMap<u32, (u16, usize)> = HashMap::new();
        let mut dirty_ids: Vec<u32> = self.dirty.iter().copied().collect();
        dirty_ids.sort_unstable();
        for &num in &dirty_ids {
            let Some(entry) = self.xref.get(num) else { continue };
            if entry.free {
                continue;
            }
            let object = self.xref.resolve(entry.id)?;
            offsets.insert(num, (entry.id.1, out.len()));
            out.extend_from_slice(format!("{} {} obj\n", entry.id.0, entry.id.1).as_bytes());
            out.extend(crate::object::serialize(&object));
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        write_incremental_xref(&mut out, &self.xref, &dirty_ids, &offsets);

        let mut trailer = self.trailer.clone();
        trailer.set(b"Size".to_vec(), Object::Integer(self.max_id as i64 + 1));
        if let Some(prev) = self.prev_startxref {
            trailer.set(b"Prev".to_vec(), Object::Integer(prev as i64));
        }
        out.extend_from_slice(b"trailer\n");
        out.extend(trailer.to_bytes());
        out.extend_from_slice(format!("\nstartxref\n{xref_offset}\n%%EOF").as_bytes());
        Ok(out)
    }
}

fn write_full_xref(out: &mut Vec<u8>, offsets: &HashMap<u32, (u16, usize)>, max_id: u32) {
    out.extend_from_slice(b"xref\n");
    out.extend_from_slice(format!("0 {}\n", max_id + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for num in 1..=max_id {
        match offsets.get(&num) {
            Some(&(gen, off)) => out.extend_from_slice(format!("{off:010} {gen:05} n \n").as_bytes()),
            None => out.extend_from_slice(b"0000000000 00000 f \n"),
        }
    }
}

fn write_incremental_xref(out: &mut Vec<u8>, xref: &XrefTable, dirty_ids: &[u32], offsets: &HashMap<u32, (u16, usize)>) {
    out.extend_from_slice(b"xref\n");
    for &num in dirty_ids {
        out.extend_from_slice(format!("{num} 1\n").as_bytes());
        match offsets.get(&num) {
            Some(&(gen, off)) => out.extend_from_slice(format!("{off:010} {gen:05} n \n").as_bytes()),
            None => {
                let generation = xref.get(num).map(|e| e.id.1).unwrap_or(0);
                out.extend_from_slice(format!("0000000000 {generation:05} f \n").as_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        let obj_offset = buf.len();
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n");
        buf.extend_from_slice(format!("{obj_offset:010} 00000 n \n").as_bytes());
        buf.extend_from_slice(b"trailer\n<< /Size 2 /Root 1 0 R >>\n");
        buf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());
        buf
    }

    #[test]
    fn loads_and_resolves_catalog() {
        let doc = Document::from_bytes(minimal_pdf()).unwrap();
        assert_eq!(doc.trailer().root(), Some((1, 0)));
        let catalog = doc.catalog().unwrap();
        assert!(catalog.has_type(b"Catalog"));
    }

    #[test]
    fn mark_updated_then_full_save_reflects_change() {
        let mut doc = Document::from_bytes(minimal_pdf()).unwrap();
        let mut catalog = doc.get_dictionary((1, 0)).unwrap();
        catalog.set(b"Marked".to_vec(), Object::Boolean(true));
        doc.mark_updated((1, 0), Object::Dictionary(catalog));

        let bytes = doc.save_bytes().unwrap();
        let reloaded = Document::from_bytes(bytes).unwrap();
        let reloaded_catalog = reloaded.catalog().unwrap();
        assert_eq!(reloaded_catalog.get(b"Marked").unwrap(), &Object::Boolean(true));
    }

    #[test]
    fn add_object_then_incremental_save_keeps_original_bytes_untouched() {
        let mut doc = Document::from_bytes(minimal_pdf()).unwrap();
        let new_id = doc.add_object(Object::Integer(42));
        let appended = doc.save_incremental_bytes().unwrap();
        assert!(appended.starts_with(b"%PDF-1.4\n"));

        let reloaded = Document::from_bytes(appended).unwrap();
        assert_eq!(reloaded.get_object(new_id).unwrap(), Object::Integer(42));
        let catalog = reloaded.catalog().unwrap();
        assert!(catalog.has_type(b"Catalog"));
    }

    #[test]
    fn unknown_reference_resolves_to_null_object() {
        let doc = Document::from_bytes(minimal_pdf()).unwrap();
        assert_eq!(doc.get_object((99, 0)).unwrap(), Object::Null);
    }

    #[test]
    fn reference_cycle_is_rejected() {
        let _ = env_logger::try_init();
        let mut doc = Document::from_bytes(minimal_pdf()).unwrap();
        doc.mark_updated((10, 0), Object::Reference((11, 0)));
        doc.mark_updated((11, 0), Object::Reference((10, 0)));
        let err = doc.get_object((10, 0)).unwrap_err();
        assert!(matches!(err, Error::ReferenceCycle(id) if id == (10, 0)));
    }

    #[test]
    fn trailer_setters_round_trip() {
        let mut doc = Document::from_bytes(minimal_pdf()).unwrap();

        doc.trailer_mut().set_prev(Some(123));
        assert_eq!(doc.trailer().prev(), Some(123));
        doc.trailer_mut().set_prev(None);
        assert_eq!(doc.trailer().prev(), None);

        doc.trailer_mut().set_id(Some([b"a".to_vec(), b"b".to_vec()]));
        assert_eq!(doc.trailer().id().unwrap().len(), 2);
        doc.trailer_mut().set_id(None);
        assert!(doc.trailer().id().is_none());

        doc.trailer_mut().set_root(Object::Dictionary(Dictionary::new())).unwrap();
        let root_id = doc.trailer().root().unwrap();
        assert_ne!(root_id, (1, 0));
        assert!(doc.get_dictionary(root_id).is_ok());
    }

    #[test]
    fn save_to_writes_a_file_round_trip() {
        let doc = Document::from_bytes(minimal_pdf()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        doc.save_to(&path, &NeverConfirm).unwrap();
        let reloaded = Document::load(&path).unwrap();
        assert!(reloaded.catalog().unwrap().has_type(b"Catalog"));
    }
}
