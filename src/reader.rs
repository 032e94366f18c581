use log::warn;

use crate::byte_view::ByteView;
use crate::dictionary::Dictionary;
use crate::error::{Result, XrefError};
use crate::object::Object;
use crate::xref::{parse_xref_and_trailer, XrefTable};

/// Where this document's footer pointed us: the final `startxref` offset
/// plus whatever `/Prev` (and, for hybrid files, `/XRefStm`) chain it led
/// through. Kept around so a later incremental save knows where to point
/// its own `/Prev`.
pub struct Discovery {
    pub xref: XrefTable,
    pub trailer: Dictionary,
    pub startxref: usize,
}

/// Locates the header, footer, and xref chain of a PDF byte buffer and
/// resolves it into a single merged xref table and trailer dictionary.
pub fn discover(view: &ByteView) -> Result<Discovery> {
    find_header(view)?;
    let eof = find_eof(view)?;
    let startxref = find_startxref(view, eof)?;

    let mut visited = Vec::new();
    let (mut xref, trailer) = walk_chain(view, startxref, &mut visited)?;

    let declared_size = trailer.get(b"Size").ok().and_then(|o| o.as_i64().ok());
    let entry_count = xref.max_id() + 1;
    if let Some(declared_size) = declared_size {
        if declared_size != entry_count as i64 {
            warn!("Size entry of trailer dictionary is {declared_size}, correct value is {entry_count}.");
            xref.size = entry_count;
        }
    }

    Ok(Discovery { xref, trailer, startxref })
}

fn find_header(view: &ByteView) -> Result<usize> {
    let search_window = view.slice(0, view.len().min(1024));
    search_window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or(XrefError::MissingHeader.into())
}

fn find_eof(view: &ByteView) -> Result<usize> {
    view.rfind(b"%%EOF", view.len()).ok_or(XrefError::MissingEof.into())
}

fn find_startxref(view: &ByteView, eof: usize) -> Result<usize> {
    let marker = view.rfind(b"startxref", eof).ok_or(XrefError::Start)?;
    let mut tk = crate::tokenizer::Tokenizer::new(view.clone());
    tk.seek((marker + b"startxref".len()) as i64);
    let offset_token = tk.next();
    let text = std::str::from_utf8(offset_token).map_err(|_| XrefError::Start)?;
    let offset: usize = text.parse().map_err(|_| XrefError::Start)?;
    if offset >= view.len() {
        return Err(XrefError::Start.into());
    }
    Ok(offset)
}

/// Recursively walks `/Prev` (and `/XRefStm`, for hybrid-reference files),
/// merging each earlier section in with first-entry-wins precedence. Cycle
/// guard: an offset already visited ends the chain instead of looping.
fn walk_chain(view: &ByteView, offset: usize, visited: &mut Vec<usize>) -> Result<(XrefTable, Dictionary)> {
    if visited.contains(&offset) {
        warn!("xref chain cycle detected at offset {offset}, stopping the walk here");
        return Ok((XrefTable::new(), Dictionary::new()));
    }
    visited.push(offset);

    let (mut xref, trailer) = parse_xref_and_trailer(view, offset)?;

    if let Ok(Object::Integer(stream_offset)) = trailer.get(b"XRefStm") {
        if let Ok((hybrid_xref, _)) = walk_chain(view, *stream_offset as usize, visited) {
            xref.merge(hybrid_xref);
        }
    }

    let mut merged_trailer = trailer.clone();
    if let Ok(Object::Integer(prev_offset)) = trailer.get(b"Prev") {
        let prev_offset = *prev_offset;
        if prev_offset < 0 || prev_offset as usize >= view.len() {
            return Err(XrefError::PrevStart.into());
        }
        let (prev_xref, prev_trailer) = walk_chain(view, prev_offset as usize, visited)?;
        xref.merge(prev_xref);
        for (key, value) in prev_trailer.iter() {
            if !merged_trailer.contains_key(key) {
                merged_trailer.set(key.clone(), value.clone());
            }
        }
    }

    Ok((xref, merged_trailer))
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
        buf.extend_from_slice(format!("{:010} 00000 n \n", obj_offset).as_bytes());
        buf.extend_from_slice(b"trailer\n<< /Size 2 /Root 1 0 R >>\n");
        buf.extend_from_slice(format!("startxref\n{}\n%%EOF", xref_offset).as_bytes());
        buf
    }

    #[test]
    fn discovers_header_footer_and_xref() {
        let bytes = minimal_pdf();
        let view = ByteView::new(bytes);
        let discovery = discover(&view).unwrap();
        assert_eq!(discovery.trailer.get(b"Size").unwrap(), &Object::Integer(2));
        let root = discovery.xref.resolve((1, 0)).unwrap();
        assert!(root.as_dict().unwrap().has_type(b"Catalog"));
    }

    #[test]
    fn missing_header_is_an_error() {
        let view = ByteView::new(b"not a pdf at all".to_vec());
        assert!(discover(&view).is_err());
    }

    #[test]
    fn prev_chain_merges_with_first_entry_winning() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        let obj1_offset = buf.len();
        buf.extend_from_slice(b"1 0 obj\n(original)\nendobj\n");
        let xref1_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n");
        buf.extend_from_slice(format!("{:010} 00000 n \n", obj1_offset).as_bytes());
        buf.extend_from_slice(b"trailer\n<< /Size 2 /Root 1 0 R >>\n");
        buf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref1_offset).as_bytes());

        let obj1_new_offset = buf.len();
        buf.extend_from_slice(b"1 0 obj\n(updated)\nendobj\n");
        let xref2_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n");
        buf.extend_from_slice(format!("{:010} 00000 n \n", obj1_new_offset).as_bytes());
        buf.extend_from_slice(format!("trailer\n<< /Size 2 /Root 1 0 R /Prev {} >>\n", xref1_offset).as_bytes());
        buf.extend_from_slice(format!("startxref\n{}\n%%EOF", xref2_offset).as_bytes());

        let view = ByteView::new(buf);
        let discovery = discover(&view).unwrap();
        let obj = discovery.xref.resolve((1, 0)).unwrap();
        assert_eq!(obj.as_str().unwrap(), b"updated");
    }
}
