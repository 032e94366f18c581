mod ascii85;
mod ascii_hex;
mod flate;
mod lzw;
mod predictor;
mod run_length;

use log::trace;

use crate::dictionary::Dictionary;
use crate::error::{FilterError, Result};
use crate::object::{Object, Stream};

/// Normalizes the abbreviated inline-image filter names to their full form
/// before dispatch.
fn canonical_name(name: &[u8]) -> &[u8] {
    match name {
        b"AHx" => b"ASCIIHexDecode",
        b"A85" => b"ASCII85Decode",
        b"LZW" => b"LZWDecode",
        b"Fl" => b"FlateDecode",
        b"RL" => b"RunLengthDecode",
        other => other,
    }
}

/// Runs a stream's content through every filter named in `/Filter`, in
/// order, applying the matching `/DecodeParms` entry (or defaults) to each.
/// `/Filter` and `/DecodeParms` are padded to the same length so a stream
/// with N filters and fewer than N param dicts still decodes.
pub fn decode_stream(stream: &Stream) -> Result<Vec<u8>> {
    let filters = stream.filters();
    let mut params = stream.decode_params();
    if params.len() < filters.len() {
        trace!(
            "stream has {} filter(s) but only {} /DecodeParms entries, padding with defaults",
            filters.len(),
            params.len()
        );
    }
    params.resize(filters.len(), Dictionary::new());

    let mut data = stream.content.clone();
    for (name, parms) in filters.iter().zip(params.iter()) {
        data = decode_one(canonical_name(name), &data, parms)?;
    }
    Ok(data)
}

fn decode_one(name: &[u8], data: &[u8], parms: &Dictionary) -> Result<Vec<u8>> {
    let early_change = parms.get(b"EarlyChange").and_then(Object::as_i64).unwrap_or(1) != 0;
    let decoded = match name {
        b"ASCIIHexDecode" => ascii_hex::decode(data)?,
        b"ASCII85Decode" => ascii85::decode(data)?,
        b"LZWDecode" => lzw::decode(data, early_change)?,
        b"FlateDecode" => flate::decode(data)?,
        b"RunLengthDecode" => run_length::decode(data)?,
        other => {
            return Err(FilterError::UnknownFilter(String::from_utf8_lossy(other).into_owned()).into());
        }
    };

    if matches!(name, b"LZWDecode" | b"FlateDecode") {
        let pred_params = predictor::PredictorParams {
            predictor: parms.get(b"Predictor").and_then(Object::as_i64).unwrap_or(1),
            colors: parms.get(b"Colors").and_then(Object::as_i64).unwrap_or(1),
            bits_per_component: parms.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8),
            columns: parms.get(b"Columns").and_then(Object::as_i64).unwrap_or(1),
        };
        return Ok(predictor::decode(&decoded, &pred_params));
    }
    Ok(decoded)
}

/// Encodes `data` with a single named filter, for callers constructing new
/// streams. Unlike decode, this never applies a predictor.
pub fn encode_with(name: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match canonical_name(name) {
        b"ASCIIHexDecode" => Ok(ascii_hex::encode(data)),
        b"ASCII85Decode" => Ok(ascii85::encode(data)),
        b"LZWDecode" => Ok(lzw::encode(data, true)),
        b"FlateDecode" => Ok(flate::encode(data)),
        b"RunLengthDecode" => Ok(run_length::encode(data)),
        other => Err(FilterError::UnknownFilter(String::from_utf8_lossy(other).into_owned()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StringFormat;

    #[test]
    fn decode_stream_applies_filters_in_order() {
        let raw = b"Hello, filters!".to_vec();
        let flated = flate::encode(&raw);
        let mut dict = Dictionary::new();
        dict.set(b"Filter".to_vec(), Object::Name(b"FlateDecode".to_vec()));
        let stream = Stream::new(dict, flated);
        assert_eq!(decode_stream(&stream).unwrap(), raw);
    }

    #[test]
    fn decode_stream_chains_multiple_filters() {
        let raw = b"chained round trip".to_vec();
        let hexed = ascii_hex::encode(&raw);
        let flated = flate::encode(&hexed);
        let mut dict = Dictionary::new();
        dict.set(
            b"Filter".to_vec(),
            Object::Array(vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"ASCIIHexDecode".to_vec())]),
        );
        let stream = Stream::new(dict, flated);
        assert_eq!(decode_stream(&stream).unwrap(), raw);
    }

    #[test]
    fn unknown_filter_is_an_error() {
        let mut dict = Dictionary::new();
        dict.set(b"Filter".to_vec(), Object::Name(b"Bogus".to_vec()));
        let stream = Stream::new(dict, b"x".to_vec());
        assert!(decode_stream(&stream).is_err());
    }

    #[test]
    fn no_filter_returns_content_unchanged() {
        let stream = Stream::new(Dictionary::new(), b"raw bytes".to_vec());
        assert_eq!(decode_stream(&stream).unwrap(), b"raw bytes");
    }

    #[test]
    fn literal_string_is_untouched_by_filter_module() {
        // sanity: filter module must not assume anything about other Object variants
        let s = Object::String(b"x".to_vec(), StringFormat::Literal);
        assert!(s.as_str().is_ok());
    }
}
