use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{FilterError, Result};

/// `FlateDecode`: zlib-wrapped deflate, via `flate2`.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|_| FilterError::CorruptStream { filter: "FlateDecode", reason: "invalid zlib stream" })?;
    Ok(out)
}

/// `FlateEncode`: default compression level, matching what most PDF writers
/// emit.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to an in-memory buffer cannot fail");
    encoder.finish().expect("finishing an in-memory zlib stream cannot fail")
}
