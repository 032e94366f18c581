use crate::error::{FilterError, Result};

const CLEAR: u16 = 256;
const EOD: u16 = 257;
const FIRST_CODE: u16 = 258;
const MAX_CODE_WIDTH: u8 = 12;

/// `LZWDecode`. `early_change` (default `1`) widens the code reader one
/// entry before the table actually needs the extra bit, matching the
/// historical off-by-one baked into the PDF spec and replicated here rather
/// than "fixed", since real producers rely on it.
pub fn decode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(data);
    let mut table: Vec<Vec<u8>> = initial_table();
    let mut width: u8 = 9;
    let mut out = Vec::new();
    let mut prev: Option<Vec<u8>> = None;

    loop {
        let Some(code) = reader.read(width) else {
            break;
        };
        if code == CLEAR {
            table = initial_table();
            width = 9;
            prev = None;
            continue;
        }
        if code == EOD {
            break;
        }

        let entry = if (code as usize) < table.len() {
            table[code as usize].clone()
        } else if code as usize == table.len() {
            let Some(prev) = &prev else {
                return Err(FilterError::InvalidLzwCode { code, dict_size: table.len() as u16 }.into());
            };
            let mut entry = prev.clone();
            entry.push(prev[0]);
            entry
        } else {
            return Err(FilterError::InvalidLzwCode { code, dict_size: table.len() as u16 }.into());
        };

        out.extend_from_slice(&entry);

        if let Some(prev) = prev {
            let mut new_entry = prev;
            new_entry.push(entry[0]);
            table.push(new_entry);
        }
        prev = Some(entry);

        let threshold = if early_change { table.len() + 1 } else { table.len() };
        width = code_width(threshold);
    }
    Ok(out)
}

/// `LZWEncode`, straightforward adaptive-dictionary encoder emitting the
/// same `early_change` code widths the decoder expects.
pub fn encode(data: &[u8], early_change: bool) -> Vec<u8> {
    let mut writer = BitWriter::new();
    let mut table: std::collections::HashMap<Vec<u8>, u16> = (0..256u16).map(|b| (vec![b as u8], b)).collect();
    let mut next_code = FIRST_CODE;
    let mut width: u8 = 9;
    writer.write(CLEAR, width);

    let mut current: Vec<u8> = Vec::new();
    for &byte in data {
        let mut extended = current.clone();
        extended.push(byte);
        if table.contains_key(&extended) {
            current = extended;
        } else {
            let code = table[&current];
            writer.write(code, width);
            if next_code < 4096 {
                table.insert(extended, next_code);
                next_code += 1;
                let threshold = if early_change { next_code + 1 } else { next_code };
                width = code_width(threshold as usize);
            } else {
                writer.write(CLEAR, width);
                table = (0..256u16).map(|b| (vec![b as u8], b)).collect();
                next_code = FIRST_CODE;
                width = 9;
            }
            current = vec![byte];
        }
    }
    if !current.is_empty() {
        writer.write(table[&current], width);
    }
    writer.write(EOD, width);
    writer.finish()
}

fn initial_table() -> Vec<Vec<u8>> {
    let mut table: Vec<Vec<u8>> = (0..256).map(|b| vec![b as u8]).collect();
    table.push(vec![]); // 256: Clear
    table.push(vec![]); // 257: EOD
    table
}

fn code_width(table_len: usize) -> u8 {
    match table_len {
        0..=511 => 9,
        512..=1023 => 10,
        1024..=2047 => 11,
        _ => MAX_CODE_WIDTH,
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit_pos: 0 }
    }

    fn read(&mut self, width: u8) -> Option<u16> {
        let width = width as usize;
        if self.bit_pos + width > self.data.len() * 8 {
            return None;
        }
        let mut value: u16 = 0;
        for _ in 0..width {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            value = (value << 1) | bit as u16;
            self.bit_pos += 1;
        }
        Some(value)
    }
}

struct BitWriter {
    bytes: Vec<u8>,
    bit_buffer: u32,
    bit_count: u8,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter { bytes: Vec::new(), bit_buffer: 0, bit_count: 0 }
    }

    fn write(&mut self, code: u16, width: u8) {
        self.bit_buffer = (self.bit_buffer << width) | code as u32;
        self.bit_count += width;
        while self.bit_count >= 8 {
            let shift = self.bit_count - 8;
            self.bytes.push(((self.bit_buffer >> shift) & 0xFF) as u8);
            self.bit_count -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            let shift = 8 - self.bit_count;
            self.bytes.push(((self.bit_buffer << shift) & 0xFF) as u8);
        }
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_repeating_pattern() {
        let data = b"aaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbccccccccccccccc".to_vec();
        let encoded = encode(&data, true);
        let decoded = decode(&encoded, true).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trip_empty() {
        assert_eq!(decode(&encode(b"", true), true).unwrap(), b"");
    }

    #[test]
    fn decode_unknown_code_is_fatal() {
        // width-9 stream containing a first code of 300 (> table size 258) is invalid.
        let mut writer = BitWriter::new();
        writer.write(300, 9);
        writer.write(EOD, 9);
        let bytes = writer.finish();
        assert!(decode(&bytes, true).is_err());
    }
}
