use crate::error::{FilterError, Result};

/// `ASCIIHexDecode`: two hex digits per byte, `>` terminates early, an odd
/// trailing digit is padded with an implicit `0` (same rule as hex-string
/// literals in the object grammar).
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = data
        .iter()
        .take_while(|&&b| b != b'>')
        .copied()
        .filter(u8::is_ascii_hexdigit)
        .collect();

    let mut out = Vec::with_capacity(digits.len().div_ceil(2));
    let mut chunks = digits.chunks(2);
    for pair in &mut chunks {
        let hi = hex_value(pair[0])?;
        let lo = if pair.len() == 2 { hex_value(pair[1])? } else { 0 };
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// `ASCIIHexEncode`: two uppercase hex digits per byte, terminated by `>`.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for &b in data {
        out.extend_from_slice(format!("{:02X}", b).as_bytes());
    }
    out.push(b'>');
    out
}

fn hex_value(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(FilterError::CorruptStream { filter: "ASCIIHexDecode", reason: "non-hex digit" }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"Hello, World!";
        let encoded = encode(data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn odd_length_pads_low_nibble() {
        assert_eq!(decode(b"A>").unwrap(), vec![0xA0]);
    }

    #[test]
    fn whitespace_is_ignored() {
        assert_eq!(decode(b"48 65 6C 6C 6F>").unwrap(), b"Hello");
    }
}
