use crate::error::{FilterError, Result};

/// `ASCII85Decode`: base-85 groups of 5 ASCII chars to 4 bytes, `z` as a
/// shorthand for an all-zero group, `~>` terminates the stream.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut filtered: Vec<u8> = Vec::with_capacity(data.len());
    for &b in data {
        if b == b'~' {
            break;
        }
        if !b.is_ascii_whitespace() {
            filtered.push(b);
        }
    }

    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut count = 0;
    for &b in &filtered {
        if b == b'z' && count == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            return Err(FilterError::CorruptStream { filter: "ASCII85Decode", reason: "byte out of range" }.into());
        }
        group[count] = b - b'!';
        count += 1;
        if count == 5 {
            out.extend_from_slice(&decode_group(&group, 5));
            count = 0;
        }
    }
    if count > 0 {
        for slot in group.iter_mut().skip(count) {
            *slot = 84; // pad with 'u'
        }
        let decoded = decode_group(&group, count);
        out.extend_from_slice(&decoded);
    }
    Ok(out)
}

fn decode_group(group: &[u8; 5], used: usize) -> Vec<u8> {
    let mut value: u32 = 0;
    for &digit in group {
        value = value.wrapping_mul(85).wrapping_add(digit as u32);
    }
    let bytes = value.to_be_bytes();
    bytes[..used.saturating_sub(1).min(4)].to_vec()
}

/// `ASCII85Encode`: groups of 4 bytes to 5 base-85 chars, `z` shorthand for
/// an all-zero group, trailing partial group padded then truncated, `~>`
/// terminator.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 5 / 4 + 2);
    for chunk in data.chunks(4) {
        if chunk.len() == 4 && chunk == [0, 0, 0, 0] {
            out.push(b'z');
            continue;
        }
        let mut buf = [0u8; 4];
        buf[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(buf);
        let mut digits = [0u8; 5];
        for slot in digits.iter_mut().rev() {
            *slot = (value % 85) as u8;
            value /= 85;
        }
        out.extend(digits.iter().take(chunk.len() + 1).map(|&d| d + b'!'));
    }
    out.extend_from_slice(b"~>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"Man is distinguished";
        let encoded = encode(data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn all_zero_group_uses_z_shorthand() {
        let encoded = encode(&[0, 0, 0, 0, 1]);
        assert!(encoded.starts_with(b"z"));
        assert_eq!(decode(&encoded).unwrap(), vec![0, 0, 0, 0, 1]);
    }

    #[test]
    fn empty_input_round_trips() {
        assert_eq!(decode(&encode(b"")).unwrap(), b"");
    }

    #[test]
    fn trailing_single_digit_group_emits_nothing() {
        // A final group with only one leftover base-85 digit carries no
        // complete byte; padding it up to a 5-digit group and decoding
        // must not manufacture output.
        assert_eq!(decode_group(&[0, 84, 84, 84, 84], 1), Vec::<u8>::new());
    }
}
