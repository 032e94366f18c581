use crate::error::{FilterError, Result};

/// `RunLengthDecode`: each run is a length byte followed by its payload.
/// `0..=127` copies the next `n+1` literal bytes; `129..=255` repeats the
/// single following byte `257-n` times; `128` is the EOD marker.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            0..=127 => {
                let count = length as usize + 1;
                if i + count > data.len() {
                    return Err(FilterError::CorruptStream { filter: "RunLengthDecode", reason: "literal run truncated" }.into());
                }
                out.extend_from_slice(&data[i..i + count]);
                i += count;
            }
            128 => break,
            _ => {
                let Some(&byte) = data.get(i) else {
                    return Err(FilterError::CorruptStream { filter: "RunLengthDecode", reason: "repeat run truncated" }.into());
                };
                let count = 257 - length as usize;
                out.extend(std::iter::repeat_n(byte, count));
                i += 1;
            }
        }
    }
    Ok(out)
}

/// `RunLengthEncode`: a simple literal/repeat-run encoder. Produces valid
/// output for any input; doesn't try to match a particular producer's exact
/// run boundaries, only the decode contract above.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let run_len = data[i..].iter().take_while(|&&b| b == data[i]).count().min(128);
        if run_len >= 2 {
            out.push((257 - run_len) as u8);
            out.push(data[i]);
            i += run_len;
            continue;
        }
        let start = i;
        while i < data.len() {
            let next_run = data[i..].iter().take_while(|&&b| b == data[i]).count();
            if next_run >= 2 || i - start >= 128 {
                break;
            }
            i += 1;
        }
        let literal = &data[start..i];
        out.push((literal.len() - 1) as u8);
        out.extend_from_slice(literal);
    }
    out.push(128);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_literal_run() {
        assert_eq!(decode(&[2, b'a', b'b', b'c', 128]).unwrap(), b"abc");
    }

    #[test]
    fn decode_repeat_run() {
        assert_eq!(decode(&[253, b'x', 128]).unwrap(), b"xxxx");
    }

    #[test]
    fn round_trip_mixed_content() {
        let data = b"aaaaabbbbbbbbcdefg".to_vec();
        let encoded = encode(&data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn round_trip_empty() {
        assert_eq!(decode(&encode(b"")).unwrap(), b"");
    }
}
