/// PNG and TIFF row predictors applied after `FlateDecode`/`LZWDecode`, per
/// `/DecodeParms` (`Predictor`, `Colors`, `BitsPerComponent`, `Columns`).
/// `Predictor` 1 is the identity (no predictor).
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: i64,
    pub bits_per_component: i64,
    pub columns: i64,
}

impl Default for PredictorParams {
    fn default() -> Self {
        PredictorParams { predictor: 1, colors: 1, bits_per_component: 8, columns: 1 }
    }
}

pub fn decode(data: &[u8], params: &PredictorParams) -> Vec<u8> {
    if params.predictor <= 1 {
        return data.to_vec();
    }
    let bpp = ((params.colors * params.bits_per_component).div_ceil(8)).max(1) as usize;
    let row_bytes = (params.colors * params.bits_per_component * params.columns).div_ceil(8) as usize;

    if params.predictor == 2 {
        return tiff_predictor_decode(data, row_bytes, bpp);
    }
    png_predictor_decode(data, row_bytes, bpp)
}

fn tiff_predictor_decode(data: &[u8], row_bytes: usize, bpp: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_bytes) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    out
}

fn png_predictor_decode(data: &[u8], row_bytes: usize, bpp: usize) -> Vec<u8> {
    let stride = row_bytes + 1; // leading tag byte per row
    let mut out = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];

    for chunk in data.chunks(stride) {
        if chunk.is_empty() {
            break;
        }
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_bytes, 0);

        for i in 0..row.len() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
            let recon = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => 0,
            };
            row[i] = row[i].wrapping_add(recon);
        }
        out.extend_from_slice(&row);
        prev_row = row;
    }
    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_predictor_is_one() {
        let params = PredictorParams::default();
        assert_eq!(decode(b"abc", &params), b"abc");
    }

    #[test]
    fn png_sub_filter_accumulates_left() {
        let params = PredictorParams { predictor: 15, colors: 1, bits_per_component: 8, columns: 3 };
        let row = [1u8, 10, 1, 1]; // tag=1 (Sub), then 10, +1, +1
        let decoded = decode(&row, &params);
        assert_eq!(decoded, vec![10, 11, 12]);
    }

    #[test]
    fn tiff_predictor_accumulates_per_sample() {
        let params = PredictorParams { predictor: 2, colors: 1, bits_per_component: 8, columns: 3 };
        let row = [10u8, 1, 1];
        let decoded = decode(&row, &params);
        assert_eq!(decoded, vec![10, 11, 12]);
    }
}
