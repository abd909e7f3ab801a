//! Allocation-free numeric field decoding.
//!
//! Values are rebuilt digit by digit with multiply-add. Decimals get a fixed
//! `DECIMAL_EPSILON` added before the sign is applied so that accumulated
//! rounding error cannot leave a value one unit below its decimal text;
//! downstream bucketing floors prices and relies on this.

/// Added to every decoded decimal magnitude.
pub const DECIMAL_EPSILON: f64 = 1e-9;

/// Decode a signed integer starting at `pos`.
///
/// Returns the value and the first unconsumed position. Stops at the first
/// non-digit. If no digit follows the optional sign the value is 0.
#[inline]
pub fn decode_i64(bytes: &[u8], mut pos: usize) -> (i64, usize) {
    let neg = bytes.get(pos) == Some(&b'-');
    if neg {
        pos += 1;
    }

    let mut val: i64 = 0;
    while let Some(&b) = bytes.get(pos) {
        if !b.is_ascii_digit() {
            break;
        }
        val = val.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
        pos += 1;
    }

    (if neg { val.wrapping_neg() } else { val }, pos)
}

/// Decode a signed fixed-point decimal starting at `pos`.
///
/// The fractional part is optional. Returns the value and the first
/// unconsumed position.
#[inline]
pub fn decode_f64(bytes: &[u8], mut pos: usize) -> (f64, usize) {
    let neg = bytes.get(pos) == Some(&b'-');
    if neg {
        pos += 1;
    }

    let mut val = 0.0;
    while let Some(&b) = bytes.get(pos) {
        if !b.is_ascii_digit() {
            break;
        }
        val = val * 10.0 + f64::from(b - b'0');
        pos += 1;
    }

    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let mut factor = 0.1;
        while let Some(&b) = bytes.get(pos) {
            if !b.is_ascii_digit() {
                break;
            }
            val += f64::from(b - b'0') * factor;
            factor *= 0.1;
            pos += 1;
        }
    }

    val += DECIMAL_EPSILON;
    (if neg { -val } else { val }, pos)
}

/// Number of ASCII digits in `bytes[start..end]`.
#[inline]
pub(crate) fn digit_count(bytes: &[u8], start: usize, end: usize) -> usize {
    bytes[start..end].iter().filter(|b| b.is_ascii_digit()).count()
}
