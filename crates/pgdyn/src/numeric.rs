//! NUMERIC binary wire format, without a precision limit.
//!
//! Layout: `ndigits: i16, weight: i16, sign: u16, dscale: u16`, then
//! `ndigits` base-10000 digits (`i16`). The first digit is worth
//! `10000^weight`. `dscale` is the number of decimal digits after the point.

use bytes::{BufMut, BytesMut};
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Sync + Send>;

const SIGN_POS: u16 = 0x0000;
const SIGN_NEG: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_PINF: u16 = 0xD000;
const SIGN_NINF: u16 = 0xF000;
const MAX_DSCALE: usize = 0x3FFF;
const MAX_INT_DIGITS: i64 = 131_072;

fn read_u16(raw: &[u8], at: usize) -> Result<u16, BoxError> {
    raw.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "truncated numeric value".into())
}

/// Decode a binary NUMERIC into its exact text form (`NaN`, `Infinity`
/// and `-Infinity` included).
pub(crate) fn decode(raw: &[u8]) -> Result<String, BoxError> {
    let ndigits = usize::from(read_u16(raw, 0)?);
    let weight = i64::from(read_u16(raw, 2)? as i16);
    let sign = read_u16(raw, 4)?;
    let dscale = usize::from(read_u16(raw, 6)?);

    match sign {
        SIGN_NAN => return Ok("NaN".to_string()),
        SIGN_PINF => return Ok("Infinity".to_string()),
        SIGN_NINF => return Ok("-Infinity".to_string()),
        SIGN_POS | SIGN_NEG => {}
        other => return Err(format!("invalid numeric sign 0x{other:04x}").into()),
    }

    let digits = (0..ndigits)
        .map(|i| -> Result<u16, BoxError> {
            let d = read_u16(raw, 8 + 2 * i)?;
            if d > 9999 {
                return Err(format!("invalid numeric digit {d}").into());
            }
            Ok(d)
        })
        .collect::<Result<Vec<u16>, BoxError>>()?;
    // Digit worth 10000^w sits at index `weight - w`.
    let digit_at = |w: i64| -> u16 {
        usize::try_from(weight - w)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == SIGN_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit_at(weight).to_string());
        for w in (0..weight).rev() {
            out.push_str(&format!("{:04}", digit_at(w)));
        }
    }

    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut w = -1;
        while frac.len() < dscale {
            frac.push_str(&format!("{:04}", digit_at(w)));
            w -= 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }
    Ok(out)
}

/// Encode decimal text (`-12.50`, `1e40`, `NaN`, `Infinity`) as a binary
/// NUMERIC.
pub(crate) fn encode(text: &str, out: &mut BytesMut) -> Result<(), BoxError> {
    let s = text.trim();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let special = match body.to_ascii_lowercase().as_str() {
        "nan" => Some(SIGN_NAN),
        "inf" | "infinity" if negative => Some(SIGN_NINF),
        "inf" | "infinity" => Some(SIGN_PINF),
        _ => None,
    };
    if let Some(sign) = special {
        write_header(out, 0, 0, sign, 0);
        return Ok(());
    }

    let invalid = || -> BoxError { format!("invalid numeric literal '{text}'").into() };
    let out_of_range =
        || -> BoxError { format!("numeric literal '{text}' is out of range").into() };
    let (mantissa, exp) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], body[at + 1..].parse::<i64>().map_err(|_| invalid())?),
        None => (body, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if (int_part.is_empty() && frac_part.is_empty())
        || !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let dscale =
        usize::try_from((frac_part.len() as i64 - exp).max(0)).map_err(|_| invalid())?;
    if dscale > MAX_DSCALE {
        return Err(out_of_range());
    }

    // Decimal digits with the point `point` places from the left, zero
    // padded on both ends to base-10000 group boundaries.
    let mut point = int_part.len() as i64 + exp;
    if point > MAX_INT_DIGITS {
        return Err(out_of_range());
    }
    let mut lead = 0usize;
    if point < 0 {
        lead = usize::try_from(-point).map_err(|_| invalid())?;
        point = 0;
    }
    let align = (4 - point.rem_euclid(4)) % 4;
    lead += align as usize;
    let point = (point + align) as usize;

    let mut decimal: Vec<u8> = std::iter::repeat_n(0u8, lead)
        .chain(int_part.bytes().chain(frac_part.bytes()).map(|b| b - b'0'))
        .collect();
    let len = decimal.len().max(point).div_ceil(4) * 4;
    decimal.resize(len, 0);

    let mut groups: Vec<u16> = decimal
        .chunks(4)
        .map(|c| c.iter().fold(0u16, |acc, d| acc * 10 + u16::from(*d)))
        .collect();
    let mut weight = (point / 4) as i64 - 1;

    let leading = groups.iter().take_while(|g| **g == 0).count();
    groups.drain(..leading);
    weight -= leading as i64;
    while groups.last() == Some(&0) {
        groups.pop();
    }
    if groups.is_empty() {
        weight = 0;
    }

    let weight = i16::try_from(weight).map_err(|_| out_of_range())?;
    let ndigits = u16::try_from(groups.len()).map_err(|_| invalid())?;
    let sign = if negative && !groups.is_empty() {
        SIGN_NEG
    } else {
        SIGN_POS
    };

    write_header(out, ndigits, weight, sign, dscale as u16);
    for g in groups {
        out.put_u16(g);
    }
    Ok(())
}

fn write_header(out: &mut BytesMut, ndigits: u16, weight: i16, sign: u16, dscale: u16) {
    out.put_u16(ndigits);
    out.put_i16(weight);
    out.put_u16(sign);
    out.put_u16(dscale);
}
