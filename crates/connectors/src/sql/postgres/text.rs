//! Raw decoding of PostgreSQL NUMERIC and JSON values into the text the
//! server would print for them.

use std::error::Error;
use tokio_postgres::types::{FromSql, Type};

type BoxError = Box<dyn Error + Sync + Send>;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;
/// Decimal digits per base-10000 digit on the wire.
const DEC_DIGITS: usize = 4;
const JSONB_VERSION: u8 = 1;

/// A NUMERIC cell at its full precision and display scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgNumericText(pub String);

impl<'a> FromSql<'a> for PgNumericText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        if raw.len() < 8 {
            return Err(format!("invalid numeric length {}", raw.len()).into());
        }
        let ndigits = i16::from_be_bytes([raw[0], raw[1]]);
        let weight = i16::from_be_bytes([raw[2], raw[3]]);
        let sign = u16::from_be_bytes([raw[4], raw[5]]);
        let dscale = u16::from_be_bytes([raw[6], raw[7]]);

        let negative = match sign {
            NUMERIC_NAN => return Ok(PgNumericText("NaN".to_string())),
            NUMERIC_PINF => return Ok(PgNumericText("Infinity".to_string())),
            NUMERIC_NINF => return Ok(PgNumericText("-Infinity".to_string())),
            NUMERIC_POS => false,
            NUMERIC_NEG => true,
            other => return Err(format!("invalid numeric sign {other:#06x}").into()),
        };

        let ndigits = usize::try_from(ndigits).map_err(|_| format!("invalid numeric digit count {ndigits}"))?;
        let body = &raw[8..];
        if body.len() != ndigits * 2 {
            return Err(format!("numeric expects {ndigits} digits, got {} bytes", body.len()).into());
        }
        let digits = body
            .chunks_exact(2)
            .map(|pair| {
                let digit = i16::from_be_bytes([pair[0], pair[1]]);
                if (0..10_000).contains(&digit) {
                    Ok(digit)
                } else {
                    Err(format!("invalid numeric digit {digit}"))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PgNumericText(render_numeric(&digits, weight, negative, dscale)))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// `weight` is the base-10000 exponent of the first digit; digits missing on
/// either side of the stored ones are zero.
fn render_numeric(digits: &[i16], weight: i16, negative: bool, dscale: u16) -> String {
    let digit_at = |position: i32| -> i16 {
        usize::try_from(position)
            .ok()
            .and_then(|index| digits.get(index).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if negative {
        text.push('-');
    }

    let weight = i32::from(weight);
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit_at(0).to_string());
        for position in 1..=weight {
            text.push_str(&format!("{:04}", digit_at(position)));
        }
    }

    if dscale > 0 {
        let dscale = usize::from(dscale);
        let mut fraction = String::with_capacity(dscale + DEC_DIGITS);
        let mut position = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit_at(position)));
            position += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }
    text
}

/// A `json` or `jsonb` cell exactly as the server stores it. `json` keeps the
/// original key order and whitespace; `jsonb` is already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgJsonText(pub String);

impl<'a> FromSql<'a> for PgJsonText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let body = if *ty == Type::JSONB {
            match raw.split_first() {
                Some((&JSONB_VERSION, rest)) => rest,
                Some((version, _)) => return Err(format!("unsupported jsonb version {version}").into()),
                None => return Err("empty jsonb value".into()),
            }
        } else {
            raw
        };
        Ok(PgJsonText(std::str::from_utf8(body)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::JSON | Type::JSONB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(ndigits: i16, weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&ndigits.to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for digit in digits {
            raw.extend_from_slice(&digit.to_be_bytes());
        }
        raw
    }

    fn decode(raw: &[u8]) -> String {
        PgNumericText::from_sql(&Type::NUMERIC, raw).unwrap().0
    }

    #[test]
    fn values_beyond_native_decimals_keep_every_digit() {
        // 1e32 is stored as a single digit with weight 8
        assert_eq!(
            decode(&numeric(1, 8, NUMERIC_POS, 0, &[1])),
            format!("1{}", "0".repeat(32))
        );
        // 30 fractional digits
        let raw = numeric(8, 0, NUMERIC_POS, 30, &[3, 1415, 9265, 3589, 7932, 3846, 2643, 3832]);
        assert_eq!(decode(&raw), "3.141592653589793238462643383200");
    }

    #[test]
    fn special_values_render_as_keywords() {
        assert_eq!(decode(&numeric(0, 0, NUMERIC_NAN, 0, &[])), "NaN");
        assert_eq!(decode(&numeric(0, 0, NUMERIC_PINF, 0, &[])), "Infinity");
        assert_eq!(decode(&numeric(0, 0, NUMERIC_NINF, 0, &[])), "-Infinity");
    }

    #[test]
    fn display_scale_is_kept() {
        assert_eq!(decode(&numeric(2, 0, NUMERIC_POS, 2, &[12, 5000])), "12.50");
        assert_eq!(decode(&numeric(0, 0, NUMERIC_POS, 3, &[])), "0.000");
        assert_eq!(decode(&numeric(2, 0, NUMERIC_NEG, 1, &[1, 5000])), "-1.5");
        assert_eq!(decode(&numeric(1, -1, NUMERIC_NEG, 4, &[12])), "-0.0012");
        assert_eq!(decode(&numeric(1, -2, NUMERIC_POS, 8, &[7])), "0.00000007");
        assert_eq!(decode(&numeric(2, 1, NUMERIC_POS, 0, &[1, 2])), "10002");
    }

    #[test]
    fn malformed_numerics_are_errors() {
        assert!(PgNumericText::from_sql(&Type::NUMERIC, &[0, 1]).is_err());
        assert!(PgNumericText::from_sql(&Type::NUMERIC, &numeric(2, 0, NUMERIC_POS, 0, &[1])).is_err());
        assert!(PgNumericText::from_sql(&Type::NUMERIC, &numeric(1, 0, NUMERIC_POS, 0, &[10_000])).is_err());
        assert!(PgNumericText::from_sql(&Type::NUMERIC, &numeric(0, 0, 0x1234, 0, &[])).is_err());
    }

    #[test]
    fn json_keeps_the_stored_text() {
        let raw = br#"{"b": 1,  "a": [2, 3]}"#;
        let json = PgJsonText::from_sql(&Type::JSON, raw).unwrap();
        assert_eq!(json.0, r#"{"b": 1,  "a": [2, 3]}"#);
    }

    #[test]
    fn jsonb_strips_the_version_byte() {
        let mut raw = vec![JSONB_VERSION];
        raw.extend_from_slice(br#"{"a": 1, "b": 2}"#);
        let json = PgJsonText::from_sql(&Type::JSONB, &raw).unwrap();
        assert_eq!(json.0, r#"{"a": 1, "b": 2}"#);

        assert!(PgJsonText::from_sql(&Type::JSONB, b"\x02{}").is_err());
        assert!(PgJsonText::from_sql(&Type::JSONB, b"").is_err());
    }
}
