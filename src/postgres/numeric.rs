//! Binary `NUMERIC` wire format.
//!
//! The server sends base-10000 digit groups with a weight (power of the first group), a sign
//! word and a display scale. Values cross this module as exact decimal text.

use std::error::Error;
use std::iter;

use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes::{BufMut, BytesMut};

const POSITIVE: u16 = 0x0000;
const NEGATIVE: u16 = 0x4000;
const NAN: u16 = 0xC000;
const POS_INFINITY: u16 = 0xD000;
const NEG_INFINITY: u16 = 0xF000;

type BoxError = Box<dyn Error + Sync + Send>;

/// A `NUMERIC` as decimal text, e.g. `-12.50`, `NaN` or `Infinity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PgNumeric(pub(super) String);

impl PgNumeric {
    pub(super) fn to_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }
}

fn read_u16(raw: &[u8], offset: usize) -> Result<u16, BoxError> {
    raw.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "truncated numeric value".into())
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let ndigits = usize::from(read_u16(raw, 0)?);
        let weight = i32::from(i16::from_be_bytes(read_u16(raw, 2)?.to_be_bytes()));
        let sign = read_u16(raw, 4)?;
        let dscale = usize::from(read_u16(raw, 6)?);
        match sign {
            NAN => return Ok(Self("NaN".into())),
            POS_INFINITY => return Ok(Self("Infinity".into())),
            NEG_INFINITY => return Ok(Self("-Infinity".into())),
            POSITIVE | NEGATIVE => {}
            other => return Err(format!("invalid numeric sign {other:#06x}").into()),
        }
        let digits = (0..ndigits)
            .map(|i| read_u16(raw, 8 + 2 * i))
            .collect::<Result<Vec<_>, _>>()?;

        // Group holding 10000^power, zero outside the transmitted digits.
        let group = |power: i32| -> u16 {
            usize::try_from(weight - power)
                .ok()
                .and_then(|i| digits.get(i).copied())
                .unwrap_or(0)
        };

        let mut text = String::new();
        if sign == NEGATIVE && !digits.is_empty() {
            text.push('-');
        }
        if weight < 0 {
            text.push('0');
        } else {
            text.push_str(&group(weight).to_string());
            for power in (0..weight).rev() {
                text.push_str(&format!("{:04}", group(power)));
            }
        }
        if dscale > 0 {
            let mut frac = String::with_capacity(dscale + 4);
            let mut power = -1;
            while frac.len() < dscale {
                frac.push_str(&format!("{:04}", group(power)));
                power -= 1;
            }
            frac.truncate(dscale);
            text.push('.');
            text.push_str(&frac);
        }
        Ok(Self(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

impl ToSql for PgNumeric {
    fn to_sql(&self, _: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let text = self.0.trim();
        let special = match text.to_ascii_lowercase().as_str() {
            "nan" => Some(NAN),
            "inf" | "infinity" | "+inf" | "+infinity" => Some(POS_INFINITY),
            "-inf" | "-infinity" => Some(NEG_INFINITY),
            _ => None,
        };
        if let Some(sign) = special {
            out.put_u16(0);
            out.put_i16(0);
            out.put_u16(sign);
            out.put_u16(0);
            return Ok(IsNull::No);
        }

        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let well_formed = !(int_part.is_empty() && frac_part.is_empty())
            && int_part
                .bytes()
                .chain(frac_part.bytes())
                .all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(format!("invalid numeric literal {:?}", self.0).into());
        }

        let int_part = int_part.trim_start_matches('0');
        let dscale = u16::try_from(frac_part.len())?;
        let int_pad = (4 - int_part.len() % 4) % 4;
        let frac_pad = (4 - frac_part.len() % 4) % 4;
        let padded: Vec<u8> = iter::repeat_n(b'0', int_pad)
            .chain(int_part.bytes())
            .chain(frac_part.bytes())
            .chain(iter::repeat_n(b'0', frac_pad))
            .collect();
        let mut groups: Vec<u16> = padded
            .chunks(4)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0_u16, |acc, d| acc * 10 + u16::from(d - b'0'))
            })
            .collect();

        let mut weight = i32::try_from((int_part.len() + int_pad) / 4)? - 1;
        let leading = groups.iter().take_while(|&&g| g == 0).count();
        groups.drain(..leading);
        weight -= i32::try_from(leading)?;
        while groups.last() == Some(&0) {
            groups.pop();
        }
        if groups.is_empty() {
            weight = 0;
        }

        out.put_u16(u16::try_from(groups.len())?);
        out.put_i16(i16::try_from(weight)?);
        out.put_u16(if negative && !groups.is_empty() {
            NEGATIVE
        } else {
            POSITIVE
        });
        out.put_u16(dscale);
        for g in groups {
            out.put_u16(g);
        }
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(text: &str) -> Vec<u8> {
        let mut out = BytesMut::new();
        PgNumeric(text.into())
            .to_sql(&Type::NUMERIC, &mut out)
            .unwrap();
        out.to_vec()
    }

    fn words(raw: &[u8]) -> Vec<u16> {
        raw.chunks(2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .collect()
    }

    fn back(raw: &[u8]) -> String {
        PgNumeric::from_sql(&Type::NUMERIC, raw).unwrap().0
    }

    #[test]
    fn encodes_digit_groups_and_weight() {
        // ndigits, weight, sign, dscale, digits...
        assert_eq!(words(&wire("1.5")), vec![2, 0, POSITIVE, 1, 1, 5000]);
        assert_eq!(words(&wire("12345")), vec![2, 1, POSITIVE, 0, 1, 2345]);
        assert_eq!(words(&wire("-0.00001")), vec![1, 0xFFFE, NEGATIVE, 5, 1000]);
        assert_eq!(words(&wire("0.00")), vec![0, 0, POSITIVE, 2]);
        assert_eq!(words(&wire("NaN")), vec![0, 0, NAN, 0]);
    }

    #[test]
    fn decodes_server_values() {
        // AVG over 1, 2 with the server's default display scale.
        let avg = [0, 2, 0, 0, 0, 0, 0, 16, 0, 1, 0x13, 0x88];
        assert_eq!(back(&avg), "1.5000000000000000");
        assert_eq!(back(&wire("-12.50")), "-12.50");
        assert_eq!(back(&wire("100000000")), "100000000");
        assert_eq!(back(&wire("-0.00001")), "-0.00001");
        assert_eq!(back(&wire("0")), "0");
        assert!((PgNumeric(back(&avg)).to_f64() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_input() {
        let mut out = BytesMut::new();
        assert!(PgNumeric("1.2.3".into()).to_sql(&Type::NUMERIC, &mut out).is_err());
        assert!(PgNumeric("-".into()).to_sql(&Type::NUMERIC, &mut out).is_err());
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &[0, 1, 0]).is_err());
    }
}
