//! NEWDECIMAL 바이너리 디코딩
//!
//! 정수부와 소수부를 각각 9자리 단위(4 바이트 워드)로 나누고,
//! 남는 자릿수는 `DIG2BYTES` 크기의 그룹으로 저장합니다.
//! 정렬을 위해 첫 바이트의 최상위 비트가 반전되어 있고, 음수는 전체 비트가 반전됩니다.

use crate::error::{CdcError, Result};
use crate::packed_int::read_bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

const DIGITS_PER_WORD: usize = 9;
const WORD_SIZE: usize = 4;
const DIG2BYTES: [usize; DIGITS_PER_WORD + 1] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];
const POW10: [u32; DIGITS_PER_WORD + 1] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

pub const MAX_PRECISION: u8 = 65;
pub const MAX_SCALE: u8 = 30;

/// 정확한 고정 소수점 값 (10진 문자열 표현)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decimal {
    text: String,
    precision: u8,
    scale: u8,
}

impl Decimal {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.text.starts_with('-')
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn validate(precision: u8, scale: u8) -> Result<()> {
    if precision == 0 || precision > MAX_PRECISION || scale > MAX_SCALE || scale > precision {
        return Err(CdcError::InvalidMetadata(format!(
            "invalid NEWDECIMAL({}, {})",
            precision, scale
        )));
    }
    Ok(())
}

/// 자릿수에 대한 (워드 수, 남는 자릿수)
fn split_digits(digits: usize) -> (usize, usize) {
    (digits / DIGITS_PER_WORD, digits % DIGITS_PER_WORD)
}

/// NEWDECIMAL(precision, scale)의 바이너리 크기
pub fn binary_size(precision: u8, scale: u8) -> Result<usize> {
    validate(precision, scale)?;
    let (int_words, int_leftover) = split_digits((precision - scale) as usize);
    let (frac_words, frac_leftover) = split_digits(scale as usize);
    Ok(int_words * WORD_SIZE
        + DIG2BYTES[int_leftover]
        + frac_words * WORD_SIZE
        + DIG2BYTES[frac_leftover])
}

/// big-endian 그룹 하나를 읽고 자릿수 범위를 검증
fn read_group(bytes: &[u8], offset: &mut usize, digits: usize) -> Result<u32> {
    let width = DIG2BYTES[digits];
    let value = bytes[*offset..*offset + width]
        .iter()
        .fold(0u32, |acc, b| (acc << 8) | *b as u32);
    *offset += width;
    if value >= POW10[digits] {
        return Err(CdcError::InvalidValue(format!(
            "decimal group {} exceeds {} digits",
            value, digits
        )));
    }
    Ok(value)
}

/// NEWDECIMAL 읽기
pub fn read_decimal(cursor: &mut Cursor<&[u8]>, precision: u8, scale: u8) -> Result<Decimal> {
    let size = binary_size(precision, scale)?;
    let mut bytes = read_bytes(cursor, size)?;

    let negative = bytes[0] & 0x80 == 0;
    bytes[0] ^= 0x80;
    if negative {
        for b in bytes.iter_mut() {
            *b = !*b;
        }
    }

    let (int_words, int_leftover) = split_digits((precision - scale) as usize);
    let (frac_words, frac_leftover) = split_digits(scale as usize);
    let mut offset = 0;

    let mut int_part = String::new();
    if int_leftover > 0 {
        let value = read_group(&bytes, &mut offset, int_leftover)?;
        int_part.push_str(&format!("{:0width$}", value, width = int_leftover));
    }
    for _ in 0..int_words {
        let value = read_group(&bytes, &mut offset, DIGITS_PER_WORD)?;
        int_part.push_str(&format!("{:09}", value));
    }
    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };

    let mut frac_part = String::new();
    for _ in 0..frac_words {
        let value = read_group(&bytes, &mut offset, DIGITS_PER_WORD)?;
        frac_part.push_str(&format!("{:09}", value));
    }
    if frac_leftover > 0 {
        let value = read_group(&bytes, &mut offset, frac_leftover)?;
        frac_part.push_str(&format!("{:0width$}", value, width = frac_leftover));
    }

    let is_zero = int_part == "0" && frac_part.bytes().all(|b| b == b'0');
    let mut text = String::with_capacity(int_part.len() + frac_part.len() + 2);
    if negative && !is_zero {
        text.push('-');
    }
    text.push_str(int_part);
    if !frac_part.is_empty() {
        text.push('.');
        text.push_str(&frac_part);
    }

    Ok(Decimal {
        text,
        precision,
        scale,
    })
}
