//! Packed integer (Length-Coded Binary) 디코딩
//!
//! 첫 바이트에 따라 길이가 결정됩니다:
//! - `0x00..=0xfa`: 값 자체 (1 바이트)
//! - `0xfb`: NULL
//! - `0xfc`: 뒤따르는 2 바이트 LE (총 3 바이트)
//! - `0xfd`: 뒤따르는 3 바이트 LE (총 4 바이트)
//! - `0xfe`: 뒤따르는 8 바이트 LE (총 9 바이트)

use crate::error::{CdcError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

pub const PACKED_NULL: u8 = 0xfb;
pub const PACKED_U16: u8 = 0xfc;
pub const PACKED_U24: u8 = 0xfd;
pub const PACKED_U64: u8 = 0xfe;

/// NULL 센티넬을 허용하는 packed integer 읽기
pub fn read_nullable_packed_int(cursor: &mut Cursor<&[u8]>) -> Result<Option<u64>> {
    let byte = cursor.read_u8()?;
    let value = match byte {
        0..=0xfa => byte as u64,
        PACKED_NULL => return Ok(None),
        PACKED_U16 => cursor.read_u16::<LittleEndian>()? as u64,
        PACKED_U24 => cursor.read_u24::<LittleEndian>()? as u64,
        PACKED_U64 => cursor.read_u64::<LittleEndian>()?,
        0xff => {
            return Err(CdcError::InvalidValue(
                "0xff is not a valid packed integer prefix".to_string(),
            ))
        }
    };
    Ok(Some(value))
}

/// 항상 값이 존재해야 하는 위치의 packed integer 읽기 (문자열 길이, 컬럼 개수 등)
pub fn read_packed_int(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    read_nullable_packed_int(cursor)?.ok_or_else(|| {
        CdcError::InvalidValue("unexpected NULL packed integer".to_string())
    })
}

/// 남은 바이트 수
pub(crate) fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let len = cursor.get_ref().len() as u64;
    len.saturating_sub(cursor.position()) as usize
}

/// `len` 바이트를 읽습니다. 할당 전에 남은 길이를 먼저 확인합니다.
pub(crate) fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let available = remaining(cursor);
    if len > available {
        return Err(CdcError::TruncatedInput(format!(
            "need {} bytes, {} available",
            len, available
        )));
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// 1~8 바이트 little-endian 부호 없는 정수
pub(crate) fn read_uint_le(cursor: &mut Cursor<&[u8]>, width: usize) -> Result<u64> {
    if !(1..=8).contains(&width) {
        return Err(CdcError::InvalidMetadata(format!(
            "integer width {} out of range 1..=8",
            width
        )));
    }
    Ok(cursor.read_uint::<LittleEndian>(width)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> (Result<u64>, u64) {
        let mut cursor = Cursor::new(bytes);
        let value = read_packed_int(&mut cursor);
        (value, cursor.position())
    }

    #[test]
    fn test_single_byte() {
        let (value, consumed) = decode(&[0x2a]);
        assert_eq!(value.unwrap(), 42);
        assert_eq!(consumed, 1);

        let (value, consumed) = decode(&[0xfa, 0x99]);
        assert_eq!(value.unwrap(), 250);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_two_byte_value() {
        let (value, consumed) = decode(&[0xfc, 0x01, 0x02]);
        assert_eq!(value.unwrap(), 0x0201);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_three_byte_value() {
        let (value, consumed) = decode(&[0xfd, 0x01, 0x02, 0x03]);
        assert_eq!(value.unwrap(), 0x030201);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_eight_byte_value() {
        let mut bytes = vec![0xfe];
        bytes.extend_from_slice(&0x0102_0304_0506_0708u64.to_le_bytes());
        let (value, consumed) = decode(&bytes);
        assert_eq!(value.unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(consumed, 9);
    }

    #[test]
    fn test_truncated() {
        for bytes in [&[][..], &[0xfc, 0x01][..], &[0xfd, 0x01, 0x02][..], &[0xfe, 1, 2, 3][..]] {
            let (value, _) = decode(bytes);
            assert!(matches!(value, Err(CdcError::TruncatedInput(_))));
        }
    }

    #[test]
    fn test_null_sentinel() {
        let mut cursor = Cursor::new(&[0xfb][..]);
        assert_eq!(read_nullable_packed_int(&mut cursor).unwrap(), None);
        assert_eq!(cursor.position(), 1);

        let (value, _) = decode(&[0xfb]);
        assert!(matches!(value, Err(CdcError::InvalidValue(_))));

        let (value, _) = decode(&[0xff]);
        assert!(matches!(value, Err(CdcError::InvalidValue(_))));
    }

    #[test]
    fn test_read_bytes_checks_bounds() {
        let data = [1u8, 2, 3];
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            read_bytes(&mut cursor, 4),
            Err(CdcError::TruncatedInput(_))
        ));
        assert_eq!(cursor.position(), 0);
        assert_eq!(read_bytes(&mut cursor, 2).unwrap(), vec![1, 2]);
        assert_eq!(remaining(&cursor), 1);
    }
}
