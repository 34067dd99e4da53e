//! Row image 디코더
//!
//! 테이블 맵의 컬럼 타입과 메타데이터를 기준으로, 한 행의 컬럼 값을 순서대로 디코딩합니다.
//! 컬럼 하나가 소비하는 바이트 수는 타입과 메타데이터로 정확히 결정되며,
//! 한 바이트라도 어긋나면 이후 모든 컬럼이 깨지므로 모르는 타입은 건너뛰지 않고 에러로 처리합니다.

use crate::column_type::{ColumnType, DecodeRule};
use crate::decimal::{read_decimal, Decimal};
use crate::error::{CdcError, Result};
use crate::metadata::ColumnMetadata;
use crate::packed_int::{read_bytes, read_packed_int, read_uint_le};
use crate::table_map::TableMap;
use crate::temporal::{read_datetime2, read_time2, read_timestamp2, MysqlDateTime};
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// 디코딩된 컬럼 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowImageCell {
    Null(ColumnType),
    /// 부호 없는 원시 비트 패턴 (부호 해석은 `signed_integer` 참고)
    Integer(u64),
    FloatingPoint(f32),
    WideFloatingPoint(f64),
    Decimal(Decimal),
    Blob(Vec<u8>),
    Text(ColumnType, String),
    Duration(#[serde(with = "duration_micros")] Duration),
    Timestamp(ColumnType, MysqlDateTime),
}

impl RowImageCell {
    pub fn is_null(&self) -> bool {
        matches!(self, RowImageCell::Null(_))
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RowImageCell::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RowImageCell::Text(_, s) => Some(s),
            RowImageCell::Decimal(d) => Some(d.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RowImageCell::Blob(b) => Some(b),
            RowImageCell::Text(_, s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

/// 정수 셀을 컬럼 폭 기준의 부호 있는 값으로 해석
pub fn signed_integer(column_type: ColumnType, raw: u64) -> Option<i64> {
    let value = match column_type {
        ColumnType::Tiny => raw as u8 as i8 as i64,
        ColumnType::Short => raw as u16 as i16 as i64,
        ColumnType::Int24 | ColumnType::Long => raw as u32 as i32 as i64,
        ColumnType::LongLong => raw as i64,
        _ => return None,
    };
    Some(value)
}

mod duration_micros {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        match value.num_microseconds() {
            Some(micros) => serializer.serialize_i64(micros),
            None => Err(serde::ser::Error::custom("duration out of range")),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::microseconds(i64::deserialize(deserializer)?))
    }
}

/// 한 행의 컬럼 값들 (테이블 맵 컬럼 순서와 동일)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowImage {
    cells: Vec<RowImageCell>,
    present: Vec<bool>,
}

impl RowImage {
    pub fn new(cells: Vec<RowImageCell>, present: Vec<bool>) -> Self {
        RowImage { cells, present }
    }

    pub fn cells(&self) -> &[RowImageCell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&RowImageCell> {
        self.cells.get(index)
    }

    /// 컬럼이 이 이미지에 포함되어 있는지 (minimal row image에서는 일부 컬럼이 빠짐)
    pub fn is_present(&self, index: usize) -> bool {
        self.present.get(index).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn into_cells(self) -> Vec<RowImageCell> {
        self.cells
    }
}

pub(crate) fn is_bit_set(bitmap: &[u8], index: usize) -> bool {
    bitmap
        .get(index / 8)
        .map(|byte| byte & (1 << (index % 8)) != 0)
        .unwrap_or(false)
}

fn metadata_mismatch(column_type: ColumnType, metadata: &ColumnMetadata) -> CdcError {
    CdcError::InvalidMetadata(format!(
        "{} cannot be decoded with metadata {:?}",
        column_type, metadata
    ))
}

fn length_to_usize(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| CdcError::InvalidValue(format!("length {} too large", len)))
}

fn read_text(cursor: &mut Cursor<&[u8]>, column_type: ColumnType, len: usize) -> Result<RowImageCell> {
    let bytes = read_bytes(cursor, len)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    Ok(RowImageCell::Text(column_type, text))
}

/// 컬럼 하나를 디코딩합니다. 커서는 정확히 소비한 바이트만큼 전진합니다.
pub fn decode_cell(
    cursor: &mut Cursor<&[u8]>,
    column_type: ColumnType,
    metadata: &ColumnMetadata,
) -> Result<RowImageCell> {
    let cell = match column_type.decode_rule() {
        DecodeRule::Integer { width } => RowImageCell::Integer(read_uint_le(cursor, width)?),
        DecodeRule::Int24 => {
            let raw = cursor.read_u24::<LittleEndian>()?;
            // 24 비트 부호를 32 비트로 확장
            let extended = ((raw << 8) as i32 >> 8) as u32;
            RowImageCell::Integer(extended as u64)
        }
        DecodeRule::Year => RowImageCell::Integer(cursor.read_u8()? as u64 + 1900),
        DecodeRule::Float => RowImageCell::FloatingPoint(cursor.read_f32::<LittleEndian>()?),
        DecodeRule::Double => RowImageCell::WideFloatingPoint(cursor.read_f64::<LittleEndian>()?),
        DecodeRule::Null => RowImageCell::Null(column_type),
        DecodeRule::VarChar => {
            let len = match *metadata {
                ColumnMetadata::MaxLength(max_length) if max_length < 256 => {
                    cursor.read_u8()? as usize
                }
                ColumnMetadata::MaxLength(_) => cursor.read_u16::<LittleEndian>()? as usize,
                _ => return Err(metadata_mismatch(column_type, metadata)),
            };
            read_text(cursor, column_type, len)?
        }
        DecodeRule::PackedString => {
            if let Some(real_type) = metadata.real_type() {
                let real_type = real_type?;
                if real_type.decode_rule() == DecodeRule::Unsupported {
                    return Err(CdcError::UnsupportedType(real_type));
                }
            }
            let len = length_to_usize(read_packed_int(cursor)?)?;
            read_text(cursor, column_type, len)?
        }
        DecodeRule::LengthPrefixed => {
            let width = match *metadata {
                ColumnMetadata::PackSize(size @ 1..=4) => size as usize,
                _ => return Err(metadata_mismatch(column_type, metadata)),
            };
            let len = length_to_usize(read_uint_le(cursor, width)?)?;
            RowImageCell::Blob(read_bytes(cursor, len)?)
        }
        DecodeRule::Bit => {
            let bits = metadata
                .bit_length()
                .ok_or_else(|| metadata_mismatch(column_type, metadata))?;
            RowImageCell::Blob(read_bytes(cursor, bits.div_ceil(8))?)
        }
        DecodeRule::Time2 => {
            let fsp = fractional_precision(column_type, metadata)?;
            RowImageCell::Duration(read_time2(cursor, fsp)?)
        }
        DecodeRule::DateTime2 => {
            let fsp = fractional_precision(column_type, metadata)?;
            RowImageCell::Timestamp(column_type, read_datetime2(cursor, fsp)?)
        }
        DecodeRule::Timestamp2 => {
            let fsp = fractional_precision(column_type, metadata)?;
            RowImageCell::Timestamp(column_type, read_timestamp2(cursor, fsp)?)
        }
        DecodeRule::NewDecimal => {
            let (precision, scale) = metadata
                .decimal()
                .ok_or_else(|| metadata_mismatch(column_type, metadata))?;
            RowImageCell::Decimal(read_decimal(cursor, precision, scale)?)
        }
        DecodeRule::Unsupported => return Err(CdcError::UnsupportedType(column_type)),
    };
    Ok(cell)
}

fn fractional_precision(column_type: ColumnType, metadata: &ColumnMetadata) -> Result<u8> {
    metadata
        .fractional_precision()
        .ok_or_else(|| metadata_mismatch(column_type, metadata))
}

/// 한 행을 디코딩합니다.
///
/// `columns_present`는 rows 이벤트의 컬럼 비트맵입니다. 포함된 컬럼 수만큼의
/// NULL 비트맵을 먼저 읽고, NULL이 아닌 컬럼만 `decode_cell`로 디코딩합니다.
/// 빠진 컬럼과 NULL 컬럼은 `Null(type)`이 되며 바이트를 소비하지 않습니다.
pub fn decode_row(
    cursor: &mut Cursor<&[u8]>,
    table_map: &TableMap,
    columns_present: &[u8],
) -> Result<RowImage> {
    let column_count = table_map.column_count();
    let present: Vec<bool> = (0..column_count)
        .map(|index| is_bit_set(columns_present, index))
        .collect();
    let present_count = present.iter().filter(|p| **p).count();
    let null_bitmap = read_bytes(cursor, present_count.div_ceil(8))?;

    let mut cells = Vec::with_capacity(column_count);
    let mut null_index = 0;

    for (index, (column_type, metadata)) in table_map
        .column_types()
        .iter()
        .zip(table_map.column_metadata())
        .enumerate()
    {
        if !present[index] {
            cells.push(RowImageCell::Null(*column_type));
            continue;
        }

        let is_null = is_bit_set(&null_bitmap, null_index);
        null_index += 1;
        if is_null {
            cells.push(RowImageCell::Null(*column_type));
            continue;
        }

        let cell = decode_cell(cursor, *column_type, metadata).map_err(|e| {
            debug!(
                "Failed to decode column {} ({}) of {}: {}",
                index,
                column_type,
                table_map.qualified_name(),
                e
            );
            e
        })?;
        cells.push(cell);
    }

    Ok(RowImage::new(cells, present))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::tests::encode_datetime2;

    fn decode(bytes: &[u8], column_type: ColumnType, metadata: ColumnMetadata) -> (Result<RowImageCell>, u64) {
        let mut cursor = Cursor::new(bytes);
        let cell = decode_cell(&mut cursor, column_type, &metadata);
        (cell, cursor.position())
    }

    fn decode_ok(bytes: &[u8], column_type: ColumnType, metadata: ColumnMetadata) -> (RowImageCell, u64) {
        let (cell, consumed) = decode(bytes, column_type, metadata);
        (cell.unwrap(), consumed)
    }

    #[test]
    fn test_fixed_width_integers() {
        let cases: [(ColumnType, u64, usize); 4] = [
            (ColumnType::Tiny, 0xab, 1),
            (ColumnType::Short, 0xbeef, 2),
            (ColumnType::Long, 0xdead_beef, 4),
            (ColumnType::LongLong, u64::MAX - 1, 8),
        ];
        for (column_type, value, width) in cases {
            let mut bytes = value.to_le_bytes()[..width].to_vec();
            bytes.push(0x99);
            let (cell, consumed) = decode_ok(&bytes, column_type, ColumnMetadata::None);
            assert_eq!(cell, RowImageCell::Integer(value), "{}", column_type);
            assert_eq!(consumed, width as u64);
        }
    }

    #[test]
    fn test_int24_sign_extension() {
        let (cell, consumed) = decode_ok(&[0x01, 0x02, 0x03], ColumnType::Int24, ColumnMetadata::None);
        assert_eq!(cell, RowImageCell::Integer(0x030201));
        assert_eq!(consumed, 3);

        let (cell, _) = decode_ok(&[0xff, 0xff, 0xff], ColumnType::Int24, ColumnMetadata::None);
        assert_eq!(cell, RowImageCell::Integer(0xffff_ffff));
        assert_eq!(signed_integer(ColumnType::Int24, 0xffff_ffff), Some(-1));
    }

    #[test]
    fn test_signed_integer() {
        assert_eq!(signed_integer(ColumnType::Tiny, 0xff), Some(-1));
        assert_eq!(signed_integer(ColumnType::Short, 0x8000), Some(-32768));
        assert_eq!(signed_integer(ColumnType::LongLong, u64::MAX), Some(-1));
        assert_eq!(signed_integer(ColumnType::Blob, 1), None);
    }

    #[test]
    fn test_year() {
        let (cell, consumed) = decode_ok(&[124], ColumnType::Year, ColumnMetadata::None);
        assert_eq!(cell, RowImageCell::Integer(2024));
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_floating_point() {
        let (cell, consumed) = decode_ok(&1.5f32.to_le_bytes(), ColumnType::Float, ColumnMetadata::PackSize(4));
        assert_eq!(cell, RowImageCell::FloatingPoint(1.5));
        assert_eq!(consumed, 4);

        let value = -1234.5678f64;
        let (cell, consumed) = decode_ok(&value.to_le_bytes(), ColumnType::Double, ColumnMetadata::PackSize(8));
        assert_eq!(cell, RowImageCell::WideFloatingPoint(value));
        assert_eq!(consumed, 8);
    }

    #[test]
    fn test_explicit_null_consumes_nothing() {
        let (cell, consumed) = decode_ok(&[0x01], ColumnType::Null, ColumnMetadata::None);
        assert_eq!(cell, RowImageCell::Null(ColumnType::Null));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_varchar_one_byte_prefix() {
        let bytes = [0x03, b'a', b'b', b'c', 0x00];
        let (cell, consumed) = decode_ok(&bytes, ColumnType::Varchar, ColumnMetadata::MaxLength(120));
        assert_eq!(cell, RowImageCell::Text(ColumnType::Varchar, "abc".to_string()));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_varchar_two_byte_prefix() {
        let text = "x".repeat(300);
        let mut bytes = (300u16).to_le_bytes().to_vec();
        bytes.extend_from_slice(text.as_bytes());
        let (cell, consumed) = decode_ok(&bytes, ColumnType::Varchar, ColumnMetadata::MaxLength(500));
        assert_eq!(cell, RowImageCell::Text(ColumnType::Varchar, text));
        assert_eq!(consumed, 302);
    }

    #[test]
    fn test_varchar_without_metadata() {
        let (cell, consumed) = decode(&[0x01, b'a'], ColumnType::Varchar, ColumnMetadata::None);
        assert!(matches!(cell, Err(CdcError::InvalidMetadata(_))));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_string_packed_length() {
        let bytes = [0x02, b'h', b'i'];
        let (cell, consumed) = decode_ok(&bytes, ColumnType::String, ColumnMetadata::string(0xfe, 20));
        assert_eq!(cell, RowImageCell::Text(ColumnType::String, "hi".to_string()));
        assert_eq!(consumed, 3);

        let mut bytes = vec![0xfc, 0x2c, 0x01];
        bytes.extend(std::iter::repeat(b'z').take(300));
        let (cell, consumed) = decode_ok(&bytes, ColumnType::VarString, ColumnMetadata::MaxLength(1020));
        assert_eq!(cell.as_str().map(str::len), Some(300));
        assert_eq!(consumed, 303);
    }

    #[test]
    fn test_string_with_enum_real_type_is_unsupported() {
        let (cell, consumed) = decode(&[0x01], ColumnType::String, ColumnMetadata::string(0xf7, 1));
        assert!(matches!(cell, Err(CdcError::UnsupportedType(ColumnType::Enum))));
        assert_eq!(consumed, 0);

        let (cell, _) = decode(&[0x01], ColumnType::String, ColumnMetadata::string(0xf8, 1));
        assert!(matches!(cell, Err(CdcError::UnsupportedType(ColumnType::Set))));
    }

    #[test]
    fn test_invalid_utf8_text_is_lossy() {
        let (cell, _) = decode_ok(&[0x02, 0xff, b'a'], ColumnType::Varchar, ColumnMetadata::MaxLength(10));
        assert_eq!(cell, RowImageCell::Text(ColumnType::Varchar, "\u{fffd}a".to_string()));
    }

    #[test]
    fn test_blob_pack_size_two() {
        let bytes = [0x05, 0x00, 1, 2, 3, 4, 5, 0xee];
        let (cell, consumed) = decode_ok(&bytes, ColumnType::Blob, ColumnMetadata::PackSize(2));
        assert_eq!(cell, RowImageCell::Blob(vec![1, 2, 3, 4, 5]));
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_blob_pack_sizes() {
        for width in 1..=4usize {
            let mut bytes = 2u32.to_le_bytes()[..width].to_vec();
            bytes.extend_from_slice(&[0xaa, 0xbb]);
            let (cell, consumed) = decode_ok(&bytes, ColumnType::Blob, ColumnMetadata::PackSize(width as u8));
            assert_eq!(cell, RowImageCell::Blob(vec![0xaa, 0xbb]));
            assert_eq!(consumed, width as u64 + 2);
        }

        let (cell, _) = decode(&[0, 0, 0, 0, 0], ColumnType::Blob, ColumnMetadata::PackSize(5));
        assert!(matches!(cell, Err(CdcError::InvalidMetadata(_))));
    }

    #[test]
    fn test_blob_truncated() {
        let (cell, _) = decode(&[0x05, 0x00, 1, 2], ColumnType::Blob, ColumnMetadata::PackSize(2));
        assert!(matches!(cell, Err(CdcError::TruncatedInput(_))));
    }

    #[test]
    fn test_geometry() {
        let wkb = [0x01, 0x01, 0x00, 0x00, 0x00];
        let mut bytes = vec![wkb.len() as u8, 0, 0, 0];
        bytes.extend_from_slice(&wkb);
        let (cell, consumed) = decode_ok(&bytes, ColumnType::Geometry, ColumnMetadata::PackSize(4));
        assert_eq!(cell, RowImageCell::Blob(wkb.to_vec()));
        assert_eq!(consumed, 9);
    }

    #[test]
    fn test_bit() {
        // BIT(11) => 2 바이트
        let (cell, consumed) = decode_ok(&[0x05, 0xa0, 0xff], ColumnType::Bit, ColumnMetadata::Bit { bits: 3, bytes: 1 });
        assert_eq!(cell, RowImageCell::Blob(vec![0x05, 0xa0]));
        assert_eq!(consumed, 2);

        let (_, consumed) = decode_ok(&[0x01], ColumnType::Bit, ColumnMetadata::Bit { bits: 1, bytes: 0 });
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_datetime2_cell() {
        let value = MysqlDateTime {
            year: 2024,
            month: 1,
            day: 2,
            hour: 3,
            minute: 4,
            second: 5,
            microsecond: 123_456,
        };
        let bytes = encode_datetime2(&value, 6);
        let (cell, consumed) = decode_ok(&bytes, ColumnType::DateTime2, ColumnMetadata::FractionalPrecision(6));
        assert_eq!(cell, RowImageCell::Timestamp(ColumnType::DateTime2, value));
        assert_eq!(consumed, 8);

        let (cell, consumed) = decode(&bytes, ColumnType::DateTime2, ColumnMetadata::FractionalPrecision(9));
        assert!(matches!(cell, Err(CdcError::InvalidMetadata(_))));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_time2_cell() {
        let bytes = [0x80, 0x10, 0x00];
        let (cell, consumed) = decode_ok(&bytes, ColumnType::Time2, ColumnMetadata::FractionalPrecision(0));
        assert_eq!(cell, RowImageCell::Duration(Duration::hours(1)));
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_timestamp2_cell() {
        let (cell, consumed) = decode_ok(&[0, 0, 0, 60], ColumnType::Timestamp2, ColumnMetadata::FractionalPrecision(0));
        match cell {
            RowImageCell::Timestamp(ColumnType::Timestamp2, value) => {
                assert_eq!(value.to_string(), "1970-01-01 00:01:00");
            }
            other => panic!("unexpected cell {:?}", other),
        }
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_newdecimal_cell() {
        let bytes = [0x81, 0x0d, 0xfb, 0x38, 0xd2, 0x04, 0xd2];
        let (cell, consumed) = decode_ok(&bytes, ColumnType::NewDecimal, ColumnMetadata::Decimal { precision: 14, scale: 4 });
        assert_eq!(cell.as_str(), Some("1234567890.1234"));
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_unsupported_types_never_produce_values() {
        let unsupported = [
            ColumnType::Enum,
            ColumnType::Set,
            ColumnType::TinyBlob,
            ColumnType::MediumBlob,
            ColumnType::LongBlob,
            ColumnType::Date,
            ColumnType::Time,
            ColumnType::DateTime,
            ColumnType::Timestamp,
            ColumnType::Decimal,
            ColumnType::NewDate,
        ];
        for column_type in unsupported {
            let (cell, consumed) = decode(&[0x01; 16], column_type, ColumnMetadata::PackSize(1));
            assert!(
                matches!(cell, Err(CdcError::UnsupportedType(t)) if t == column_type),
                "{}",
                column_type
            );
            assert_eq!(consumed, 0);
        }
    }

    #[test]
    fn test_every_type_is_dispatched() {
        for column_type in ColumnType::ALL {
            let (cell, consumed) = decode(&[], column_type, ColumnMetadata::None);
            assert_eq!(consumed, 0, "{}", column_type);
            if column_type == ColumnType::Null {
                assert_eq!(cell.unwrap(), RowImageCell::Null(ColumnType::Null));
            } else {
                assert!(
                    matches!(
                        cell,
                        Err(CdcError::TruncatedInput(_)
                            | CdcError::InvalidMetadata(_)
                            | CdcError::UnsupportedType(_))
                    ),
                    "{}: {:?}",
                    column_type,
                    cell
                );
            }
        }
    }

    #[test]
    fn test_varchar_requires_max_length() {
        for metadata in [ColumnMetadata::PackSize(1), ColumnMetadata::PackSize(2)] {
            let (cell, consumed) = decode(&[0x01, b'a'], ColumnType::Varchar, metadata);
            assert!(matches!(cell, Err(CdcError::InvalidMetadata(_))));
            assert_eq!(consumed, 0);
        }
    }

    fn table() -> TableMap {
        TableMap::new(
            9,
            "shop",
            "orders",
            vec![
                ColumnType::Long,
                ColumnType::Varchar,
                ColumnType::Blob,
                ColumnType::Tiny,
            ],
            vec![
                ColumnMetadata::None,
                ColumnMetadata::MaxLength(64),
                ColumnMetadata::PackSize(2),
                ColumnMetadata::None,
            ],
            vec![0x0e],
        )
        .unwrap()
    }

    #[test]
    fn test_decode_row_with_null() {
        // 모든 컬럼 포함, 컬럼 2(BLOB)가 NULL
        let mut bytes = vec![0b0000_0100];
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&[0x02, b'o', b'k']);
        bytes.push(0x01);

        let mut cursor = Cursor::new(bytes.as_slice());
        let row = decode_row(&mut cursor, &table(), &[0x0f]).unwrap();
        assert_eq!(cursor.position() as usize, bytes.len());
        assert_eq!(
            row.cells(),
            &[
                RowImageCell::Integer(7),
                RowImageCell::Text(ColumnType::Varchar, "ok".to_string()),
                RowImageCell::Null(ColumnType::Blob),
                RowImageCell::Integer(1),
            ]
        );
        assert!(row.is_present(2));
    }

    #[test]
    fn test_decode_row_with_absent_columns() {
        // 컬럼 0, 3만 포함 (minimal row image)
        let mut bytes = vec![0b0000_0000];
        bytes.extend_from_slice(&42u32.to_le_bytes());
        bytes.push(0x09);

        let mut cursor = Cursor::new(bytes.as_slice());
        let row = decode_row(&mut cursor, &table(), &[0b0000_1001]).unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(row.get(0), Some(&RowImageCell::Integer(42)));
        assert_eq!(row.get(1), Some(&RowImageCell::Null(ColumnType::Varchar)));
        assert!(!row.is_present(1));
        assert_eq!(row.get(3), Some(&RowImageCell::Integer(9)));
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn test_decode_row_propagates_errors() {
        let bytes = [0x00, 0x01, 0x00];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            decode_row(&mut cursor, &table(), &[0x0f]),
            Err(CdcError::TruncatedInput(_))
        ));
    }

    #[test]
    fn test_cell_serializes_to_json() {
        let json = serde_json::to_value(RowImageCell::Duration(Duration::seconds(2))).unwrap();
        assert_eq!(json, serde_json::json!({ "Duration": 2_000_000 }));

        let json = serde_json::to_value(RowImageCell::Text(ColumnType::Varchar, "a".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "Text": ["Varchar", "a"] }));
    }
}
