//! 테이블 맵 이벤트의 컬럼 메타데이터
//!
//! 타입마다 메타데이터 블록에서 차지하는 크기와 의미가 다릅니다.

use crate::column_type::ColumnType;
use crate::error::{CdcError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// 컬럼 메타데이터
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnMetadata {
    /// 메타데이터 없음 (정수, YEAR, NULL 등)
    None,
    /// 길이 접두사 또는 값의 바이트 폭 (FLOAT, DOUBLE, BLOB, GEOMETRY)
    PackSize(u8),
    /// 선언된 최대 길이 (VARCHAR, VAR_STRING)
    MaxLength(u16),
    /// STRING/ENUM/SET: 실제 타입과 최대 길이
    String { real_type: u8, max_length: u16 },
    /// BIT(n): n = bytes * 8 + bits
    Bit { bits: u8, bytes: u8 },
    /// NEWDECIMAL(precision, scale)
    Decimal { precision: u8, scale: u8 },
    /// TIME2/DATETIME2/TIMESTAMP2 소수점 이하 자릿수 (0~6)
    FractionalPrecision(u8),
}

impl ColumnMetadata {
    /// 테이블 맵 메타데이터 블록에서 한 컬럼분을 읽습니다.
    pub fn read(cursor: &mut Cursor<&[u8]>, column_type: ColumnType) -> Result<Self> {
        let meta = match column_type {
            ColumnType::Float
            | ColumnType::Double
            | ColumnType::Blob
            | ColumnType::TinyBlob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob
            | ColumnType::Geometry => ColumnMetadata::PackSize(cursor.read_u8()?),
            ColumnType::Varchar | ColumnType::VarString => {
                ColumnMetadata::MaxLength(cursor.read_u16::<LittleEndian>()?)
            }
            ColumnType::String | ColumnType::Enum | ColumnType::Set => {
                let byte0 = cursor.read_u8()?;
                let byte1 = cursor.read_u8()?;
                Self::string(byte0, byte1)
            }
            ColumnType::Bit => {
                let bits = cursor.read_u8()?;
                let bytes = cursor.read_u8()?;
                ColumnMetadata::Bit { bits, bytes }
            }
            ColumnType::NewDecimal => {
                let precision = cursor.read_u8()?;
                let scale = cursor.read_u8()?;
                ColumnMetadata::Decimal { precision, scale }
            }
            ColumnType::Time2 | ColumnType::DateTime2 | ColumnType::Timestamp2 => {
                ColumnMetadata::FractionalPrecision(cursor.read_u8()?)
            }
            ColumnType::Decimal
            | ColumnType::Tiny
            | ColumnType::Short
            | ColumnType::Long
            | ColumnType::Null
            | ColumnType::Timestamp
            | ColumnType::LongLong
            | ColumnType::Int24
            | ColumnType::Date
            | ColumnType::Time
            | ColumnType::DateTime
            | ColumnType::Year
            | ColumnType::NewDate => ColumnMetadata::None,
        };
        Ok(meta)
    }

    /// STRING 계열 메타데이터 해석
    ///
    /// MySQL은 최대 길이의 상위 2 비트를 real type 바이트에 XOR로 접어 넣습니다.
    pub fn string(byte0: u8, byte1: u8) -> Self {
        let mut real_type = byte0;
        let mut max_length = byte1 as u16;
        if real_type & 0x30 != 0x30 {
            max_length |= (((real_type & 0x30) ^ 0x30) as u16) << 4;
            real_type |= 0x30;
        }
        ColumnMetadata::String {
            real_type,
            max_length,
        }
    }

    /// 길이 접두사의 바이트 폭
    pub fn pack_size(&self) -> Option<usize> {
        match *self {
            ColumnMetadata::PackSize(size) => Some(size as usize),
            ColumnMetadata::MaxLength(max_length)
            | ColumnMetadata::String { max_length, .. } => {
                Some(if max_length < 256 { 1 } else { 2 })
            }
            _ => None,
        }
    }

    pub fn max_length(&self) -> Option<u16> {
        match *self {
            ColumnMetadata::MaxLength(max_length)
            | ColumnMetadata::String { max_length, .. } => Some(max_length),
            _ => None,
        }
    }

    pub fn fractional_precision(&self) -> Option<u8> {
        match *self {
            ColumnMetadata::FractionalPrecision(fsp) => Some(fsp),
            _ => None,
        }
    }

    /// BIT 컬럼의 선언된 비트 수
    pub fn bit_length(&self) -> Option<usize> {
        match *self {
            ColumnMetadata::Bit { bits, bytes } => Some(bytes as usize * 8 + bits as usize),
            _ => None,
        }
    }

    pub fn decimal(&self) -> Option<(u8, u8)> {
        match *self {
            ColumnMetadata::Decimal { precision, scale } => Some((precision, scale)),
            _ => None,
        }
    }

    /// STRING 메타데이터에 기록된 실제 타입
    pub fn real_type(&self) -> Option<Result<ColumnType>> {
        match *self {
            ColumnMetadata::String { real_type, .. } => Some(ColumnType::from_u8(real_type)),
            _ => None,
        }
    }
}

/// 메타데이터 블록 전체를 읽습니다. 블록 길이와 소비한 바이트 수가 다르면 에러입니다.
pub fn read_metadata_block(block: &[u8], column_types: &[ColumnType]) -> Result<Vec<ColumnMetadata>> {
    let mut cursor = Cursor::new(block);
    let mut metadata = Vec::with_capacity(column_types.len());
    for column_type in column_types {
        let meta = ColumnMetadata::read(&mut cursor, *column_type).map_err(|e| match e {
            CdcError::TruncatedInput(_) => CdcError::InvalidMetadata(format!(
                "metadata block of {} bytes too short for {} columns",
                block.len(),
                column_types.len()
            )),
            other => other,
        })?;
        metadata.push(meta);
    }

    if cursor.position() as usize != block.len() {
        return Err(CdcError::InvalidMetadata(format!(
            "metadata block declares {} bytes but columns use {}",
            block.len(),
            cursor.position()
        )));
    }
    Ok(metadata)
}
