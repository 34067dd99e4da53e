//! MySQL 물리 컬럼 타입 카탈로그
//!
//! 코드 값은 wire 호환을 위해 고정되어 있습니다.
//! - 연속 구간: 0 ~ 19
//! - 분리 구간: 246 ~ 255

use crate::error::{CdcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// MySQL 컬럼 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0,
    Tiny = 1,
    Short = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Null = 6,
    Timestamp = 7,
    LongLong = 8,
    Int24 = 9,
    Date = 10,
    Time = 11,
    DateTime = 12,
    Year = 13,
    /// binlog에는 나타나지 않음
    NewDate = 14,
    Varchar = 15,
    Bit = 16,
    Timestamp2 = 17,
    DateTime2 = 18,
    Time2 = 19,
    NewDecimal = 246,
    /// binlog에는 나타나지 않음 (STRING 메타데이터의 real type으로만 등장)
    Enum = 247,
    /// binlog에는 나타나지 않음 (STRING 메타데이터의 real type으로만 등장)
    Set = 248,
    TinyBlob = 249,
    MediumBlob = 250,
    LongBlob = 251,
    Blob = 252,
    VarString = 253,
    String = 254,
    Geometry = 255,
}

/// 컬럼 한 개를 디코딩하는 규칙
///
/// `ColumnType::decode_rule`이 타입마다 정확히 하나의 규칙을 돌려줍니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRule {
    /// 고정 폭 little-endian 부호 없는 정수
    Integer { width: usize },
    /// 3 바이트 LE, 32 비트로 부호 확장
    Int24,
    /// 1 바이트 + 1900
    Year,
    Float,
    Double,
    /// 0 바이트
    Null,
    /// 최대 길이에 따라 1/2 바이트 길이 접두사
    VarChar,
    /// packed integer 길이 접두사
    PackedString,
    /// pack size 바이트 길이 접두사 (BLOB, GEOMETRY)
    LengthPrefixed,
    Bit,
    Time2,
    DateTime2,
    Timestamp2,
    NewDecimal,
    /// replication wire에 나타나지 않는 타입
    Unsupported,
}

impl ColumnType {
    pub const ALL: [ColumnType; 30] = [
        ColumnType::Decimal,
        ColumnType::Tiny,
        ColumnType::Short,
        ColumnType::Long,
        ColumnType::Float,
        ColumnType::Double,
        ColumnType::Null,
        ColumnType::Timestamp,
        ColumnType::LongLong,
        ColumnType::Int24,
        ColumnType::Date,
        ColumnType::Time,
        ColumnType::DateTime,
        ColumnType::Year,
        ColumnType::NewDate,
        ColumnType::Varchar,
        ColumnType::Bit,
        ColumnType::Timestamp2,
        ColumnType::DateTime2,
        ColumnType::Time2,
        ColumnType::NewDecimal,
        ColumnType::Enum,
        ColumnType::Set,
        ColumnType::TinyBlob,
        ColumnType::MediumBlob,
        ColumnType::LongBlob,
        ColumnType::Blob,
        ColumnType::VarString,
        ColumnType::String,
        ColumnType::Geometry,
    ];

    /// 숫자 코드를 타입으로 변환 (알 수 없는 코드는 에러)
    pub fn from_u8(code: u8) -> Result<Self> {
        let ty = match code {
            0 => ColumnType::Decimal,
            1 => ColumnType::Tiny,
            2 => ColumnType::Short,
            3 => ColumnType::Long,
            4 => ColumnType::Float,
            5 => ColumnType::Double,
            6 => ColumnType::Null,
            7 => ColumnType::Timestamp,
            8 => ColumnType::LongLong,
            9 => ColumnType::Int24,
            10 => ColumnType::Date,
            11 => ColumnType::Time,
            12 => ColumnType::DateTime,
            13 => ColumnType::Year,
            14 => ColumnType::NewDate,
            15 => ColumnType::Varchar,
            16 => ColumnType::Bit,
            17 => ColumnType::Timestamp2,
            18 => ColumnType::DateTime2,
            19 => ColumnType::Time2,
            246 => ColumnType::NewDecimal,
            247 => ColumnType::Enum,
            248 => ColumnType::Set,
            249 => ColumnType::TinyBlob,
            250 => ColumnType::MediumBlob,
            251 => ColumnType::LongBlob,
            252 => ColumnType::Blob,
            253 => ColumnType::VarString,
            254 => ColumnType::String,
            255 => ColumnType::Geometry,
            _ => return Err(CdcError::UnknownColumnType(code)),
        };
        Ok(ty)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// 진단용 이름
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Decimal => "MYSQL_TYPE_DECIMAL",
            ColumnType::Tiny => "MYSQL_TYPE_TINY",
            ColumnType::Short => "MYSQL_TYPE_SHORT",
            ColumnType::Long => "MYSQL_TYPE_LONG",
            ColumnType::Float => "MYSQL_TYPE_FLOAT",
            ColumnType::Double => "MYSQL_TYPE_DOUBLE",
            ColumnType::Null => "MYSQL_TYPE_NULL",
            ColumnType::Timestamp => "MYSQL_TYPE_TIMESTAMP",
            ColumnType::LongLong => "MYSQL_TYPE_LONGLONG",
            ColumnType::Int24 => "MYSQL_TYPE_INT24",
            ColumnType::Date => "MYSQL_TYPE_DATE",
            ColumnType::Time => "MYSQL_TYPE_TIME",
            ColumnType::DateTime => "MYSQL_TYPE_DATETIME",
            ColumnType::Year => "MYSQL_TYPE_YEAR",
            ColumnType::NewDate => "MYSQL_TYPE_NEWDATE",
            ColumnType::Varchar => "MYSQL_TYPE_VARCHAR",
            ColumnType::Bit => "MYSQL_TYPE_BIT",
            ColumnType::Timestamp2 => "MYSQL_TYPE_TIMESTAMP2",
            ColumnType::DateTime2 => "MYSQL_TYPE_DATETIME2",
            ColumnType::Time2 => "MYSQL_TYPE_TIME2",
            ColumnType::NewDecimal => "MYSQL_TYPE_NEWDECIMAL",
            ColumnType::Enum => "MYSQL_TYPE_ENUM",
            ColumnType::Set => "MYSQL_TYPE_SET",
            ColumnType::TinyBlob => "MYSQL_TYPE_TINY_BLOB",
            ColumnType::MediumBlob => "MYSQL_TYPE_MEDIUM_BLOB",
            ColumnType::LongBlob => "MYSQL_TYPE_LONG_BLOB",
            ColumnType::Blob => "MYSQL_TYPE_BLOB",
            ColumnType::VarString => "MYSQL_TYPE_VAR_STRING",
            ColumnType::String => "MYSQL_TYPE_STRING",
            ColumnType::Geometry => "MYSQL_TYPE_GEOMETRY",
        }
    }

    /// 타입별 디코딩 규칙 테이블
    pub const fn decode_rule(self) -> DecodeRule {
        match self {
            ColumnType::Tiny => DecodeRule::Integer { width: 1 },
            ColumnType::Short => DecodeRule::Integer { width: 2 },
            ColumnType::Long => DecodeRule::Integer { width: 4 },
            ColumnType::LongLong => DecodeRule::Integer { width: 8 },
            ColumnType::Int24 => DecodeRule::Int24,
            ColumnType::Year => DecodeRule::Year,
            ColumnType::Float => DecodeRule::Float,
            ColumnType::Double => DecodeRule::Double,
            ColumnType::Null => DecodeRule::Null,
            ColumnType::Varchar => DecodeRule::VarChar,
            ColumnType::VarString | ColumnType::String => DecodeRule::PackedString,
            ColumnType::Blob | ColumnType::Geometry => DecodeRule::LengthPrefixed,
            ColumnType::Bit => DecodeRule::Bit,
            ColumnType::Time2 => DecodeRule::Time2,
            ColumnType::DateTime2 => DecodeRule::DateTime2,
            ColumnType::Timestamp2 => DecodeRule::Timestamp2,
            ColumnType::NewDecimal => DecodeRule::NewDecimal,
            ColumnType::Enum
            | ColumnType::Set
            | ColumnType::TinyBlob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob
            | ColumnType::Date
            | ColumnType::Time
            | ColumnType::DateTime
            | ColumnType::Timestamp
            | ColumnType::Decimal
            | ColumnType::NewDate => DecodeRule::Unsupported,
        }
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = CdcError;

    fn try_from(code: u8) -> Result<Self> {
        ColumnType::from_u8(code)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
