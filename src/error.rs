//! 디코더 에러 타입

use crate::column_type::ColumnType;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdcError {
    #[error("입력이 부족합니다: {0}")]
    TruncatedInput(String),

    #[error("유효하지 않은 컬럼 메타데이터: {0}")]
    InvalidMetadata(String),

    #[error("지원하지 않는 컬럼 타입: {0}")]
    UnsupportedType(ColumnType),

    #[error("유효하지 않은 binlog 매직 넘버")]
    MalformedMagic,

    #[error("알 수 없는 컬럼 타입 코드: {0}")]
    UnknownColumnType(u8),

    #[error("유효하지 않은 값: {0}")]
    InvalidValue(String),

    #[error("유효하지 않은 이벤트: {0}")]
    InvalidEvent(String),

    #[error("테이블 맵이 없는 테이블 ID: {0}")]
    UnknownTableId(u64),

    #[error("체크섬 불일치: expected {expected:#010x}, actual {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("I/O 에러: {0}")]
    IoError(String),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<io::Error> for CdcError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => CdcError::TruncatedInput(err.to_string()),
            _ => CdcError::IoError(err.to_string()),
        }
    }
}

impl CdcError {
    /// 이벤트 단위로 건너뛰어도 스트림 동기화가 유지되는 에러인지 여부
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            CdcError::TruncatedInput(_)
                | CdcError::InvalidMetadata(_)
                | CdcError::UnsupportedType(_)
                | CdcError::UnknownColumnType(_)
                | CdcError::InvalidValue(_)
                | CdcError::UnknownTableId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CdcError>;
