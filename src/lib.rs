//! MySQL row 기반 Binlog 디코더
//!
//! 이 라이브러리는 MySQL 바이너리 로그의 row 이벤트를 읽어 컬럼 값으로 복원합니다.
//! 주요 기능:
//! - Binlog 이벤트 프레이밍 및 체크섬 검증
//! - 테이블 맵 기반 row image 디코딩
//! - 정수, 문자열, BLOB, 시간(V2), NEWDECIMAL 타입 디코딩
//! - 변경 이벤트 (INSERT/UPDATE/DELETE) 추출

pub mod binlog;
pub mod cdc_engine;
pub mod column_type;
pub mod decimal;
pub mod error;
pub mod events;
pub mod metadata;
pub mod packed_int;
pub mod row_image;
pub mod table_map;
pub mod temporal;

pub use binlog::{BinlogParser, BinlogReader};
pub use cdc_engine::{CdcConfig, CdcEngine, ErrorPolicy};
pub use column_type::ColumnType;
pub use error::{CdcError, Result};
pub use events::{BinlogEvent, ChangeEvent, EventType};
pub use metadata::ColumnMetadata;
pub use row_image::{decode_cell, decode_row, RowImage, RowImageCell};
pub use table_map::{TableMap, TableMapCache};
