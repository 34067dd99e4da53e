//! MySQL Binlog 이벤트 타입 및 데이터 구조 정의

use crate::row_image::RowImage;
use crate::table_map::TableMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MySQL Binlog 이벤트 타입 (0 ~ 35)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventType {
    /// 알 수 없는 이벤트
    Unknown = 0,
    StartEventV3 = 1,
    /// 쿼리 이벤트 (statement 기반, 디코딩하지 않음)
    QueryEvent = 2,
    StopEvent = 3,
    /// 로테이션 이벤트 (새 binlog 파일)
    RotateEvent = 4,
    IntvarEvent = 5,
    LoadEvent = 6,
    SlaveEvent = 7,
    CreateFileEvent = 8,
    AppendBlockEvent = 9,
    ExecLoadEvent = 10,
    DeleteFileEvent = 11,
    NewLoadEvent = 12,
    RandEvent = 13,
    UserVarEvent = 14,
    /// 포맷 설명 이벤트 (체크섬 알고리즘 포함)
    FormatDescriptionEvent = 15,
    XidEvent = 16,
    BeginLoadQueryEvent = 17,
    ExecuteLoadQueryEvent = 18,
    /// 테이블 맵 이벤트 (스키마 정보)
    TableMapEvent = 19,
    WriteRowsEventV0 = 20,
    UpdateRowsEventV0 = 21,
    DeleteRowsEventV0 = 22,
    WriteRowsEventV1 = 23,
    UpdateRowsEventV1 = 24,
    DeleteRowsEventV1 = 25,
    IncidentEvent = 26,
    HeartbeatEvent = 27,
    IgnorableEvent = 28,
    /// Rows Query 이벤트 (원본 쿼리)
    RowsQueryEvent = 29,
    /// WRITE_ROWS 이벤트 (INSERT)
    WriteRowsEventV2 = 30,
    /// UPDATE_ROWS 이벤트 (UPDATE)
    UpdateRowsEventV2 = 31,
    /// DELETE_ROWS 이벤트 (DELETE)
    DeleteRowsEventV2 = 32,
    /// GTID 이벤트 (Global Transaction ID)
    GtidEvent = 33,
    /// 익명 GTID 이벤트
    AnonymousGtidEvent = 34,
    PreviousGtidsEvent = 35,
}

impl EventType {
    pub fn from_u8(val: u8) -> Self {
        match val {
            1 => EventType::StartEventV3,
            2 => EventType::QueryEvent,
            3 => EventType::StopEvent,
            4 => EventType::RotateEvent,
            5 => EventType::IntvarEvent,
            6 => EventType::LoadEvent,
            7 => EventType::SlaveEvent,
            8 => EventType::CreateFileEvent,
            9 => EventType::AppendBlockEvent,
            10 => EventType::ExecLoadEvent,
            11 => EventType::DeleteFileEvent,
            12 => EventType::NewLoadEvent,
            13 => EventType::RandEvent,
            14 => EventType::UserVarEvent,
            15 => EventType::FormatDescriptionEvent,
            16 => EventType::XidEvent,
            17 => EventType::BeginLoadQueryEvent,
            18 => EventType::ExecuteLoadQueryEvent,
            19 => EventType::TableMapEvent,
            20 => EventType::WriteRowsEventV0,
            21 => EventType::UpdateRowsEventV0,
            22 => EventType::DeleteRowsEventV0,
            23 => EventType::WriteRowsEventV1,
            24 => EventType::UpdateRowsEventV1,
            25 => EventType::DeleteRowsEventV1,
            26 => EventType::IncidentEvent,
            27 => EventType::HeartbeatEvent,
            28 => EventType::IgnorableEvent,
            29 => EventType::RowsQueryEvent,
            30 => EventType::WriteRowsEventV2,
            31 => EventType::UpdateRowsEventV2,
            32 => EventType::DeleteRowsEventV2,
            33 => EventType::GtidEvent,
            34 => EventType::AnonymousGtidEvent,
            35 => EventType::PreviousGtidsEvent,
            _ => EventType::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventType::Unknown => "UNKNOWN_EVENT",
            EventType::StartEventV3 => "START_EVENT_V3",
            EventType::QueryEvent => "QUERY_EVENT",
            EventType::StopEvent => "STOP_EVENT",
            EventType::RotateEvent => "ROTATE_EVENT",
            EventType::IntvarEvent => "INTVAR_EVENT",
            EventType::LoadEvent => "LOAD_EVENT",
            EventType::SlaveEvent => "SLAVE_EVENT",
            EventType::CreateFileEvent => "CREATE_FILE_EVENT",
            EventType::AppendBlockEvent => "APPEND_BLOCK_EVENT",
            EventType::ExecLoadEvent => "EXEC_LOAD_EVENT",
            EventType::DeleteFileEvent => "DELETE_FILE_EVENT",
            EventType::NewLoadEvent => "NEW_LOAD_EVENT",
            EventType::RandEvent => "RAND_EVENT",
            EventType::UserVarEvent => "USER_VAR_EVENT",
            EventType::FormatDescriptionEvent => "FORMAT_DESCRIPTION_EVENT",
            EventType::XidEvent => "XID_EVENT",
            EventType::BeginLoadQueryEvent => "BEGIN_LOAD_QUERY_EVENT",
            EventType::ExecuteLoadQueryEvent => "EXECUTE_LOAD_QUERY_EVENT",
            EventType::TableMapEvent => "TABLE_MAP_EVENT",
            EventType::WriteRowsEventV0 => "WRITE_ROWS_EVENTv0",
            EventType::UpdateRowsEventV0 => "UPDATE_ROWS_EVENTv0",
            EventType::DeleteRowsEventV0 => "DELETE_ROWS_EVENTv0",
            EventType::WriteRowsEventV1 => "WRITE_ROWS_EVENTv1",
            EventType::UpdateRowsEventV1 => "UPDATE_ROWS_EVENTv1",
            EventType::DeleteRowsEventV1 => "DELETE_ROWS_EVENTv1",
            EventType::IncidentEvent => "INCIDENT_EVENT",
            EventType::HeartbeatEvent => "HEARTBEAT_EVENT",
            EventType::IgnorableEvent => "IGNORABLE_EVENT",
            EventType::RowsQueryEvent => "ROWS_QUERY_EVENT",
            EventType::WriteRowsEventV2 => "WRITE_ROWS_EVENTv2",
            EventType::UpdateRowsEventV2 => "UPDATE_ROWS_EVENTv2",
            EventType::DeleteRowsEventV2 => "DELETE_ROWS_EVENTv2",
            EventType::GtidEvent => "GTID_EVENT",
            EventType::AnonymousGtidEvent => "ANONYMOUS_GTID_EVENT",
            EventType::PreviousGtidsEvent => "PREVIOUS_GTIDS_EVENT",
        }
    }

    /// rows 이벤트의 연산 타입 (v0/v1/v2 공통)
    pub fn row_operation(&self) -> Option<OperationType> {
        match self {
            EventType::WriteRowsEventV0
            | EventType::WriteRowsEventV1
            | EventType::WriteRowsEventV2 => Some(OperationType::Insert),
            EventType::UpdateRowsEventV0
            | EventType::UpdateRowsEventV1
            | EventType::UpdateRowsEventV2 => Some(OperationType::Update),
            EventType::DeleteRowsEventV0
            | EventType::DeleteRowsEventV1
            | EventType::DeleteRowsEventV2 => Some(OperationType::Delete),
            _ => None,
        }
    }

    /// v2 rows 이벤트는 post-header 뒤에 extra data가 있음
    pub fn has_rows_extra_data(&self) -> bool {
        matches!(
            self,
            EventType::WriteRowsEventV2
                | EventType::UpdateRowsEventV2
                | EventType::DeleteRowsEventV2
        )
    }
}

/// Binlog 이벤트 헤더 (19 바이트)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHeader {
    /// 이벤트 타임스탬프 (초 단위)
    pub timestamp: u32,
    /// 이벤트 타입
    pub event_type: EventType,
    /// 헤더에 기록된 원래 타입 코드
    pub type_code: u8,
    /// MySQL 서버 ID
    pub server_id: u32,
    /// 이벤트 길이 (헤더 포함, 바이트)
    pub event_length: u32,
    /// 다음 이벤트 위치
    pub next_pos: u32,
    /// 이벤트 플래그
    pub flags: u16,
}

impl EventHeader {
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp as i64, 0).unwrap_or_default()
    }
}

/// 이벤트 체크섬 알고리즘
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    None,
    Crc32,
}

impl ChecksumAlgorithm {
    /// 이벤트 끝에 붙는 체크섬 바이트 수
    pub fn trailer_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::None => 0,
            ChecksumAlgorithm::Crc32 => 4,
        }
    }
}

/// FORMAT_DESCRIPTION 이벤트 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDescriptionData {
    pub binlog_version: u16,
    /// 서버 버전 문자열 (e.g., "8.0.35-log")
    pub server_version: String,
    pub create_timestamp: u32,
    pub header_length: u8,
    pub checksum: ChecksumAlgorithm,
}

/// WRITE_ROWS 이벤트 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRowsData {
    /// 테이블 ID
    pub table_id: u64,
    /// 플래그
    pub flags: u16,
    /// 컬럼 개수
    pub column_count: u64,
    /// 사용된 컬럼 비트맵
    pub columns_present: Vec<u8>,
    /// 행 데이터들
    pub rows: Vec<RowImage>,
}

/// UPDATE_ROWS 이벤트 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRowsData {
    /// 테이블 ID
    pub table_id: u64,
    /// 플래그
    pub flags: u16,
    /// 컬럼 개수
    pub column_count: u64,
    /// 변경 전 이미지의 컬럼 비트맵
    pub columns_present: Vec<u8>,
    /// 변경 후 이미지의 컬럼 비트맵
    pub columns_changed: Vec<u8>,
    /// 변경 전후 데이터 쌍들
    pub rows: Vec<(RowImage, RowImage)>,
}

/// DELETE_ROWS 이벤트 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRowsData {
    /// 테이블 ID
    pub table_id: u64,
    /// 플래그
    pub flags: u16,
    /// 컬럼 개수
    pub column_count: u64,
    /// 사용된 컬럼 비트맵
    pub columns_present: Vec<u8>,
    /// 행 데이터들
    pub rows: Vec<RowImage>,
}

/// 디코딩된 Binlog 이벤트 본문
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BinlogEventData {
    FormatDescription(FormatDescriptionData),
    TableMap(TableMap),
    WriteRows(WriteRowsData),
    UpdateRows(UpdateRowsData),
    DeleteRows(DeleteRowsData),
    /// 디코딩 대상이 아닌 이벤트 (길이만큼 건너뜀)
    Skipped,
}

/// 완성된 Binlog 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinlogEvent {
    /// 이벤트 헤더
    pub header: EventHeader,
    /// 이벤트 데이터
    pub data: BinlogEventData,
}

/// CDC 변경 이벤트 (application-level view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// 연산 타입 (INSERT, UPDATE, DELETE)
    pub op: OperationType,
    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
    /// 테이블 ID
    pub table_id: u64,
    /// 데이터베이스명
    pub database: String,
    /// 테이블명
    pub table: String,
    /// 변경 전 데이터 (UPDATE/DELETE의 경우)
    pub before: Option<RowImage>,
    /// 변경 후 데이터 (INSERT/UPDATE의 경우)
    pub after: Option<RowImage>,
}

/// 변경 연산 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Insert,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Insert => "INSERT",
            OperationType::Update => "UPDATE",
            OperationType::Delete => "DELETE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_codes() {
        for code in 0u8..=35 {
            assert_eq!(EventType::from_u8(code) as u8, code);
        }
        assert_eq!(EventType::from_u8(36), EventType::Unknown);
        assert_eq!(EventType::from_u8(200), EventType::Unknown);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventType::TableMapEvent.name(), "TABLE_MAP_EVENT");
        assert_eq!(EventType::from_u8(31).name(), "UPDATE_ROWS_EVENTv2");
        assert_eq!(EventType::PreviousGtidsEvent.name(), "PREVIOUS_GTIDS_EVENT");
    }

    #[test]
    fn test_row_operations() {
        assert_eq!(EventType::WriteRowsEventV0.row_operation(), Some(OperationType::Insert));
        assert_eq!(EventType::UpdateRowsEventV1.row_operation(), Some(OperationType::Update));
        assert_eq!(EventType::DeleteRowsEventV2.row_operation(), Some(OperationType::Delete));
        assert_eq!(EventType::QueryEvent.row_operation(), None);
        assert!(EventType::WriteRowsEventV2.has_rows_extra_data());
        assert!(!EventType::WriteRowsEventV1.has_rows_extra_data());
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(OperationType::Update.as_str(), "UPDATE");
    }
}
