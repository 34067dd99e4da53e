//! MySQL CDC 엔진 - binlog 버퍼를 변경 이벤트로 변환
//!
//! CDC 엔진은 다음 단계로 진행됩니다:
//! 1. 매직 넘버 확인
//! 2. 이벤트 단위 읽기 (FORMAT_DESCRIPTION으로 체크섬 알고리즘 결정)
//! 3. 테이블 맵 등록 후 rows 이벤트를 ChangeEvent로 변환

use crate::binlog::{BinlogParser, BinlogReader, RawEvent};
use crate::error::{CdcError, Result};
use crate::events::*;
use crate::table_map::{TableMap, TableMapCache};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// 이벤트 디코딩 실패 시 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// 첫 오류에서 스트림 중단
    #[default]
    AbortStream,
    /// 오류 이벤트를 건너뛰고 다음 이벤트부터 계속
    SkipEvent,
}

impl FromStr for ErrorPolicy {
    type Err = CdcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ErrorPolicy::AbortStream),
            "skip" => Ok(ErrorPolicy::SkipEvent),
            other => Err(CdcError::InvalidValue(format!(
                "unknown error policy '{}' (expected abort|skip)",
                other
            ))),
        }
    }
}

/// CDC 엔진 설정
#[derive(Debug, Clone)]
pub struct CdcConfig {
    /// 비어 있으면 모든 데이터베이스
    pub databases: Vec<String>,
    /// `table` 또는 `database.table`
    pub tables: Option<Vec<String>>,
    pub error_policy: ErrorPolicy,
    pub verify_checksum: bool,
}

impl Default for CdcConfig {
    fn default() -> Self {
        CdcConfig {
            databases: Vec::new(),
            tables: None,
            error_policy: ErrorPolicy::AbortStream,
            verify_checksum: true,
        }
    }
}

impl CdcConfig {
    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// 필터 적용 여부
    pub fn includes(&self, table_map: &TableMap) -> bool {
        if !self.databases.is_empty() && !self.databases.contains(&table_map.database) {
            return false;
        }

        match &self.tables {
            Some(tables) => {
                let qualified = table_map.qualified_name();
                tables
                    .iter()
                    .any(|t| *t == table_map.table || *t == qualified)
            }
            None => true,
        }
    }
}

/// 처리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub events: u64,
    pub change_events: u64,
    pub skipped_events: u64,
    pub filtered_events: u64,
}

/// MySQL CDC 엔진
pub struct CdcEngine {
    config: CdcConfig,
    tables: TableMapCache,
    checksum: ChecksumAlgorithm,
    stats: EngineStats,
}

impl CdcEngine {
    /// 새 CDC 엔진 생성
    pub fn new(config: CdcConfig) -> Self {
        CdcEngine {
            config,
            tables: TableMapCache::new(),
            checksum: ChecksumAlgorithm::None,
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &CdcConfig {
        &self.config
    }

    pub fn tables(&self) -> &TableMapCache {
        &self.tables
    }

    pub fn checksum(&self) -> ChecksumAlgorithm {
        self.checksum
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// binlog 파일을 읽어 처리
    pub async fn process_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<ChangeEvent>> {
        let path = path.as_ref();
        info!("Reading binlog file {}", path.display());
        let data = tokio::fs::read(path).await?;
        self.process(Bytes::from(data))
    }

    /// 메모리의 binlog 버퍼 전체를 처리
    pub fn process(&mut self, data: Bytes) -> Result<Vec<ChangeEvent>> {
        let mut reader =
            BinlogReader::new(data)?.with_checksum_verification(self.config.verify_checksum);
        let mut changes = Vec::new();

        // 프레이밍 오류는 정책과 무관하게 중단
        while let Some(event) = reader.next_event()? {
            self.checksum = reader.checksum();
            self.stats.events += 1;

            match self.handle_event(&event) {
                Ok(events) => {
                    self.stats.change_events += events.len() as u64;
                    changes.extend(events);
                }
                Err(e) if self.config.error_policy == ErrorPolicy::SkipEvent && e.is_row_level() => {
                    warn!(
                        "Skipping {} at {}: {}",
                        event.header.event_type.name(),
                        event.offset,
                        e
                    );
                    self.stats.skipped_events += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Processed {} events, {} changes, {} skipped",
            self.stats.events, self.stats.change_events, self.stats.skipped_events
        );
        Ok(changes)
    }

    /// 이벤트 하나 처리
    fn handle_event(&mut self, event: &RawEvent) -> Result<Vec<ChangeEvent>> {
        if event.header.event_type.row_operation().is_some() && !self.rows_included(event) {
            self.stats.filtered_events += 1;
            return Ok(Vec::new());
        }

        let decoded = match BinlogParser::parse_event(event, &self.tables) {
            Ok(decoded) => decoded,
            Err(e) => {
                if event.header.event_type == EventType::TableMapEvent {
                    self.forget_table_map(event);
                }
                return Err(e);
            }
        };
        let timestamp = decoded.header.datetime();

        let changes = match decoded.data {
            BinlogEventData::FormatDescription(fde) => {
                info!(
                    "Binlog v{} from server {}, checksum {:?}",
                    fde.binlog_version, fde.server_version, fde.checksum
                );
                Vec::new()
            }
            BinlogEventData::TableMap(table_map) => {
                self.handle_table_map(table_map);
                Vec::new()
            }
            BinlogEventData::WriteRows(data) => {
                let table = self.tables.get_or_err(data.table_id)?;
                write_rows_to_change_event(data, &table, timestamp)
            }
            BinlogEventData::UpdateRows(data) => {
                let table = self.tables.get_or_err(data.table_id)?;
                update_rows_to_change_event(data, &table, timestamp)
            }
            BinlogEventData::DeleteRows(data) => {
                let table = self.tables.get_or_err(data.table_id)?;
                delete_rows_to_change_event(data, &table, timestamp)
            }
            BinlogEventData::Skipped => Vec::new(),
        };

        Ok(changes)
    }

    /// 테이블 맵 이벤트 처리
    fn handle_table_map(&mut self, table_map: TableMap) {
        debug!(
            "Table map event: {} ({} columns)",
            table_map.qualified_name(),
            table_map.column_count()
        );
        self.tables.insert(table_map);
    }

    /// 재정의에 실패한 테이블 ID의 이전 맵 제거 (이후 rows 이벤트는 UnknownTableId)
    fn forget_table_map(&mut self, event: &RawEvent) {
        let Some(table_id) = payload_table_id(&event.payload) else {
            return;
        };
        if let Some(previous) = self.tables.remove(table_id) {
            warn!(
                "Dropping table map {} for {} after failed redefinition",
                table_id,
                previous.qualified_name()
            );
        }
    }

    /// rows 이벤트가 필터를 통과하는지 (테이블 맵이 없으면 디코딩 단계에서 오류)
    fn rows_included(&self, event: &RawEvent) -> bool {
        let Some(table_id) = payload_table_id(&event.payload) else {
            return true;
        };

        match self.tables.get(table_id) {
            Some(table_map) => self.config.includes(&table_map),
            None => true,
        }
    }
}

/// 테이블 맵 / rows 이벤트 본문 앞 6 바이트의 테이블 ID
fn payload_table_id(payload: &[u8]) -> Option<u64> {
    let id = payload.get(..6)?;
    Some(id.iter().rev().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

/// WRITE_ROWS 이벤트를 ChangeEvent로 변환
fn write_rows_to_change_event(
    data: WriteRowsData,
    table: &TableMap,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> Vec<ChangeEvent> {
    data.rows
        .into_iter()
        .map(|row| ChangeEvent {
            op: OperationType::Insert,
            timestamp,
            table_id: data.table_id,
            database: table.database.clone(),
            table: table.table.clone(),
            before: None,
            after: Some(row),
        })
        .collect()
}

/// UPDATE_ROWS 이벤트를 ChangeEvent로 변환
fn update_rows_to_change_event(
    data: UpdateRowsData,
    table: &TableMap,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> Vec<ChangeEvent> {
    data.rows
        .into_iter()
        .map(|(before, after)| ChangeEvent {
            op: OperationType::Update,
            timestamp,
            table_id: data.table_id,
            database: table.database.clone(),
            table: table.table.clone(),
            before: Some(before),
            after: Some(after),
        })
        .collect()
}

/// DELETE_ROWS 이벤트를 ChangeEvent로 변환
fn delete_rows_to_change_event(
    data: DeleteRowsData,
    table: &TableMap,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> Vec<ChangeEvent> {
    data.rows
        .into_iter()
        .map(|row| ChangeEvent {
            op: OperationType::Delete,
            timestamp,
            table_id: data.table_id,
            database: table.database.clone(),
            table: table.table.clone(),
            before: Some(row),
            after: None,
        })
        .collect()
}
