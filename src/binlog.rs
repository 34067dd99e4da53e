//! MySQL Binlog 프로토콜 파싱
//!
//! Binlog 파일의 바이너리 형식을 파싱합니다.
//! 헤더: 4 바이트 매직 넘버 (0xfe 0x62 0x69 0x6e)
//! 각 이벤트:
//!   - Timestamp (4 bytes)
//!   - Type (1 byte)
//!   - Server ID (4 bytes)
//!   - Event Length (4 bytes)
//!   - Next Position (4 bytes)
//!   - Flags (2 bytes)
//!   - Event Data (variable)
//!   - Checksum (4 bytes, CRC32 사용 시)

use crate::column_type::ColumnType;
use crate::error::{CdcError, Result};
use crate::events::*;
use crate::metadata::read_metadata_block;
use crate::packed_int::{read_bytes, read_packed_int, remaining};
use crate::row_image::{decode_row, RowImage};
use crate::table_map::{TableMap, TableMapCache};
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;
use std::io::{Cursor, Read};
use tracing::{debug, trace};

pub const BINLOG_MAGIC: [u8; 4] = [0xfe, 0x62, 0x69, 0x6e]; // ".bin" in ASCII
pub const EVENT_HEADER_SIZE: usize = 19;
const SERVER_VERSION_LEN: usize = 50;
/// FORMAT_DESCRIPTION 끝의 체크섬 알고리즘(1) + 체크섬(4)
const FDE_CHECKSUM_TRAILER: usize = 5;

/// Binlog 파서
pub struct BinlogParser;

impl BinlogParser {
    /// 매직 넘버 확인 (정확히 4 바이트여야 함)
    pub fn verify_magic(data: &[u8]) -> bool {
        data == BINLOG_MAGIC
    }

    /// Binlog 파일 헤더 검증
    pub fn check_magic(data: &[u8]) -> Result<()> {
        match data.get(..BINLOG_MAGIC.len()) {
            Some(magic) if Self::verify_magic(magic) => Ok(()),
            _ => Err(CdcError::MalformedMagic),
        }
    }

    /// 이벤트 헤더 파싱
    pub fn parse_header(data: &[u8]) -> Result<EventHeader> {
        if data.len() < EVENT_HEADER_SIZE {
            return Err(CdcError::TruncatedInput(format!(
                "event header needs {} bytes, {} available",
                EVENT_HEADER_SIZE,
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);

        let timestamp = cursor.read_u32::<LittleEndian>()?;
        let type_code = cursor.read_u8()?;
        let server_id = cursor.read_u32::<LittleEndian>()?;
        let event_length = cursor.read_u32::<LittleEndian>()?;
        let next_pos = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;

        if (event_length as usize) < EVENT_HEADER_SIZE {
            return Err(CdcError::InvalidEvent(format!(
                "event length {} shorter than header",
                event_length
            )));
        }

        Ok(EventHeader {
            timestamp,
            event_type: EventType::from_u8(type_code),
            type_code,
            server_id,
            event_length,
            next_pos,
            flags,
        })
    }

    /// FORMAT_DESCRIPTION 이벤트 파싱 (15)
    ///
    /// `body`는 헤더 이후 이벤트 끝까지 (체크섬 포함)입니다.
    pub fn parse_format_description(body: &[u8]) -> Result<FormatDescriptionData> {
        let mut cursor = Cursor::new(body);

        let binlog_version = cursor.read_u16::<LittleEndian>()?;
        let mut version_bytes = [0u8; SERVER_VERSION_LEN];
        cursor.read_exact(&mut version_bytes)?;
        let server_version = String::from_utf8_lossy(&version_bytes)
            .trim_end_matches('\0')
            .to_string();
        let create_timestamp = cursor.read_u32::<LittleEndian>()?;
        let header_length = cursor.read_u8()?;

        let checksum = if version_has_checksum(&server_version) {
            let after_fixed = cursor.position() as usize;
            if body.len() < after_fixed + FDE_CHECKSUM_TRAILER {
                return Err(CdcError::TruncatedInput(
                    "format description missing checksum algorithm".to_string(),
                ));
            }
            match body[body.len() - FDE_CHECKSUM_TRAILER] {
                1 => ChecksumAlgorithm::Crc32,
                _ => ChecksumAlgorithm::None,
            }
        } else {
            ChecksumAlgorithm::None
        };

        debug!(
            "Format description: binlog v{}, server {}, checksum {:?}",
            binlog_version, server_version, checksum
        );

        Ok(FormatDescriptionData {
            binlog_version,
            server_version,
            create_timestamp,
            header_length,
            checksum,
        })
    }

    /// 테이블 맵 이벤트 파싱 (19)
    pub fn parse_table_map_event(data: &[u8]) -> Result<TableMap> {
        let mut cursor = Cursor::new(data);

        let table_id = cursor.read_u48::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;

        // 데이터베이스명 (길이 + 이름 + NUL)
        let db_len = cursor.read_u8()? as usize;
        let database = String::from_utf8_lossy(&read_bytes(&mut cursor, db_len)?).to_string();
        cursor.read_u8()?;

        // 테이블명 (길이 + 이름 + NUL)
        let tbl_len = cursor.read_u8()? as usize;
        let table = String::from_utf8_lossy(&read_bytes(&mut cursor, tbl_len)?).to_string();
        cursor.read_u8()?;

        // 컬럼 타입들
        let column_count = read_packed_int(&mut cursor)? as usize;
        let column_types = read_bytes(&mut cursor, column_count)?
            .into_iter()
            .map(ColumnType::from_u8)
            .collect::<Result<Vec<_>>>()?;

        // 메타데이터 블록
        let metadata_length = read_packed_int(&mut cursor)? as usize;
        let block = read_bytes(&mut cursor, metadata_length)?;
        let column_metadata = read_metadata_block(&block, &column_types)?;

        // nullable 비트맵
        let nullable_bitmap = read_bytes(&mut cursor, column_count.div_ceil(8))?;

        // 이후의 optional metadata (MySQL 8 컬럼명 등)는 사용하지 않음
        trace!(
            "Table map {} {}.{} ignores {} trailing bytes",
            table_id,
            database,
            table,
            remaining(&cursor)
        );

        TableMap::new(
            table_id,
            database,
            table,
            column_types,
            column_metadata,
            nullable_bitmap,
        )
    }

    /// WRITE_ROWS 이벤트 파싱 (20, 23, 30)
    pub fn parse_write_rows_event(
        data: &[u8],
        event_type: EventType,
        tables: &TableMapCache,
    ) -> Result<WriteRowsData> {
        let mut cursor = Cursor::new(data);
        let header = read_rows_header(&mut cursor, event_type, tables)?;
        let columns_present = read_bytes(&mut cursor, header.bitmap_len())?;

        let mut rows = Vec::new();
        while remaining(&cursor) > 0 {
            let start = cursor.position();
            rows.push(decode_row(&mut cursor, &header.table_map, &columns_present)?);
            ensure_progress(&cursor, start)?;
        }

        Ok(WriteRowsData {
            table_id: header.table_id,
            flags: header.flags,
            column_count: header.column_count,
            columns_present,
            rows,
        })
    }

    /// UPDATE_ROWS 이벤트 파싱 (21, 24, 31)
    pub fn parse_update_rows_event(
        data: &[u8],
        event_type: EventType,
        tables: &TableMapCache,
    ) -> Result<UpdateRowsData> {
        let mut cursor = Cursor::new(data);
        let header = read_rows_header(&mut cursor, event_type, tables)?;

        // 변경 전 / 변경 후 컬럼 비트맵
        let columns_present = read_bytes(&mut cursor, header.bitmap_len())?;
        let columns_changed = read_bytes(&mut cursor, header.bitmap_len())?;

        let mut rows = Vec::new();
        while remaining(&cursor) > 0 {
            let start = cursor.position();
            let before = decode_row(&mut cursor, &header.table_map, &columns_present)?;
            let after = decode_row(&mut cursor, &header.table_map, &columns_changed)?;
            ensure_progress(&cursor, start)?;
            rows.push((before, after));
        }

        Ok(UpdateRowsData {
            table_id: header.table_id,
            flags: header.flags,
            column_count: header.column_count,
            columns_present,
            columns_changed,
            rows,
        })
    }

    /// DELETE_ROWS 이벤트 파싱 (22, 25, 32)
    pub fn parse_delete_rows_event(
        data: &[u8],
        event_type: EventType,
        tables: &TableMapCache,
    ) -> Result<DeleteRowsData> {
        let mut cursor = Cursor::new(data);
        let header = read_rows_header(&mut cursor, event_type, tables)?;
        let columns_present = read_bytes(&mut cursor, header.bitmap_len())?;

        let mut rows: Vec<RowImage> = Vec::new();
        while remaining(&cursor) > 0 {
            let start = cursor.position();
            rows.push(decode_row(&mut cursor, &header.table_map, &columns_present)?);
            ensure_progress(&cursor, start)?;
        }

        Ok(DeleteRowsData {
            table_id: header.table_id,
            flags: header.flags,
            column_count: header.column_count,
            columns_present,
            rows,
        })
    }

    /// 원시 이벤트 하나를 디코딩
    pub fn parse_event(event: &RawEvent, tables: &TableMapCache) -> Result<BinlogEvent> {
        let header = event.header.clone();
        let payload = &event.payload[..];

        let data = match header.event_type {
            EventType::FormatDescriptionEvent => BinlogEventData::FormatDescription(
                Self::parse_format_description(&event.raw[EVENT_HEADER_SIZE..])?,
            ),
            EventType::TableMapEvent => {
                BinlogEventData::TableMap(Self::parse_table_map_event(payload)?)
            }
            event_type => match event_type.row_operation() {
                Some(OperationType::Insert) => BinlogEventData::WriteRows(
                    Self::parse_write_rows_event(payload, event_type, tables)?,
                ),
                Some(OperationType::Update) => BinlogEventData::UpdateRows(
                    Self::parse_update_rows_event(payload, event_type, tables)?,
                ),
                Some(OperationType::Delete) => BinlogEventData::DeleteRows(
                    Self::parse_delete_rows_event(payload, event_type, tables)?,
                ),
                None => BinlogEventData::Skipped,
            },
        };

        Ok(BinlogEvent { header, data })
    }
}

/// rows 이벤트 공통 헤더
struct RowsHeader {
    table_id: u64,
    flags: u16,
    column_count: u64,
    table_map: std::sync::Arc<TableMap>,
}

impl RowsHeader {
    fn bitmap_len(&self) -> usize {
        (self.column_count as usize).div_ceil(8)
    }
}

fn read_rows_header(
    cursor: &mut Cursor<&[u8]>,
    event_type: EventType,
    tables: &TableMapCache,
) -> Result<RowsHeader> {
    let table_id = cursor.read_u48::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;

    // v2: extra data 길이는 자기 자신(2 바이트)을 포함
    if event_type.has_rows_extra_data() {
        let extra_len = cursor.read_u16::<LittleEndian>()? as usize;
        if extra_len < 2 {
            return Err(CdcError::InvalidEvent(format!(
                "rows event extra data length {} < 2",
                extra_len
            )));
        }
        read_bytes(cursor, extra_len - 2)?;
    }

    let column_count = read_packed_int(cursor)?;
    let table_map = tables.get_or_err(table_id)?;
    if column_count != table_map.column_count() as u64 {
        return Err(CdcError::InvalidMetadata(format!(
            "rows event for {} has {} columns, table map has {}",
            table_map.qualified_name(),
            column_count,
            table_map.column_count()
        )));
    }

    Ok(RowsHeader {
        table_id,
        flags,
        column_count,
        table_map,
    })
}

/// 행을 읽고도 커서가 그대로면 남은 바이트를 해석할 수 없음
fn ensure_progress(cursor: &Cursor<&[u8]>, start: u64) -> Result<()> {
    if cursor.position() == start {
        return Err(CdcError::InvalidEvent(format!(
            "rows event made no progress at offset {} ({} bytes left)",
            start,
            remaining(cursor)
        )));
    }
    Ok(())
}

/// 서버 버전으로 체크섬 지원 여부 판단 (MySQL 5.6.1+, MariaDB 5.3+)
fn version_has_checksum(version: &str) -> bool {
    let mut parts = version.split(|c: char| !c.is_ascii_digit());
    let mut next = || parts.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
    let (major, minor, patch) = (next(), next(), next());

    if version.contains("MariaDB") {
        return (major, minor) >= (5, 3);
    }
    (major, minor, patch) >= (5, 6, 1)
}

/// 헤더와 본문이 잘린 원시 이벤트
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub header: EventHeader,
    /// 이벤트 전체 (헤더 + 본문 + 체크섬)
    pub raw: Bytes,
    /// 헤더와 체크섬을 제외한 본문
    pub payload: Bytes,
    /// 이 이벤트의 파일 내 시작 위치
    pub offset: usize,
}

/// 메모리에 올라온 binlog 버퍼를 이벤트 단위로 읽는 리더
pub struct BinlogReader {
    data: Bytes,
    position: usize,
    checksum: ChecksumAlgorithm,
    verify_checksum: bool,
}

impl BinlogReader {
    /// 매직 넘버로 시작하는 binlog 파일 내용
    pub fn new(data: Bytes) -> Result<Self> {
        BinlogParser::check_magic(&data)?;
        Ok(BinlogReader {
            data,
            position: BINLOG_MAGIC.len(),
            checksum: ChecksumAlgorithm::None,
            verify_checksum: true,
        })
    }

    pub fn with_checksum_verification(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    pub fn checksum(&self) -> ChecksumAlgorithm {
        self.checksum
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// 다음 이벤트 (버퍼 끝이면 `None`)
    pub fn next_event(&mut self) -> Result<Option<RawEvent>> {
        if self.position == self.data.len() {
            return Ok(None);
        }

        let offset = self.position;
        let header = BinlogParser::parse_header(&self.data[offset..])?;
        let length = header.event_length as usize;
        let available = self.data.len() - offset;
        if length > available {
            return Err(CdcError::TruncatedInput(format!(
                "event at {} declares {} bytes, {} available",
                offset, length, available
            )));
        }

        let raw = self.data.slice(offset..offset + length);
        self.position = offset + length;

        let trailer = if header.event_type == EventType::FormatDescriptionEvent {
            let fde = BinlogParser::parse_format_description(&raw[EVENT_HEADER_SIZE..])?;
            self.checksum = fde.checksum;
            if version_has_checksum(&fde.server_version) {
                FDE_CHECKSUM_TRAILER
            } else {
                0
            }
        } else {
            self.checksum.trailer_len()
        };

        if length < EVENT_HEADER_SIZE + trailer {
            return Err(CdcError::InvalidEvent(format!(
                "{} at {} too short for checksum",
                header.event_type.name(),
                offset
            )));
        }

        if self.verify_checksum && self.checksum == ChecksumAlgorithm::Crc32 {
            verify_crc32(&raw)?;
        }

        let payload = raw.slice(EVENT_HEADER_SIZE..length - trailer);
        trace!(
            "Read {} at {} ({} bytes)",
            header.event_type.name(),
            offset,
            length
        );

        Ok(Some(RawEvent {
            header,
            raw,
            payload,
            offset,
        }))
    }
}

impl Iterator for BinlogReader {
    type Item = Result<RawEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// 이벤트 끝 4 바이트의 CRC32 검증
fn verify_crc32(raw: &[u8]) -> Result<()> {
    let split = raw.len() - 4;
    let expected = u32::from_le_bytes([raw[split], raw[split + 1], raw[split + 2], raw[split + 3]]);
    let actual = crc32fast::hash(&raw[..split]);
    if expected != actual {
        return Err(CdcError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}
