//! 테이블 맵 컨텍스트와 테이블 ID별 레지스트리
//!
//! 테이블 맵은 한 번 만들어지면 변경되지 않습니다.
//! 같은 ID로 새 테이블 맵이 오면 `Arc`를 교체하므로,
//! 이전 스냅샷을 들고 디코딩 중인 호출자는 영향을 받지 않습니다.

use crate::column_type::ColumnType;
use crate::error::{CdcError, Result};
use crate::metadata::ColumnMetadata;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 테이블 맵 (컬럼 타입 + 메타데이터)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMap {
    pub table_id: u64,
    pub database: String,
    pub table: String,
    column_types: Vec<ColumnType>,
    column_metadata: Vec<ColumnMetadata>,
    nullable_bitmap: Vec<u8>,
}

impl TableMap {
    pub fn new(
        table_id: u64,
        database: impl Into<String>,
        table: impl Into<String>,
        column_types: Vec<ColumnType>,
        column_metadata: Vec<ColumnMetadata>,
        nullable_bitmap: Vec<u8>,
    ) -> Result<Self> {
        if column_types.len() != column_metadata.len() {
            return Err(CdcError::InvalidMetadata(format!(
                "{} column types but {} metadata entries",
                column_types.len(),
                column_metadata.len()
            )));
        }

        Ok(TableMap {
            table_id,
            database: database.into(),
            table: table.into(),
            column_types,
            column_metadata,
            nullable_bitmap,
        })
    }

    pub fn column_count(&self) -> usize {
        self.column_types.len()
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    pub fn column_metadata(&self) -> &[ColumnMetadata] {
        &self.column_metadata
    }

    pub fn column(&self, index: usize) -> Option<(ColumnType, &ColumnMetadata)> {
        let column_type = *self.column_types.get(index)?;
        let metadata = self.column_metadata.get(index)?;
        Some((column_type, metadata))
    }

    pub fn is_nullable(&self, index: usize) -> bool {
        crate::row_image::is_bit_set(&self.nullable_bitmap, index)
    }

    /// `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

/// 테이블 ID → 테이블 맵 스냅샷
#[derive(Debug, Default)]
pub struct TableMapCache {
    maps: RwLock<HashMap<u64, Arc<TableMap>>>,
}

impl TableMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 테이블 맵 등록 (같은 ID는 교체), 이전 스냅샷을 반환
    pub fn insert(&self, table_map: TableMap) -> Option<Arc<TableMap>> {
        let table_id = table_map.table_id;
        debug!(
            "Registering table map {} for {}",
            table_id,
            table_map.qualified_name()
        );
        self.maps.write().insert(table_id, Arc::new(table_map))
    }

    pub fn get(&self, table_id: u64) -> Option<Arc<TableMap>> {
        self.maps.read().get(&table_id).cloned()
    }

    pub fn get_or_err(&self, table_id: u64) -> Result<Arc<TableMap>> {
        self.get(table_id).ok_or(CdcError::UnknownTableId(table_id))
    }

    pub fn remove(&self, table_id: u64) -> Option<Arc<TableMap>> {
        self.maps.write().remove(&table_id)
    }

    pub fn clear(&self) {
        self.maps.write().clear();
    }

    pub fn len(&self) -> usize {
        self.maps.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn users(table_id: u64, columns: usize) -> TableMap {
        TableMap::new(
            table_id,
            "shop",
            "users",
            vec![ColumnType::Long; columns],
            vec![ColumnMetadata::None; columns],
            vec![0xff],
        )
        .unwrap()
    }

    #[test]
    fn test_parallel_lists_must_match() {
        let result = TableMap::new(
            1,
            "shop",
            "users",
            vec![ColumnType::Long, ColumnType::Blob],
            vec![ColumnMetadata::None],
            vec![0],
        );
        assert!(matches!(result, Err(CdcError::InvalidMetadata(_))));
    }

    #[test]
    fn test_column_lookup() {
        let map = users(7, 2);
        assert_eq!(map.column_count(), 2);
        assert_eq!(map.column(1), Some((ColumnType::Long, &ColumnMetadata::None)));
        assert_eq!(map.column(2), None);
        assert!(map.is_nullable(1));
        assert_eq!(map.qualified_name(), "shop.users");
    }

    #[test]
    fn test_replacement_keeps_old_snapshot() {
        let cache = TableMapCache::new();
        assert!(cache.insert(users(7, 2)).is_none());

        let snapshot = cache.get(7).unwrap();
        let previous = cache.insert(users(7, 3)).unwrap();

        assert_eq!(snapshot.column_count(), 2);
        assert!(Arc::ptr_eq(&snapshot, &previous));
        assert_eq!(cache.get(7).unwrap().column_count(), 3);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_table_id() {
        let cache = TableMapCache::new();
        assert!(matches!(cache.get_or_err(42), Err(CdcError::UnknownTableId(42))));
        cache.insert(users(42, 1));
        assert!(cache.remove(42).is_some());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_readers() {
        let cache = Arc::new(TableMapCache::new());
        cache.insert(users(1, 4));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    if i == 0 {
                        cache.insert(users(1, 5));
                    }
                    let count = cache.get(1).unwrap().column_count();
                    assert!(count == 4 || count == 5);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.get(1).unwrap().column_count(), 5);
    }
}
