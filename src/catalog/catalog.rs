use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::catalog::schema::Schema;
use crate::common::config::Oid;
use crate::common::exception::CatalogError;
use crate::common::rid::RID;
use crate::container::extendible_hash_table::ExtendibleHashTable;
use crate::container::hash_function::Xxh3HashFunction;
use crate::storage::index::int_comparator::I64Comparator;
use crate::storage::table::table_heap::TableHeap;
use crate::types_db::type_id::TypeId;

/// The index type the catalog builds over integer key columns.
pub type RecordIndex = ExtendibleHashTable<i64, RID, I64Comparator, Xxh3HashFunction<i64>>;

pub struct TableInfo {
    oid: Oid,
    name: String,
    schema: Schema,
    table: Arc<TableHeap>,
}

impl TableInfo {
    pub fn get_oid(&self) -> Oid {
        self.oid
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_table(&self) -> &Arc<TableHeap> {
        &self.table
    }
}

pub struct IndexInfo {
    oid: Oid,
    name: String,
    table_name: String,
    /// Column the index key is drawn from.
    key_attr: usize,
    index: RecordIndex,
}

impl IndexInfo {
    pub fn get_oid(&self) -> Oid {
        self.oid
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_table_name(&self) -> &str {
        &self.table_name
    }

    pub fn get_key_attr(&self) -> usize {
        self.key_attr
    }

    pub fn get_index(&self) -> &RecordIndex {
        &self.index
    }
}

/// Registry of tables and their secondary indexes.
pub struct Catalog {
    bpm: Arc<BufferPoolManager>,
    next_oid: AtomicU64,
    tables: RwLock<HashMap<Oid, Arc<TableInfo>>>,
    table_names: RwLock<HashMap<String, Oid>>,
    indexes: RwLock<HashMap<Oid, Arc<IndexInfo>>>,
    /// Table name -> index oids over that table.
    table_indexes: RwLock<HashMap<String, Vec<Oid>>>,
}

impl Catalog {
    pub fn new(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            next_oid: AtomicU64::new(0),
            tables: RwLock::new(HashMap::new()),
            table_names: RwLock::new(HashMap::new()),
            indexes: RwLock::new(HashMap::new()),
            table_indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a table with the given schema.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<Arc<TableInfo>, CatalogError> {
        let mut table_names = self.table_names.write();
        if table_names.contains_key(name) {
            return Err(CatalogError::TableExists(name.to_string()));
        }
        let oid = self.next_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(TableInfo {
            oid,
            name: name.to_string(),
            schema,
            table: Arc::new(TableHeap::new()),
        });
        table_names.insert(name.to_string(), oid);
        self.tables.write().insert(oid, Arc::clone(&info));
        info!("created table {} (oid {})", name, oid);
        Ok(info)
    }

    pub fn get_table(&self, oid: Oid) -> Option<Arc<TableInfo>> {
        self.tables.read().get(&oid).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let oid = *self.table_names.read().get(name)?;
        self.get_table(oid)
    }

    /// Creates an extendible-hash index over an integer column of an
    /// existing table and back-fills it from the table's live rows.
    pub fn create_index(
        &self,
        index_name: &str,
        table_name: &str,
        key_column: &str,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        let table_info = self
            .get_table_by_name(table_name)
            .ok_or_else(|| CatalogError::TableNotFound(table_name.to_string()))?;
        let key_attr = table_info
            .get_schema()
            .column_index(key_column)
            .ok_or_else(|| CatalogError::InvalidKeyColumn {
                table: table_name.to_string(),
                column: key_column.to_string(),
            })?;
        if table_info.get_schema().get_column(key_attr).get_type() != TypeId::Integer {
            return Err(CatalogError::InvalidKeyColumn {
                table: table_name.to_string(),
                column: key_column.to_string(),
            });
        }
        {
            let table_indexes = self.table_indexes.read();
            let indexes = self.indexes.read();
            if let Some(oids) = table_indexes.get(table_name) {
                if oids
                    .iter()
                    .any(|oid| indexes.get(oid).map(|i| i.get_name()) == Some(index_name))
                {
                    return Err(CatalogError::IndexExists(index_name.to_string()));
                }
            }
        }

        let index = RecordIndex::new(
            index_name,
            Arc::clone(&self.bpm),
            I64Comparator::new(),
            Xxh3HashFunction::new(),
        )
        .ok_or_else(|| CatalogError::OutOfPages(index_name.to_string()))?;

        // Back-fill from whatever the table already holds.
        let heap = table_info.get_table();
        for rid in heap.scan() {
            if let Some(tuple) = heap.get_tuple(rid) {
                if let Some(key) = tuple.get_value(key_attr).as_i64() {
                    index.insert(None, &key, &rid);
                }
            }
        }

        let oid = self.next_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(IndexInfo {
            oid,
            name: index_name.to_string(),
            table_name: table_name.to_string(),
            key_attr,
            index,
        });
        self.indexes.write().insert(oid, Arc::clone(&info));
        self.table_indexes
            .write()
            .entry(table_name.to_string())
            .or_default()
            .push(oid);
        info!(
            "created index {} on {}.{} (oid {})",
            index_name, table_name, key_column, oid
        );
        Ok(info)
    }

    /// Every index over the named table.
    pub fn get_table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        let table_indexes = self.table_indexes.read();
        let indexes = self.indexes.read();
        table_indexes
            .get(table_name)
            .map(|oids| oids.iter().filter_map(|oid| indexes.get(oid).cloned()).collect())
            .unwrap_or_default()
    }
}
