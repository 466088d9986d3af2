use thiserror::Error;

use crate::common::config::PageId;

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("i/o failure on page {page_id}: {source}")]
    Io {
        page_id: PageId,
        source: std::io::Error,
    },
    #[error("failed to open database file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("table {0} already exists")]
    TableExists(String),
    #[error("table {0} not found")]
    TableNotFound(String),
    #[error("index {0} already exists")]
    IndexExists(String),
    #[error("column {column} of table {table} cannot back an index key")]
    InvalidKeyColumn { table: String, column: String },
    #[error("buffer pool could not allocate pages for {0}")]
    OutOfPages(String),
}
