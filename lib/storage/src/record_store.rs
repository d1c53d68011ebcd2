// LMDB-backed product table: (id PK, name, category, image_path, embedding_blob)
use heed::byteorder::BE;
use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use visearch_core::{codec, Error, ProductInfo, ProductRecord, RecordSource, Result, Vector};

const DB_PRODUCTS: &str = "products";
const DB_META: &str = "meta";
const META_DIMENSION: &str = "dimension";

/// 10 GiB of address space; LMDB only touches what it uses.
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub map_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
        }
    }
}

/// On-disk row. The embedding is kept as a codec blob, not a serde array,
/// so the value layout stays independent of the row encoding.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    name: String,
    category: String,
    image_path: PathBuf,
    embedding: Vec<u8>,
}

/// Durable store of product records keyed by id.
///
/// Each upsert is a single LMDB write transaction: readers see either the
/// previous row or the new one, and LMDB serializes concurrent writers.
pub struct RecordStore {
    env: Arc<Env>,
    products_db: Database<U64<BE>, Bytes>,
    meta_db: Database<Str, Bytes>,
    path: PathBuf,
}

fn storage_err(e: heed::Error) -> Error {
    Error::Storage(e.to_string())
}

impl RecordStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, StoreConfig::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)
            .map_err(|e| Error::StoreUnavailable(format!("{}: {}", path.display(), e)))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size)
                .max_dbs(2)
                .open(&path)
        }
        .map_err(|e| Error::StoreUnavailable(format!("{}: {}", path.display(), e)))?;
        let env = Arc::new(env);

        let mut wtxn = env
            .write_txn()
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        let products_db = env
            .create_database(&mut wtxn, Some(DB_PRODUCTS))
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        let meta_db = env
            .create_database(&mut wtxn, Some(DB_META))
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        info!("Record store opened at {:?}", path);

        Ok(Self {
            env,
            products_db,
            meta_db,
            path,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the record with `record.id`.
    ///
    /// The first upsert pins the store's embedding dimension; later records
    /// must match it.
    pub fn upsert(&self, record: &ProductRecord) -> Result<()> {
        if record.embedding.is_empty() {
            return Err(Error::EmptyVector);
        }
        record.embedding.ensure_finite()?;
        let dim = record.embedding.dim();

        let row = StoredRow {
            name: record.name.clone(),
            category: record.category.clone(),
            image_path: record.image_path.clone(),
            embedding: codec::encode(record.embedding.as_slice()),
        };
        let value = bincode::serialize(&row).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut wtxn = self.env.write_txn().map_err(storage_err)?;
        match self.meta_dimension(&wtxn)? {
            Some(expected) if expected != dim => {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
            Some(_) => {}
            None => {
                self.meta_db
                    .put(&mut wtxn, META_DIMENSION, &(dim as u32).to_le_bytes())
                    .map_err(storage_err)?;
            }
        }
        self.products_db
            .put(&mut wtxn, &record.id, &value)
            .map_err(storage_err)?;
        wtxn.commit().map_err(storage_err)?;

        debug!("Upserted product {} ({} dims)", record.id, dim);
        Ok(())
    }

    pub fn get(&self, id: u64) -> Result<Option<ProductRecord>> {
        let rtxn = self.env.read_txn().map_err(storage_err)?;
        let expected = self.meta_dimension(&rtxn)?;
        match self.products_db.get(&rtxn, &id).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode_record(id, bytes, expected)?)),
            None => Ok(None),
        }
    }

    /// Every record in ascending id order. Aborts on the first malformed row.
    pub fn list_all(&self) -> Result<Vec<ProductRecord>> {
        let rtxn = self.env.read_txn().map_err(storage_err)?;
        let expected = self.meta_dimension(&rtxn)?;

        let mut records = Vec::new();
        for entry in self.products_db.iter(&rtxn).map_err(storage_err)? {
            let (id, bytes) = entry.map_err(storage_err)?;
            records.push(decode_record(id, bytes, expected)?);
        }
        Ok(records)
    }

    /// First `limit` products by id, without decoding embeddings.
    pub fn sample(&self, limit: usize) -> Result<Vec<ProductInfo>> {
        let rtxn = self.env.read_txn().map_err(storage_err)?;
        let mut out = Vec::with_capacity(limit);
        for entry in self.products_db.iter(&rtxn).map_err(storage_err)?.take(limit) {
            let (id, bytes) = entry.map_err(storage_err)?;
            let row = decode_row(id, bytes)?;
            out.push(ProductInfo {
                id,
                name: row.name,
                category: row.category,
                image_path: row.image_path,
            });
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<u64> {
        let rtxn = self.env.read_txn().map_err(storage_err)?;
        self.products_db.len(&rtxn).map_err(storage_err)
    }

    /// Dimension pinned by the first upsert, if any.
    pub fn dimension(&self) -> Result<Option<usize>> {
        let rtxn = self.env.read_txn().map_err(storage_err)?;
        self.meta_dimension(&rtxn)
    }

    fn meta_dimension(&self, txn: &heed::RoTxn<'_>) -> Result<Option<usize>> {
        match self.meta_db.get(txn, META_DIMENSION).map_err(storage_err)? {
            Some(bytes) => {
                let raw: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| Error::Storage("malformed dimension entry".to_string()))?;
                Ok(Some(u32::from_le_bytes(raw) as usize))
            }
            None => Ok(None),
        }
    }
}

impl RecordSource for RecordStore {
    fn list_all(&self) -> Result<Vec<ProductRecord>> {
        RecordStore::list_all(self)
    }
}

fn decode_row(id: u64, bytes: &[u8]) -> Result<StoredRow> {
    bincode::deserialize(bytes).map_err(|e| Error::CorruptRecord {
        id,
        reason: e.to_string(),
    })
}

fn decode_record(id: u64, bytes: &[u8], expected: Option<usize>) -> Result<ProductRecord> {
    let row = decode_row(id, bytes)?;
    let embedding = codec::decode(&row.embedding).map_err(|e| Error::CorruptRecord {
        id,
        reason: e.to_string(),
    })?;
    if let Some(expected) = expected {
        if embedding.len() != expected {
            return Err(Error::CorruptRecord {
                id,
                reason: format!(
                    "embedding has {} components, store dimension is {}",
                    embedding.len(),
                    expected
                ),
            });
        }
    }
    Ok(ProductRecord {
        id,
        name: row.name,
        category: row.category,
        image_path: row.image_path,
        embedding: Vector::new(embedding),
    })
}
