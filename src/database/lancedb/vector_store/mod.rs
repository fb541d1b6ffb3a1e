
use super::{DocumentMetadata, DocumentRecord};
use crate::embeddings::Embedder;
use crate::{DocuSenseError, Result, config::Config};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Vector-indexed document store holding one LanceDB table per collection
///
/// Every collection is created with the embedder's dimension. Inserts into the
/// same collection are serialized so that `id == row count before insert`
/// holds; searches do not lock and see the latest committed table version.
pub struct DocumentStore {
    connection: Connection,
    embedder: Arc<dyn Embedder>,
    dimension: usize,
    db_path: PathBuf,
    create_lock: tokio::sync::Mutex<()>,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// A ranked result of a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: u64,
    pub metadata: DocumentMetadata,
    /// `1 - distance`, higher is more similar
    pub similarity_score: f32,
    /// Cosine distance to the query vector
    pub distance: f32,
}

impl DocumentStore {
    /// Open the vector database configured for this installation
    #[inline]
    pub async fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::open(config.vector_database_path(), embedder).await
    }

    /// Open (or create) a vector database directory at `db_path`
    #[inline]
    pub async fn open(db_path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let db_path = db_path.into();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            DocuSenseError::storage(
                "*",
                "open",
                format!("Failed to create vector database directory: {}", e),
            )
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| DocuSenseError::storage("*", "open", e))?;

        let dimension = embedder.dimension();
        info!(
            "Document store opened at {} ({} dimensions)",
            db_path.display(),
            dimension
        );

        Ok(Self {
            connection,
            embedder,
            dimension,
            db_path,
            create_lock: tokio::sync::Mutex::new(()),
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Create the collection if it does not exist yet
    ///
    /// An existing collection is accepted only if its vector dimension matches
    /// the store's. Only the create path takes the store-wide lock.
    #[inline]
    pub async fn ensure_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;

        if self.collection_exists(name).await? {
            return self.check_dimension(name).await;
        }

        let _guard = self.create_lock.lock().await;

        if self.collection_exists(name).await? {
            return self.check_dimension(name).await;
        }

        self.connection
            .create_empty_table(name, self.create_schema())
            .execute()
            .await
            .map_err(|e| DocuSenseError::storage(name, "create", e))?;

        info!(
            "Created collection '{}' with {} dimensions",
            name, self.dimension
        );
        Ok(())
    }

    /// Embed `description` and append a new document record to the collection
    ///
    /// The record id is the collection's row count before the insert. The same
    /// path may be inserted any number of times, each insert adds a record.
    #[inline]
    pub async fn insert(
        &self,
        name: &str,
        description: &str,
        raw_content: &str,
        path: &Path,
    ) -> Result<DocumentRecord> {
        validate_collection_name(name)?;

        let vector = self.embed(description)?;

        let write_lock = self.write_lock(name);
        let _guard = write_lock.lock().await;

        self.ensure_collection(name).await?;
        let table = self.open_table(name, "insert").await?;
        let id = table
            .count_rows(None)
            .await
            .map_err(|e| DocuSenseError::storage(name, "insert", e))? as u64;

        let record = DocumentRecord {
            id,
            vector,
            metadata: DocumentMetadata::new(description, raw_content, path),
        };

        let record_batch = self.create_record_batch(std::slice::from_ref(&record), name)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| DocuSenseError::storage(name, "insert", e))?;

        info!(
            "Inserted document {} into '{}' from {}",
            record.id, name, record.metadata.path
        );
        Ok(record)
    }

    /// Return up to `top_k` documents most similar to `query_text`, most similar first
    ///
    /// Searching an absent collection creates it and yields no hits.
    #[inline]
    pub async fn search(
        &self,
        name: &str,
        query_text: &str,
        top_k: NonZeroUsize,
    ) -> Result<Vec<SearchHit>> {
        validate_collection_name(name)?;

        self.ensure_collection(name).await?;

        let query_vector = self.embed(query_text)?;

        let table = self.open_table(name, "search").await?;
        let row_count = table
            .count_rows(None)
            .await
            .map_err(|e| DocuSenseError::storage(name, "search", e))?;
        if row_count == 0 {
            debug!("Collection '{}' is empty, nothing to search", name);
            return Ok(Vec::new());
        }

        debug!(
            "Searching '{}' ({} rows) with top_k {}",
            name, row_count, top_k
        );

        let results = table
            .vector_search(query_vector.as_slice())
            .map_err(|e| DocuSenseError::storage(name, "search", e))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(top_k.get())
            .execute()
            .await
            .map_err(|e| DocuSenseError::storage(name, "search", e))?;

        let mut hits = parse_search_results_stream(results, name).await?;
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k.get());

        debug!("Search in '{}' returned {} hits", name, hits.len());
        Ok(hits)
    }

    /// Drop the collection and all of its records; absent collections are ignored
    ///
    /// Waits for an in-flight insert into the same collection to finish.
    #[inline]
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;

        let write_lock = self.write_lock(name);
        let _write_guard = write_lock.lock().await;
        let _create_guard = self.create_lock.lock().await;

        if self.collection_exists(name).await? {
            self.connection
                .drop_table(name)
                .await
                .map_err(|e| DocuSenseError::storage(name, "delete", e))?;
            info!("Deleted collection '{}'", name);
        } else {
            debug!("Collection '{}' does not exist, nothing to delete", name);
        }

        Ok(())
    }

    /// Names of all collections in the store
    #[inline]
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocuSenseError::storage("*", "list", e))
    }

    /// Number of records in the collection; zero if it does not exist
    #[inline]
    pub async fn count(&self, name: &str) -> Result<u64> {
        validate_collection_name(name)?;

        if !self.collection_exists(name).await? {
            return Ok(0);
        }

        let table = self.open_table(name, "count").await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| DocuSenseError::storage(name, "count", e))?;

        Ok(count as u64)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(text)?;
        if vector.len() != self.dimension {
            return Err(DocuSenseError::Embedding(format!(
                "embedder returned {} dimensions, expected {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }

    fn write_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    async fn check_dimension(&self, name: &str) -> Result<()> {
        let table = self.open_table(name, "open").await?;
        let existing = detect_vector_dimension(&table, name).await?;
        if existing == self.dimension {
            return Ok(());
        }

        Err(DocuSenseError::storage(
            name,
            "open",
            format!(
                "collection has {} dimensions but the embedder produces {}",
                existing, self.dimension
            ),
        ))
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocuSenseError::storage(name, "list", e))?;

        Ok(table_names.iter().any(|table| table == name))
    }

    async fn open_table(&self, name: &str, operation: &'static str) -> Result<Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| DocuSenseError::storage(name, operation, e))
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::UInt64, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("type", DataType::Utf8, false),
            Field::new("description", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("path", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(&self, records: &[DocumentRecord], name: &str) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);
        let mut file_types = Vec::with_capacity(len);
        let mut descriptions = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut paths = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id);
            flat_values.extend_from_slice(&record.vector);
            file_types.push(record.metadata.file_type.as_str());
            descriptions.push(record.metadata.description.as_str());
            contents.push(record.metadata.content.as_str());
            paths.push(record.metadata.path.as_str());
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| {
            DocuSenseError::storage(name, "insert", format!("Failed to create vector array: {}", e))
        })?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(UInt64Array::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(file_types)),
            Arc::new(StringArray::from(descriptions)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(paths)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays).map_err(|e| {
            DocuSenseError::storage(name, "insert", format!("Failed to create record batch: {}", e))
        })
    }
}

/// LanceDB table names allow ASCII alphanumerics, `_`, `-` and `.`
#[inline]
pub fn validate_collection_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(DocuSenseError::storage(
            name,
            "validate",
            "collection names may only contain ASCII letters, digits, '_', '-' and '.'",
        ))
    }
}

async fn detect_vector_dimension(table: &Table, name: &str) -> Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(|e| DocuSenseError::storage(name, "open", e))?;

    for field in schema.fields() {
        if field.name() == "vector" {
            if let DataType::FixedSizeList(_, size) = field.data_type() {
                return Ok(*size as usize);
            }
        }
    }

    Err(DocuSenseError::storage(
        name,
        "open",
        "could not find vector column or determine dimension",
    ))
}

async fn parse_search_results_stream(
    mut results: lancedb::arrow::SendableRecordBatchStream,
    name: &str,
) -> Result<Vec<SearchHit>> {
    let mut hits = Vec::new();

    while let Some(batch) = results
        .try_next()
        .await
        .map_err(|e| DocuSenseError::storage(name, "search", e))?
    {
        hits.extend(parse_search_batch(&batch, name)?);
    }

    Ok(hits)
}

fn parse_search_batch(batch: &RecordBatch, name: &str) -> Result<Vec<SearchHit>> {
    let ids = typed_column::<UInt64Array>(batch, "id", name)?;
    let file_types = typed_column::<StringArray>(batch, "type", name)?;
    let descriptions = typed_column::<StringArray>(batch, "description", name)?;
    let contents = typed_column::<StringArray>(batch, "content", name)?;
    let paths = typed_column::<StringArray>(batch, "path", name)?;
    let distances = typed_column::<Float32Array>(batch, "_distance", name)?;

    let hits = (0..batch.num_rows())
        .map(|row| {
            // A missing distance ranks last
            let distance = if distances.is_null(row) {
                f32::INFINITY
            } else {
                distances.value(row)
            };

            SearchHit {
                id: ids.value(row),
                metadata: DocumentMetadata {
                    file_type: file_types.value(row).to_string(),
                    description: descriptions.value(row).to_string(),
                    content: contents.value(row).to_string(),
                    path: paths.value(row).to_string(),
                },
                similarity_score: 1.0 - distance,
                distance,
            }
        })
        .collect();

    Ok(hits)
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, column: &str, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(column)
        .ok_or_else(|| DocuSenseError::storage(name, "search", format!("missing {} column", column)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| {
            DocuSenseError::storage(name, "search", format!("invalid {} column type", column))
        })
}
