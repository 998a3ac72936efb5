//! Mock content store for testing and local dry runs.
//!
//! The `MockContentStore` keeps collections and the media library in memory, assigns
//! sequential numeric identifiers on creation and records every call it receives.
//! Individual operations can be made to fail so callers can exercise their
//! partial-failure paths without a network.
//!
//! # Example
//!
//! ```ignore
//! use content_migrate_repository::{ContentStore, MockContentStore};
//! use serde_json::json;
//!
//! let store = MockContentStore::new();
//! store.seed_collection("artikels", vec![json!({"id": 1, "title": "Hello"})]);
//! store.fail_create_when(|collection, data| collection == "artikels" && data["title"] == "Broken");
//!
//! let created = store.create_record("artikels", &json!({"title": "World"})).await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use content_migrate_shared::RecordId;
use serde_json::{json, Map, Value};

use crate::errors::ContentStoreError;
use crate::interfaces::ContentStore;
use crate::types::{ListQuery, MediaUpload, RecordPage, UploadedMedia};

/// Page size applied when a listing does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

type CreateFailure = Box<dyn Fn(&str, &Value) -> bool + Send>;

/// One call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    List {
        collection: String,
        query: ListQuery,
    },
    Delete {
        collection: String,
        id: RecordId,
    },
    Create {
        collection: String,
        data: Value,
    },
    Update {
        collection: String,
        id: RecordId,
        data: Value,
    },
    ListMedia,
    Upload {
        file_name: String,
    },
}

#[derive(Default)]
struct MockState {
    collections: HashMap<String, Vec<Value>>,
    media: Vec<Value>,
    next_id: i64,
    calls: Vec<StoreCall>,
    create_failures: Vec<CreateFailure>,
    failing_uploads: HashSet<String>,
    failing_deletes: HashSet<(String, RecordId)>,
    unreachable_collections: HashSet<String>,
    media_unreachable: bool,
}

/// In-memory content store.
///
/// Records are stored with an integer `id` field. Created records receive ids counting
/// up from the configured first id, so target ids never collide with the source ids a
/// test seeds unless it asks for that.
pub struct MockContentStore {
    state: Mutex<MockState>,
}

impl MockContentStore {
    /// Create an empty store whose first assigned id is 1.
    pub fn new() -> Self {
        Self::with_first_id(1)
    }

    /// Create an empty store whose first assigned id is `first_id`.
    pub fn with_first_id(first_id: i64) -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: first_id,
                ..MockState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the contents of `collection` with `items`, stored as given.
    pub fn seed_collection(&self, collection: &str, items: Vec<Value>) {
        self.state()
            .collections
            .insert(collection.to_string(), items);
    }

    /// Replace the media index with `entries`, stored as given.
    pub fn seed_media(&self, entries: Vec<Value>) {
        self.state().media = entries;
    }

    /// Current records of `collection`.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.state()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// The record of `collection` whose `id` is `id`.
    pub fn record(&self, collection: &str, id: &RecordId) -> Option<Value> {
        self.state()
            .collections
            .get(collection)
            .and_then(|items| {
                items
                    .iter()
                    .find(|item| RecordId::of_record(item, "id").as_ref() == Some(id))
            })
            .cloned()
    }

    /// Current media index.
    pub fn media(&self) -> Vec<Value> {
        self.state().media.clone()
    }

    /// Make every create for which `predicate(collection, data)` holds fail with HTTP 400.
    pub fn fail_create_when<F>(&self, predicate: F)
    where
        F: Fn(&str, &Value) -> bool + Send + 'static,
    {
        self.state().create_failures.push(Box::new(predicate));
    }

    /// Make uploads of `file_name` fail with HTTP 413.
    pub fn fail_upload(&self, file_name: &str) {
        self.state().failing_uploads.insert(file_name.to_string());
    }

    /// Make deleting `id` from `collection` fail with HTTP 500.
    pub fn fail_delete(&self, collection: &str, id: RecordId) {
        self.state()
            .failing_deletes
            .insert((collection.to_string(), id));
    }

    /// Make every listing of `collection` fail with a connection error.
    pub fn make_unreachable(&self, collection: &str) {
        self.state()
            .unreachable_collections
            .insert(collection.to_string());
    }

    /// Make the media index listing fail with a connection error.
    pub fn make_media_unreachable(&self) {
        self.state().media_unreachable = true;
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Forget recorded calls, keeping data and failure settings.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls<F>(&self, predicate: F) -> usize
    where
        F: Fn(&StoreCall) -> bool,
    {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }
}

impl Default for MockContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn list_records(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<RecordPage, ContentStoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::List {
            collection: collection.to_string(),
            query: query.clone(),
        });

        if state.unreachable_collections.contains(collection) {
            return Err(ContentStoreError::connection(format!(
                "mock: {} is unreachable",
                collection
            )));
        }

        let items = state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1) as usize;
        let page = query.page.unwrap_or(1).max(1);
        let page_count = items.len().div_ceil(page_size).max(1) as u32;
        let start = (page as usize - 1) * page_size;

        Ok(RecordPage {
            items: items.into_iter().skip(start).take(page_size).collect(),
            page,
            page_count,
        })
    }

    async fn delete_record(
        &self,
        collection: &str,
        id: &RecordId,
    ) -> Result<(), ContentStoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Delete {
            collection: collection.to_string(),
            id: id.clone(),
        });

        if state
            .failing_deletes
            .contains(&(collection.to_string(), id.clone()))
        {
            return Err(ContentStoreError::status(
                500,
                format!("mock://{}/{}", collection, id),
                "mock delete failure",
            ));
        }

        let items = state.collections.entry(collection.to_string()).or_default();
        let before = items.len();
        items.retain(|item| RecordId::of_record(item, "id").as_ref() != Some(id));
        if items.len() == before {
            return Err(ContentStoreError::not_found(format!("{}/{}", collection, id)));
        }
        Ok(())
    }

    async fn create_record(
        &self,
        collection: &str,
        data: &Value,
    ) -> Result<Value, ContentStoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Create {
            collection: collection.to_string(),
            data: data.clone(),
        });

        if state
            .create_failures
            .iter()
            .any(|predicate| predicate(collection, data))
        {
            return Err(ContentStoreError::status(
                400,
                format!("mock://{}", collection),
                "mock validation failure",
            ));
        }

        let fields = data
            .as_object()
            .cloned()
            .ok_or_else(|| ContentStoreError::serialization("record data must be an object"))?;

        let id = state.next_id;
        state.next_id += 1;

        let mut record = Map::new();
        record.insert("id".to_string(), json!(id));
        record.extend(fields);
        let record = Value::Object(record);

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        collection: &str,
        id: &RecordId,
        data: &Value,
    ) -> Result<(), ContentStoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Update {
            collection: collection.to_string(),
            id: id.clone(),
            data: data.clone(),
        });

        let fields = data
            .as_object()
            .cloned()
            .ok_or_else(|| ContentStoreError::serialization("update data must be an object"))?;

        let record = state
            .collections
            .get_mut(collection)
            .and_then(|items| {
                items
                    .iter_mut()
                    .find(|item| RecordId::of_record(item, "id").as_ref() == Some(id))
            })
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ContentStoreError::not_found(format!("{}/{}", collection, id)))?;

        record.extend(fields);
        Ok(())
    }

    async fn list_media(&self) -> Result<Vec<Value>, ContentStoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::ListMedia);

        if state.media_unreachable {
            return Err(ContentStoreError::connection("mock: media is unreachable"));
        }
        Ok(state.media.clone())
    }

    async fn upload_media(
        &self,
        upload: &MediaUpload,
    ) -> Result<UploadedMedia, ContentStoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Upload {
            file_name: upload.file_name.clone(),
        });

        if state.failing_uploads.contains(&upload.file_name) {
            return Err(ContentStoreError::status(
                413,
                "mock://upload",
                "mock upload rejected",
            ));
        }

        let id = state.next_id;
        state.next_id += 1;
        let hash = format!("upload_{}", id);

        state.media.push(json!({
            "id": id,
            "name": upload.file_name,
            "hash": hash,
            "mime": upload.mime,
            "size": upload.bytes.len(),
        }));

        Ok(UploadedMedia {
            id: RecordId::Numeric(id),
            content_hash: Some(hash),
        })
    }
}
