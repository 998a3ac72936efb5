//! Response-shape helpers shared by content store implementations.
//!
//! The store wraps payloads as `{ "data": ..., "meta": { "pagination": ... } }`. These
//! functions unwrap that envelope and turn any deviation into
//! `ContentStoreError::MalformedResponse`.

use content_migrate_shared::RecordId;
use serde_json::Value;

use crate::errors::ContentStoreError;
use crate::types::{RecordPage, UploadedMedia};

/// Parse a collection listing into a `RecordPage`.
///
/// Missing pagination metadata is read as a single page.
///
/// # Example
///
/// ```
/// use content_migrate_repository::utils::parse_record_page;
/// use serde_json::json;
///
/// let page = parse_record_page(json!({
///     "data": [{"id": 1}],
///     "meta": {"pagination": {"page": 1, "pageCount": 2}}
/// })).expect("valid listing");
/// assert!(page.has_next());
/// ```
pub fn parse_record_page(body: Value) -> Result<RecordPage, ContentStoreError> {
    let pagination = body.pointer("/meta/pagination").cloned();
    let items = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ContentStoreError::malformed(format!(
                    "expected `data` to be an array, got {}",
                    type_name(&other)
                )))
            }
            None => return Err(ContentStoreError::malformed("listing has no `data` field")),
        },
        other => {
            return Err(ContentStoreError::malformed(format!(
                "expected listing object, got {}",
                type_name(&other)
            )))
        }
    };

    let read_u32 = |key: &str| {
        pagination
            .as_ref()
            .and_then(|p| p.get(key))
            .and_then(Value::as_u64)
            .map(|n| n as u32)
    };
    let page = read_u32("page").unwrap_or(1).max(1);
    let page_count = read_u32("pageCount").unwrap_or(1).max(1);

    Ok(RecordPage {
        items,
        page,
        page_count,
    })
}

/// Unwrap the `data` object of a create/update response.
///
/// The returned record must be an object; identifier extraction is left to the caller,
/// which knows which field carries the identifier.
pub fn parse_single_record(body: Value) -> Result<Value, ContentStoreError> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(record @ Value::Object(_)) => Ok(record),
            Some(other) => Err(ContentStoreError::malformed(format!(
                "expected `data` to be an object, got {}",
                type_name(&other)
            ))),
            None => Err(ContentStoreError::malformed("response has no `data` field")),
        },
        other => Err(ContentStoreError::malformed(format!(
            "expected response object, got {}",
            type_name(&other)
        ))),
    }
}

/// Parse the media index. The store returns a bare array here, without envelope;
/// a `data`-wrapped array is accepted as well.
pub fn parse_media_index(body: Value) -> Result<Vec<Value>, ContentStoreError> {
    match body {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(ContentStoreError::malformed("media index is not an array")),
        },
        other => Err(ContentStoreError::malformed(format!(
            "expected media index array, got {}",
            type_name(&other)
        ))),
    }
}

/// Parse an upload response: an array whose first element is the created asset,
/// identified by `id_field`.
pub fn parse_upload_response(
    body: Value,
    id_field: &str,
) -> Result<UploadedMedia, ContentStoreError> {
    let first = match body {
        Value::Array(mut entries) if !entries.is_empty() => entries.swap_remove(0),
        Value::Array(_) => {
            return Err(ContentStoreError::malformed("upload response is an empty array"))
        }
        other => {
            return Err(ContentStoreError::malformed(format!(
                "expected upload response array, got {}",
                type_name(&other)
            )))
        }
    };

    let id = RecordId::of_record(&first, id_field).ok_or_else(|| {
        ContentStoreError::malformed(format!("uploaded file has no `{}`", id_field))
    })?;
    let content_hash = first.get("hash").and_then(Value::as_str).map(str::to_string);

    Ok(UploadedMedia { id, content_hash })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
