use registry_common::ResourceKind;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::domain::pagination::{Page, PageRequest, PaginationMeta};
use crate::domain::publication::Publication;

/// `{ "<kind>": {...} }`
#[derive(Debug, Clone)]
pub struct OneRecordResponse {
    kind: ResourceKind,
    record: Publication,
}

impl OneRecordResponse {
    pub fn new(record: Publication) -> Self {
        Self {
            kind: record.kind,
            record,
        }
    }
}

impl Serialize for OneRecordResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.kind.singular_key(), &self.record)?;
        map.end()
    }
}

/// `{ "<kinds>": [...], "pagination": {...} }`
#[derive(Debug, Clone)]
pub struct ManyRecordsResponse {
    kind: ResourceKind,
    records: Vec<Publication>,
    pagination: PaginationMeta,
}

impl ManyRecordsResponse {
    pub fn new(kind: ResourceKind, page: Page<Publication>, request: &PageRequest) -> Self {
        Self {
            kind,
            pagination: PaginationMeta::new(page.total, request),
            records: page.rows,
        }
    }
}

impl Serialize for ManyRecordsResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.kind.plural_key(), &self.records)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteManyRequest {
    pub ids: Vec<String>,
}
