use std::future::Future;

use registry_common::{ColumnDef, FieldValue, RecordId, ResourceKind, Role, User, UserId};

use crate::domain::pagination::{Page, PageRequest, Sort};
use crate::domain::predicate::Predicate;
use crate::domain::publication::{NewPublication, Publication, PublicationPatch};

#[cfg(test)]
pub mod memory;

/// Storage of research records and read access to the user directory
pub trait ResearchRepository: Clone + Send + Sync + 'static {
    fn find_user(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Number of distinct users among `ids` holding `role`
    fn count_users_with_role(
        &self,
        ids: &[UserId],
        role: Role,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// One page of matching records and the size of the whole match set
    fn find_page(
        &self,
        kind: ResourceKind,
        predicate: &Predicate,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Page<Publication>, RepositoryError>> + Send;

    /// Every matching record, unpaginated
    fn find_all(
        &self,
        kind: ResourceKind,
        predicate: &Predicate,
        sort: &Sort,
    ) -> impl Future<Output = Result<Vec<Publication>, RepositoryError>> + Send;

    fn find_by_id(
        &self,
        kind: ResourceKind,
        id: &RecordId,
    ) -> impl Future<Output = Result<Option<Publication>, RepositoryError>> + Send;

    /// Whether another record of `kind` already holds `value` in `column`
    fn exists_with_value(
        &self,
        kind: ResourceKind,
        column: &'static ColumnDef,
        value: &FieldValue,
        excluding: Option<&RecordId>,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Inserts the record and its authorship rows atomically
    fn create(
        &self,
        record: NewPublication,
    ) -> impl Future<Output = Result<Publication, RepositoryError>> + Send;

    /// Writes the present attributes and the author set differences atomically
    fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        patch: PublicationPatch,
    ) -> impl Future<Output = Result<Publication, RepositoryError>> + Send;

    fn delete(
        &self,
        kind: ResourceKind,
        id: &RecordId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Returns the number of records actually deleted
    fn delete_many(
        &self,
        kind: ResourceKind,
        ids: &[RecordId],
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

#[derive(Debug)]
pub enum RepositoryError {
    NotFound,
    ValidationFailed(String),
    UniqueViolation { field: String, value: String },
    DatabaseError(String),
}
