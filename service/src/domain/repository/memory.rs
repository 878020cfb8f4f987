use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use registry_common::{
    AuthorKind, ColumnDef, FieldValue, RecordId, ResourceKind, Role, User, UserId,
};
use tokio::sync::RwLock;

use crate::domain::pagination::{Page, PageRequest, Sort};
use crate::domain::predicate::Predicate;
use crate::domain::publication::{NewPublication, Publication, PublicationPatch};
use crate::domain::repository::{RepositoryError, ResearchRepository};

/// Repository over process memory that evaluates predicates directly.
/// Mirrors the unique constraints and author ordering of the Postgres store.
#[derive(Clone, Default)]
pub struct InMemoryResearchRepository {
    store: Arc<RwLock<Store>>,
}

#[derive(Default)]
struct Store {
    users: Vec<User>,
    records: HashMap<ResourceKind, Vec<Publication>>,
}

impl InMemoryResearchRepository {
    pub fn with_users(users: Vec<User>) -> Self {
        let store = Store {
            users,
            records: HashMap::new(),
        };
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }
}

impl Store {
    fn records(&self, kind: ResourceKind) -> &[Publication] {
        self.records.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    fn matching(&self, kind: ResourceKind, predicate: &Predicate, sort: &Sort) -> Vec<Publication> {
        let mut rows: Vec<Publication> = self
            .records(kind)
            .iter()
            .filter(|p| predicate.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| sort.compare(a, b));
        rows
    }

    /// Users named by `ids`, once each, ordered by name then id
    fn resolve(&self, ids: &[UserId]) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        users
    }

    fn check_unique(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        attributes: &BTreeMap<&'static str, FieldValue>,
    ) -> Result<(), RepositoryError> {
        for column in kind.schema().unique_attributes() {
            let Some(value) = attributes.get(column.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = self
                .records(kind)
                .iter()
                .any(|p| &p.id != id && *p.value(column) == *value);
            if taken {
                return Err(RepositoryError::UniqueViolation {
                    field: column.name.to_string(),
                    value: value.as_text().unwrap_or_default().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl ResearchRepository for InMemoryResearchRepository {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| &u.id == id).cloned())
    }

    async fn count_users_with_role(
        &self,
        ids: &[UserId],
        role: Role,
    ) -> Result<u64, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .filter(|u| u.role == role && ids.contains(&u.id))
            .count() as u64)
    }

    async fn find_page(
        &self,
        kind: ResourceKind,
        predicate: &Predicate,
        request: &PageRequest,
    ) -> Result<Page<Publication>, RepositoryError> {
        let store = self.store.read().await;
        let rows = store.matching(kind, predicate, &request.sort);
        let total = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Ok(Page { rows, total })
    }

    async fn find_all(
        &self,
        kind: ResourceKind,
        predicate: &Predicate,
        sort: &Sort,
    ) -> Result<Vec<Publication>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.matching(kind, predicate, sort))
    }

    async fn find_by_id(
        &self,
        kind: ResourceKind,
        id: &RecordId,
    ) -> Result<Option<Publication>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.records(kind).iter().find(|p| &p.id == id).cloned())
    }

    async fn exists_with_value(
        &self,
        kind: ResourceKind,
        column: &'static ColumnDef,
        value: &FieldValue,
        excluding: Option<&RecordId>,
    ) -> Result<bool, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .records(kind)
            .iter()
            .any(|p| Some(&p.id) != excluding && *p.value(column) == *value))
    }

    async fn create(&self, record: NewPublication) -> Result<Publication, RepositoryError> {
        let mut store = self.store.write().await;
        store.check_unique(record.kind, &record.id, &record.attributes)?;

        let publication = Publication {
            faculty_authors: store.resolve(record.author_ids(AuthorKind::Faculty)),
            student_authors: store.resolve(record.author_ids(AuthorKind::Student)),
            id: record.id,
            kind: record.kind,
            attributes: record.attributes,
            created_at: record.created_at,
            updated_at: record.created_at,
        };
        store
            .records
            .entry(publication.kind)
            .or_default()
            .push(publication.clone());
        Ok(publication)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        patch: PublicationPatch,
    ) -> Result<Publication, RepositoryError> {
        let mut store = self.store.write().await;
        store.check_unique(kind, id, &patch.attributes)?;

        let faculty = patch
            .author_ids(AuthorKind::Faculty)
            .map(|ids| store.resolve(ids));
        let students = patch
            .author_ids(AuthorKind::Student)
            .map(|ids| store.resolve(ids));

        let publication = store
            .records
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|p| &p.id == id))
            .ok_or(RepositoryError::NotFound)?;

        publication.attributes.extend(patch.attributes);
        if let Some(faculty) = faculty {
            publication.faculty_authors = faculty;
        }
        if let Some(students) = students {
            publication.student_authors = students;
        }
        publication.updated_at = patch.updated_at;
        Ok(publication.clone())
    }

    async fn delete(&self, kind: ResourceKind, id: &RecordId) -> Result<(), RepositoryError> {
        match self.delete_many(kind, std::slice::from_ref(id)).await? {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    async fn delete_many(
        &self,
        kind: ResourceKind,
        ids: &[RecordId],
    ) -> Result<u64, RepositoryError> {
        let mut store = self.store.write().await;
        let Some(rows) = store.records.get_mut(&kind) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|p| !ids.contains(&p.id));
        Ok((before - rows.len()) as u64)
    }
}
