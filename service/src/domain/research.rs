use std::collections::BTreeMap;

use chrono::Utc;
use registry_common::{AuthorKind, FieldValue, RecordId, ResourceKind, UserId};
use serde_json::Value;

use crate::domain::access::{
    AccessPolicies, Caller, ensure_can_delete, ensure_can_modify, resolve_scope,
};
use crate::domain::error::{ResearchError, ValidationError};
use crate::domain::export::{export_columns, to_csv};
use crate::domain::filter::{FilterParams, build_predicate};
use crate::domain::pagination::{Page, PageRequest, PaginationSettings, Sort};
use crate::domain::predicate::Predicate;
use crate::domain::publication::Publication;
use crate::domain::repository::{RepositoryError, ResearchRepository};
use crate::domain::stats::{PublicationStats, TrendPeriod};
use crate::domain::validation::{validate_create, validate_update};

/// Role scoped reads and validated writes over research records of every kind
#[derive(Clone)]
pub struct ResearchService<R: ResearchRepository> {
    repository: R,
    pagination: PaginationSettings,
    access: AccessPolicies,
}

impl<R: ResearchRepository> ResearchService<R> {
    pub fn new(repository: R, pagination: PaginationSettings, access: AccessPolicies) -> Self {
        Self {
            repository,
            pagination,
            access,
        }
    }

    /// Loads the user named by a verified session. A session of a user
    /// that no longer exists is reported as NotFound, not Unauthorized.
    pub async fn resolve_caller(
        &self,
        session: Option<&UserId>,
    ) -> Result<Option<Caller>, ResearchError> {
        let Some(user_id) = session else {
            return Ok(None);
        };
        let user = self
            .repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| ResearchError::NotFound("user".to_string()))?;
        Ok(Some(Caller::from(&user)))
    }

    fn list_predicate(
        &self,
        kind: ResourceKind,
        caller: Option<&Caller>,
        params: &FilterParams,
    ) -> Result<Predicate, ResearchError> {
        let scope = resolve_scope(caller, self.access.list_policy(kind));
        Ok(build_predicate(scope, kind, params)?)
    }

    pub async fn list(
        &self,
        kind: ResourceKind,
        caller: Option<&Caller>,
        params: &FilterParams,
    ) -> Result<(Page<Publication>, PageRequest), ResearchError> {
        let predicate = self.list_predicate(kind, caller, params)?;
        let request = PageRequest::from_params(kind, params, &self.pagination)?;
        let page = self.repository.find_page(kind, &predicate, &request).await?;
        Ok((page, request))
    }

    /// Invisible records are reported exactly like missing ones
    pub async fn get(
        &self,
        kind: ResourceKind,
        caller: Option<&Caller>,
        id: &str,
    ) -> Result<Publication, ResearchError> {
        let scope = resolve_scope(caller, self.access.read_policy(kind));
        self.find_existing(kind, id)
            .await?
            .filter(|record| scope.matches(record))
            .ok_or_else(|| not_found(kind))
    }

    /// Full match set of the same filters a list request takes, as CSV
    pub async fn export(
        &self,
        kind: ResourceKind,
        caller: &Caller,
        params: &FilterParams,
    ) -> Result<String, ResearchError> {
        let predicate = self.list_predicate(kind, Some(caller), params)?;
        let sort = Sort::from_params(kind, params)?;
        let rows = self.repository.find_all(kind, &predicate, &sort).await?;
        tracing::info!(kind = kind.path_segment(), rows = rows.len(), "export");
        Ok(to_csv(&rows, export_columns(kind)))
    }

    pub async fn stats(
        &self,
        kind: ResourceKind,
        caller: Option<&Caller>,
        params: &FilterParams,
    ) -> Result<PublicationStats, ResearchError> {
        let period = TrendPeriod::from_params(params)?;
        let predicate = self.list_predicate(kind, caller, params)?;
        let rows = self
            .repository
            .find_all(kind, &predicate, &Sort::default())
            .await?;
        Ok(PublicationStats::compute(kind, &rows, period))
    }

    pub async fn create(
        &self,
        kind: ResourceKind,
        caller: &Caller,
        payload: &Value,
    ) -> Result<Publication, ResearchError> {
        let id = RecordId::try_new(uuid::Uuid::new_v4().to_string())
            .map_err(|e| ResearchError::Internal(e.to_string()))?;
        let record = validate_create(kind.schema(), payload, id, Utc::now())?;

        for author_kind in AuthorKind::ALL {
            self.verify_authors(author_kind, record.author_ids(author_kind))
                .await?;
        }
        self.ensure_unique(kind, &record.attributes, None).await?;

        let created = self.repository.create(record).await?;
        tracing::info!(kind = kind.path_segment(), id = %created.id, caller = %caller.id, "created");
        Ok(created)
    }

    pub async fn update(
        &self,
        kind: ResourceKind,
        caller: &Caller,
        id: &str,
        payload: &Value,
    ) -> Result<Publication, ResearchError> {
        let existing = self
            .find_existing(kind, id)
            .await?
            .ok_or_else(|| not_found(kind))?;
        ensure_can_modify(caller, &existing)?;

        let patch = validate_update(kind.schema(), payload, Utc::now())?;
        for author_kind in AuthorKind::ALL {
            if let Some(ids) = patch.author_ids(author_kind) {
                self.verify_authors(author_kind, ids).await?;
            }
        }
        self.ensure_unique(kind, &patch.attributes, Some(&existing.id))
            .await?;

        let updated = self.repository.update(kind, &existing.id, patch).await?;
        tracing::info!(kind = kind.path_segment(), id = %updated.id, caller = %caller.id, "updated");
        Ok(updated)
    }

    pub async fn delete(
        &self,
        kind: ResourceKind,
        caller: &Caller,
        id: &str,
    ) -> Result<(), ResearchError> {
        ensure_can_delete(caller)?;
        let id = RecordId::try_new(id).map_err(|_| not_found(kind))?;
        self.repository
            .delete(kind, &id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => not_found(kind),
                other => ResearchError::from(other),
            })?;
        tracing::info!(kind = kind.path_segment(), id = %id, caller = %caller.id, "deleted");
        Ok(())
    }

    /// Ids that are malformed or unknown are simply not counted
    pub async fn delete_many(
        &self,
        kind: ResourceKind,
        caller: &Caller,
        ids: &[String],
    ) -> Result<u64, ResearchError> {
        ensure_can_delete(caller)?;
        if ids.is_empty() {
            return Err(ValidationError::EmptyIdList.into());
        }
        let ids: Vec<RecordId> = ids
            .iter()
            .filter_map(|id| RecordId::try_new(id.as_str()).ok())
            .collect();
        let count = if ids.is_empty() {
            0
        } else {
            self.repository.delete_many(kind, &ids).await?
        };
        tracing::info!(kind = kind.path_segment(), count, caller = %caller.id, "bulk deleted");
        Ok(count)
    }

    async fn find_existing(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<Publication>, ResearchError> {
        match RecordId::try_new(id) {
            Ok(id) => Ok(self.repository.find_by_id(kind, &id).await?),
            Err(_) => Ok(None),
        }
    }

    /// Every id must name a distinct user holding the role of `kind`
    async fn verify_authors(
        &self,
        kind: AuthorKind,
        ids: &[UserId],
    ) -> Result<(), ResearchError> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self
            .repository
            .count_users_with_role(ids, kind.role())
            .await?;
        if found != ids.len() as u64 {
            return Err(ValidationError::InvalidAuthorReference(kind.label()).into());
        }
        Ok(())
    }

    async fn ensure_unique(
        &self,
        kind: ResourceKind,
        attributes: &BTreeMap<&'static str, FieldValue>,
        excluding: Option<&RecordId>,
    ) -> Result<(), ResearchError> {
        for column in kind.schema().unique_attributes() {
            let Some(value) = attributes.get(column.name).filter(|v| !v.is_null()) else {
                continue;
            };
            if self
                .repository
                .exists_with_value(kind, column, value, excluding)
                .await?
            {
                return Err(ValidationError::DuplicateKey {
                    field: column.name.to_string(),
                    value: value.as_text().unwrap_or_default().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn not_found(kind: ResourceKind) -> ResearchError {
    ResearchError::NotFound(kind.display_name().to_string())
}
