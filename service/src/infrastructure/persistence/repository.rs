use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use futures::TryStreamExt;
use registry_common::database::Database;
use registry_common::{
    AuthorKind, ColumnDef, FieldValue, RecordId, ResourceKind, ResourceSchema, Role, User,
    UserId,
};
use sqlx::Row;

use crate::domain::pagination::{Page, PageRequest, Sort};
use crate::domain::predicate::Predicate;
use crate::domain::publication::{AuthorChanges, NewPublication, Publication, PublicationPatch};
use crate::domain::repository::{RepositoryError, ResearchRepository};
use crate::infrastructure::persistence::{
    build::{
        author_ids_query, authors_query, delete_authors, delete_records, insert_authors,
        insert_record, records_query, update_record, users_query,
    },
    columns::{ID_COLUMN, USER_ID_COLUMN, USER_ROLE_COLUMN},
    parameters::{SqlParameter, bind_all},
    query::{Condition, QueryBuilder, column_ref},
    result::{row_to_author_id, row_to_authorship, row_to_publication, row_to_user},
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PostgresResearchRepository {
    database: &'static Database,
}

impl PostgresResearchRepository {
    pub fn new(database: &'static Database) -> Self {
        Self { database }
    }

    async fn fetch_publications(
        &self,
        schema: &'static ResourceSchema,
        query: QueryBuilder<'static>,
    ) -> Result<Vec<Publication>, RepositoryError> {
        let (sql, params) = query.build();
        tracing::debug!("{}", sql);

        let mut publications = Vec::new();
        {
            let mut rows = bind_all(&sql, params).fetch(self.database.database_pool());
            while let Some(row) = rows.try_next().await.map_err(database_error)? {
                publications.push(row_to_publication(&row, schema)?);
            }
        }

        self.attach_authors(schema, &mut publications).await?;
        Ok(publications)
    }

    /// Resolve authors of all `publications` with a single query
    async fn attach_authors(
        &self,
        schema: &'static ResourceSchema,
        publications: &mut [Publication],
    ) -> Result<(), RepositoryError> {
        if publications.is_empty() {
            return Ok(());
        }
        let ids: Vec<RecordId> = publications.iter().map(|p| p.id.clone()).collect();
        let (sql, params) = authors_query(schema, &ids).build();
        let rows = bind_all(&sql, params)
            .fetch_all(self.database.database_pool())
            .await
            .map_err(database_error)?;

        let mut by_record: HashMap<RecordId, Vec<(AuthorKind, User)>> = HashMap::new();
        for row in &rows {
            let (record_id, kind, user) = row_to_authorship(row)?;
            by_record.entry(record_id).or_default().push((kind, user));
        }

        for publication in publications.iter_mut() {
            for (kind, user) in by_record.remove(&publication.id).unwrap_or_default() {
                match kind {
                    AuthorKind::Faculty => publication.faculty_authors.push(user),
                    AuthorKind::Student => publication.student_authors.push(user),
                }
            }
        }
        Ok(())
    }

    async fn count(&self, query: QueryBuilder<'static>) -> Result<u64, RepositoryError> {
        let (sql, params) = query.build_count();
        tracing::debug!("{}", sql);
        let row = bind_all(&sql, params)
            .fetch_one(self.database.database_pool())
            .await
            .map_err(database_error)?;
        let count: i64 = row.try_get(0).map_err(database_error)?;
        Ok(count.max(0) as u64)
    }
}

impl ResearchRepository for PostgresResearchRepository {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let (sql, params) = users_query()
            .where_condition(Condition::Equals {
                column: Cow::Borrowed(&USER_ID_COLUMN),
                value: SqlParameter::text(id.to_string()),
            })
            .build();
        let row = bind_all(&sql, params)
            .fetch_optional(self.database.database_pool())
            .await
            .map_err(database_error)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn count_users_with_role(
        &self,
        ids: &[UserId],
        role: Role,
    ) -> Result<u64, RepositoryError> {
        let query = users_query()
            .where_condition(Condition::In {
                column: Cow::Borrowed(&USER_ID_COLUMN),
                values: ids.iter().map(|id| id.to_string()).collect(),
            })
            .where_condition(Condition::Equals {
                column: Cow::Borrowed(&USER_ROLE_COLUMN),
                value: SqlParameter::text(role.as_str()),
            });
        self.count(query).await
    }

    async fn find_page(
        &self,
        kind: ResourceKind,
        predicate: &Predicate,
        request: &PageRequest,
    ) -> Result<Page<Publication>, RepositoryError> {
        let schema = kind.schema();
        let condition = Condition::from_predicate(predicate, schema);

        let total = self
            .count(records_query(schema).where_condition(condition.clone()))
            .await?;
        let rows = self
            .fetch_publications(
                schema,
                records_query(schema)
                    .where_condition(condition)
                    .sorted(&request.sort)
                    .limit(request.limit as u64)
                    .offset(request.offset()),
            )
            .await?;

        Ok(Page { rows, total })
    }

    async fn find_all(
        &self,
        kind: ResourceKind,
        predicate: &Predicate,
        sort: &Sort,
    ) -> Result<Vec<Publication>, RepositoryError> {
        let schema = kind.schema();
        let query = records_query(schema)
            .where_condition(Condition::from_predicate(predicate, schema))
            .sorted(sort);
        self.fetch_publications(schema, query).await
    }

    async fn find_by_id(
        &self,
        kind: ResourceKind,
        id: &RecordId,
    ) -> Result<Option<Publication>, RepositoryError> {
        let schema = kind.schema();
        let query = records_query(schema).where_condition(id_equals(id));
        Ok(self.fetch_publications(schema, query).await?.pop())
    }

    async fn exists_with_value(
        &self,
        kind: ResourceKind,
        column: &'static ColumnDef,
        value: &FieldValue,
        excluding: Option<&RecordId>,
    ) -> Result<bool, RepositoryError> {
        let mut query = records_query(kind.schema()).where_condition(Condition::Equals {
            column: column_ref(column),
            value: SqlParameter::from_value(column.column_type, value),
        });
        if let Some(id) = excluding {
            query = query.where_condition(Condition::NotEquals {
                column: Cow::Borrowed(&ID_COLUMN),
                value: SqlParameter::text(id.to_string()),
            });
        }
        Ok(self.count(query).await? > 0)
    }

    async fn create(&self, record: NewPublication) -> Result<Publication, RepositoryError> {
        let schema = record.kind.schema();
        let mut transaction = self
            .database
            .database_pool()
            .begin()
            .await
            .map_err(database_error)?;

        let (sql, params) = insert_record(schema, &record);
        tracing::debug!("{}", sql);
        bind_all(&sql, params)
            .execute(&mut *transaction)
            .await
            .map_err(|e| write_error(e, schema, &record.attributes))?;

        for author_kind in AuthorKind::ALL {
            let ids = record.author_ids(author_kind);
            if ids.is_empty() {
                continue;
            }
            let (sql, params) = insert_authors(schema, &record.id, author_kind, ids);
            bind_all(&sql, params)
                .execute(&mut *transaction)
                .await
                .map_err(database_error)?;
        }

        transaction.commit().await.map_err(database_error)?;

        self.find_by_id(record.kind, &record.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        patch: PublicationPatch,
    ) -> Result<Publication, RepositoryError> {
        let schema = kind.schema();
        let mut transaction = self
            .database
            .database_pool()
            .begin()
            .await
            .map_err(database_error)?;

        let (sql, params) = update_record(schema, id, &patch);
        tracing::debug!("{}", sql);
        let updated = bind_all(&sql, params)
            .execute(&mut *transaction)
            .await
            .map_err(|e| write_error(e, schema, &patch.attributes))?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for author_kind in AuthorKind::ALL {
            let Some(requested) = patch.author_ids(author_kind) else {
                continue;
            };

            let (sql, params) = author_ids_query(schema, id, author_kind).build();
            let current = bind_all(&sql, params)
                .fetch_all(&mut *transaction)
                .await
                .map_err(database_error)?
                .iter()
                .map(row_to_author_id)
                .collect::<Result<Vec<_>, _>>()?;

            let changes = AuthorChanges::diff(&current, requested);
            if !changes.removed.is_empty() {
                let (sql, params) = delete_authors(schema, id, author_kind, &changes.removed);
                bind_all(&sql, params)
                    .execute(&mut *transaction)
                    .await
                    .map_err(database_error)?;
            }
            if !changes.added.is_empty() {
                let (sql, params) = insert_authors(schema, id, author_kind, &changes.added);
                bind_all(&sql, params)
                    .execute(&mut *transaction)
                    .await
                    .map_err(database_error)?;
            }
        }

        transaction.commit().await.map_err(database_error)?;

        self.find_by_id(kind, id)
            .await?
            .ok_or(RepositoryError::NotFound)
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
        let (sql, params) = delete_records(kind.schema(), ids);
        tracing::debug!("{}", sql);
        let result = bind_all(&sql, params)
            .execute(self.database.database_pool())
            .await
            .map_err(database_error)?;
        Ok(result.rows_affected())
    }
}

fn id_equals(id: &RecordId) -> Condition<'static> {
    Condition::Equals {
        column: Cow::Borrowed(&ID_COLUMN),
        value: SqlParameter::text(id.to_string()),
    }
}

fn database_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(error.to_string())
}

/// Unique violations on a schema column name the column and the offending value
fn write_error(
    error: sqlx::Error,
    schema: &'static ResourceSchema,
    attributes: &BTreeMap<&'static str, FieldValue>,
) -> RepositoryError {
    if let sqlx::Error::Database(db_error) = &error
        && db_error.code().as_deref() == Some(UNIQUE_VIOLATION)
    {
        let constraint = db_error.constraint().unwrap_or_default();
        if let Some(column) = schema
            .unique_attributes()
            .find(|c| constraint.contains(c.column))
        {
            return RepositoryError::UniqueViolation {
                field: column.name.to_string(),
                value: attributes
                    .get(column.name)
                    .and_then(FieldValue::as_text)
                    .unwrap_or_default()
                    .to_string(),
            };
        }
    }
    database_error(error)
}
