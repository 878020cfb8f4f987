use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use registry_common::domain::schema::ColumnSource;
use registry_common::{
    AUTHOR_KIND_FIELD_NAME, AuthorKind, ColumnDef, ColumnType, FieldValue, ID_FIELD_NAME,
    RECORD_ID_FIELD_NAME, RecordId, ResourceSchema, Role, USER_EMAIL_FIELD_NAME,
    USER_ID_FIELD_NAME, USER_NAME_FIELD_NAME, USER_ROLE_FIELD_NAME, User, UserId,
};
use sqlx::{Row, postgres::PgRow};

use crate::domain::publication::Publication;
use crate::domain::repository::RepositoryError;

/// Map a main table row; authors are attached separately
pub fn row_to_publication(
    row: &PgRow,
    schema: &'static ResourceSchema,
) -> Result<Publication, RepositoryError> {
    let mut id = None;
    let mut created_at = None;
    let mut updated_at = None;
    let mut attributes = BTreeMap::new();

    for column in schema.columns {
        match column.source {
            ColumnSource::Id => id = Some(parse_record_id(row, column.column)?),
            ColumnSource::CreatedAt => created_at = Some(parse_timestamp(row, column.column)?),
            ColumnSource::UpdatedAt => updated_at = Some(parse_timestamp(row, column.column)?),
            ColumnSource::Attribute => {
                let value = parse_field_value(row, column)?;
                if !value.is_null() {
                    attributes.insert(column.name, value);
                }
            }
        }
    }

    let missing = |name: &str| RepositoryError::DatabaseError(format!("Missing column {}", name));
    Ok(Publication {
        id: id.ok_or_else(|| missing(ID_FIELD_NAME))?,
        kind: schema.kind,
        attributes,
        faculty_authors: Vec::new(),
        student_authors: Vec::new(),
        created_at: created_at.ok_or_else(|| missing("created_at"))?,
        updated_at: updated_at.ok_or_else(|| missing("updated_at"))?,
    })
}

pub fn parse_field_value(row: &PgRow, column: &ColumnDef) -> Result<FieldValue, RepositoryError> {
    let column_name = column.column;
    let value = match column.column_type {
        ColumnType::Text | ColumnType::Enum(_) => get::<Option<String>>(row, column_name)?
            .map(FieldValue::Text),
        ColumnType::Float => get::<Option<f64>>(row, column_name)?.map(FieldValue::Float),
        ColumnType::Boolean => get::<Option<bool>>(row, column_name)?.map(FieldValue::Boolean),
        ColumnType::Date => get::<Option<NaiveDate>>(row, column_name)?.map(FieldValue::Date),
        ColumnType::Timestamp => {
            get::<Option<DateTime<Utc>>>(row, column_name)?.map(FieldValue::Timestamp)
        }
        ColumnType::TextList => get::<Option<Vec<String>>>(row, column_name)?
            .map(FieldValue::TextList),
    };
    Ok(value.unwrap_or(FieldValue::Null))
}

pub fn row_to_user(row: &PgRow) -> Result<User, RepositoryError> {
    let id: String = get(row, ID_FIELD_NAME)?;
    let role: String = get(row, USER_ROLE_FIELD_NAME)?;

    Ok(User {
        id: UserId::try_new(id)
            .map_err(|e| RepositoryError::DatabaseError(format!("Failed to parse user id: {}", e)))?,
        name: get(row, USER_NAME_FIELD_NAME)?,
        email: get(row, USER_EMAIL_FIELD_NAME)?,
        role: role
            .parse::<Role>()
            .map_err(|e| RepositoryError::DatabaseError(format!("Failed to parse role: {}", e)))?,
    })
}

/// One authorship row joined with its user
pub fn row_to_authorship(row: &PgRow) -> Result<(RecordId, AuthorKind, User), RepositoryError> {
    let record_id = parse_record_id(row, RECORD_ID_FIELD_NAME)?;
    let kind: String = get(row, AUTHOR_KIND_FIELD_NAME)?;
    let kind = kind.parse::<AuthorKind>().map_err(|e| {
        RepositoryError::DatabaseError(format!("Failed to parse author kind: {}", e))
    })?;
    Ok((record_id, kind, row_to_user(row)?))
}

/// Single `user_id` column of an authorship row
pub fn row_to_author_id(row: &PgRow) -> Result<UserId, RepositoryError> {
    let id: String = get(row, USER_ID_FIELD_NAME)?;
    UserId::try_new(id)
        .map_err(|e| RepositoryError::DatabaseError(format!("Failed to parse user id: {}", e)))
}

fn parse_record_id(row: &PgRow, column_name: &str) -> Result<RecordId, RepositoryError> {
    let id: String = get(row, column_name)?;
    RecordId::try_new(id)
        .map_err(|e| RepositoryError::DatabaseError(format!("Failed to parse id: {}", e)))
}

fn parse_timestamp(row: &PgRow, column_name: &str) -> Result<DateTime<Utc>, RepositoryError> {
    get(row, column_name)
}

fn get<'r, T>(row: &'r PgRow, column_name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column_name).map_err(|e| {
        RepositoryError::DatabaseError(format!("Failed to parse {}: {}", column_name, e))
    })
}
