use std::borrow::Cow;

use itertools::Itertools;
use registry_common::domain::schema::ColumnSource;
use registry_common::{
    AUTHOR_KIND_FIELD_NAME, AuthorKind, ID_FIELD_NAME, RECORD_ID_FIELD_NAME, RecordId,
    ResourceSchema, UPDATED_FIELD_NAME, USER_ID_FIELD_NAME, UserId,
};

use crate::domain::publication::{NewPublication, PublicationPatch};
use crate::infrastructure::persistence::{
    columns::{
        AUTHOR_ID_COLUMN, AUTHOR_KIND_COLUMN, RECORD_ID_COLUMN, USER_EMAIL_COLUMN,
        USER_ID_COLUMN, USER_NAME_COLUMN, USER_ROLE_COLUMN,
    },
    parameters::SqlParameter,
    query::{Condition, Join, JoinType, OrderBy, QueryBuilder, SortDirection, column_ref},
    schema::{ColumnRef, Table, quoted},
};

/// SELECT m.id, m.serial_no, ... FROM main_table m
pub fn records_query(schema: &'static ResourceSchema) -> QueryBuilder<'static> {
    let columns = schema.columns.iter().copied().map(column_ref).collect();
    QueryBuilder::from(Table::main(schema)).select(columns)
}

/// SELECT a.record_id, a.author_kind, u.id, u.name, u.email, u.role
/// FROM authors_table a
/// JOIN users u ON a.user_id = u.id
/// WHERE a.record_id = ANY($1)
pub fn authors_query(
    schema: &'static ResourceSchema,
    record_ids: &[RecordId],
) -> QueryBuilder<'static> {
    let mut columns = author_link_columns();
    columns.extend(user_columns());

    QueryBuilder::from(Table::authors(schema))
        .join(Join {
            join_type: JoinType::Inner,
            target_table: Table::users(),
            main_column: Cow::Borrowed(&AUTHOR_ID_COLUMN),
            target_column: Cow::Borrowed(&USER_ID_COLUMN),
        })
        .select(columns)
        .where_condition(Condition::In {
            column: Cow::Borrowed(&RECORD_ID_COLUMN),
            values: record_ids.iter().map(|id| id.to_string()).collect(),
        })
        .order_by(OrderBy {
            column: Cow::Borrowed(&USER_NAME_COLUMN),
            direction: SortDirection::Ascending,
        })
        .order_by(OrderBy {
            column: Cow::Borrowed(&USER_ID_COLUMN),
            direction: SortDirection::Ascending,
        })
}

/// SELECT a.user_id FROM authors_table a WHERE a.record_id = $1 AND a.author_kind = $2
pub fn author_ids_query(
    schema: &'static ResourceSchema,
    record_id: &RecordId,
    kind: AuthorKind,
) -> QueryBuilder<'static> {
    QueryBuilder::from(Table::authors(schema))
        .select(vec![Cow::Borrowed(&AUTHOR_ID_COLUMN)])
        .where_condition(Condition::Equals {
            column: Cow::Borrowed(&RECORD_ID_COLUMN),
            value: SqlParameter::text(record_id.to_string()),
        })
        .where_condition(Condition::Equals {
            column: Cow::Borrowed(&AUTHOR_KIND_COLUMN),
            value: SqlParameter::text(kind.as_str()),
        })
}

pub fn users_query() -> QueryBuilder<'static> {
    QueryBuilder::from(Table::users()).select(user_columns())
}

fn author_link_columns() -> Vec<ColumnRef<'static>> {
    vec![
        Cow::Borrowed(&RECORD_ID_COLUMN),
        Cow::Borrowed(&AUTHOR_KIND_COLUMN),
    ]
}

fn user_columns() -> Vec<ColumnRef<'static>> {
    vec![
        Cow::Borrowed(&USER_ID_COLUMN),
        Cow::Borrowed(&USER_NAME_COLUMN),
        Cow::Borrowed(&USER_EMAIL_COLUMN),
        Cow::Borrowed(&USER_ROLE_COLUMN),
    ]
}

/// INSERT INTO main_table (id, created_at, updated_at, attributes...) VALUES ($1, ...)
pub fn insert_record(
    schema: &'static ResourceSchema,
    record: &NewPublication,
) -> (String, Vec<SqlParameter>) {
    let mut names = Vec::new();
    let mut params = Vec::new();

    for column in schema.columns {
        names.push(quoted(column.column));
        let value = match column.source {
            ColumnSource::Attribute => {
                let value = record
                    .attributes
                    .get(column.name)
                    .cloned()
                    .unwrap_or_else(|| column.default_value());
                SqlParameter::from_value(column.column_type, &value)
            }
            ColumnSource::Id => SqlParameter::text(record.id.to_string()),
            ColumnSource::CreatedAt | ColumnSource::UpdatedAt => {
                SqlParameter::Timestamp(Some(record.created_at))
            }
        };
        params.push(value);
    }

    let placeholders = (1..=params.len()).map(|n| format!("${}", n)).join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(schema.table_name),
        names.join(", "),
        placeholders
    );
    (sql, params)
}

/// UPDATE main_table SET present attributes..., updated_at = $n WHERE id = $n+1
pub fn update_record(
    schema: &'static ResourceSchema,
    id: &RecordId,
    patch: &PublicationPatch,
) -> (String, Vec<SqlParameter>) {
    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for column in schema.attributes() {
        if let Some(value) = patch.attributes.get(column.name) {
            params.push(SqlParameter::from_value(column.column_type, value));
            assignments.push(format!("{} = ${}", quoted(column.column), params.len()));
        }
    }

    params.push(SqlParameter::Timestamp(Some(patch.updated_at)));
    assignments.push(format!("{} = ${}", quoted(UPDATED_FIELD_NAME), params.len()));

    params.push(SqlParameter::text(id.to_string()));
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quoted(schema.table_name),
        assignments.join(", "),
        quoted(ID_FIELD_NAME),
        params.len()
    );
    (sql, params)
}

/// DELETE FROM main_table WHERE id = ANY($1); authorship rows cascade
pub fn delete_records(
    schema: &'static ResourceSchema,
    ids: &[RecordId],
) -> (String, Vec<SqlParameter>) {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ANY($1)",
        quoted(schema.table_name),
        quoted(ID_FIELD_NAME)
    );
    (sql, vec![SqlParameter::text_list(ids)])
}

/// One authorship row per user id; repeated ids collapse on the primary key
pub fn insert_authors(
    schema: &'static ResourceSchema,
    record_id: &RecordId,
    kind: AuthorKind,
    user_ids: &[UserId],
) -> (String, Vec<SqlParameter>) {
    let sql = format!(
        "INSERT INTO {} ({}, {}, {}) SELECT $1, UNNEST($2::text[]), $3 ON CONFLICT DO NOTHING",
        quoted(schema.authors_table_name),
        quoted(RECORD_ID_FIELD_NAME),
        quoted(USER_ID_FIELD_NAME),
        quoted(AUTHOR_KIND_FIELD_NAME)
    );
    let params = vec![
        SqlParameter::text(record_id.to_string()),
        SqlParameter::text_list(user_ids),
        SqlParameter::text(kind.as_str()),
    ];
    (sql, params)
}

pub fn delete_authors(
    schema: &'static ResourceSchema,
    record_id: &RecordId,
    kind: AuthorKind,
    user_ids: &[UserId],
) -> (String, Vec<SqlParameter>) {
    let sql = format!(
        "DELETE FROM {} WHERE {} = $1 AND {} = $2 AND {} = ANY($3)",
        quoted(schema.authors_table_name),
        quoted(RECORD_ID_FIELD_NAME),
        quoted(AUTHOR_KIND_FIELD_NAME),
        quoted(USER_ID_FIELD_NAME)
    );
    let params = vec![
        SqlParameter::text(record_id.to_string()),
        SqlParameter::text(kind.as_str()),
        SqlParameter::text_list(user_ids),
    ];
    (sql, params)
}
