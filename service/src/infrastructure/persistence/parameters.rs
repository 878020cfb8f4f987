use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use registry_common::{ColumnType, FieldValue};
use sqlx::{Postgres, postgres::PgArguments, query::Query};

/// SQL parameter that will be bound to query.
///
/// Every variant carries its own NULL so that a NULL is bound with the
/// column's type rather than as untyped text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParameter {
    Text(Option<String>),
    Float(Option<f64>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    TextList(Vec<String>),
}

impl SqlParameter {
    /// Parameter of `column_type` holding `value`; a value of another shape binds as NULL
    pub fn from_value(column_type: ColumnType, value: &FieldValue) -> Self {
        match column_type {
            ColumnType::Text | ColumnType::Enum(_) => {
                SqlParameter::Text(value.as_text().map(str::to_string))
            }
            ColumnType::Float => SqlParameter::Float(value.as_float()),
            ColumnType::Boolean => SqlParameter::Boolean(value.as_bool()),
            ColumnType::Date => SqlParameter::Date(match value {
                FieldValue::Date(date) => Some(*date),
                _ => None,
            }),
            ColumnType::Timestamp => SqlParameter::Timestamp(match value {
                FieldValue::Timestamp(at) => Some(*at),
                _ => None,
            }),
            ColumnType::TextList => SqlParameter::TextList(value.as_list().to_vec()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        SqlParameter::Text(Some(value.into()))
    }

    pub fn text_list<T: Display>(values: &[T]) -> Self {
        SqlParameter::TextList(values.iter().map(|v| v.to_string()).collect())
    }

    /// Bind to sqlx query
    pub fn bind_to_query<'q>(
        self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlParameter::Text(value) => query.bind(value),
            SqlParameter::Float(value) => query.bind(value),
            SqlParameter::Boolean(value) => query.bind(value),
            SqlParameter::Date(value) => query.bind(value),
            SqlParameter::Timestamp(value) => query.bind(value),
            SqlParameter::TextList(values) => query.bind(values),
        }
    }
}

/// Prepare a statement with all its parameters bound in order
pub fn bind_all(sql: &str, params: Vec<SqlParameter>) -> Query<'_, Postgres, PgArguments> {
    params
        .into_iter()
        .fold(sqlx::query(sql), |query, param| param.bind_to_query(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_keep_the_column_type() {
        assert_eq!(
            SqlParameter::from_value(ColumnType::Float, &FieldValue::Null),
            SqlParameter::Float(None)
        );
        assert_eq!(
            SqlParameter::from_value(ColumnType::TextList, &FieldValue::Null),
            SqlParameter::TextList(vec![])
        );
        assert_eq!(
            SqlParameter::from_value(ColumnType::Enum(&["A"]), &FieldValue::from("A")),
            SqlParameter::text("A")
        );
    }
}
