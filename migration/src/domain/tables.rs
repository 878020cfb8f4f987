use std::fmt::{Display, Formatter};

pub mod generate;

pub use generate::research_tables;

/// Represents table in a database, used for ddl generation
#[derive(Debug)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub indexes: Vec<Index>,
}

/// Represents one column in the database table
#[derive(Debug)]
pub struct Column {
    pub name: String,
    pub column_type: SqlType,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
    /// allowed values of a TEXT column holding an enumeration
    pub allowed_values: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    DoublePrecision,
    Boolean,
    Date,
    TimestampTZ,
    TextArray,
}

impl Display for SqlType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SqlType::Text => "TEXT",
            SqlType::DoublePrecision => "DOUBLE PRECISION",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Date => "DATE",
            SqlType::TimestampTZ => "TIMESTAMPTZ",
            SqlType::TextArray => "TEXT[]",
        };
        f.write_str(name)
    }
}

/// Represents foreign key constraint in the database table
#[derive(Debug)]
pub struct ForeignKeyConstraint {
    pub table_name: String,
    pub column_name: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
}

/// Represents a plain (non unique) index in the database table
#[derive(Debug)]
pub struct Index {
    pub table_name: String,
    pub columns: Vec<String>,
}

impl Table {
    pub fn new(
        name: String,
        columns: Vec<Column>,
        foreign_keys: Vec<ForeignKeyConstraint>,
        indexes: Vec<Index>,
    ) -> Self {
        Self {
            name,
            columns,
            foreign_keys,
            indexes,
        }
    }
}

impl Column {
    pub fn new<T: Into<String>>(
        name: T,
        column_type: SqlType,
        not_null: bool,
        unique: bool,
        default_value: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null,
            unique,
            primary_key: false,
            default_value,
            allowed_values: None,
        }
    }

    pub fn primary_key<T: Into<String>>(name: T, column_type: SqlType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: true,
            unique: false,
            primary_key: true,
            default_value: None,
            allowed_values: None,
        }
    }

    pub fn with_allowed_values(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

impl ForeignKeyConstraint {
    pub fn new<T: Into<String>>(
        table_name: T,
        column_name: T,
        referenced_table_name: T,
        referenced_column_name: T,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
            referenced_table_name: referenced_table_name.into(),
            referenced_column_name: referenced_column_name.into(),
        }
    }
}

impl Index {
    pub fn new<T: Into<String>>(table_name: T, columns: Vec<T>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: columns.into_iter().map(T::into).collect(),
        }
    }
}
