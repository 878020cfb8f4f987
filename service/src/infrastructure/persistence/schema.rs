use std::borrow::Cow;

use registry_common::{ResourceSchema, USERS_TABLE_NAME};

pub const MAIN_ALIAS: &str = "m";
pub const AUTHORS_ALIAS: &str = "a";
pub const USERS_ALIAS: &str = "u";

// Represents a table in database
#[derive(Debug, Clone, PartialEq)]
pub struct Table<'a> {
    pub name: &'a str,
    pub alias: &'static str,
}

impl<'a> Table<'a> {
    /// Get qualified table name with alias
    pub fn qualified(&self) -> String {
        format!("\"{}\" AS \"{}\"", self.name, self.alias)
    }

    pub fn main(schema: &'a ResourceSchema) -> Self {
        Table {
            name: schema.table_name,
            alias: MAIN_ALIAS,
        }
    }

    pub fn authors(schema: &'a ResourceSchema) -> Self {
        Table {
            name: schema.authors_table_name,
            alias: AUTHORS_ALIAS,
        }
    }

    pub fn users() -> Self {
        Table {
            name: USERS_TABLE_NAME,
            alias: USERS_ALIAS,
        }
    }
}

/// Represents one column in the database table
#[derive(Debug, Clone, PartialEq)]
pub struct Column<'a> {
    pub qualifier: &'static str,
    pub name: &'a str,
}

impl<'a> Column<'a> {
    /// Get qualified column name
    pub fn qualified(&self) -> String {
        format!("\"{}\".\"{}\"", self.qualifier, self.name)
    }

    pub fn main(name: &'a str) -> Self {
        Column {
            qualifier: MAIN_ALIAS,
            name,
        }
    }
}

/// Column reference which can be either borrowed or owned
pub type ColumnRef<'a> = Cow<'a, Column<'a>>;

/// Quoted identifier for statements without table aliases
pub fn quoted(name: &str) -> String {
    format!("\"{}\"", name)
}
