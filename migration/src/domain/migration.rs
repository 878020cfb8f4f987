use std::collections::HashSet;

use crate::domain::persistence::Persistence;
use crate::domain::tables::{Column, ForeignKeyConstraint, Index, Table, research_tables};

pub trait MigrationStep {
    fn ctx(&self) -> &'static str;
    fn ddls(self) -> Vec<String>;
}

pub struct CreateTableStep {
    ddls: Vec<String>,
}

impl CreateTableStep {
    fn new(database_schema: &str, table: &Table) -> Self {
        let ddls = create_table_ddl(database_schema, table);
        Self { ddls }
    }
}

impl MigrationStep for CreateTableStep {
    fn ctx(&self) -> &'static str {
        "CREATE TABLE"
    }

    fn ddls(self) -> Vec<String> {
        self.ddls
    }
}

/// Brings the database schema in line with the research resource schemas.
/// Only missing tables are created; existing ones are left untouched.
pub struct Migration<P: Persistence> {
    persistence: P,
}

impl<P: Persistence> Migration<P> {
    pub fn new(persistence: P) -> Self {
        Self { persistence }
    }

    pub async fn migrate(&self) -> Result<usize, anyhow::Error> {
        let actual_schema = self.persistence.load().await?;
        let steps = migration_steps(self.persistence.database_schema(), &actual_schema);
        let count = steps.len();
        self.persistence.apply_migration_steps(steps).await?;
        Ok(count)
    }
}

pub fn migration_steps(database_schema: &str, actual_schema: &HashSet<String>) -> Vec<CreateTableStep> {
    research_tables()
        .iter()
        .filter(|table| !actual_schema.contains(&table.name))
        .map(|table| CreateTableStep::new(database_schema, table))
        .collect()
}

fn create_table_ddl(schema: &str, table: &Table) -> Vec<String> {
    let mut columns = Vec::new();
    let mut pk_columns = Vec::new();

    for column in table.columns.iter() {
        columns.push(column_ddl(column));
        if column.primary_key {
            pk_columns.push(format!("\"{}\"", column.name));
        }
    }

    let columns_sql = columns.join(",\n    ");
    let pk_columns_sql = pk_columns.join(",");

    let table_ddl = format!(
        "CREATE TABLE \"{}\".\"{}\" (\n    {},\n    PRIMARY KEY({})\n)",
        schema, table.name, columns_sql, pk_columns_sql
    );

    let mut ddls = vec![table_ddl];

    for fk in table.foreign_keys.iter() {
        ddls.push(create_fk_ddl(schema, fk));
    }

    for index in table.indexes.iter() {
        ddls.push(create_index_ddl(schema, index));
    }

    ddls
}

fn column_ddl(column: &Column) -> String {
    let mut sql = format!("\"{}\" {}", column.name, column.column_type);
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if let Some(default_value) = &column.default_value {
        sql.push_str(format!(" DEFAULT {}", default_value).as_str());
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(values) = &column.allowed_values {
        let values: Vec<String> = values
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect();
        sql.push_str(format!(" CHECK (\"{}\" IN ({}))", column.name, values.join(", ")).as_str());
    }
    sql
}

fn create_fk_ddl(schema: &str, fk: &ForeignKeyConstraint) -> String {
    format!(
        "ALTER TABLE \"{}\".\"{}\" ADD CONSTRAINT \"{}_{}_fkey\" FOREIGN KEY (\"{}\") REFERENCES \"{}\".\"{}\" (\"{}\") ON DELETE CASCADE",
        schema,
        fk.table_name,
        fk.table_name,
        fk.column_name,
        fk.column_name,
        schema,
        fk.referenced_table_name,
        fk.referenced_column_name
    )
}

fn create_index_ddl(schema: &str, index: &Index) -> String {
    let columns_sql: Vec<String> = index.columns.iter().map(|c| format!("\"{}\"", c)).collect();
    format!(
        "CREATE INDEX \"{}_{}_idx\" ON \"{}\".\"{}\" ({})",
        index.table_name,
        index.columns.join("_"),
        schema,
        index.table_name,
        columns_sql.join(", ")
    )
}
