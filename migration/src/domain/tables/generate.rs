use registry_common::domain::schema::{ColumnDefault, ColumnSource};
use registry_common::domain::{AuthorKind, ColumnDef, ColumnType, ResourceKind, ResourceSchema};
use registry_common::{
    AUTHOR_KIND_FIELD_NAME, CREATED_FIELD_NAME, ID_FIELD_NAME, RECORD_ID_FIELD_NAME,
    UPDATED_FIELD_NAME, USER_EMAIL_FIELD_NAME, USER_ID_FIELD_NAME, USER_NAME_FIELD_NAME,
    USER_ROLE_FIELD_NAME, USERS_TABLE_NAME,
};

use crate::domain::tables::{Column, ForeignKeyConstraint, Index, SqlType, Table};

/// returns database tables for all research resources, sorted conform dependency order:
/// users, then resource tables, then authorship joins
pub fn research_tables() -> Vec<Table> {
    let mut tables = vec![users_table()];
    let mut authors_tables = Vec::new();

    for kind in ResourceKind::ALL {
        let schema = kind.schema();
        tables.push(MainTableBuilder::new(schema).build());
        authors_tables.push(AuthorsTableBuilder::new(schema).build());
    }
    tables.extend(authors_tables);

    tables
}

/// Users are provisioned by the identity system; the table exists so that
/// authorship joins can reference it.
fn users_table() -> Table {
    let columns = vec![
        Column::primary_key(ID_FIELD_NAME, SqlType::Text),
        Column::new(USER_NAME_FIELD_NAME, SqlType::Text, true, false, None),
        Column::new(USER_EMAIL_FIELD_NAME, SqlType::Text, true, true, None),
        Column::new(USER_ROLE_FIELD_NAME, SqlType::Text, true, false, None)
            .with_allowed_values(&["ADMIN", "FACULTY", "STUDENT"]),
        Column::new(
            CREATED_FIELD_NAME,
            SqlType::TimestampTZ,
            true,
            false,
            Some("now()".to_string()),
        ),
    ];
    let indexes = vec![Index::new(USERS_TABLE_NAME, vec![USER_ROLE_FIELD_NAME])];

    Table::new(USERS_TABLE_NAME.to_string(), columns, Vec::new(), indexes)
}

struct MainTableBuilder {
    table_name: String,
    columns: Vec<Column>,
    indexes: Vec<Index>,
}

impl MainTableBuilder {
    fn new(schema: &ResourceSchema) -> Self {
        let table_name = schema.table_name.to_string();
        let mut builder = Self {
            columns: vec![Column::primary_key(ID_FIELD_NAME, SqlType::Text)],
            indexes: Vec::new(),
            table_name,
        };
        for column in schema.attributes() {
            builder.push(column);
        }
        builder
    }

    fn push(&mut self, column: &ColumnDef) {
        let mut sql_column = Column::new(
            column.column,
            sql_type(column.column_type),
            !column.is_nullable(),
            column.unique,
            default_literal(column.default),
        );
        if let ColumnType::Enum(values) = column.column_type {
            sql_column = sql_column.with_allowed_values(values);
            // enumerated columns are the usual equality filters
            self.indexes
                .push(Index::new(self.table_name.clone(), vec![column.column.to_string()]));
        }
        self.columns.push(sql_column);
    }

    fn build(mut self) -> Table {
        self.columns.push(Column::new(
            CREATED_FIELD_NAME,
            SqlType::TimestampTZ,
            true,
            false,
            Some("now()".to_string()),
        ));
        self.columns.push(Column::new(
            UPDATED_FIELD_NAME,
            SqlType::TimestampTZ,
            true,
            false,
            Some("now()".to_string()),
        ));
        self.indexes
            .push(Index::new(self.table_name.clone(), vec![CREATED_FIELD_NAME.to_string()]));

        Table::new(self.table_name, self.columns, Vec::new(), self.indexes)
    }
}

/// Authorship join: (record, user, author kind), owned by the record
struct AuthorsTableBuilder {
    main_table_name: String,
    authors_table_name: String,
}

impl AuthorsTableBuilder {
    fn new(schema: &ResourceSchema) -> Self {
        Self {
            main_table_name: schema.table_name.to_string(),
            authors_table_name: schema.authors_table_name.to_string(),
        }
    }

    fn build(self) -> Table {
        let kinds: Vec<&str> = AuthorKind::ALL.iter().map(|k| k.as_str()).collect();
        let columns = vec![
            Column::primary_key(RECORD_ID_FIELD_NAME, SqlType::Text),
            Column::primary_key(USER_ID_FIELD_NAME, SqlType::Text),
            Column::primary_key(AUTHOR_KIND_FIELD_NAME, SqlType::Text).with_allowed_values(&kinds),
        ];

        let foreign_keys = vec![
            ForeignKeyConstraint::new(
                self.authors_table_name.as_str(),
                RECORD_ID_FIELD_NAME,
                self.main_table_name.as_str(),
                ID_FIELD_NAME,
            ),
            ForeignKeyConstraint::new(
                self.authors_table_name.as_str(),
                USER_ID_FIELD_NAME,
                USERS_TABLE_NAME,
                ID_FIELD_NAME,
            ),
        ];

        let indexes = vec![Index::new(
            self.authors_table_name.as_str(),
            vec![USER_ID_FIELD_NAME],
        )];

        Table::new(self.authors_table_name, columns, foreign_keys, indexes)
    }
}

fn sql_type(column_type: ColumnType) -> SqlType {
    match column_type {
        ColumnType::Text | ColumnType::Enum(_) => SqlType::Text,
        ColumnType::Float => SqlType::DoublePrecision,
        ColumnType::Boolean => SqlType::Boolean,
        ColumnType::Date => SqlType::Date,
        ColumnType::Timestamp => SqlType::TimestampTZ,
        ColumnType::TextList => SqlType::TextArray,
    }
}

fn default_literal(default: ColumnDefault) -> Option<String> {
    match default {
        ColumnDefault::None => None,
        ColumnDefault::Text(value) => Some(format!("'{}'", value.replace('\'', "''"))),
        ColumnDefault::Boolean(value) => Some(value.to_string().to_uppercase()),
        ColumnDefault::EmptyList => Some("'{}'".to_string()),
    }
}
