use std::borrow::Cow;

use registry_common::{ColumnDef, ResourceSchema};

use crate::domain::pagination::{Sort, SortOrder};
use crate::domain::predicate::Predicate;
use crate::infrastructure::persistence::columns::{
    AUTHOR_ID_COLUMN, AUTHOR_KIND_COLUMN, ID_COLUMN, RECORD_ID_COLUMN,
};
use crate::infrastructure::persistence::parameters::SqlParameter;
use crate::infrastructure::persistence::schema::{Column, ColumnRef, Table};

/// High-level, composable query builder
/// Similar to jOOQ, but with Rust's type system
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    from_table: Table<'a>,
    select: Vec<ColumnRef<'a>>,
    joins: Vec<Join<'a>>,
    where_conditions: Vec<Condition<'a>>,
    order_by: Vec<OrderBy<'a>>,
    limit: Option<u64>,
    offset: Option<u64>,
}

/// A where condition; top level conditions are AND'ed together
#[derive(Debug, Clone)]
pub enum Condition<'a> {
    /// TRUE or FALSE
    Literal(bool),

    /// Empty conjunction is TRUE
    And(Vec<Condition<'a>>),

    /// Empty disjunction is FALSE
    Or(Vec<Condition<'a>>),

    /// field = value
    Equals {
        column: ColumnRef<'a>,
        value: SqlParameter,
    },

    /// field <> value
    NotEquals {
        column: ColumnRef<'a>,
        value: SqlParameter,
    },

    /// field >= value
    GreaterThanOrEqual {
        column: ColumnRef<'a>,
        value: SqlParameter,
    },

    /// field <= value
    LessThanOrEqual {
        column: ColumnRef<'a>,
        value: SqlParameter,
    },

    /// field ILIKE '%value%'
    Contains {
        column: ColumnRef<'a>,
        value: String,
    },

    /// value = ANY(field)
    ArrayContains {
        column: ColumnRef<'a>,
        value: String,
    },

    /// field = ANY(values)
    In {
        column: ColumnRef<'a>,
        values: Vec<String>,
    },

    /// field IS NOT NULL
    IsNotNull { column: ColumnRef<'a> },

    /// EXISTS (SELECT 1 FROM table WHERE inner = outer AND conditions)
    Exists {
        table: Table<'a>,
        inner: ColumnRef<'a>,
        outer: ColumnRef<'a>,
        conditions: Vec<Condition<'a>>,
    },
}

#[derive(Debug, Clone)]
pub struct OrderBy<'a> {
    pub column: ColumnRef<'a>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl From<SortOrder> for SortDirection {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Ascending => SortDirection::Ascending,
            SortOrder::Descending => SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Join<'a> {
    pub join_type: JoinType,
    pub target_table: Table<'a>,
    pub main_column: ColumnRef<'a>,
    pub target_column: ColumnRef<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum JoinType {
    Inner,
}

impl<'a> From<Table<'a>> for QueryBuilder<'a> {
    fn from(value: Table<'a>) -> Self {
        QueryBuilder {
            from_table: value,
            select: vec![],
            joins: vec![],
            where_conditions: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }
}

impl QueryBuilder<'static> {
    /// Order by the sort column, NULLs last, then by id so that pages are stable
    pub fn sorted(self, sort: &Sort) -> Self {
        self.order_by(OrderBy {
            column: column_ref(sort.column),
            direction: sort.order.into(),
        })
        .order_by(OrderBy {
            column: Cow::Borrowed(&ID_COLUMN),
            direction: SortDirection::Ascending,
        })
    }
}

impl<'a> QueryBuilder<'a> {
    /// Select specified columns
    pub fn select(mut self, columns: Vec<ColumnRef<'a>>) -> Self {
        self.select = columns;
        self
    }

    pub fn join(mut self, join: Join<'a>) -> Self {
        self.joins.push(join);
        self
    }

    /// Add where condition; a literal TRUE adds nothing
    pub fn where_condition(mut self, condition: Condition<'a>) -> Self {
        if !matches!(condition, Condition::Literal(true)) {
            self.where_conditions.push(condition);
        }
        self
    }

    pub fn order_by(mut self, order_by: OrderBy<'a>) -> Self {
        self.order_by.push(order_by);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build the SQL query string
    pub fn build(self) -> (String, Vec<SqlParameter>) {
        let columns: Vec<String> = self.select.iter().map(|c| c.qualified()).collect();
        let mut sql = format!("SELECT {}", columns.join(", "));
        let params = self.push_from_and_where(&mut sql);

        // ORDER BY clause
        if !self.order_by.is_empty() {
            sql.push_str("\nORDER BY ");
            let order_clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|ob| {
                    let direction = match ob.direction {
                        SortDirection::Ascending => "ASC",
                        SortDirection::Descending => "DESC",
                    };
                    format!("{} {} NULLS LAST", ob.column.qualified(), direction)
                })
                .collect();
            sql.push_str(&order_clauses.join(", "));
        }

        // LIMIT clause
        if let Some(limit) = self.limit {
            sql.push_str(&format!("\nLIMIT {}", limit));
        }
        // OFFSET clause
        if let Some(offset) = self.offset {
            sql.push_str(&format!("\nOFFSET {}", offset));
        }

        (sql, params)
    }

    /// Build a COUNT(*) over the same FROM and WHERE, ignoring order and window
    pub fn build_count(self) -> (String, Vec<SqlParameter>) {
        let mut sql = String::from("SELECT COUNT(*)");
        let params = self.push_from_and_where(&mut sql);
        (sql, params)
    }

    fn push_from_and_where(&self, sql: &mut String) -> Vec<SqlParameter> {
        let mut params = Vec::new();
        let mut param_counter = 1;

        // FROM clause
        sql.push_str(&format!("\nFROM {}", self.from_table.qualified()));

        // JOIN clauses
        for join in &self.joins {
            let join_keyword = match join.join_type {
                JoinType::Inner => "INNER JOIN",
            };
            sql.push_str(&format!(
                "\n{} {} ON {} = {}",
                join_keyword,
                join.target_table.qualified(),
                join.main_column.qualified(),
                join.target_column.qualified()
            ));
        }

        // WHERE clause
        if !self.where_conditions.is_empty() {
            sql.push_str("\nWHERE ");
            let (where_clause, where_params) =
                Condition::join(&self.where_conditions, " AND ", &mut param_counter);
            sql.push_str(&where_clause);
            params.extend(where_params);
        }

        params
    }
}

impl<'a> Condition<'a> {
    pub fn to_sql(&self, param_counter: &mut usize) -> (String, Vec<SqlParameter>) {
        match self {
            Condition::Literal(true) => ("TRUE".to_string(), vec![]),
            Condition::Literal(false) => ("FALSE".to_string(), vec![]),

            Condition::And(parts) if parts.is_empty() => ("TRUE".to_string(), vec![]),
            Condition::Or(parts) if parts.is_empty() => ("FALSE".to_string(), vec![]),
            Condition::And(parts) | Condition::Or(parts) if parts.len() == 1 => {
                parts[0].to_sql(param_counter)
            }
            Condition::And(parts) => {
                let (sql, params) = Self::join(parts, " AND ", param_counter);
                (format!("({})", sql), params)
            }
            Condition::Or(parts) => {
                let (sql, params) = Self::join(parts, " OR ", param_counter);
                (format!("({})", sql), params)
            }

            Condition::Equals { column, value } => {
                Self::compare(column, "=", value.clone(), param_counter)
            }
            Condition::NotEquals { column, value } => {
                Self::compare(column, "<>", value.clone(), param_counter)
            }
            Condition::GreaterThanOrEqual { column, value } => {
                Self::compare(column, ">=", value.clone(), param_counter)
            }
            Condition::LessThanOrEqual { column, value } => {
                Self::compare(column, "<=", value.clone(), param_counter)
            }

            Condition::Contains { column, value } => {
                let sql = format!("{} ILIKE ${}", column.qualified(), param_counter);
                *param_counter += 1;
                let pattern = format!("%{}%", escape_like(value));
                (sql, vec![SqlParameter::text(pattern)])
            }

            Condition::ArrayContains { column, value } => {
                let sql = format!("${} = ANY({})", param_counter, column.qualified());
                *param_counter += 1;
                (sql, vec![SqlParameter::text(value.as_str())])
            }

            Condition::In { column, values } => {
                let sql = format!("{} = ANY(${})", column.qualified(), param_counter);
                *param_counter += 1;
                (sql, vec![SqlParameter::TextList(values.clone())])
            }

            Condition::IsNotNull { column } => {
                (format!("{} IS NOT NULL", column.qualified()), vec![])
            }

            Condition::Exists {
                table,
                inner,
                outer,
                conditions,
            } => {
                let mut sql = format!(
                    "EXISTS (SELECT 1 FROM {} WHERE {} = {}",
                    table.qualified(),
                    inner.qualified(),
                    outer.qualified()
                );
                let mut params = Vec::new();
                if !conditions.is_empty() {
                    let (conditions_sql, conditions_params) =
                        Self::join(conditions, " AND ", param_counter);
                    sql.push_str(" AND ");
                    sql.push_str(&conditions_sql);
                    params.extend(conditions_params);
                }
                sql.push(')');
                (sql, params)
            }
        }
    }

    fn join(
        conditions: &[Condition<'_>],
        separator: &str,
        param_counter: &mut usize,
    ) -> (String, Vec<SqlParameter>) {
        let mut parts = Vec::with_capacity(conditions.len());
        let mut params = Vec::new();
        for condition in conditions {
            let (sql, condition_params) = condition.to_sql(param_counter);
            parts.push(sql);
            params.extend(condition_params);
        }
        (parts.join(separator), params)
    }

    fn compare(
        column: &ColumnRef<'_>,
        operator: &str,
        value: SqlParameter,
        param_counter: &mut usize,
    ) -> (String, Vec<SqlParameter>) {
        let sql = format!("{} {} ${}", column.qualified(), operator, param_counter);
        *param_counter += 1;
        (sql, vec![value])
    }
}

impl Condition<'static> {
    /// Lower a predicate over records of `schema` to a condition on its main table
    pub fn from_predicate(predicate: &Predicate, schema: &'static ResourceSchema) -> Self {
        match predicate {
            Predicate::True => Condition::Literal(true),
            Predicate::And(parts) => Condition::And(
                parts
                    .iter()
                    .map(|p| Condition::from_predicate(p, schema))
                    .collect(),
            ),
            Predicate::Or(parts) => Condition::Or(
                parts
                    .iter()
                    .map(|p| Condition::from_predicate(p, schema))
                    .collect(),
            ),
            Predicate::Eq { column, value } => Condition::Equals {
                column: column_ref(*column),
                value: SqlParameter::from_value(column.column_type, value),
            },
            Predicate::Contains { column, value } => Condition::Contains {
                column: column_ref(*column),
                value: value.clone(),
            },
            Predicate::ArrayContains { column, value } => Condition::ArrayContains {
                column: column_ref(*column),
                value: value.clone(),
            },
            Predicate::Range {
                column,
                lower,
                upper,
            } => {
                let mut bounds = Vec::new();
                if let Some(lower) = lower {
                    bounds.push(Condition::GreaterThanOrEqual {
                        column: column_ref(*column),
                        value: SqlParameter::from_value(column.column_type, lower),
                    });
                }
                if let Some(upper) = upper {
                    bounds.push(Condition::LessThanOrEqual {
                        column: column_ref(*column),
                        value: SqlParameter::from_value(column.column_type, upper),
                    });
                }
                if bounds.is_empty() {
                    return Condition::IsNotNull {
                        column: column_ref(*column),
                    };
                }
                Condition::And(bounds)
            }
            Predicate::HasAuthor { kind, users } => Condition::Exists {
                table: Table::authors(schema),
                inner: Cow::Borrowed(&RECORD_ID_COLUMN),
                outer: Cow::Borrowed(&ID_COLUMN),
                conditions: vec![
                    Condition::Equals {
                        column: Cow::Borrowed(&AUTHOR_KIND_COLUMN),
                        value: SqlParameter::text(kind.as_str()),
                    },
                    Condition::In {
                        column: Cow::Borrowed(&AUTHOR_ID_COLUMN),
                        values: users.iter().map(|u| u.to_string()).collect(),
                    },
                ],
            },
        }
    }
}

/// Main table column backing a schema column
pub fn column_ref(column: &'static ColumnDef) -> ColumnRef<'static> {
    Cow::Owned(Column::main(column.column))
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use registry_common::domain::schema::{CREATED_AT, IMPACT_FACTOR, IS_PUBLIC, JOURNAL, STATUS, TITLE};
    use registry_common::test_utils::user_id;
    use registry_common::AuthorKind;

    use super::*;

    #[test]
    fn test_simple_select() {
        let builder = QueryBuilder::from(Table::main(&JOURNAL))
            .select(vec![Cow::Borrowed(&ID_COLUMN), column_ref(&TITLE)])
            .where_condition(Condition::Equals {
                column: column_ref(&STATUS),
                value: SqlParameter::text("PUBLISHED"),
            });

        let (sql, params) = builder.build();

        assert_eq!(
            sql,
            "SELECT \"m\".\"id\", \"m\".\"title\"\nFROM \"journals\" AS \"m\"\nWHERE \"m\".\"status\" = $1"
        );
        assert_eq!(params, vec![SqlParameter::text("PUBLISHED")]);
    }

    #[test]
    fn scope_and_filters_lower_to_numbered_parameters() {
        let predicate = Predicate::all(vec![
            Predicate::Contains {
                column: &TITLE,
                value: "crop".into(),
            },
            Predicate::any(vec![
                Predicate::Eq {
                    column: &IS_PUBLIC,
                    value: true.into(),
                },
                Predicate::HasAuthor {
                    kind: AuthorKind::Student,
                    users: vec![user_id("s1")],
                },
            ]),
        ]);

        let (sql, params) = QueryBuilder::from(Table::main(&JOURNAL))
            .select(vec![Cow::Borrowed(&ID_COLUMN)])
            .where_condition(Condition::from_predicate(&predicate, &JOURNAL))
            .build();

        assert!(sql.ends_with(
            "WHERE (\"m\".\"title\" ILIKE $1 AND (\"m\".\"is_public\" = $2 OR EXISTS (SELECT 1 FROM \"journal_authors\" AS \"a\" WHERE \"a\".\"record_id\" = \"m\".\"id\" AND \"a\".\"author_kind\" = $3 AND \"a\".\"user_id\" = ANY($4))))"
        ), "{sql}");
        assert_eq!(
            params,
            vec![
                SqlParameter::text("%crop%"),
                SqlParameter::Boolean(Some(true)),
                SqlParameter::text("STUDENT"),
                SqlParameter::TextList(vec!["s1".into()]),
            ]
        );
    }

    #[test]
    fn trivial_predicates_lower_to_literals() {
        let (sql, params) = QueryBuilder::from(Table::main(&JOURNAL))
            .select(vec![Cow::Borrowed(&ID_COLUMN)])
            .where_condition(Condition::from_predicate(&Predicate::True, &JOURNAL))
            .build();
        assert!(!sql.contains("WHERE"));
        assert!(params.is_empty());

        let (sql, _) = QueryBuilder::from(Table::main(&JOURNAL))
            .select(vec![Cow::Borrowed(&ID_COLUMN)])
            .where_condition(Condition::from_predicate(&Predicate::Or(vec![]), &JOURNAL))
            .build();
        assert!(sql.ends_with("WHERE FALSE"));
    }

    #[test]
    fn like_wildcards_in_input_are_escaped() {
        let condition = Condition::Contains {
            column: column_ref(&TITLE),
            value: "50%_off\\".into(),
        };
        let (_, params) = condition.to_sql(&mut 1);
        assert_eq!(params, vec![SqlParameter::text("%50\\%\\_off\\\\%")]);
    }

    #[test]
    fn open_range_still_excludes_nulls() {
        let predicate = Predicate::Range {
            column: &IMPACT_FACTOR,
            lower: Some(1.5.into()),
            upper: None,
        };
        let (sql, _) = Condition::from_predicate(&predicate, &JOURNAL).to_sql(&mut 1);
        assert_eq!(sql, "\"m\".\"impact_factor\" >= $1");

        let unbounded = Predicate::Range {
            column: &IMPACT_FACTOR,
            lower: None,
            upper: None,
        };
        let (sql, _) = Condition::from_predicate(&unbounded, &JOURNAL).to_sql(&mut 1);
        assert_eq!(sql, "\"m\".\"impact_factor\" IS NOT NULL");
    }

    #[test]
    fn page_is_ordered_with_id_tie_break() {
        let sort = Sort {
            column: &CREATED_AT,
            order: SortOrder::Descending,
        };
        let (sql, _) = QueryBuilder::from(Table::main(&JOURNAL))
            .select(vec![Cow::Borrowed(&ID_COLUMN)])
            .sorted(&sort)
            .limit(10)
            .offset(20)
            .build();
        assert!(sql.ends_with(
            "ORDER BY \"m\".\"created_at\" DESC NULLS LAST, \"m\".\"id\" ASC NULLS LAST\nLIMIT 10\nOFFSET 20"
        ), "{sql}");
    }

    #[test]
    fn count_ignores_window() {
        let (sql, params) = QueryBuilder::from(Table::main(&JOURNAL))
            .select(vec![Cow::Borrowed(&ID_COLUMN)])
            .where_condition(Condition::Equals {
                column: column_ref(&STATUS),
                value: SqlParameter::text("DRAFT"),
            })
            .limit(5)
            .build_count();
        assert_eq!(
            sql,
            "SELECT COUNT(*)\nFROM \"journals\" AS \"m\"\nWHERE \"m\".\"status\" = $1"
        );
        assert_eq!(params.len(), 1);
    }
}
