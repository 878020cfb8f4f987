use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;

use crate::domain::enums;
use crate::domain::values::{FieldValue, ValueError};
use crate::{CREATED_FIELD_NAME, ID_FIELD_NAME, UPDATED_FIELD_NAME};

/// The three kinds of research records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Journal,
    BookChapter,
    Copyright,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Journal,
        ResourceKind::BookChapter,
        ResourceKind::Copyright,
    ];

    pub fn schema(&self) -> &'static ResourceSchema {
        match self {
            ResourceKind::Journal => &JOURNAL,
            ResourceKind::BookChapter => &BOOK_CHAPTER,
            ResourceKind::Copyright => &COPYRIGHT,
        }
    }

    /// segment used in `/api/research/{kind}`
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceKind::Journal => "journal",
            ResourceKind::BookChapter => "book-chapter",
            ResourceKind::Copyright => "copyright",
        }
    }

    /// json key wrapping a single record
    pub fn singular_key(&self) -> &'static str {
        match self {
            ResourceKind::Journal => "journal",
            ResourceKind::BookChapter => "bookChapter",
            ResourceKind::Copyright => "copyright",
        }
    }

    /// json key wrapping a list of records
    pub fn plural_key(&self) -> &'static str {
        match self {
            ResourceKind::Journal => "journals",
            ResourceKind::BookChapter => "bookChapters",
            ResourceKind::Copyright => "copyrights",
        }
    }

    /// prefix of the exported file name
    pub fn export_file_prefix(&self) -> &'static str {
        match self {
            ResourceKind::Journal => "journals",
            ResourceKind::BookChapter => "book-chapters",
            ResourceKind::Copyright => "copyrights",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Journal => "Journal",
            ResourceKind::BookChapter => "Book chapter",
            ResourceKind::Copyright => "Copyright",
        }
    }
}

/// Storage and wire type of a column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Text,
    /// text restricted to a closed set of values
    Enum(&'static [&'static str]),
    Float,
    Boolean,
    Date,
    Timestamp,
    TextList,
}

/// Where the value of a column lives in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    Id,
    Attribute,
    CreatedAt,
    UpdatedAt,
}

/// Value a column takes when a new record does not supply it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnDefault {
    None,
    Text(&'static str),
    Boolean(bool),
    EmptyList,
}

/// A column of a research record table.
/// `name` is the camelCase key used in payloads, filters and responses,
/// `column` the snake_case name in the database.
#[derive(Debug, PartialEq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column: &'static str,
    pub column_type: ColumnType,
    pub source: ColumnSource,
    pub required: bool,
    pub unique: bool,
    pub default: ColumnDefault,
}

impl ColumnDef {
    pub const fn attribute(
        name: &'static str,
        column: &'static str,
        column_type: ColumnType,
    ) -> Self {
        Self {
            name,
            column,
            column_type,
            source: ColumnSource::Attribute,
            required: false,
            unique: false,
            default: ColumnDefault::None,
        }
    }

    const fn system(
        name: &'static str,
        column: &'static str,
        column_type: ColumnType,
        source: ColumnSource,
    ) -> Self {
        Self {
            name,
            column,
            column_type,
            source,
            required: true,
            unique: false,
            default: ColumnDefault::None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn with_default(mut self, default: ColumnDefault) -> Self {
        self.default = default;
        self
    }

    pub fn is_attribute(&self) -> bool {
        self.source == ColumnSource::Attribute
    }

    /// Attribute may hold NULL: neither required nor defaulted
    pub fn is_nullable(&self) -> bool {
        !self.required && self.default == ColumnDefault::None
    }

    pub fn default_value(&self) -> FieldValue {
        match self.default {
            ColumnDefault::None => FieldValue::Null,
            ColumnDefault::Text(value) => FieldValue::Text(value.to_string()),
            ColumnDefault::Boolean(value) => FieldValue::Boolean(value),
            ColumnDefault::EmptyList => FieldValue::TextList(Vec::new()),
        }
    }
}

impl ColumnType {
    /// Shape expected by this column, used in validation messages
    pub fn expected(&self) -> &'static str {
        match self {
            ColumnType::Text => "a string",
            ColumnType::Enum(_) => "an enumerated string",
            ColumnType::Float => "a number",
            ColumnType::Boolean => "true or false",
            ColumnType::Date => "a date (YYYY-MM-DD)",
            ColumnType::Timestamp => "an RFC 3339 timestamp",
            ColumnType::TextList => "a list of strings",
        }
    }

    /// Lists have no natural order
    pub fn is_sortable(&self) -> bool {
        !matches!(self, ColumnType::TextList)
    }

    /// Converts a json payload value. Empty strings are treated as NULL.
    pub fn parse_json(&self, value: &Value) -> Result<FieldValue, ValueError> {
        match (self, value) {
            (_, Value::Null) => Ok(FieldValue::Null),
            (_, Value::String(raw)) => self.parse_param(raw),
            (ColumnType::Float, Value::Number(number)) => number
                .as_f64()
                .filter(|n| n.is_finite())
                .map(FieldValue::Float)
                .ok_or(ValueError::WrongType(self.expected())),
            (ColumnType::Boolean, Value::Bool(flag)) => Ok(FieldValue::Boolean(*flag)),
            (ColumnType::TextList, Value::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let text = item.as_str().ok_or(ValueError::WrongType(self.expected()))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        values.push(text.to_string());
                    }
                }
                Ok(FieldValue::TextList(values))
            }
            _ => Err(ValueError::WrongType(self.expected())),
        }
    }

    /// Converts a raw string, as found in query strings and form fields.
    /// Empty input is NULL; numbers must be finite.
    pub fn parse_param(&self, raw: &str) -> Result<FieldValue, ValueError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(FieldValue::Null);
        }
        match self {
            ColumnType::Text => Ok(FieldValue::Text(raw.to_string())),
            ColumnType::Enum(values) => {
                if values.contains(&raw) {
                    Ok(FieldValue::Text(raw.to_string()))
                } else {
                    Err(ValueError::NotAllowed(values))
                }
            }
            ColumnType::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Float)
                .ok_or(ValueError::WrongType(self.expected())),
            ColumnType::Boolean => match raw {
                "true" => Ok(FieldValue::Boolean(true)),
                "false" => Ok(FieldValue::Boolean(false)),
                _ => Err(ValueError::WrongType(self.expected())),
            },
            ColumnType::Date => parse_date(raw)
                .map(FieldValue::Date)
                .ok_or(ValueError::WrongType(self.expected())),
            ColumnType::Timestamp => parse_timestamp(raw)
                .map(FieldValue::Timestamp)
                .ok_or(ValueError::WrongType(self.expected())),
            ColumnType::TextList => Ok(FieldValue::TextList(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part is kept)
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|t| t.date_naive()))
}

/// Accepts a full RFC 3339 timestamp or `YYYY-MM-DD` (midnight UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
}

/// Declarative description of one resource table
#[derive(Debug)]
pub struct ResourceSchema {
    pub kind: ResourceKind,
    pub table_name: &'static str,
    pub authors_table_name: &'static str,
    pub columns: &'static [&'static ColumnDef],
    /// creation needs at least one faculty and one student author
    pub requires_authors: bool,
}

impl ResourceSchema {
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().copied().find(|c| c.name == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns.iter().copied().filter(|c| c.is_attribute())
    }

    pub fn unique_attributes(&self) -> impl Iterator<Item = &'static ColumnDef> {
        self.attributes().filter(|c| c.unique)
    }
}

// Columns shared by all kinds

pub static ID: ColumnDef =
    ColumnDef::system("id", ID_FIELD_NAME, ColumnType::Text, ColumnSource::Id);
pub static CREATED_AT: ColumnDef = ColumnDef::system(
    "createdAt",
    CREATED_FIELD_NAME,
    ColumnType::Timestamp,
    ColumnSource::CreatedAt,
);
pub static UPDATED_AT: ColumnDef = ColumnDef::system(
    "updatedAt",
    UPDATED_FIELD_NAME,
    ColumnType::Timestamp,
    ColumnSource::UpdatedAt,
);

pub static TITLE: ColumnDef = ColumnDef::attribute("title", "title", ColumnType::Text).required();
pub static ABSTRACT: ColumnDef = ColumnDef::attribute("abstract", "abstract", ColumnType::Text);
pub static STATUS: ColumnDef =
    ColumnDef::attribute("status", "status", ColumnType::Enum(enums::STATUS))
        .with_default(ColumnDefault::Text(enums::DEFAULT_STATUS));
pub static TEACHER_STATUS: ColumnDef = ColumnDef::attribute(
    "teacherStatus",
    "teacher_status",
    ColumnType::Enum(enums::TEACHER_STATUS),
)
.with_default(ColumnDefault::Text(enums::DEFAULT_TEACHER_STATUS));
pub static IS_PUBLIC: ColumnDef = ColumnDef::attribute("isPublic", "is_public", ColumnType::Boolean)
    .with_default(ColumnDefault::Boolean(false));
pub static FEES: ColumnDef = ColumnDef::attribute("fees", "fees", ColumnType::Float);
pub static REIMBURSEMENT: ColumnDef =
    ColumnDef::attribute("reimbursement", "reimbursement", ColumnType::Float);
pub static DOCUMENT_URL: ColumnDef =
    ColumnDef::attribute("documentUrl", "document_url", ColumnType::Text);
pub static IMAGE_URL: ColumnDef = ColumnDef::attribute("imageUrl", "image_url", ColumnType::Text);
pub static PUBLISHER: ColumnDef = ColumnDef::attribute("publisher", "publisher", ColumnType::Text);
pub static DOI: ColumnDef = ColumnDef::attribute("doi", "doi", ColumnType::Text);
pub static KEYWORDS: ColumnDef = ColumnDef::attribute("keywords", "keywords", ColumnType::TextList)
    .with_default(ColumnDefault::EmptyList);
pub static PUBLICATION_DATE: ColumnDef =
    ColumnDef::attribute("publicationDate", "publication_date", ColumnType::Date);

// Journal

pub static SERIAL_NO: ColumnDef = ColumnDef::attribute("serialNo", "serial_no", ColumnType::Text)
    .required()
    .unique();
pub static JOURNAL_NAME: ColumnDef =
    ColumnDef::attribute("journalName", "journal_name", ColumnType::Text).required();
pub static IMPACT_FACTOR: ColumnDef =
    ColumnDef::attribute("impactFactor", "impact_factor", ColumnType::Float);
pub static IMPACT_FACTOR_DATE: ColumnDef =
    ColumnDef::attribute("impactFactorDate", "impact_factor_date", ColumnType::Date);
pub static SCOPE: ColumnDef =
    ColumnDef::attribute("scope", "scope", ColumnType::Enum(enums::JOURNAL_SCOPE)).required();
pub static REVIEW_TYPE: ColumnDef =
    ColumnDef::attribute("reviewType", "review_type", ColumnType::Enum(enums::REVIEW_TYPE))
        .required();
pub static ACCESS_TYPE: ColumnDef =
    ColumnDef::attribute("accessType", "access_type", ColumnType::Enum(enums::ACCESS_TYPE))
        .required();
pub static INDEXING: ColumnDef =
    ColumnDef::attribute("indexing", "indexing", ColumnType::Enum(enums::INDEXING)).required();
pub static QUARTILE: ColumnDef =
    ColumnDef::attribute("quartile", "quartile", ColumnType::Enum(enums::QUARTILE));
pub static PUBLICATION_MODE: ColumnDef = ColumnDef::attribute(
    "publicationMode",
    "publication_mode",
    ColumnType::Enum(enums::PUBLICATION_MODE),
)
.required();
pub static PAPER_LINK: ColumnDef = ColumnDef::attribute("paperLink", "paper_link", ColumnType::Text);

// Book chapter

pub static BOOK_TITLE: ColumnDef = ColumnDef::attribute("bookTitle", "book_title", ColumnType::Text);
pub static ISBN_ISSN: ColumnDef = ColumnDef::attribute("isbnIssn", "isbn_issn", ColumnType::Text);

// Copyright

pub static REG_NO: ColumnDef = ColumnDef::attribute("regNo", "reg_no", ColumnType::Text);
pub static FILING_DATE: ColumnDef =
    ColumnDef::attribute("filingDate", "filing_date", ColumnType::Date);
pub static SUBMISSION_DATE: ColumnDef =
    ColumnDef::attribute("submissionDate", "submission_date", ColumnType::Date);
pub static GRANT_DATE: ColumnDef = ColumnDef::attribute("grantDate", "grant_date", ColumnType::Date);

pub static JOURNAL: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Journal,
    table_name: "journals",
    authors_table_name: "journal_authors",
    columns: &[
        &ID,
        &SERIAL_NO,
        &TITLE,
        &JOURNAL_NAME,
        &ABSTRACT,
        &STATUS,
        &TEACHER_STATUS,
        &SCOPE,
        &REVIEW_TYPE,
        &ACCESS_TYPE,
        &INDEXING,
        &QUARTILE,
        &PUBLICATION_MODE,
        &IMPACT_FACTOR,
        &IMPACT_FACTOR_DATE,
        &PUBLISHER,
        &DOI,
        &PAPER_LINK,
        &KEYWORDS,
        &PUBLICATION_DATE,
        &FEES,
        &REIMBURSEMENT,
        &IS_PUBLIC,
        &DOCUMENT_URL,
        &IMAGE_URL,
        &CREATED_AT,
        &UPDATED_AT,
    ],
    requires_authors: true,
};

pub static BOOK_CHAPTER: ResourceSchema = ResourceSchema {
    kind: ResourceKind::BookChapter,
    table_name: "book_chapters",
    authors_table_name: "book_chapter_authors",
    columns: &[
        &ID,
        &TITLE,
        &BOOK_TITLE,
        &ABSTRACT,
        &STATUS,
        &TEACHER_STATUS,
        &ISBN_ISSN,
        &PUBLISHER,
        &DOI,
        &KEYWORDS,
        &PUBLICATION_DATE,
        &FEES,
        &REIMBURSEMENT,
        &IS_PUBLIC,
        &DOCUMENT_URL,
        &IMAGE_URL,
        &CREATED_AT,
        &UPDATED_AT,
    ],
    requires_authors: false,
};

pub static COPYRIGHT: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Copyright,
    table_name: "copyrights",
    authors_table_name: "copyright_authors",
    columns: &[
        &ID,
        &TITLE,
        &REG_NO,
        &ABSTRACT,
        &STATUS,
        &TEACHER_STATUS,
        &FILING_DATE,
        &SUBMISSION_DATE,
        &PUBLICATION_DATE,
        &GRANT_DATE,
        &FEES,
        &REIMBURSEMENT,
        &IS_PUBLIC,
        &DOCUMENT_URL,
        &IMAGE_URL,
        &CREATED_AT,
        &UPDATED_AT,
    ],
    requires_authors: true,
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    #[test]
    fn every_schema_has_unique_names_and_system_columns() {
        for kind in ResourceKind::ALL {
            let schema = kind.schema();
            assert_eq!(schema.kind, kind);

            let names: HashSet<_> = schema.columns.iter().map(|c| c.name).collect();
            assert_eq!(names.len(), schema.columns.len(), "{:?}", kind);

            for system in ["id", "createdAt", "updatedAt"] {
                assert!(schema.column(system).is_some_and(|c| !c.is_attribute()));
            }
        }
    }

    #[test]
    fn journal_serial_number_is_the_only_unique_attribute() {
        let unique: Vec<_> = JOURNAL.unique_attributes().map(|c| c.name).collect();
        assert_eq!(unique, vec!["serialNo"]);
        assert_eq!(BOOK_CHAPTER.unique_attributes().count(), 0);
    }

    #[test]
    fn enum_columns_accept_only_their_values() {
        let status = ColumnType::Enum(enums::STATUS);
        assert_eq!(
            status.parse_param("UNDER_REVIEW"),
            Ok(FieldValue::Text("UNDER_REVIEW".into()))
        );
        assert_eq!(
            status.parse_param("bogus"),
            Err(ValueError::NotAllowed(enums::STATUS))
        );
        assert_eq!(status.parse_param("  "), Ok(FieldValue::Null));
    }

    #[test]
    fn floats_must_be_finite() {
        assert_eq!(ColumnType::Float.parse_param("2.5"), Ok(FieldValue::Float(2.5)));
        assert!(ColumnType::Float.parse_param("NaN").is_err());
        assert!(ColumnType::Float.parse_param("inf").is_err());
        assert!(ColumnType::Float.parse_param("abc").is_err());
        assert_eq!(ColumnType::Float.parse_json(&json!(3)), Ok(FieldValue::Float(3.0)));
        assert!(ColumnType::Float.parse_json(&json!(true)).is_err());
    }

    #[test]
    fn dates_accept_plain_and_rfc3339_forms() {
        let expected = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(ColumnType::Date.parse_param("2024-05-17"), Ok(expected.clone()));
        assert_eq!(
            ColumnType::Date.parse_json(&json!("2024-05-17T00:00:00.000Z")),
            Ok(expected)
        );
        assert!(ColumnType::Date.parse_param("17/05/2024").is_err());
    }

    #[test]
    fn text_lists_drop_blank_items() {
        assert_eq!(
            ColumnType::TextList.parse_json(&json!(["ml", " ", "nlp "])),
            Ok(FieldValue::TextList(vec!["ml".into(), "nlp".into()]))
        );
        assert_eq!(
            ColumnType::TextList.parse_param("ml, nlp"),
            Ok(FieldValue::TextList(vec!["ml".into(), "nlp".into()]))
        );
        assert!(ColumnType::TextList.parse_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn defaults_follow_column_definition() {
        assert_eq!(STATUS.default_value(), FieldValue::Text("DRAFT".into()));
        assert_eq!(IS_PUBLIC.default_value(), FieldValue::Boolean(false));
        assert_eq!(KEYWORDS.default_value(), FieldValue::TextList(vec![]));
        assert!(DOI.is_nullable());
        assert!(!IS_PUBLIC.is_nullable());
        assert!(!TITLE.is_nullable());
    }
}
