use std::fmt::Debug;
use std::str::FromStr;
use std::sync::LazyLock;

use nutype::nutype;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod enums;
pub mod schema;
pub mod users;
pub mod values;

pub use schema::{ColumnDef, ColumnType, ResourceKind, ResourceSchema};
pub use users::User;
pub use values::{FieldValue, ValueError};

// Identifiers are opaque strings: cuid/uuid from the identity system, uuid for records.
// Example: "f1", "ckx2k1p0a0000", "3f0c1a9e-..." are valid; "a b" or "x;drop" are not.
pub const ELIGIBLE_SYMBOLS_REGEX: &str = r"^[A-Za-z0-9_-]+$";

static ELIGIBLE_SYMBOLS_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ELIGIBLE_SYMBOLS_REGEX).expect("ELIGIBLE_SYMBOLS_REGEX must be a valid regex")
});

pub fn is_eligible_id(id: &str) -> bool {
    ELIGIBLE_SYMBOLS_REGEX_COMPILED.is_match(id)
}

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64, predicate = is_eligible_id),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct UserId(String);

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64, predicate = is_eligible_id),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct RecordId(String);

/// Role of an institution user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Faculty => "FACULTY",
            Role::Student => "STUDENT",
        }
    }

    /// Capacity in which a user of this role may author a record.
    /// Admins never appear in authorship joins.
    pub fn author_kind(&self) -> Option<AuthorKind> {
        match self {
            Role::Admin => None,
            Role::Faculty => Some(AuthorKind::Faculty),
            Role::Student => Some(AuthorKind::Student),
        }
    }
}

impl FromStr for Role {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "FACULTY" => Ok(Role::Faculty),
            "STUDENT" => Ok(Role::Student),
            _ => Err(ValueError::NotAllowed(&["ADMIN", "FACULTY", "STUDENT"])),
        }
    }
}

/// The two disjoint authorship capacities
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthorKind {
    Faculty,
    Student,
}

impl AuthorKind {
    pub const ALL: [AuthorKind; 2] = [AuthorKind::Faculty, AuthorKind::Student];

    /// value stored in the authorship join table
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorKind::Faculty => "FACULTY",
            AuthorKind::Student => "STUDENT",
        }
    }

    /// the only role allowed to be referenced in this capacity
    pub fn role(&self) -> Role {
        match self {
            AuthorKind::Faculty => Role::Faculty,
            AuthorKind::Student => Role::Student,
        }
    }

    /// payload and filter key carrying author ids of this kind
    pub fn ids_field(&self) -> &'static str {
        match self {
            AuthorKind::Faculty => "facultyAuthorIds",
            AuthorKind::Student => "studentAuthorIds",
        }
    }

    /// response key carrying resolved authors of this kind
    pub fn authors_field(&self) -> &'static str {
        match self {
            AuthorKind::Faculty => "facultyAuthors",
            AuthorKind::Student => "studentAuthors",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthorKind::Faculty => "faculty",
            AuthorKind::Student => "student",
        }
    }
}

impl FromStr for AuthorKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FACULTY" => Ok(AuthorKind::Faculty),
            "STUDENT" => Ok(AuthorKind::Student),
            _ => Err(ValueError::NotAllowed(&["FACULTY", "STUDENT"])),
        }
    }
}
