use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use registry_common::domain::schema::ColumnSource;
use registry_common::{AuthorKind, ColumnDef, FieldValue, RecordId, ResourceKind, User, UserId};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A research record of any kind, with its authors resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub id: RecordId,
    pub kind: ResourceKind,
    /// attribute values keyed by column name; absent means NULL
    pub attributes: BTreeMap<&'static str, FieldValue>,
    pub faculty_authors: Vec<User>,
    pub student_authors: Vec<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Publication {
    /// Value of any column, system columns included
    pub fn value(&self, column: &ColumnDef) -> Cow<'_, FieldValue> {
        match column.source {
            ColumnSource::Id => Cow::Owned(FieldValue::Text(self.id.to_string())),
            ColumnSource::CreatedAt => Cow::Owned(FieldValue::Timestamp(self.created_at)),
            ColumnSource::UpdatedAt => Cow::Owned(FieldValue::Timestamp(self.updated_at)),
            ColumnSource::Attribute => self
                .attributes
                .get(column.name)
                .map(Cow::Borrowed)
                .unwrap_or(Cow::Owned(FieldValue::Null)),
        }
    }

    pub fn set(&mut self, column: &'static ColumnDef, value: impl Into<FieldValue>) {
        self.attributes.insert(column.name, value.into());
    }

    pub fn authors(&self, kind: AuthorKind) -> &[User] {
        match kind {
            AuthorKind::Faculty => &self.faculty_authors,
            AuthorKind::Student => &self.student_authors,
        }
    }

    pub fn author_ids(&self, kind: AuthorKind) -> Vec<UserId> {
        self.authors(kind).iter().map(|u| u.id.clone()).collect()
    }

    pub fn is_authored_by(&self, user: &UserId) -> bool {
        AuthorKind::ALL
            .iter()
            .any(|kind| self.authors(*kind).iter().any(|a| &a.id == user))
    }
}

/// Columns in schema order, followed by the two author lists
impl Serialize for Publication {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let schema = self.kind.schema();
        let mut map = serializer.serialize_map(Some(schema.columns.len() + 2))?;
        for column in schema.columns {
            map.serialize_entry(column.name, &*self.value(column))?;
        }
        for kind in AuthorKind::ALL {
            map.serialize_entry(kind.authors_field(), self.authors(kind))?;
        }
        map.end()
    }
}

/// Validated input of a create operation
#[derive(Debug, Clone, PartialEq)]
pub struct NewPublication {
    pub id: RecordId,
    pub kind: ResourceKind,
    /// every attribute of the schema, defaults applied
    pub attributes: BTreeMap<&'static str, FieldValue>,
    pub faculty_author_ids: Vec<UserId>,
    pub student_author_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl NewPublication {
    pub fn author_ids(&self, kind: AuthorKind) -> &[UserId] {
        match kind {
            AuthorKind::Faculty => &self.faculty_author_ids,
            AuthorKind::Student => &self.student_author_ids,
        }
    }
}

/// Validated input of an update; only present attributes are written
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationPatch {
    pub attributes: BTreeMap<&'static str, FieldValue>,
    /// `Some` replaces the author set of that kind
    pub faculty_author_ids: Option<Vec<UserId>>,
    pub student_author_ids: Option<Vec<UserId>>,
    pub updated_at: DateTime<Utc>,
}

impl PublicationPatch {
    pub fn author_ids(&self, kind: AuthorKind) -> Option<&[UserId]> {
        match kind {
            AuthorKind::Faculty => self.faculty_author_ids.as_deref(),
            AuthorKind::Student => self.student_author_ids.as_deref(),
        }
    }
}

/// Authorship rows to remove and to add to go from one author set to another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorChanges {
    pub removed: Vec<UserId>,
    pub added: Vec<UserId>,
}

impl AuthorChanges {
    pub fn diff(current: &[UserId], requested: &[UserId]) -> Self {
        let current: BTreeSet<&UserId> = current.iter().collect();
        let requested: BTreeSet<&UserId> = requested.iter().collect();
        Self {
            removed: current.difference(&requested).map(|id| (*id).clone()).collect(),
            added: requested.difference(&current).map(|id| (*id).clone()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use registry_common::domain::schema::{SERIAL_NO, TITLE};
    use registry_common::test_utils::{make_user, user_id};
    use registry_common::Role;

    use super::*;

    /// Record of `kind` with every attribute at its default
    pub(crate) fn publication(kind: ResourceKind, id: &str) -> Publication {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let attributes = kind
            .schema()
            .attributes()
            .map(|c| (c.name, c.default_value()))
            .filter(|(_, v)| !v.is_null())
            .collect();
        Publication {
            id: RecordId::try_new(id).unwrap(),
            kind,
            attributes,
            faculty_authors: Vec::new(),
            student_authors: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn serializes_columns_in_schema_order_with_authors() {
        let mut record = publication(ResourceKind::Journal, "j1");
        record.set(&SERIAL_NO, "J-001");
        record.set(&TITLE, "On \"Quoted\" Things");
        record.faculty_authors = vec![make_user("f1", "Frank Faculty", Role::Faculty)];

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "j1");
        assert_eq!(json["serialNo"], "J-001");
        assert_eq!(json["status"], "DRAFT");
        assert_eq!(json["isPublic"], false);
        assert!(json["doi"].is_null());
        assert_eq!(json["createdAt"], "2024-01-15T10:00:00Z");
        assert_eq!(json["facultyAuthors"][0]["email"], "f1@university.edu");
        assert_eq!(json["studentAuthors"].as_array().unwrap().len(), 0);

        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), ResourceKind::Journal.schema().columns.len() + 2);
    }

    #[test]
    fn authorship_check_covers_both_kinds() {
        let mut record = publication(ResourceKind::Copyright, "c1");
        record.student_authors = vec![make_user("s1", "Sam Student", Role::Student)];
        assert!(record.is_authored_by(&user_id("s1")));
        assert!(!record.is_authored_by(&user_id("f1")));
    }

    #[test]
    fn author_diff_keeps_common_members() {
        let current = vec![user_id("f1"), user_id("f2")];
        let requested = vec![user_id("f2"), user_id("f3")];
        let changes = AuthorChanges::diff(&current, &requested);
        assert_eq!(changes.removed, vec![user_id("f1")]);
        assert_eq!(changes.added, vec![user_id("f3")]);
        assert!(AuthorChanges::diff(&current, &current).is_empty());
    }
}
