use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use registry_common::{
    AuthorKind, ColumnDef, ColumnType, FieldValue, RecordId, ResourceSchema, UserId, ValueError,
};
use serde_json::{Map, Value};

use crate::domain::error::ValidationError;
use crate::domain::publication::{NewPublication, PublicationPatch};

/// Keys clients echo back from responses; they are never written
const READ_ONLY_KEYS: &[&str] = &["id", "createdAt", "updatedAt", "facultyAuthors", "studentAuthors"];

/// Checks the shape of a create payload and applies column defaults.
/// Cross references (author roles, unique values) are checked against the store afterwards.
pub fn validate_create(
    schema: &ResourceSchema,
    payload: &Value,
    id: RecordId,
    now: DateTime<Utc>,
) -> Result<NewPublication, ValidationError> {
    let object = as_object(payload)?;
    reject_unknown_fields(schema, object)?;

    let mut attributes = BTreeMap::new();
    for column in schema.attributes() {
        let value = match object.get(column.name) {
            Some(value) => parse_attribute(column, value)?,
            None if column.required => return Err(ValidationError::MissingField(column.name)),
            None => FieldValue::Null,
        };
        let value = if value.is_null() {
            column.default_value()
        } else {
            value
        };
        attributes.insert(column.name, value);
    }

    let mut author_ids = BTreeMap::new();
    for kind in AuthorKind::ALL {
        let ids = parse_author_ids(object, kind)?.unwrap_or_default();
        if schema.requires_authors && ids.is_empty() {
            return Err(ValidationError::EmptyAuthors(kind.label()));
        }
        author_ids.insert(kind, ids);
    }

    Ok(NewPublication {
        id,
        kind: schema.kind,
        attributes,
        faculty_author_ids: author_ids.remove(&AuthorKind::Faculty).unwrap_or_default(),
        student_author_ids: author_ids.remove(&AuthorKind::Student).unwrap_or_default(),
        created_at: now,
    })
}

/// Checks the shape of a partial update; absent keys are left untouched
pub fn validate_update(
    schema: &ResourceSchema,
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<PublicationPatch, ValidationError> {
    let object = as_object(payload)?;
    reject_unknown_fields(schema, object)?;

    let mut attributes = BTreeMap::new();
    for column in schema.attributes() {
        if let Some(value) = object.get(column.name) {
            let value = parse_attribute(column, value)?;
            if value.is_null() && !column.is_nullable() {
                return Err(ValidationError::InvalidField {
                    field: column.name.to_string(),
                    expected: column.column_type.expected(),
                });
            }
            attributes.insert(column.name, value);
        }
    }

    let mut patch = PublicationPatch {
        attributes,
        faculty_author_ids: None,
        student_author_ids: None,
        updated_at: now,
    };
    for kind in AuthorKind::ALL {
        let ids = parse_author_ids(object, kind)?;
        if schema.requires_authors && ids.as_ref().is_some_and(Vec::is_empty) {
            return Err(ValidationError::EmptyAuthors(kind.label()));
        }
        match kind {
            AuthorKind::Faculty => patch.faculty_author_ids = ids,
            AuthorKind::Student => patch.student_author_ids = ids,
        }
    }

    Ok(patch)
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, ValidationError> {
    payload.as_object().ok_or(ValidationError::InvalidBody)
}

fn reject_unknown_fields(
    schema: &ResourceSchema,
    object: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let unknown = object.keys().find(|key| {
        let key = key.as_str();
        !READ_ONLY_KEYS.contains(&key)
            && !AuthorKind::ALL.iter().any(|k| k.ids_field() == key)
            && !schema.column(key).is_some_and(|c| c.is_attribute())
    });
    match unknown {
        Some(key) => Err(ValidationError::UnknownField(key.clone())),
        None => Ok(()),
    }
}

fn parse_attribute(column: &ColumnDef, value: &Value) -> Result<FieldValue, ValidationError> {
    // required strings must be actual non-blank strings
    if column.required && column.column_type == ColumnType::Text && !value.is_string() {
        return Err(ValidationError::MissingField(column.name));
    }
    let parsed = column
        .column_type
        .parse_json(value)
        .map_err(|e| field_error(column, e))?;
    if column.required && parsed.is_null() {
        return Err(ValidationError::MissingField(column.name));
    }
    Ok(parsed)
}

fn field_error(column: &ColumnDef, error: ValueError) -> ValidationError {
    match (column.column_type, error) {
        (ColumnType::Enum(allowed), _) | (_, ValueError::NotAllowed(allowed)) => {
            ValidationError::InvalidEnum {
                field: column.name.to_string(),
                allowed,
            }
        }
        (_, ValueError::WrongType(expected)) => ValidationError::InvalidField {
            field: column.name.to_string(),
            expected,
        },
    }
}

/// `None` when the key is absent or null. Duplicates are kept so that the
/// role check against the user store rejects them.
fn parse_author_ids(
    object: &Map<String, Value>,
    kind: AuthorKind,
) -> Result<Option<Vec<UserId>>, ValidationError> {
    let field = kind.ids_field();
    let invalid = || ValidationError::InvalidField {
        field: field.to_string(),
        expected: "a list of user ids",
    };
    let items = match object.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(invalid()),
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|id| UserId::try_new(id).ok())
                .ok_or_else(invalid)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use registry_common::domain::enums;
    use registry_common::domain::schema::{BOOK_CHAPTER, COPYRIGHT, JOURNAL};
    use registry_common::test_utils::user_id;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record_id() -> RecordId {
        RecordId::try_new("r1").unwrap()
    }

    fn journal_payload() -> Value {
        json!({
            "serialNo": "J-001",
            "title": "Graph Neural Networks",
            "journalName": "Journal of AI",
            "scope": "INTERNATIONAL",
            "reviewType": "PEER_REVIEWED",
            "accessType": "OPEN_ACCESS",
            "indexing": "SCOPUS",
            "publicationMode": "ONLINE",
            "impactFactor": 3.2,
            "keywords": ["gnn", "graphs"],
            "facultyAuthorIds": ["f1"],
            "studentAuthorIds": ["s1"]
        })
    }

    #[test]
    fn valid_journal_gets_defaults() {
        let record = validate_create(&JOURNAL, &journal_payload(), record_id(), now()).unwrap();
        assert_eq!(record.attributes["status"], FieldValue::Text("DRAFT".into()));
        assert_eq!(record.attributes["teacherStatus"], FieldValue::Text("UPLOADED".into()));
        assert_eq!(record.attributes["isPublic"], FieldValue::Boolean(false));
        assert_eq!(record.attributes["doi"], FieldValue::Null);
        assert_eq!(record.attributes["impactFactor"], FieldValue::Float(3.2));
        assert_eq!(record.faculty_author_ids, vec![user_id("f1")]);
        assert_eq!(record.created_at, now());
    }

    #[test]
    fn required_strings_must_be_present_and_non_blank() {
        for value in [Value::Null, json!(""), json!("   "), json!(42)] {
            let mut payload = journal_payload();
            payload["serialNo"] = value;
            assert_eq!(
                validate_create(&JOURNAL, &payload, record_id(), now()),
                Err(ValidationError::MissingField("serialNo"))
            );
        }
        let mut payload = journal_payload();
        payload.as_object_mut().unwrap().remove("journalName");
        assert_eq!(
            validate_create(&JOURNAL, &payload, record_id(), now()),
            Err(ValidationError::MissingField("journalName"))
        );
    }

    #[test]
    fn enums_outside_closed_set_are_named() {
        let mut payload = journal_payload();
        payload["scope"] = json!("GALACTIC");
        assert_eq!(
            validate_create(&JOURNAL, &payload, record_id(), now()),
            Err(ValidationError::InvalidEnum {
                field: "scope".into(),
                allowed: enums::JOURNAL_SCOPE
            })
        );
    }

    #[test]
    fn wrongly_typed_and_unknown_fields_are_rejected() {
        let mut payload = journal_payload();
        payload["impactFactor"] = json!("high");
        assert!(matches!(
            validate_create(&JOURNAL, &payload, record_id(), now()),
            Err(ValidationError::InvalidField { ref field, .. }) if field == "impactFactor"
        ));

        let mut payload = journal_payload();
        payload["favouriteColour"] = json!("blue");
        assert_eq!(
            validate_create(&JOURNAL, &payload, record_id(), now()),
            Err(ValidationError::UnknownField("favouriteColour".into()))
        );

        assert_eq!(
            validate_create(&JOURNAL, &json!([1, 2]), record_id(), now()),
            Err(ValidationError::InvalidBody)
        );
    }

    #[test]
    fn echoed_read_only_keys_are_ignored() {
        let mut payload = journal_payload();
        payload["id"] = json!("forged");
        payload["createdAt"] = json!("2000-01-01T00:00:00Z");
        payload["facultyAuthors"] = json!([]);
        let record = validate_create(&JOURNAL, &payload, record_id(), now()).unwrap();
        assert_eq!(record.id, record_id());
    }

    #[test]
    fn journal_and_copyright_need_both_author_kinds() {
        let mut payload = journal_payload();
        payload["studentAuthorIds"] = json!([]);
        assert_eq!(
            validate_create(&JOURNAL, &payload, record_id(), now()),
            Err(ValidationError::EmptyAuthors("student"))
        );

        let copyright = json!({ "title": "Crop Sensor", "studentAuthorIds": ["s1"] });
        assert_eq!(
            validate_create(&COPYRIGHT, &copyright, record_id(), now()),
            Err(ValidationError::EmptyAuthors("faculty"))
        );
    }

    #[test]
    fn book_chapter_accepts_missing_or_empty_authors() {
        let payload = json!({ "title": "Soil Microbes", "facultyAuthorIds": [] });
        let record = validate_create(&BOOK_CHAPTER, &payload, record_id(), now()).unwrap();
        assert!(record.faculty_author_ids.is_empty());
        assert!(record.student_author_ids.is_empty());
    }

    #[test]
    fn author_ids_must_be_a_list_of_ids() {
        let mut payload = journal_payload();
        payload["facultyAuthorIds"] = json!("f1");
        assert!(matches!(
            validate_create(&JOURNAL, &payload, record_id(), now()),
            Err(ValidationError::InvalidField { ref field, .. }) if field == "facultyAuthorIds"
        ));
    }

    #[test]
    fn patch_contains_only_present_attributes() {
        let patch = validate_update(
            &JOURNAL,
            &json!({ "status": "SUBMITTED", "doi": null, "studentAuthorIds": ["s2"] }),
            now(),
        )
        .unwrap();
        assert_eq!(patch.attributes.len(), 2);
        assert_eq!(patch.attributes["doi"], FieldValue::Null);
        assert_eq!(patch.faculty_author_ids, None);
        assert_eq!(patch.student_author_ids, Some(vec![user_id("s2")]));
        assert_eq!(patch.updated_at, now());
    }

    #[test]
    fn patch_cannot_blank_required_or_defaulted_columns() {
        assert_eq!(
            validate_update(&JOURNAL, &json!({ "title": "" }), now()),
            Err(ValidationError::MissingField("title"))
        );
        assert!(validate_update(&JOURNAL, &json!({ "isPublic": null }), now()).is_err());
        assert_eq!(
            validate_update(&JOURNAL, &json!({ "facultyAuthorIds": [] }), now()),
            Err(ValidationError::EmptyAuthors("faculty"))
        );
        assert!(validate_update(&BOOK_CHAPTER, &json!({ "facultyAuthorIds": [] }), now()).is_ok());
    }

    #[test]
    fn any_status_value_is_accepted_on_patch() {
        let patch = validate_update(&JOURNAL, &json!({ "status": "PUBLISHED" }), now()).unwrap();
        assert_eq!(patch.attributes["status"], FieldValue::Text("PUBLISHED".into()));
    }
}
