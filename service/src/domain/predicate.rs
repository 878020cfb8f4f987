use registry_common::{AuthorKind, ColumnDef, FieldValue, UserId};

use crate::domain::publication::Publication;

/// Boolean condition over the records of one kind.
///
/// Built from the caller's scope and the request filters, then either lowered
/// to SQL by the Postgres repository or evaluated with [`Predicate::matches`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    And(Vec<Predicate>),
    /// an empty disjunction matches nothing
    Or(Vec<Predicate>),
    Eq {
        column: &'static ColumnDef,
        value: FieldValue,
    },
    /// case-insensitive substring
    Contains {
        column: &'static ColumnDef,
        value: String,
    },
    /// list column holds `value`
    ArrayContains {
        column: &'static ColumnDef,
        value: String,
    },
    /// inclusive on both ends, an absent bound is open
    Range {
        column: &'static ColumnDef,
        lower: Option<FieldValue>,
        upper: Option<FieldValue>,
    },
    /// record has at least one of `users` as an author of `kind`
    HasAuthor { kind: AuthorKind, users: Vec<UserId> },
}

impl Predicate {
    /// Conjunction that drops `True` members and flattens trivial cases
    pub fn all(parts: Vec<Predicate>) -> Predicate {
        let mut parts: Vec<Predicate> = parts
            .into_iter()
            .filter(|p| *p != Predicate::True)
            .collect();
        match parts.len() {
            0 => Predicate::True,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    /// Disjunction; any `True` member makes the whole predicate `True`
    pub fn any(mut parts: Vec<Predicate>) -> Predicate {
        if parts.contains(&Predicate::True) {
            return Predicate::True;
        }
        match parts.len() {
            1 => parts.remove(0),
            _ => Predicate::Or(parts),
        }
    }

    pub fn matches(&self, publication: &Publication) -> bool {
        match self {
            Predicate::True => true,
            Predicate::And(parts) => parts.iter().all(|p| p.matches(publication)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(publication)),
            Predicate::Eq { column, value } => {
                let actual = publication.value(column);
                !actual.is_null() && *actual == *value
            }
            Predicate::Contains { column, value } => publication
                .value(column)
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(&value.to_lowercase())),
            Predicate::ArrayContains { column, value } => {
                publication.value(column).as_list().contains(value)
            }
            Predicate::Range {
                column,
                lower,
                upper,
            } => {
                let actual = publication.value(column);
                if actual.is_null() {
                    return false;
                }
                let above = lower.as_ref().is_none_or(|lower| *actual >= *lower);
                let below = upper.as_ref().is_none_or(|upper| *actual <= *upper);
                above && below
            }
            Predicate::HasAuthor { kind, users } => publication
                .authors(*kind)
                .iter()
                .any(|author| users.contains(&author.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use registry_common::domain::schema::{FEES, IS_PUBLIC, KEYWORDS, TITLE};
    use registry_common::test_utils::{make_user, user_id};
    use registry_common::{ResourceKind, Role};

    use super::*;
    use crate::domain::publication::tests::publication;

    fn sample() -> Publication {
        let mut record = publication(ResourceKind::BookChapter, "b1");
        record.set(&TITLE, "Deep Learning for Crops");
        record.set(&FEES, 120.0);
        record.set(&KEYWORDS, FieldValue::TextList(vec!["ml".into(), "agri".into()]));
        record.student_authors = vec![make_user("s1", "Sam Student", Role::Student)];
        record
    }

    #[test]
    fn composition_simplifies_trivial_cases() {
        assert_eq!(Predicate::all(vec![]), Predicate::True);
        assert_eq!(
            Predicate::all(vec![Predicate::True, Predicate::Or(vec![])]),
            Predicate::Or(vec![])
        );
        assert_eq!(
            Predicate::any(vec![Predicate::Or(vec![]), Predicate::True]),
            Predicate::True
        );
        assert!(!Predicate::Or(vec![]).matches(&sample()));
    }

    #[test]
    fn contains_ignores_case() {
        let predicate = Predicate::Contains {
            column: &TITLE,
            value: "LEARNING".into(),
        };
        assert!(predicate.matches(&sample()));
    }

    #[test]
    fn range_is_inclusive_and_skips_nulls() {
        let record = sample();
        let inclusive = Predicate::Range {
            column: &FEES,
            lower: Some(120.0.into()),
            upper: Some(120.0.into()),
        };
        assert!(inclusive.matches(&record));

        let mut unpriced = sample();
        unpriced.set(&FEES, FieldValue::Null);
        let open = Predicate::Range {
            column: &FEES,
            lower: None,
            upper: Some(1000.0.into()),
        };
        assert!(!open.matches(&unpriced));
    }

    #[test]
    fn keyword_and_author_membership() {
        let record = sample();
        assert!(
            Predicate::ArrayContains {
                column: &KEYWORDS,
                value: "agri".into()
            }
            .matches(&record)
        );
        assert!(
            Predicate::HasAuthor {
                kind: AuthorKind::Student,
                users: vec![user_id("s2"), user_id("s1")]
            }
            .matches(&record)
        );
        assert!(
            !Predicate::HasAuthor {
                kind: AuthorKind::Faculty,
                users: vec![user_id("s1")]
            }
            .matches(&record)
        );
    }

    #[test]
    fn equality_on_visibility_flag() {
        let record = sample();
        let public = Predicate::Eq {
            column: &IS_PUBLIC,
            value: true.into(),
        };
        assert!(!public.matches(&record));
    }
}
