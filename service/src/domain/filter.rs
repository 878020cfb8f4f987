use chrono::NaiveDate;
use registry_common::domain::schema::*;
use registry_common::{AuthorKind, ColumnDef, ColumnType, FieldValue, ResourceKind, UserId, ValueError};

use crate::domain::error::ValidationError;
use crate::domain::predicate::Predicate;

pub const SEARCH_PARAMETER: &str = "search";

/// Query string parameters of a list, export or stats request.
/// Repeated keys are kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    pairs: Vec<(String, String)>,
}

impl FilterParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Last non-blank value of `key`, trimmed
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    /// All values of `key`, repeated or comma separated
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One filterable query parameter (or pair of parameters) of a resource
#[derive(Debug)]
pub enum FilterDef {
    Equals {
        parameter: &'static str,
        column: &'static ColumnDef,
    },
    Contains {
        parameter: &'static str,
        column: &'static ColumnDef,
    },
    ArrayContains {
        parameter: &'static str,
        column: &'static ColumnDef,
    },
    Range {
        lower: &'static str,
        upper: &'static str,
        column: &'static ColumnDef,
    },
}

impl FilterDef {
    fn predicate(&self, params: &FilterParams) -> Result<Option<Predicate>, ValidationError> {
        let predicate = match self {
            FilterDef::Equals { parameter, column } => match params.get(parameter) {
                Some(raw) => Some(Predicate::Eq {
                    column: *column,
                    value: parse_value(parameter, column, raw)?,
                }),
                None => None,
            },
            FilterDef::Contains { parameter, column } => {
                params.get(parameter).map(|raw| Predicate::Contains {
                    column: *column,
                    value: raw.to_string(),
                })
            }
            FilterDef::ArrayContains { parameter, column } => {
                params.get(parameter).map(|raw| Predicate::ArrayContains {
                    column: *column,
                    value: raw.to_string(),
                })
            }
            FilterDef::Range {
                lower,
                upper,
                column,
            } => {
                let lower_value = match params.get(lower) {
                    Some(raw) => Some(parse_value(lower, column, raw)?),
                    None => None,
                };
                let upper_value = match params.get(upper) {
                    Some(raw) => Some(parse_upper_bound(upper, column, raw)?),
                    None => None,
                };
                if lower_value.is_none() && upper_value.is_none() {
                    None
                } else {
                    Some(Predicate::Range {
                        column: *column,
                        lower: lower_value,
                        upper: upper_value,
                    })
                }
            }
        };
        Ok(predicate)
    }
}

fn parse_value(
    parameter: &str,
    column: &ColumnDef,
    raw: &str,
) -> Result<FieldValue, ValidationError> {
    column
        .column_type
        .parse_param(raw)
        .map_err(|e| match e {
            ValueError::NotAllowed(allowed) => ValidationError::InvalidEnum {
                field: parameter.to_string(),
                allowed,
            },
            ValueError::WrongType(_) => ValidationError::InvalidFilter {
                parameter: parameter.to_string(),
                reason: e.to_string(),
            },
        })
}

/// A bare date as the upper bound of a timestamp range covers that whole day
fn parse_upper_bound(
    parameter: &str,
    column: &ColumnDef,
    raw: &str,
) -> Result<FieldValue, ValidationError> {
    if column.column_type == ColumnType::Timestamp
        && let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        && let Some(end_of_day) = date.and_hms_milli_opt(23, 59, 59, 999)
    {
        return Ok(FieldValue::Timestamp(end_of_day.and_utc()));
    }
    parse_value(parameter, column, raw)
}

static COMMON_FILTERS: &[FilterDef] = &[
    FilterDef::Equals {
        parameter: "status",
        column: &STATUS,
    },
    FilterDef::Equals {
        parameter: "teacherStatus",
        column: &TEACHER_STATUS,
    },
    FilterDef::Equals {
        parameter: "isPublic",
        column: &IS_PUBLIC,
    },
    FilterDef::Range {
        lower: "createdAtFrom",
        upper: "createdAtTo",
        column: &CREATED_AT,
    },
    FilterDef::Range {
        lower: "minFees",
        upper: "maxFees",
        column: &FEES,
    },
    FilterDef::Range {
        lower: "minReimbursement",
        upper: "maxReimbursement",
        column: &REIMBURSEMENT,
    },
];

static JOURNAL_FILTERS: &[FilterDef] = &[
    FilterDef::Equals {
        parameter: "scope",
        column: &SCOPE,
    },
    FilterDef::Equals {
        parameter: "reviewType",
        column: &REVIEW_TYPE,
    },
    FilterDef::Equals {
        parameter: "accessType",
        column: &ACCESS_TYPE,
    },
    FilterDef::Equals {
        parameter: "indexing",
        column: &INDEXING,
    },
    FilterDef::Equals {
        parameter: "quartile",
        column: &QUARTILE,
    },
    FilterDef::Equals {
        parameter: "publicationMode",
        column: &PUBLICATION_MODE,
    },
    FilterDef::Contains {
        parameter: "publisher",
        column: &PUBLISHER,
    },
    FilterDef::Contains {
        parameter: "serialNo",
        column: &SERIAL_NO,
    },
    FilterDef::ArrayContains {
        parameter: "keyword",
        column: &KEYWORDS,
    },
    FilterDef::Range {
        lower: "publicationDateFrom",
        upper: "publicationDateTo",
        column: &PUBLICATION_DATE,
    },
    FilterDef::Range {
        lower: "impactFactorDateFrom",
        upper: "impactFactorDateTo",
        column: &IMPACT_FACTOR_DATE,
    },
    FilterDef::Range {
        lower: "minImpactFactor",
        upper: "maxImpactFactor",
        column: &IMPACT_FACTOR,
    },
];

static BOOK_CHAPTER_FILTERS: &[FilterDef] = &[
    FilterDef::Contains {
        parameter: "publisher",
        column: &PUBLISHER,
    },
    FilterDef::Contains {
        parameter: "isbnIssn",
        column: &ISBN_ISSN,
    },
    FilterDef::ArrayContains {
        parameter: "keyword",
        column: &KEYWORDS,
    },
    FilterDef::Range {
        lower: "publicationDateFrom",
        upper: "publicationDateTo",
        column: &PUBLICATION_DATE,
    },
];

static COPYRIGHT_FILTERS: &[FilterDef] = &[
    FilterDef::Contains {
        parameter: "regNo",
        column: &REG_NO,
    },
    FilterDef::Range {
        lower: "filingDateFrom",
        upper: "filingDateTo",
        column: &FILING_DATE,
    },
    FilterDef::Range {
        lower: "submissionDateFrom",
        upper: "submissionDateTo",
        column: &SUBMISSION_DATE,
    },
    FilterDef::Range {
        lower: "publicationDateFrom",
        upper: "publicationDateTo",
        column: &PUBLICATION_DATE,
    },
    FilterDef::Range {
        lower: "grantDateFrom",
        upper: "grantDateTo",
        column: &GRANT_DATE,
    },
];

static JOURNAL_SEARCH: &[&ColumnDef] = &[&TITLE, &ABSTRACT, &JOURNAL_NAME, &PUBLISHER, &SERIAL_NO, &DOI];
static BOOK_CHAPTER_SEARCH: &[&ColumnDef] =
    &[&TITLE, &ABSTRACT, &BOOK_TITLE, &PUBLISHER, &ISBN_ISSN, &DOI];
static COPYRIGHT_SEARCH: &[&ColumnDef] = &[&TITLE, &ABSTRACT, &REG_NO];

/// Filters specific to `kind`, on top of the common ones
pub fn filters(kind: ResourceKind) -> impl Iterator<Item = &'static FilterDef> {
    let specific = match kind {
        ResourceKind::Journal => JOURNAL_FILTERS,
        ResourceKind::BookChapter => BOOK_CHAPTER_FILTERS,
        ResourceKind::Copyright => COPYRIGHT_FILTERS,
    };
    COMMON_FILTERS.iter().chain(specific.iter())
}

/// Columns matched by the free text `search` parameter
pub fn search_columns(kind: ResourceKind) -> &'static [&'static ColumnDef] {
    match kind {
        ResourceKind::Journal => JOURNAL_SEARCH,
        ResourceKind::BookChapter => BOOK_CHAPTER_SEARCH,
        ResourceKind::Copyright => COPYRIGHT_SEARCH,
    }
}

/// AND of every supplied filter of `kind`, with the caller's scope last.
/// Blank or absent parameters are ignored; unknown ones too.
pub fn build_predicate(
    scope: Predicate,
    kind: ResourceKind,
    params: &FilterParams,
) -> Result<Predicate, ValidationError> {
    let mut parts = Vec::new();

    for filter in filters(kind) {
        if let Some(predicate) = filter.predicate(params)? {
            parts.push(predicate);
        }
    }

    if let Some(term) = params.get(SEARCH_PARAMETER) {
        let matches = search_columns(kind)
            .iter()
            .map(|column| Predicate::Contains {
                column: *column,
                value: term.to_string(),
            })
            .collect();
        parts.push(Predicate::any(matches));
    }

    for author_kind in AuthorKind::ALL {
        let parameter = author_kind.ids_field();
        let raw_ids = params.get_list(parameter);
        if raw_ids.is_empty() {
            continue;
        }
        let users = raw_ids
            .into_iter()
            .map(|raw| {
                UserId::try_new(raw).map_err(|e| ValidationError::InvalidFilter {
                    parameter: parameter.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        parts.push(Predicate::HasAuthor {
            kind: author_kind,
            users,
        });
    }

    parts.push(scope);
    Ok(Predicate::all(parts))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use registry_common::domain::enums;
    use registry_common::test_utils::user_id;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn blank_parameters_are_not_supplied() {
        let predicate = build_predicate(
            Predicate::True,
            ResourceKind::Journal,
            &params(&[("status", ""), ("search", "  "), ("page", "2")]),
        )
        .unwrap();
        assert_eq!(predicate, Predicate::True);
    }

    #[test]
    fn filters_are_anded_with_scope_last() {
        let scope = Predicate::Eq {
            column: &IS_PUBLIC,
            value: true.into(),
        };
        let predicate = build_predicate(
            scope.clone(),
            ResourceKind::Journal,
            &params(&[("status", "PUBLISHED"), ("quartile", "Q1")]),
        )
        .unwrap();

        let Predicate::And(parts) = predicate else {
            panic!("expected a conjunction");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[0],
            Predicate::Eq {
                column: &STATUS,
                value: "PUBLISHED".into()
            }
        );
        assert_eq!(parts[2], scope);
    }

    #[test]
    fn enum_values_outside_allow_list_are_rejected() {
        let error = build_predicate(
            Predicate::True,
            ResourceKind::Journal,
            &params(&[("indexing", "MYSPACE")]),
        )
        .unwrap_err();
        assert_eq!(
            error,
            ValidationError::InvalidEnum {
                field: "indexing".into(),
                allowed: enums::INDEXING
            }
        );
    }

    #[test]
    fn unparsable_numbers_and_dates_are_rejected() {
        for (key, value) in [
            ("minFees", "cheap"),
            ("maxImpactFactor", "NaN"),
            ("publicationDateFrom", "yesterday"),
            ("isPublic", "maybe"),
        ] {
            let result = build_predicate(Predicate::True, ResourceKind::Journal, &params(&[(key, value)]));
            assert!(
                matches!(result, Err(ValidationError::InvalidFilter { ref parameter, .. }) if parameter == key),
                "{key}={value} gave {result:?}"
            );
        }
    }

    #[test]
    fn ranges_accept_one_open_end() {
        let predicate = build_predicate(
            Predicate::True,
            ResourceKind::Copyright,
            &params(&[("grantDateTo", "2024-12-31")]),
        )
        .unwrap();
        assert_eq!(
            predicate,
            Predicate::Range {
                column: &GRANT_DATE,
                lower: None,
                upper: Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap().into())
            }
        );
    }

    #[test]
    fn created_at_upper_bound_covers_the_whole_day() {
        let predicate = build_predicate(
            Predicate::True,
            ResourceKind::BookChapter,
            &params(&[("createdAtTo", "2024-03-01")]),
        )
        .unwrap();
        let Predicate::Range { upper: Some(FieldValue::Timestamp(upper)), .. } = predicate else {
            panic!("expected a timestamp range");
        };
        assert!(upper > Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap());
        assert!(upper < Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn search_spans_resource_columns() {
        let predicate =
            build_predicate(Predicate::True, ResourceKind::Copyright, &params(&[("search", "ai")]))
                .unwrap();
        let Predicate::Or(parts) = predicate else {
            panic!("expected a disjunction");
        };
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn author_ids_may_repeat_or_be_comma_separated() {
        let predicate = build_predicate(
            Predicate::True,
            ResourceKind::Journal,
            &params(&[("studentAuthorIds", "s1,s2"), ("studentAuthorIds", "s3")]),
        )
        .unwrap();
        assert_eq!(
            predicate,
            Predicate::HasAuthor {
                kind: AuthorKind::Student,
                users: vec![user_id("s1"), user_id("s2"), user_id("s3")]
            }
        );
    }

    #[test]
    fn kind_specific_parameters_are_ignored_elsewhere() {
        let predicate = build_predicate(
            Predicate::True,
            ResourceKind::BookChapter,
            &params(&[("scope", "NOT_A_SCOPE")]),
        )
        .unwrap();
        assert_eq!(predicate, Predicate::True);
    }
}
