use std::cmp::Ordering;

use registry_common::domain::schema::CREATED_AT;
use registry_common::{ColumnDef, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;
use crate::domain::filter::FilterParams;
use crate::domain::publication::Publication;

pub const PAGE_PARAMETER: &str = "page";
pub const LIMIT_PARAMETER: &str = "limit";
pub const SORT_BY_PARAMETER: &str = "sortBy";
pub const SORT_ORDER_PARAMETER: &str = "sortOrder";

/// Page size bounds, both at least 1
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(try_from = "PageLimits")]
pub struct PaginationSettings {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Unchecked page size bounds as read from configuration
#[derive(Deserialize)]
#[serde(default)]
struct PageLimits {
    default_limit: u32,
    max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        let defaults = PaginationSettings::default();
        Self {
            default_limit: defaults.default_limit,
            max_limit: defaults.max_limit,
        }
    }
}

impl TryFrom<PageLimits> for PaginationSettings {
    type Error = String;

    fn try_from(limits: PageLimits) -> Result<Self, Self::Error> {
        if limits.default_limit == 0 || limits.max_limit == 0 {
            return Err("pagination limits must be at least 1".to_string());
        }
        Ok(Self {
            default_limit: limits.default_limit,
            max_limit: limits.max_limit,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Single column sort; ties are broken by record id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sort {
    pub column: &'static ColumnDef,
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            column: &CREATED_AT,
            order: SortOrder::Descending,
        }
    }
}

impl Sort {
    /// `sortBy` and `sortOrder`, restricted to the scalar columns of `kind`
    pub fn from_params(kind: ResourceKind, params: &FilterParams) -> Result<Self, ValidationError> {
        let mut sort = Sort::default();
        if let Some(sort_by) = params.get(SORT_BY_PARAMETER) {
            sort.column = kind
                .schema()
                .column(sort_by)
                .filter(|c| c.column_type.is_sortable())
                .ok_or_else(|| ValidationError::InvalidSort(sort_by.to_string()))?;
        }
        if let Some(order) = params.get(SORT_ORDER_PARAMETER) {
            sort.order = match order.to_ascii_lowercase().as_str() {
                "asc" => SortOrder::Ascending,
                "desc" => SortOrder::Descending,
                _ => return Err(ValidationError::InvalidSort(order.to_string())),
            };
        }
        Ok(sort)
    }

    /// Ordering used by in-process evaluation, NULL values last in both directions
    pub fn compare(&self, a: &Publication, b: &Publication) -> Ordering {
        let left = a.value(self.column);
        let right = b.value(self.column);
        let by_column = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = left.partial_cmp(&right).unwrap_or(Ordering::Equal);
                match self.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            }
        };
        by_column.then_with(|| a.id.cmp(&b.id))
    }
}

/// Requested window over the matching records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    /// 1-based
    pub page: u32,
    pub limit: u32,
    pub sort: Sort,
}

impl PageRequest {
    pub fn from_params(
        kind: ResourceKind,
        params: &FilterParams,
        settings: &PaginationSettings,
    ) -> Result<Self, ValidationError> {
        let page = positive(params.get(PAGE_PARAMETER), PAGE_PARAMETER)?.unwrap_or(1);
        let limit = positive(params.get(LIMIT_PARAMETER), LIMIT_PARAMETER)?
            .unwrap_or(settings.default_limit)
            .min(settings.max_limit);

        let sort = Sort::from_params(kind, params)?;

        Ok(Self { page, limit, sort })
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

fn positive(raw: Option<&str>, parameter: &'static str) -> Result<Option<u32>, ValidationError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or(ValidationError::InvalidPagination(parameter)),
    }
}

/// One page of records and the size of the whole match set
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(total: u64, request: &PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            limit: request.limit,
            total_pages: total.div_ceil(request.limit as u64),
        }
    }
}
