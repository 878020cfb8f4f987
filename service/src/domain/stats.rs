use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Utc};
use registry_common::domain::enums;
use registry_common::domain::schema::{FEES, IMPACT_FACTOR, IS_PUBLIC, REIMBURSEMENT, STATUS, TEACHER_STATUS};
use registry_common::{ColumnDef, ResourceKind};
use serde::Serialize;

use crate::domain::error::ValidationError;
use crate::domain::filter::FilterParams;
use crate::domain::publication::Publication;

pub const PERIOD_PARAMETER: &str = "period";

/// Bucket width of the creation trend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl TrendPeriod {
    pub fn from_params(params: &FilterParams) -> Result<Self, ValidationError> {
        match params.get(PERIOD_PARAMETER) {
            None => Ok(TrendPeriod::default()),
            Some("daily") => Ok(TrendPeriod::Daily),
            Some("weekly") => Ok(TrendPeriod::Weekly),
            Some("monthly") => Ok(TrendPeriod::Monthly),
            Some(other) => Err(ValidationError::InvalidFilter {
                parameter: PERIOD_PARAMETER.to_string(),
                reason: format!("unknown period {}", other),
            }),
        }
    }

    /// Day, Monday of the ISO week, or month of `at`
    pub fn bucket(&self, at: DateTime<Utc>) -> String {
        let date = at.date_naive();
        match self {
            TrendPeriod::Daily => date.format("%Y-%m-%d").to_string(),
            TrendPeriod::Weekly => {
                let from_monday = date.weekday().num_days_from_monday() as u64;
                date.checked_sub_days(Days::new(from_monday))
                    .unwrap_or(date)
                    .format("%Y-%m-%d")
                    .to_string()
            }
            TrendPeriod::Monthly => date.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationStats {
    pub total: u64,
    pub by_status: BTreeMap<&'static str, u64>,
    pub by_teacher_status: BTreeMap<&'static str, u64>,
    pub public: u64,
    pub private: u64,
    pub total_fees: f64,
    pub total_reimbursement: f64,
    /// journals only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_impact_factor: Option<f64>,
    pub period: TrendPeriod,
    pub trend: Vec<TrendPoint>,
}

impl PublicationStats {
    pub fn compute(kind: ResourceKind, rows: &[Publication], period: TrendPeriod) -> Self {
        let mut by_status = zeroed(enums::STATUS);
        let mut by_teacher_status = zeroed(enums::TEACHER_STATUS);
        let mut trend: BTreeMap<String, u64> = BTreeMap::new();
        let mut public = 0;
        let mut impact_factors = Vec::new();

        for row in rows {
            count_value(&mut by_status, row, &STATUS);
            count_value(&mut by_teacher_status, row, &TEACHER_STATUS);
            if row.value(&IS_PUBLIC).as_bool().unwrap_or(false) {
                public += 1;
            }
            if let Some(factor) = row.value(&IMPACT_FACTOR).as_float() {
                impact_factors.push(factor);
            }
            *trend.entry(period.bucket(row.created_at)).or_default() += 1;
        }

        let total = rows.len() as u64;
        let average_impact_factor = match kind {
            ResourceKind::Journal if impact_factors.is_empty() => Some(0.0),
            ResourceKind::Journal => {
                Some(impact_factors.iter().sum::<f64>() / impact_factors.len() as f64)
            }
            _ => None,
        };

        Self {
            total,
            by_status,
            by_teacher_status,
            public,
            private: total - public,
            total_fees: sum(rows, &FEES),
            total_reimbursement: sum(rows, &REIMBURSEMENT),
            average_impact_factor,
            period,
            trend: trend
                .into_iter()
                .map(|(period, count)| TrendPoint { period, count })
                .collect(),
        }
    }
}

fn zeroed(values: &'static [&'static str]) -> BTreeMap<&'static str, u64> {
    values.iter().map(|v| (*v, 0)).collect()
}

fn count_value(counts: &mut BTreeMap<&'static str, u64>, row: &Publication, column: &ColumnDef) {
    if let Some(value) = row.value(column).as_text()
        && let Some(count) = counts.get_mut(value)
    {
        *count += 1;
    }
}

fn sum(rows: &[Publication], column: &ColumnDef) -> f64 {
    rows.iter()
        .filter_map(|row| row.value(column).as_float())
        .sum()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::publication::tests::publication;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn buckets_follow_period() {
        // 2024-05-16 is a Thursday
        let thursday = at(2024, 5, 16);
        assert_eq!(TrendPeriod::Daily.bucket(thursday), "2024-05-16");
        assert_eq!(TrendPeriod::Weekly.bucket(thursday), "2024-05-13");
        assert_eq!(TrendPeriod::Monthly.bucket(thursday), "2024-05");
    }

    #[test]
    fn period_parameter_is_checked() {
        let params: FilterParams = [("period", "weekly")].into_iter().collect();
        assert_eq!(TrendPeriod::from_params(&params), Ok(TrendPeriod::Weekly));
        let params: FilterParams = [("period", "hourly")].into_iter().collect();
        assert!(TrendPeriod::from_params(&params).is_err());
        assert_eq!(
            TrendPeriod::from_params(&FilterParams::default()),
            Ok(TrendPeriod::Monthly)
        );
    }

    #[test]
    fn aggregates_over_rows() {
        let mut first = publication(ResourceKind::Journal, "j1");
        first.set(&STATUS, "PUBLISHED");
        first.set(&IS_PUBLIC, true);
        first.set(&FEES, 100.0);
        first.set(&IMPACT_FACTOR, 2.0);
        first.created_at = at(2024, 1, 10);

        let mut second = publication(ResourceKind::Journal, "j2");
        second.set(&FEES, 50.5);
        second.set(&REIMBURSEMENT, 25.0);
        second.set(&IMPACT_FACTOR, 4.0);
        second.created_at = at(2024, 3, 2);

        let mut third = publication(ResourceKind::Journal, "j3");
        third.created_at = at(2024, 1, 31);

        let stats = PublicationStats::compute(
            ResourceKind::Journal,
            &[first, second, third],
            TrendPeriod::Monthly,
        );
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status["PUBLISHED"], 1);
        assert_eq!(stats.by_status["DRAFT"], 2);
        assert_eq!(stats.by_status["REJECTED"], 0);
        assert_eq!(stats.by_teacher_status["UPLOADED"], 3);
        assert_eq!((stats.public, stats.private), (1, 2));
        assert_eq!(stats.total_fees, 150.5);
        assert_eq!(stats.total_reimbursement, 25.0);
        assert_eq!(stats.average_impact_factor, Some(3.0));
        assert_eq!(
            stats.trend,
            vec![
                TrendPoint { period: "2024-01".into(), count: 2 },
                TrendPoint { period: "2024-03".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn impact_factor_is_reported_for_journals_only() {
        let stats = PublicationStats::compute(ResourceKind::Copyright, &[], TrendPeriod::Daily);
        assert_eq!(stats.average_impact_factor, None);
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("averageImpactFactor").is_none());
        assert_eq!(json["byStatus"]["DRAFT"], 0);
        assert_eq!(json["period"], "daily");
    }
}
