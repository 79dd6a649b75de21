use serde::{Deserialize, Serialize};

use crate::{
    decimal::Decimal,
    delta::{ActionType, CorrelationId, MonthKey, WorkloadDelta},
    errors::DeltaError,
};

/// How many applied correlation ids a summary remembers for duplicate detection.
pub const RECENT_DELTAS_WINDOW: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    pub month: String,
    pub total_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyBucket {
    pub year: String,
    pub months: Vec<MonthlyBucket>,
}

impl YearlyBucket {
    pub fn month(&self, month: &str) -> Option<&MonthlyBucket> {
        self.months.iter().find(|bucket| bucket.month == month)
    }
}

/// Hours worked by one trainer, bucketed by year and month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSummary {
    #[serde(rename = "_id")]
    pub trainer_username: String,
    pub first_name: String,
    pub last_name: String,
    pub status: bool,
    pub years: Vec<YearlyBucket>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub recent_deltas: Vec<CorrelationId>,
}

impl WorkloadSummary {
    pub fn new(delta: &WorkloadDelta) -> Self {
        WorkloadSummary {
            trainer_username: delta.trainer_username.clone(),
            first_name: delta.trainer_first_name.clone(),
            last_name: delta.trainer_last_name.clone(),
            status: delta.is_active,
            years: Vec::new(),
            version: 0,
            recent_deltas: Vec::new(),
        }
    }

    /// Folds a delta into an existing summary, or into a fresh one seeded from the delta.
    pub fn merge(
        summary: Option<WorkloadSummary>,
        delta: &WorkloadDelta,
    ) -> Result<WorkloadSummary, DeltaError> {
        let mut summary = summary.unwrap_or_else(|| WorkloadSummary::new(delta));
        summary.apply(delta)?;
        Ok(summary)
    }

    /// Applies the delta to its year/month bucket.
    ///
    /// Returns the bucket total after the change, or `None` if the bucket was pruned.
    /// On error the summary is left untouched.
    pub fn apply(&mut self, delta: &WorkloadDelta) -> Result<Option<Decimal>, DeltaError> {
        let MonthKey { year, month } = delta.month_key();
        let current = self.hours(&year, &month).unwrap_or_default();
        let total = match delta.action_type {
            ActionType::Add => current.checked_add(delta.training_duration),
            ActionType::Delete => current.checked_sub(delta.training_duration),
        }
        .ok_or_else(|| DeltaError::HoursOverflow {
            year: year.clone(),
            month: month.clone(),
        })?;

        let year_idx = match self.years.iter().position(|bucket| bucket.year == year) {
            Some(idx) => idx,
            None => {
                self.years.push(YearlyBucket {
                    year,
                    months: Vec::new(),
                });
                self.years.len() - 1
            }
        };
        let months = &mut self.years[year_idx].months;
        let month_idx = months.iter().position(|bucket| bucket.month == month);

        if !total.is_positive() {
            if let Some(idx) = month_idx {
                months.remove(idx);
            }
            return Ok(None);
        }
        match month_idx {
            Some(idx) => months[idx].total_hours = total,
            None => months.push(MonthlyBucket {
                month,
                total_hours: total,
            }),
        }
        Ok(Some(total))
    }

    pub fn year(&self, year: &str) -> Option<&YearlyBucket> {
        self.years.iter().find(|bucket| bucket.year == year)
    }

    pub fn hours(&self, year: &str, month: &str) -> Option<Decimal> {
        self.year(year)
            .and_then(|bucket| bucket.month(month))
            .map(|bucket| bucket.total_hours)
    }

    pub fn has_applied(&self, id: &CorrelationId) -> bool {
        self.recent_deltas.contains(id)
    }

    pub fn remember(&mut self, id: CorrelationId) {
        self.recent_deltas.push(id);
        if self.recent_deltas.len() > RECENT_DELTAS_WINDOW {
            let overflow = self.recent_deltas.len() - RECENT_DELTAS_WINDOW;
            self.recent_deltas.drain(..overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::tests::delta;

    fn fold(deltas: &[WorkloadDelta]) -> WorkloadSummary {
        deltas
            .iter()
            .fold(None, |summary, delta| {
                Some(WorkloadSummary::merge(summary, delta).unwrap())
            })
            .unwrap()
    }

    #[test]
    fn test_first_delta_creates_single_buckets() {
        let summary = fold(&[delta(ActionType::Add, "2023-10-01", 2.5)]);
        assert_eq!(summary.trainer_username, "john.doe");
        assert_eq!(summary.first_name, "John");
        assert_eq!(summary.last_name, "Doe");
        assert!(summary.status);
        assert_eq!(summary.years.len(), 1);
        assert_eq!(summary.years[0].months.len(), 1);
        assert_eq!(summary.hours("2023", "10"), Some(Decimal::from(2.5)));
    }

    #[test]
    fn test_adds_accumulate_in_same_month() {
        let summary = fold(&[
            delta(ActionType::Add, "2023-10-01", 2.5),
            delta(ActionType::Add, "2023-10-15", 1.0),
        ]);
        assert_eq!(summary.years.len(), 1);
        assert_eq!(summary.years[0].year, "2023");
        assert_eq!(summary.years[0].months.len(), 1);
        assert_eq!(summary.years[0].months[0].month, "10");
        assert_eq!(summary.hours("2023", "10"), Some(Decimal::from(3.5)));
    }

    #[test]
    fn test_adds_are_order_independent() {
        let hours = [0.5, 1.25, 2.0, 0.75, 3.1];
        let forward: Vec<_> = hours
            .iter()
            .map(|h| delta(ActionType::Add, "2024-02-10", *h))
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let expected: Decimal = hours.iter().map(|h| Decimal::from(*h)).sum();
        assert_eq!(fold(&forward).hours("2024", "02"), Some(expected));
        assert_eq!(fold(&backward).hours("2024", "02"), Some(expected));
    }

    #[test]
    fn test_delete_equal_prunes_month_keeps_year() {
        let summary = fold(&[
            delta(ActionType::Add, "2023-10-01", 2.5),
            delta(ActionType::Add, "2023-10-15", 1.0),
            delta(ActionType::Delete, "2023-10-20", 3.5),
        ]);
        assert_eq!(summary.hours("2023", "10"), None);
        let year = summary.year("2023").unwrap();
        assert!(year.months.is_empty());
    }

    #[test]
    fn test_delete_more_than_recorded_prunes() {
        let summary = fold(&[
            delta(ActionType::Add, "2023-10-01", 1.0),
            delta(ActionType::Delete, "2023-10-01", 2.0),
        ]);
        assert_eq!(summary.hours("2023", "10"), None);
    }

    #[test]
    fn test_delete_less_than_recorded_reduces() {
        let summary = fold(&[
            delta(ActionType::Add, "2023-10-01", 3.0),
            delta(ActionType::Delete, "2023-10-01", 1.25),
        ]);
        assert_eq!(summary.hours("2023", "10"), Some(Decimal::from(1.75)));
    }

    #[test]
    fn test_delete_on_empty_summary_leaves_no_month() {
        let summary = fold(&[delta(ActionType::Delete, "2023-10-01", 1.0)]);
        assert_eq!(summary.years.len(), 1);
        assert!(summary.years[0].months.is_empty());
    }

    #[test]
    fn test_buckets_keep_insertion_order() {
        let summary = fold(&[
            delta(ActionType::Add, "2024-05-01", 1.0),
            delta(ActionType::Add, "2023-12-01", 1.0),
            delta(ActionType::Add, "2024-01-01", 1.0),
        ]);
        let years: Vec<_> = summary.years.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(years, vec!["2024", "2023"]);
        let months: Vec<_> = summary.years[0]
            .months
            .iter()
            .map(|m| m.month.as_str())
            .collect();
        assert_eq!(months, vec!["05", "01"]);
    }

    #[test]
    fn test_existing_summary_keeps_seed_fields() {
        let first = delta(ActionType::Add, "2023-10-01", 1.0);
        let mut second = delta(ActionType::Add, "2023-11-01", 1.0);
        second.trainer_first_name = "Johnny".to_string();
        second.is_active = false;
        let summary = fold(&[first, second]);
        assert_eq!(summary.first_name, "John");
        assert!(summary.status);
    }

    #[test]
    fn test_overflowing_add_leaves_summary_untouched() {
        let mut summary = fold(&[delta(ActionType::Add, "2023-10-01", 1.0)]);
        let near_max = Decimal::int(i64::MAX / 10_000);
        summary.years[0].months[0].total_hours = near_max;
        let before = summary.clone();

        let err = summary
            .apply(&delta(ActionType::Add, "2023-10-02", 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            DeltaError::HoursOverflow {
                year: "2023".to_string(),
                month: "10".to_string()
            }
        );
        assert_eq!(summary, before);
        let next = delta(ActionType::Add, "2023-10-02", 1.0);
        assert!(WorkloadSummary::merge(Some(before), &next).is_err());
    }

    #[test]
    fn test_remember_window() {
        let mut summary = WorkloadSummary::new(&delta(ActionType::Add, "2023-10-01", 1.0));
        let first = CorrelationId::from("first");
        summary.remember(first.clone());
        assert!(summary.has_applied(&first));
        for i in 0..RECENT_DELTAS_WINDOW {
            summary.remember(CorrelationId::from(format!("id-{}", i)));
        }
        assert_eq!(summary.recent_deltas.len(), RECENT_DELTAS_WINDOW);
        assert!(!summary.has_applied(&first));
        assert!(summary.has_applied(&CorrelationId::from("id-0")));
    }
}
