//! Summary statistics: pure functions from a dataset to display scalars.
//!
//! Every metric is a pure function of the series values. Degenerate inputs
//! (empty series, a zero first value) yield `None`, the "not available"
//! sentinel, never a panic or a division by zero.

use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, Series};

/// Scalars derived from one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub entity: String,
    pub name: String,
    pub unit: String,
    pub count: usize,
    pub latest: Option<f64>,
    pub first: Option<f64>,
    /// (latest - first) / first * 100.
    pub pct_change: Option<f64>,
    /// Latest point versus the one before it, in percent.
    pub last_change_pct: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
}

impl SeriesStats {
    pub fn compute(series: &Series) -> Self {
        let values = series.values();
        let first = values.first().copied();
        let latest = values.last().copied();
        let (min, max) = match min_max(&values) {
            Some((lo, hi)) => (Some(lo), Some(hi)),
            None => (None, None),
        };
        Self {
            entity: series.entity().to_string(),
            name: series.name().to_string(),
            unit: series.unit().to_string(),
            count: values.len(),
            latest,
            first,
            pct_change: first.zip(latest).and_then(|(f, l)| percent_change(f, l)),
            last_change_pct: last_step_change(&values),
            mean: mean(&values),
            min,
            max,
            sum: sum(&values),
        }
    }
}

/// Cross-entity figures for the combined stat card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub entities: usize,
    pub unit: String,
    pub mean_latest: Option<f64>,
    pub mean_pct_change: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AggregateStats {
    /// Only meaningful when there are several series sharing one unit.
    pub fn compute(per_series: &[SeriesStats]) -> Option<Self> {
        let first = per_series.first()?;
        if per_series.len() < 2 || per_series.iter().any(|s| s.unit != first.unit) {
            return None;
        }
        let latest: Vec<f64> = per_series.iter().filter_map(|s| s.latest).collect();
        let changes: Vec<f64> = per_series.iter().filter_map(|s| s.pct_change).collect();
        let min = per_series
            .iter()
            .filter_map(|s| s.min)
            .reduce(f64::min);
        let max = per_series
            .iter()
            .filter_map(|s| s.max)
            .reduce(f64::max);
        Some(Self {
            entities: per_series.len(),
            unit: first.unit.clone(),
            mean_latest: mean(&latest),
            mean_pct_change: mean(&changes),
            min,
            max,
        })
    }
}

/// Summary of a whole dataset. Recomputed every refresh; has no identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub series: Vec<SeriesStats>,
    pub aggregate: Option<AggregateStats>,
}

impl SummaryStats {
    pub fn compute(dataset: &Dataset) -> Self {
        let series: Vec<SeriesStats> = dataset.series().iter().map(SeriesStats::compute).collect();
        let aggregate = AggregateStats::compute(&series);
        Self { series, aggregate }
    }

    pub fn get(&self, entity: &str) -> Option<&SeriesStats> {
        self.series.iter().find(|s| s.entity == entity)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Percent change from `first` to `latest`.
///
/// Returns `None` when `first` is zero or any input (or the result) is not
/// finite.
pub fn percent_change(first: f64, latest: f64) -> Option<f64> {
    if first == 0.0 || !first.is_finite() || !latest.is_finite() {
        return None;
    }
    let pct = (latest - first) / first * 100.0;
    pct.is_finite().then_some(pct)
}

/// Percent change of the last step (second-to-last → last).
pub fn last_step_change(values: &[f64]) -> Option<f64> {
    match values {
        [.., prev, last] => percent_change(*prev, *last),
        _ => None,
    }
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of all values. `None` for an empty slice.
pub fn sum(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum())
}

/// Minimum and maximum. `None` for an empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let (&head, rest) = values.split_first()?;
    Some(
        rest.iter()
            .fold((head, head), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataPoint, Mode};
    use chrono::{TimeZone, Utc};

    fn series(entity: &str, unit: &str, values: &[f64]) -> Series {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| DataPoint::new(Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(), v))
            .collect();
        Series::new(entity, entity, unit, points).unwrap()
    }

    #[test]
    fn two_point_series() {
        let s = SeriesStats::compute(&series("bitcoin", "USD", &[100.0, 110.0]));
        assert_eq!(s.latest, Some(110.0));
        assert_eq!(s.first, Some(100.0));
        assert!((s.pct_change.unwrap() - 10.0).abs() < 1e-12);
        assert!((s.last_change_pct.unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(s.mean, Some(105.0));
        assert_eq!(s.min, Some(100.0));
        assert_eq!(s.max, Some(110.0));
        assert_eq!(s.sum, Some(210.0));
        assert_eq!(s.count, 2);
    }

    #[test]
    fn zero_first_value_is_not_available() {
        assert_eq!(percent_change(0.0, 5.0), None);
        let s = SeriesStats::compute(&series("rain", "mm", &[0.0, 1.2, 0.4]));
        assert_eq!(s.pct_change, None);
        assert!(s.last_change_pct.is_some());
        assert_eq!(s.max, Some(1.2));
    }

    #[test]
    fn negative_first_value_keeps_sign_convention() {
        // Plain formula, no abs() on the denominator.
        assert_eq!(percent_change(-10.0, -5.0), Some(-50.0));
    }

    #[test]
    fn empty_series_yields_sentinels() {
        let s = SeriesStats::compute(&series("none", "USD", &[]));
        assert_eq!(s.count, 0);
        assert!(s.latest.is_none());
        assert!(s.mean.is_none());
        assert!(s.min.is_none() && s.max.is_none());
        assert!(s.pct_change.is_none());
        assert!(s.sum.is_none());
    }

    #[test]
    fn single_point_has_no_step_change() {
        let s = SeriesStats::compute(&series("x", "USD", &[42.0]));
        assert_eq!(s.pct_change, Some(0.0));
        assert_eq!(s.last_change_pct, None);
    }

    #[test]
    fn aggregate_requires_shared_unit_and_several_series() {
        let mut ds = Dataset::new(Mode::Crypto);
        ds.insert(series("bitcoin", "USD", &[100.0, 110.0]));
        assert!(SummaryStats::compute(&ds).aggregate.is_none());

        ds.insert(series("ethereum", "USD", &[50.0, 45.0]));
        let agg = SummaryStats::compute(&ds).aggregate.unwrap();
        assert_eq!(agg.entities, 2);
        assert_eq!(agg.mean_latest, Some(77.5));
        assert!((agg.mean_pct_change.unwrap() - 0.0).abs() < 1e-12);
        assert_eq!(agg.min, Some(45.0));
        assert_eq!(agg.max, Some(110.0));

        let mut weather = Dataset::new(Mode::Weather);
        weather.insert(series("temperature", "°C", &[10.0, 12.0]));
        weather.insert(series("humidity", "%", &[60.0, 70.0]));
        assert!(SummaryStats::compute(&weather).aggregate.is_none());
    }

    #[test]
    fn lookup_by_entity() {
        let mut ds = Dataset::new(Mode::Stock);
        ds.insert(series("AAPL", "USD", &[1.0, 2.0]));
        let stats = SummaryStats::compute(&ds);
        assert!(stats.get("AAPL").is_some());
        assert!(stats.get("MSFT").is_none());
    }
}
