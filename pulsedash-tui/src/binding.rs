//! Snapshot → display model.
//!
//! Pure functions that turn a `Snapshot` into what the panels draw: chart
//! lines with bounds, stat cards and the per-entity change list. Keeping
//! them free of ratatui makes every formatting rule testable.

use chrono::{DateTime, Utc};

use pulsedash_core::domain::{Mode, WeatherMetric};
use pulsedash_core::refresh::Snapshot;

/// Shown wherever a statistic is not available.
pub const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    pub name: String,
    /// (unix seconds, value)
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub title: String,
    pub unit: String,
    pub lines: Vec<ChartLine>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_labels: [String; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatCard {
    pub title: String,
    pub value: String,
    /// Signed percent shown under the value, colored by sign.
    pub delta: Option<f64>,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRow {
    pub label: String,
    pub pct_change: Option<f64>,
    /// Set when the entity produced no data this cycle.
    pub note: Option<String>,
}

/// Lines sharing the primary series' unit. Weather charts only the primary
/// metric, since its three metrics have unrelated scales.
pub fn chart_model(snapshot: &Snapshot) -> Option<ChartModel> {
    let dataset = &snapshot.dataset;
    let primary = dataset.series().first()?;
    let unit = primary.unit().to_string();
    let limit = if dataset.mode() == Mode::Weather { 1 } else { usize::MAX };

    let lines: Vec<ChartLine> = dataset
        .series()
        .iter()
        .filter(|s| s.unit() == unit && !s.is_empty())
        .take(limit)
        .map(|s| ChartLine {
            name: s.name().to_string(),
            points: s
                .points()
                .iter()
                .map(|p| (p.timestamp.timestamp() as f64, p.value))
                .collect(),
        })
        .collect();

    let all = lines.iter().flat_map(|l| l.points.iter());
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in all {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !x_min.is_finite() {
        return None;
    }

    let title = match dataset.mode() {
        Mode::Weather => format!(
            "{} ({unit}) · {}",
            primary.name(),
            dataset.location().unwrap_or(&snapshot.params.location)
        ),
        Mode::Crypto | Mode::Stock => format!("Price ({unit})"),
    };

    Some(ChartModel {
        title,
        x_labels: [axis_time(x_min), axis_time(x_max)],
        x_bounds: [x_min, x_max.max(x_min + 1.0)],
        y_bounds: padded(y_min, y_max),
        unit,
        lines,
    })
}

/// 5% headroom on both sides; a flat line gets a unit band around it.
fn padded(min: f64, max: f64) -> [f64; 2] {
    let span = max - min;
    let pad = if span > 0.0 { span * 0.05 } else { (min.abs() * 0.05).max(1.0) };
    [min - pad, max + pad]
}

fn axis_time(secs: f64) -> String {
    DateTime::<Utc>::from_timestamp(secs as i64, 0)
        .map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn stat_cards(snapshot: &Snapshot) -> Vec<StatCard> {
    let stats = &snapshot.stats;
    match snapshot.dataset.mode() {
        Mode::Weather => {
            let location = snapshot
                .dataset
                .location()
                .unwrap_or(&snapshot.params.location)
                .to_string();
            let horizon = format!("Next {} days", snapshot.params.days);
            WeatherMetric::ALL
                .into_iter()
                .filter_map(|metric| {
                    let s = stats.get(metric.key())?;
                    let (title, value) = match metric {
                        WeatherMetric::Temperature => ("Avg Temperature", s.mean),
                        WeatherMetric::Humidity => ("Avg Humidity", s.mean),
                        WeatherMetric::Precipitation => ("Total Precipitation", s.sum),
                    };
                    Some(StatCard {
                        title: title.to_string(),
                        value: format_measure(value, metric.unit()),
                        delta: None,
                        caption: if metric == WeatherMetric::Temperature {
                            location.clone()
                        } else {
                            horizon.clone()
                        },
                    })
                })
                .collect()
        }
        Mode::Crypto | Mode::Stock => {
            let mut cards: Vec<StatCard> = stats
                .series
                .iter()
                .map(|s| StatCard {
                    title: s.name.clone(),
                    value: format_price(s.latest, &s.unit),
                    delta: s.last_change_pct,
                    caption: format!("{} pts", s.count),
                })
                .collect();
            if let Some(agg) = &stats.aggregate {
                cards.push(StatCard {
                    title: "Average".to_string(),
                    value: format_pct(agg.mean_pct_change),
                    delta: agg.mean_pct_change,
                    caption: format!("over {} entities", agg.entities),
                });
            }
            cards
        }
    }
}

/// Total change per entity, then any entity that was skipped.
pub fn change_rows(snapshot: &Snapshot) -> Vec<ChangeRow> {
    let rows = snapshot.stats.series.iter().map(|s| ChangeRow {
        label: s.name.clone(),
        pct_change: s.pct_change,
        note: None,
    });
    let skipped = snapshot.dataset.skipped().iter().map(|s| ChangeRow {
        label: s.entity.clone(),
        pct_change: None,
        note: Some(s.reason.clone()),
    });
    rows.chain(skipped).collect()
}

/// `+1.23%`, `-0.50%`, or `n/a`.
pub fn format_pct(pct: Option<f64>) -> String {
    match pct {
        Some(v) => format!("{v:+.2}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `$43,210.55` for USD, `0.4521 EUR` otherwise; sub-unit prices get four
/// decimals.
pub fn format_price(value: Option<f64>, unit: &str) -> String {
    let Some(v) = value else {
        return NOT_AVAILABLE.to_string();
    };
    let decimals = if v.abs() < 1.0 { 4 } else { 2 };
    let number = group_thousands(v, decimals);
    match unit {
        "USD" => format!("${number}"),
        "" => number,
        other => format!("{number} {other}"),
    }
}

/// `12.3°C`, `64.0%`, `3.2mm`.
pub fn format_measure(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn group_thousands(v: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Footer timestamp in local time.
pub fn updated_label(fetched_at: DateTime<Utc>) -> String {
    fetched_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
