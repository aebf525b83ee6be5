//! Prediction-quality histogram grids
//!
//! A training run records, for every example, a tuple of quality metrics.
//! The data file groups those tuples by phase and input scenario:
//!
//! ```json
//! {"groups": [
//!   {"label": "Training Unit & Context", "entries": [[1, 1, 0, 2], null, [0, 1, 3, 12]]}
//! ]}
//! ```
//!
//! Each metric becomes one small histogram:
//!
//! - boolean metrics (hit or miss) show the proportion in each outcome
//! - distance metrics are clamped at `categories` and shown as a cumulative
//!   proportion, so the bar at `k` reads "within distance k"
//!
//! `null` entries are examples that were never scored and are skipped.

use super::{bars_layer, HistogramLook, PlotSpec, Tick};
use crate::error::{DeckError, Result};
use crate::stats::{histogram, Bins};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_categories() -> usize { 10 }

/// One metric column of the quality tuples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    /// Hit/miss metric rather than a distance
    #[serde(default)]
    pub boolean: bool,
}

impl Metric {
    pub fn new(name: impl Into<String>, boolean: bool) -> Self {
        Self { name: name.into(), boolean }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGroup {
    pub label: String,
    pub entries: Vec<Option<Vec<f64>>>,
}

/// Recorded quality tuples, grouped by scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityData {
    pub groups: Vec<QualityGroup>,
    /// Distance values at or above this are lumped into the last bin
    #[serde(default = "default_categories")]
    pub categories: usize,
}

impl QualityData {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DeckError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| DeckError::json(path, e))
    }
}

/// One group's row of metric plots
#[derive(Debug, Clone, PartialEq)]
pub struct QualityRow {
    pub label: String,
    pub plots: Vec<PlotSpec>,
}

/// Build one row of small histograms per group
pub fn quality_grid(data: &QualityData, metrics: &[Metric]) -> Result<Vec<QualityRow>> {
    if data.categories == 0 {
        return Err(DeckError::Histogram("categories must be positive".to_string()));
    }

    data.groups
        .iter()
        .map(|group| {
            let plots = metrics
                .iter()
                .enumerate()
                .map(|(index, metric)| metric_plot(group, index, metric, data.categories))
                .collect::<Result<Vec<_>>>()?;
            Ok(QualityRow { label: group.label.clone(), plots })
        })
        .collect()
}

fn metric_plot(group: &QualityGroup, index: usize, metric: &Metric, categories: usize) -> Result<PlotSpec> {
    let cap = if metric.boolean { 2.0 } else { categories as f64 };

    let mut values = Vec::with_capacity(group.entries.len());
    for entry in group.entries.iter().flatten() {
        let value = entry.get(index).ok_or_else(|| {
            DeckError::Histogram(format!(
                "group '{}': entry has {} metrics, '{}' needs index {}",
                group.label,
                entry.len(),
                metric.name,
                index
            ))
        })?;
        values.push(value.min(cap));
    }

    let mut plot = if metric.boolean {
        let hist = histogram(&values, &Bins::Edges(vec![-0.5, 0.5, 1.5]), true)?;
        let look = HistogramLook {
            color: "Red".to_string(),
            alpha: 1.0,
            label: "Proportion".to_string(),
        };
        let mut plot = PlotSpec::new(130, 135);
        plot.layers.push(bars_layer(&hist, &look));
        plot.y_label = look.label;
        plot.x_ticks = vec![Tick::new(0.0, "Miss"), Tick::new(1.0, "Hit")];
        plot
    } else {
        let edges: Vec<f64> = (0..categories + 2).map(|e| e as f64 - 0.5).collect();
        let hist = histogram(&values, &Bins::Edges(edges), true)?.cumulative();
        let look = HistogramLook {
            color: "Blue".to_string(),
            alpha: 1.0,
            label: "Cumulative Proportion".to_string(),
        };
        let mut plot = PlotSpec::new(230, 135);
        plot.layers.push(bars_layer(&hist, &look));
        plot.y_label = look.label;
        plot.x_ticks = (0..=categories)
            .map(|k| match k {
                0 => Tick::new(0.0, "Exact"),
                k if k == categories => Tick::new(k as f64, format!("{}+", k)),
                k => Tick::new(k as f64, k.to_string()),
            })
            .collect();
        plot
    };

    plot.title = metric.name.clone();
    plot.x_label = "Quality".to_string();
    plot.y_range = Some((0.0, 1.0));
    plot.font_size = Some(8);
    Ok(plot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::Layer;

    fn metrics() -> Vec<Metric> {
        vec![Metric::new("Predict Exact", true), Metric::new("Distance First Metric", false)]
    }

    fn data() -> QualityData {
        serde_json::from_str(
            r#"{"groups": [
                {"label": "Training Unit Only", "entries": [[1, 0], [0, 2], null, [1, 25]]},
                {"label": "Validation Unit Only", "entries": [[0, 1]]}
            ]}"#,
        )
        .unwrap()
    }

    fn bar_values(plot: &PlotSpec) -> Vec<f64> {
        match &plot.layers[0] {
            Layer::Bars { bars, .. } => bars.iter().map(|b| b.value).collect(),
            _ => panic!("expected bars"),
        }
    }

    #[test]
    fn test_grid_shape() {
        let rows = quality_grid(&data(), &metrics()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Training Unit Only");
        assert_eq!(rows[0].plots.len(), 2);
        assert_eq!(rows[0].plots[0].title, "Predict Exact");
    }

    #[test]
    fn test_boolean_metric_proportions() {
        let rows = quality_grid(&data(), &metrics()).unwrap();
        let values = bar_values(&rows[0].plots[0]);
        // Three scored entries: one miss, two hits
        assert!((values[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((values[1] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(rows[0].plots[0].x_ticks[1].label, "Hit");
    }

    #[test]
    fn test_distance_metric_is_cumulative_and_clamped() {
        let rows = quality_grid(&data(), &metrics()).unwrap();
        let plot = &rows[0].plots[1];
        let values = bar_values(plot);

        assert_eq!(values.len(), 11);
        assert!((values[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((values[2] - 2.0 / 3.0).abs() < 1e-9);
        // 25 is clamped into the 10+ bin, so the curve ends at one
        assert!((values[10] - 1.0).abs() < 1e-9);
        assert_eq!(plot.x_ticks.first().unwrap().label, "Exact");
        assert_eq!(plot.x_ticks.last().unwrap().label, "10+");
    }

    #[test]
    fn test_short_entry_is_an_error() {
        let data: QualityData =
            serde_json::from_str(r#"{"groups": [{"label": "g", "entries": [[1]]}]}"#).unwrap();
        assert!(matches!(quality_grid(&data, &metrics()), Err(DeckError::Histogram(_))));
    }
}
