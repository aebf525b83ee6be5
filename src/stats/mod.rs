//! Histogram and summary statistics for display plots
//!
//! The histogram follows `numpy.histogram` so that plots match the figures
//! previously produced from the same recorded data:
//!
//! | Input              | Edges                                              |
//! |--------------------|----------------------------------------------------|
//! | `Bins::Count`      | `count + 1` evenly spaced edges over `range`       |
//! |                    | (data min/max when `range` is absent)              |
//! | `Bins::Edges`      | used as given, must be non-decreasing              |
//!
//! Every bin is half-open `[a, b)` except the last, which is `[a, b]`.
//! Values outside the edges are dropped. With `density` each count becomes
//! `count / (n * width)`, so the bar *areas* sum to one.
//!
//! Nothing here is adaptive: bins are always decided by the caller.

use crate::error::{DeckError, Result};
use serde::{Deserialize, Serialize};

/// How to bin values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bins {
    /// Explicit bin edges
    Edges(Vec<f64>),
    /// Number of equal-width bins, optionally over a fixed range
    Count {
        count: usize,
        #[serde(default)]
        range: Option<(f64, f64)>,
    },
}

/// Bin edges and per-bin frequencies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `counts.len() + 1` edges
    pub edges: Vec<f64>,
    /// Raw counts, or densities when built with `density = true`
    pub counts: Vec<f64>,
}

impl Histogram {
    /// `(left, right, value)` per bin
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(w, &c)| (w[0], w[1], c))
    }

    /// Same edges, running total of the frequencies
    pub fn cumulative(&self) -> Histogram {
        Histogram {
            edges: self.edges.clone(),
            counts: cumulative(&self.counts),
        }
    }
}

/// Bin `values`
pub fn histogram(values: &[f64], bins: &Bins, density: bool) -> Result<Histogram> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let edges = resolve_edges(&values, bins)?;
    let nbins = edges.len() - 1;

    let first = edges[0];
    let last = edges[nbins];
    let mut counts = vec![0.0; nbins];

    for &v in &values {
        if v < first || v > last {
            continue;
        }
        let idx = if v == last {
            nbins - 1
        } else {
            // Number of edges <= v, minus one
            edges.partition_point(|&e| e <= v).saturating_sub(1)
        };
        counts[idx.min(nbins - 1)] += 1.0;
    }

    if density {
        let total: f64 = counts.iter().sum();
        for (count, w) in counts.iter_mut().zip(edges.windows(2)) {
            let width = w[1] - w[0];
            *count = if total > 0.0 && width > 0.0 {
                *count / (total * width)
            } else {
                0.0
            };
        }
    }

    Ok(Histogram { edges, counts })
}

fn resolve_edges(values: &[f64], bins: &Bins) -> Result<Vec<f64>> {
    match bins {
        Bins::Edges(edges) => {
            if edges.len() < 2 {
                return Err(DeckError::Histogram("need at least two bin edges".to_string()));
            }
            if edges.iter().any(|e| !e.is_finite()) {
                return Err(DeckError::Histogram("bin edges must be finite".to_string()));
            }
            if edges.windows(2).any(|w| w[1] < w[0]) {
                return Err(DeckError::Histogram("bin edges must increase monotonically".to_string()));
            }
            Ok(edges.clone())
        }
        Bins::Count { count, range } => {
            if *count == 0 {
                return Err(DeckError::Histogram("bin count must be positive".to_string()));
            }

            let (mut lo, mut hi) = match range {
                Some((lo, hi)) => {
                    if lo > hi {
                        return Err(DeckError::Histogram(format!("range ({}, {}) is reversed", lo, hi)));
                    }
                    (*lo, *hi)
                }
                None if values.is_empty() => (0.0, 1.0),
                None => values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                }),
            };

            if lo == hi {
                lo -= 0.5;
                hi += 0.5;
            }

            let n = *count as f64;
            let step = (hi - lo) / n;
            let mut edges: Vec<f64> = if step.is_finite() {
                (0..=*count).map(|i| lo + step * i as f64).collect()
            } else {
                // hi - lo overflows: interpolate between the ends instead
                (0..=*count)
                    .map(|i| {
                        let t = i as f64 / n;
                        lo * (1.0 - t) + hi * t
                    })
                    .collect()
            };
            if edges.iter().any(|e| !e.is_finite()) {
                return Err(DeckError::Histogram(format!("cannot split ({}, {}) into {} bins", lo, hi, count)));
            }
            // Pin the top edge so the closed last bin catches the max exactly
            edges[*count] = hi;
            Ok(edges)
        }
    }
}

/// Running sum
pub fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Arithmetic mean, `None` for empty input
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (numpy's default `ddof=0`)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}
