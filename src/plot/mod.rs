//! Plot model: previously computed charts and histogram plots
//!
//! A [`PlotSpec`] is a finished chart: axis labels, size, and one or more
//! layers drawn on top of each other. Plots are either
//!
//! - **loaded** from a JSON file that an analysis run wrote earlier, then
//!   re-styled for the slide they land on ([`PlotSpec::load`] +
//!   [`PlotSpec::restyle`]), or
//! - **built** here from recorded values via [`crate::stats::histogram`]
//!   ([`histogram_plot`], [`quality`]).
//!
//! Layers are bars, spikes, curves and points on numeric axes, or heat map
//! cells on categorical axes. A plot holding a heat map is drawn as a heat
//! map only: its x categories run left to right and its y categories bottom
//! to top, both in order of first appearance.
//!
//! The renderer turns a plot into inline SVG or into D3 data, so nothing in
//! this module knows about HTML.

pub mod colormap;
pub mod quality;

use crate::error::{DeckError, Result};
use crate::stats::{self, Histogram};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use quality::{quality_grid, Metric, QualityData, QualityGroup, QualityRow};

fn default_width() -> u32 { 350 }
fn default_height() -> u32 { 350 }
fn default_alpha() -> f64 { 1.0 }
fn default_bar_color() -> String { "#1f77b4".to_string() }
fn default_spike_color() -> String { "red".to_string() }
fn default_spike_length() -> f64 { 20.0 }
fn default_cmap() -> String { colormap::DEFAULT_COLORMAP.to_string() }
fn default_line_width() -> f64 { 2.0 }
fn default_point_size() -> f64 { 4.0 }
fn default_true() -> bool { true }

/// A labeled x-axis tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

impl Tick {
    pub fn new(value: f64, label: impl Into<String>) -> Self {
        Self { value, label: label.into() }
    }
}

/// One histogram bar spanning `[left, right]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub left: f64,
    pub right: f64,
    pub value: f64,
}

/// A data point of a curve or scatter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One heat map cell; `x` and `y` are category names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub x: String,
    pub y: String,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    /// Histogram-style bars
    Bars {
        bars: Vec<Bar>,
        #[serde(default = "default_bar_color")]
        color: String,
        #[serde(default = "default_alpha")]
        alpha: f64,
        /// Hover label for the bar values
        #[serde(default)]
        label: String,
    },
    /// Vertical marks at fixed x positions (e.g. mean and ±std)
    Spikes {
        positions: Vec<f64>,
        #[serde(default = "default_spike_color")]
        color: String,
        /// Mark height in pixels
        #[serde(default = "default_spike_length")]
        length: f64,
        #[serde(default)]
        label: String,
    },
    /// Category × category grid colored by `z`
    HeatMap {
        cells: Vec<Cell>,
        #[serde(default = "default_cmap")]
        cmap: String,
        /// Draw a color scale next to the grid
        #[serde(default)]
        colorbar: bool,
        /// Hover label for `z`
        #[serde(default)]
        label: String,
    },
    /// Line through the points in the given order
    Curve {
        points: Vec<Point>,
        #[serde(default = "default_bar_color")]
        color: String,
        /// Stroke width in px
        #[serde(default = "default_line_width")]
        width: f64,
        #[serde(default)]
        label: String,
    },
    /// Scatter
    Points {
        points: Vec<Point>,
        #[serde(default = "default_bar_color")]
        color: String,
        /// Radius in px
        #[serde(default = "default_point_size")]
        size: f64,
        #[serde(default)]
        label: String,
    },
}

impl Layer {
    fn points(&self) -> &[Point] {
        match self {
            Layer::Curve { points, .. } | Layer::Points { points, .. } => points,
            _ => &[],
        }
    }
}

/// A finished chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Fixed y axis; derived from the data when absent
    #[serde(default)]
    pub y_range: Option<(f64, f64)>,
    /// Custom x ticks; evenly spaced numeric ticks when empty
    #[serde(default)]
    pub x_ticks: Vec<Tick>,
    /// Title font size in px
    #[serde(default)]
    pub font_size: Option<u32>,
    #[serde(default = "default_true")]
    pub show_x_axis: bool,
    #[serde(default = "default_true")]
    pub show_y_axis: bool,
    pub layers: Vec<Layer>,
}

/// Overrides applied to a plot after it is loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotStyle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub y_range: Option<(f64, f64)>,
    #[serde(default)]
    pub x_ticks: Option<Vec<Tick>>,
    #[serde(default)]
    pub font_size: Option<u32>,
    /// Recolor every bar, spike, curve and points layer
    #[serde(default)]
    pub color: Option<String>,
    /// Colormap for heat map layers
    #[serde(default)]
    pub cmap: Option<String>,
    /// `false` hides the x axis line, ticks and labels
    #[serde(default)]
    pub x_axis: Option<bool>,
    #[serde(default)]
    pub y_axis: Option<bool>,
}

impl PlotSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            width,
            height,
            y_range: None,
            x_ticks: Vec::new(),
            font_size: None,
            show_x_axis: true,
            show_y_axis: true,
            layers: Vec::new(),
        }
    }

    /// Load a plot written by an earlier analysis run
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DeckError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| DeckError::json(path, e))
    }

    /// Apply slide-specific overrides
    pub fn restyle(mut self, style: &PlotStyle) -> Self {
        if let Some(ref title) = style.title {
            self.title = title.clone();
        }
        if let Some(ref x_label) = style.x_label {
            self.x_label = x_label.clone();
        }
        if let Some(ref y_label) = style.y_label {
            self.y_label = y_label.clone();
        }
        if let Some(width) = style.width {
            self.width = width;
        }
        if let Some(height) = style.height {
            self.height = height;
        }
        if style.y_range.is_some() {
            self.y_range = style.y_range;
        }
        if let Some(ref ticks) = style.x_ticks {
            self.x_ticks = ticks.clone();
        }
        if style.font_size.is_some() {
            self.font_size = style.font_size;
        }
        if let Some(show) = style.x_axis {
            self.show_x_axis = show;
        }
        if let Some(show) = style.y_axis {
            self.show_y_axis = show;
        }
        for layer in &mut self.layers {
            match layer {
                Layer::Bars { color: c, .. }
                | Layer::Spikes { color: c, .. }
                | Layer::Curve { color: c, .. }
                | Layer::Points { color: c, .. } => {
                    if let Some(ref color) = style.color {
                        *c = color.clone();
                    }
                }
                Layer::HeatMap { cmap, .. } => {
                    if let Some(ref name) = style.cmap {
                        *cmap = name.clone();
                    }
                }
            }
        }
        self
    }

    /// Whether this plot is drawn as a heat map
    pub fn is_heat_map(&self) -> bool {
        self.layers.iter().any(|l| matches!(l, Layer::HeatMap { .. }))
    }

    /// Heat map categories `(x, y)`, each in order of first appearance
    pub fn categories(&self) -> (Vec<&str>, Vec<&str>) {
        let mut xs: Vec<&str> = Vec::new();
        let mut ys: Vec<&str> = Vec::new();
        for layer in &self.layers {
            if let Layer::HeatMap { cells, .. } = layer {
                for cell in cells {
                    if !xs.contains(&cell.x.as_str()) {
                        xs.push(&cell.x);
                    }
                    if !ys.contains(&cell.y.as_str()) {
                        ys.push(&cell.y);
                    }
                }
            }
        }
        (xs, ys)
    }

    /// Range of the finite heat map values
    pub fn z_extent(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for layer in &self.layers {
            if let Layer::HeatMap { cells, .. } = layer {
                for z in cells.iter().map(|c| c.z).filter(|z| z.is_finite()) {
                    lo = lo.min(z);
                    hi = hi.max(z);
                }
            }
        }
        finite_extent(lo, hi)
    }

    /// Draw `layer` on top of the existing layers
    pub fn overlay(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Horizontal data extent over all layers
    pub fn x_extent(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for layer in &self.layers {
            match layer {
                Layer::Bars { bars, .. } => {
                    for b in bars {
                        lo = lo.min(b.left);
                        hi = hi.max(b.right);
                    }
                }
                Layer::Spikes { positions, .. } => {
                    for &p in positions {
                        lo = lo.min(p);
                        hi = hi.max(p);
                    }
                }
                Layer::Curve { points, .. } | Layer::Points { points, .. } => {
                    for p in points.iter().filter(|p| p.x.is_finite()) {
                        lo = lo.min(p.x);
                        hi = hi.max(p.x);
                    }
                }
                Layer::HeatMap { .. } => {}
            }
        }
        for t in &self.x_ticks {
            lo = lo.min(t.value);
            hi = hi.max(t.value);
        }
        finite_extent(lo, hi)
    }

    /// Vertical extent: the fixed `y_range`, or from zero (or the lowest
    /// point, if below zero) to the tallest bar or highest point
    pub fn y_extent(&self) -> (f64, f64) {
        if let Some(range) = self.y_range {
            return finite_extent(range.0, range.1);
        }
        let mut lo: f64 = 0.0;
        let mut hi: f64 = 0.0;
        for layer in &self.layers {
            if let Layer::Bars { bars, .. } = layer {
                hi = bars.iter().map(|b| b.value).filter(|v| v.is_finite()).fold(hi, f64::max);
            }
            for p in layer.points().iter().filter(|p| p.y.is_finite()) {
                lo = lo.min(p.y);
                hi = hi.max(p.y);
            }
        }
        finite_extent(lo, hi)
    }
}

fn finite_extent(lo: f64, hi: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        (0.0, 1.0)
    } else if lo == hi {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// Look for a histogram plot
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramLook {
    pub color: String,
    pub alpha: f64,
    pub label: String,
}

impl Default for HistogramLook {
    fn default() -> Self {
        Self {
            color: default_bar_color(),
            alpha: 1.0,
            label: "Frequency".to_string(),
        }
    }
}

/// A bars layer from a histogram
pub fn bars_layer(hist: &Histogram, look: &HistogramLook) -> Layer {
    Layer::Bars {
        bars: hist
            .bars()
            .map(|(left, right, value)| Bar { left, right, value })
            .collect(),
        color: look.color.clone(),
        alpha: look.alpha,
        label: look.label.clone(),
    }
}

/// Wrap a histogram in a single-layer plot
pub fn histogram_plot(hist: &Histogram, look: &HistogramLook, style: &PlotStyle) -> PlotSpec {
    let mut plot = PlotSpec::new(default_width(), default_height());
    plot.y_label = look.label.clone();
    plot.layers.push(bars_layer(hist, look));
    plot.restyle(style)
}

/// Red marks at mean - std, mean and mean + std
pub fn stats_spikes(values: &[f64]) -> Option<Layer> {
    let mean = stats::mean(values)?;
    let std = stats::std_dev(values)?;
    Some(Layer::Spikes {
        positions: vec![mean - std, mean, mean + std],
        color: default_spike_color(),
        length: default_spike_length(),
        label: "Mean +- STD".to_string(),
    })
}
