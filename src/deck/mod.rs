//! Deck files
//!
//! A deck is one venue's presentation or poster, described as JSON:
//!
//! ```json
//! {
//!   "title": "The Reference Model for COVID-19",
//!   "output": "COVID19_Ensemble_Latest.html",
//!   "vars": {"publish_url": "https://example.org/COVID19_Ensemble_Latest.html"},
//!   "header": {
//!     "title": "# The Reference Model for COVID-19",
//!     "authors": "By: ***[Jacob Barhak](https://example.org)***",
//!     "venue": "[2023 MSM Consortium Meeting](https://example.org/msm)"
//!   },
//!   "references": "### References\n\n1. The COVID tracking project <https://covidtracking.com/>\n",
//!   "sections": [
//!     {"title": "Introduction", "content": {"type": "markdown", "text": "Data from [1]"}},
//!     {"title": "Summary", "content": {"type": "row", "children": [
//!       {"type": "markdown", "file": "summary.md", "width": 700},
//!       {"type": "image", "file": "qr.png", "link": "{{publish_url}}", "text": "View on the web"}
//!     ]}}
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the deck file's directory, then the
//! matching asset directory: `image_dir` for images, `data_dir` for plots and
//! recorded values, `resource_dir` for videos and HTML pages.

mod build;

use crate::error::{DeckError, Result};
use crate::layout::{Document, Margin};
use crate::plot::{Metric, PlotStyle};
use crate::render::Resources;
use crate::stats::Bins;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default page width in px
pub const DEFAULT_WIDTH: u32 = 1100;
/// Default height of embedded videos and pages in px
pub const DEFAULT_EMBED_HEIGHT: u32 = 700;

fn default_width() -> u32 { DEFAULT_WIDTH }
fn default_image_dir() -> PathBuf { PathBuf::from("Images") }
fn default_data_dir() -> PathBuf { PathBuf::from("Data") }
fn default_resource_dir() -> PathBuf { PathBuf::from("Resources") }
fn default_image_width() -> u32 { 380 }

/// Options that change how a deck is built, not what it contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Inline video files as data URIs instead of linking them
    pub embed_video: bool,
    /// Embed local HTML pages; otherwise reference them with `<object>`
    pub local_files: bool,
    pub resources: Resources,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            embed_video: false,
            local_files: true,
            resources: Resources::Inline,
        }
    }
}

/// Placement shared by every element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub margin: Option<Margin>,
}

/// Title block above the section tabs
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Header {
    /// Markdown, usually a single `#` heading
    pub title: String,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
}

/// One tab: a title and its content
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: Element,
}

/// Recorded values for a histogram
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Values {
    /// Literal numbers
    Inline(Vec<f64>),
    /// A JSON or CSV file under `data_dir`: either an array of numbers, or
    /// records from which `field` is taken after `filter` matches. A `.csv`
    /// file is read as records keyed by its header row.
    File {
        file: PathBuf,
        #[serde(default)]
        field: Option<String>,
        #[serde(default)]
        filter: BTreeMap<String, serde_json::Value>,
        /// Clamp values to at most this
        #[serde(default)]
        clamp: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Markdown from `text` or from `file` (relative to the deck)
    Markdown {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        file: Option<PathBuf>,
        #[serde(flatten)]
        placement: Placement,
    },
    /// Raw HTML
    Html {
        html: String,
        #[serde(flatten)]
        placement: Placement,
    },
    /// Plain text with `$…$`, `$$…$$`, `\(…\)` or `\[…\]` math
    Latex {
        text: String,
        /// Font size in px
        #[serde(default)]
        size: Option<u32>,
        #[serde(flatten)]
        placement: Placement,
    },
    /// Embedded image wrapped in a link
    Image {
        file: PathBuf,
        link: String,
        text: String,
        #[serde(default = "default_image_width")]
        image_width: u32,
        #[serde(flatten)]
        placement: Placement,
    },
    Video {
        file: PathBuf,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    /// External page shown through `<object>`, never embedded
    Object {
        src: String,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    /// Local HTML page, embedded when building with local files
    InlineHtml {
        file: PathBuf,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    /// Previously computed plot, re-styled for this slide
    Plot {
        file: PathBuf,
        #[serde(default)]
        style: PlotStyle,
        #[serde(default)]
        margin: Option<Margin>,
    },
    Histogram {
        values: Values,
        bins: Bins,
        #[serde(default)]
        density: bool,
        /// Plot the running total instead of the per-bin values
        #[serde(default)]
        cumulative: bool,
        /// Draw the running total faintly behind the per-bin values
        #[serde(default)]
        overlay_cumulative: bool,
        /// Mark mean and mean ± std
        #[serde(default)]
        stats: bool,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        alpha: Option<f64>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        style: PlotStyle,
        #[serde(default)]
        margin: Option<Margin>,
    },
    /// Prediction-quality histograms, one row per recorded group
    QualityGrid {
        file: PathBuf,
        metrics: Vec<Metric>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        footer: Option<String>,
    },
    /// The deck's reference list
    References {
        #[serde(flatten)]
        placement: Placement,
    },
    Spacer {
        #[serde(flatten)]
        placement: Placement,
    },
    Row {
        children: Vec<Element>,
        #[serde(flatten)]
        placement: Placement,
    },
    Column {
        children: Vec<Element>,
        #[serde(flatten)]
        placement: Placement,
    },
    Tabs {
        tabs: Vec<Section>,
        #[serde(flatten)]
        placement: Placement,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Deck {
    /// HTML `<title>`
    pub title: String,
    /// Output file name; defaults to the deck file's stem
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_resource_dir")]
    pub resource_dir: PathBuf,
    /// Values for `{{name}}` placeholders in markdown
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub header: Option<Header>,
    /// Numbered reference list, as markdown
    #[serde(default)]
    pub references: Option<String>,
    pub sections: Vec<Section>,

    #[serde(skip)]
    base_dir: PathBuf,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Deck {
    /// Load a deck file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DeckError::io(path, e))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut deck: Deck = serde_json::from_str(&text).map_err(|e| DeckError::json(path, e))?;
        deck.base_dir = base_dir;
        deck.source = Some(path.to_path_buf());
        Ok(deck)
    }

    /// Parse deck JSON with paths relative to `base_dir`
    pub fn parse(json: &str, base_dir: impl Into<PathBuf>) -> std::result::Result<Self, serde_json::Error> {
        let mut deck: Deck = serde_json::from_str(json)?;
        deck.base_dir = base_dir.into();
        Ok(deck)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where the built page goes: `output` next to the deck, or the deck
    /// file's stem (minus a `.deck` suffix) with `.html`
    pub fn output_path(&self) -> PathBuf {
        if let Some(ref output) = self.output {
            return self.base_dir.join(output);
        }

        let stem = self
            .source
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .map(|s| s.trim_end_matches(".deck").to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "presentation".to_string());

        self.base_dir.join(format!("{}.html", stem))
    }

    /// Assemble the page
    pub fn build(&self, options: &BuildOptions) -> Result<Document> {
        build::build(self, options)
    }

    fn resolve(&self, dir: &Path, file: &Path) -> PathBuf {
        self.base_dir.join(dir).join(file)
    }
}
