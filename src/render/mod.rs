//! Serialization of a layout tree to a single HTML file
//!
//! Two resource modes, mirroring how a deck is meant to be shared:
//!
//! - **Inline** (default): plots are pre-rendered to SVG. The file needs no
//!   network access and can be mailed around or opened from a USB stick.
//! - **CDN**: plots ship as JSON and are drawn by D3 loaded from its CDN,
//!   which adds hover tooltips and axis niceties at the cost of needing a
//!   connection.
//!
//! The output never contains timestamps; identical inputs give
//! byte-identical files.
//!
//! # Usage
//!
//! ```ignore
//! use talkdeck::render::{self, Resources};
//!
//! render::save("Poster_MIDAS2021.html", &document, Resources::Inline)?;
//! ```

pub mod html;
pub mod svg;

pub use html::write;

use crate::error::{DeckError, Result};
use crate::layout::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

/// Where the page gets its plotting code from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resources {
    #[default]
    Inline,
    Cdn,
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resources::Inline => write!(f, "inline"),
            Resources::Cdn => write!(f, "cdn"),
        }
    }
}

impl FromStr for Resources {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(Resources::Inline),
            "cdn" => Ok(Resources::Cdn),
            other => Err(format!("unknown resources mode '{}' (expected inline or cdn)", other)),
        }
    }
}

/// Write `doc` to `path`
pub fn save<P: AsRef<Path>>(path: P, doc: &Document, resources: Resources) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| DeckError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    html::write(&mut writer, doc, resources).map_err(|e| DeckError::io(path, e))?;
    std::io::Write::flush(&mut writer).map_err(|e| DeckError::io(path, e))
}

/// Render `doc` into a string
pub fn to_string(doc: &Document, resources: Resources) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = html::write(&mut buf, doc, resources);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Escape text for HTML content and attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
