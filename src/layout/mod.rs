//! Layout tree
//!
//! A page is a tree of [`Node`]s. Leaves hold rendered HTML or a plot;
//! containers arrange their children:
//!
//! ```text
//! Column
//! ├── Markdown  "# Title"
//! ├── Row
//! │   ├── Markdown  "By: ..."
//! │   └── Markdown  "[Venue](...)"
//! └── Tabs
//!     ├── "Introduction" → Column [...]
//!     └── "Summary"      → Row [...]
//! ```
//!
//! The tree is built once and handed to [`crate::render`]; nothing mutates
//! it afterwards.

use crate::markdown;
use crate::plot::PlotSpec;
use serde::{Deserialize, Serialize};

/// Fixed pixel size; `None` lets the browser size the element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Size {
    pub fn width(width: u32) -> Self {
        Self { width: Some(width), height: None }
    }

    pub fn fixed(width: u32, height: u32) -> Self {
        Self { width: Some(width), height: Some(height) }
    }
}

/// CSS margin in px: top, right, bottom, left
pub type Margin = (u32, u32, u32, u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Markdown already rendered to HTML
    Markdown { html: String, size: Size, margin: Option<Margin> },
    /// Raw HTML: image anchors, videos, embedded pages
    Html { html: String, size: Size, margin: Option<Margin> },
    Plot { plot: PlotSpec, margin: Option<Margin> },
    Row { children: Vec<Node>, size: Size, margin: Option<Margin> },
    Column { children: Vec<Node>, size: Size, margin: Option<Margin> },
    Tabs { tabs: Vec<(String, Node)>, size: Size, margin: Option<Margin> },
    /// Empty block, for alignment
    Spacer { size: Size },
}

impl Node {
    /// Render markdown text into a leaf
    pub fn markdown(text: &str) -> Self {
        Node::Markdown { html: markdown::to_html(text), size: Size::default(), margin: None }
    }

    pub fn html(html: impl Into<String>) -> Self {
        Node::Html { html: html.into(), size: Size::default(), margin: None }
    }

    pub fn plot(plot: PlotSpec) -> Self {
        Node::Plot { plot, margin: None }
    }

    pub fn row(children: Vec<Node>) -> Self {
        Node::Row { children, size: Size::default(), margin: None }
    }

    pub fn column(children: Vec<Node>) -> Self {
        Node::Column { children, size: Size::default(), margin: None }
    }

    pub fn tabs(tabs: Vec<(String, Node)>) -> Self {
        Node::Tabs { tabs, size: Size::default(), margin: None }
    }

    pub fn spacer(size: Size) -> Self {
        Node::Spacer { size }
    }

    /// Set the size; plots keep their own size, so this is a no-op for them
    pub fn with_size(mut self, new_size: Size) -> Self {
        match &mut self {
            Node::Markdown { size, .. }
            | Node::Html { size, .. }
            | Node::Row { size, .. }
            | Node::Column { size, .. }
            | Node::Tabs { size, .. }
            | Node::Spacer { size } => *size = new_size,
            Node::Plot { .. } => {}
        }
        self
    }

    pub fn with_margin(mut self, new_margin: Margin) -> Self {
        match &mut self {
            Node::Markdown { margin, .. }
            | Node::Html { margin, .. }
            | Node::Plot { margin, .. }
            | Node::Row { margin, .. }
            | Node::Column { margin, .. }
            | Node::Tabs { margin, .. } => *margin = Some(new_margin),
            Node::Spacer { .. } => {}
        }
        self
    }

    /// Every plot in the tree, depth first
    pub fn plots(&self) -> Vec<&PlotSpec> {
        let mut out = Vec::new();
        self.collect_plots(&mut out);
        out
    }

    fn collect_plots<'a>(&'a self, out: &mut Vec<&'a PlotSpec>) {
        match self {
            Node::Plot { plot, .. } => out.push(plot),
            Node::Row { children, .. } | Node::Column { children, .. } => {
                for child in children {
                    child.collect_plots(out);
                }
            }
            Node::Tabs { tabs, .. } => {
                for (_, child) in tabs {
                    child.collect_plots(out);
                }
            }
            Node::Markdown { .. } | Node::Html { .. } | Node::Spacer { .. } => {}
        }
    }
}

/// A finished page, ready to serialize
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// HTML `<title>`
    pub title: String,
    pub root: Node,
}
