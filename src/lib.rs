//! talkdeck - Build self-contained HTML presentations and posters
//!
//! A talk given at several venues is mostly the same material re-arranged:
//! a header with title, authors and venue, then a set of tabs holding
//! markdown, linked images, videos, embedded pages and plots. talkdeck reads
//! that arrangement from a JSON deck file and writes a single HTML file that
//! can be opened offline, mailed, or published as-is.
//!
//! # Pipeline
//!
//! 1. **Load** the deck ([`Deck::load`]) and parse its numbered reference
//!    block ([`ReferenceMap::parse`]).
//! 2. **Assemble** a layout tree ([`Deck::build`]): markdown gets template
//!    variables and citation links, images and pages are embedded as base64
//!    or inline HTML, recorded values (JSON or CSV) become histogram plots.
//! 3. **Render** the tree to one HTML file ([`render::save`]), with plots as
//!    static SVG or as D3 charts loaded from a CDN.
//!
//! # Quick Start
//!
//! ```no_run
//! use talkdeck::{BuildOptions, Deck, Resources};
//!
//! let deck = Deck::load("MIDAS2021.deck.json")?;
//! let options = BuildOptions { embed_video: true, ..Default::default() };
//! let document = deck.build(&options)?;
//! talkdeck::render::save(deck.output_path(), &document, Resources::Inline)?;
//! # Ok::<(), talkdeck::DeckError>(())
//! ```
//!
//! # Citations
//!
//! | In the reference block                 | In slide text | Rendered as                           |
//! |----------------------------------------|---------------|---------------------------------------|
//! | `1. COVID tracking <https://...>`      | `[1]`         | `<a href="https://..." ...>[1]</a>`   |
//! | `12. MIDAS network <https://...>`      | `[12]`        | `<a href="https://..." ...>[12]</a>`  |
//! | `3. Unpublished notes` (no URL)        | `[3]`         | link with empty href, warning logged  |
//!
//! # Modules
//!
//! - [`deck`]: deck files and assembly of the layout tree
//! - [`references`]: reference block parsing and citation linking
//! - [`markdown`]: template variables, markdown → HTML, LaTeX math as MathML
//! - [`assets`]: base64 embedding of images, videos and pages
//! - [`stats`]: numpy-compatible histograms
//! - [`plot`]: plot model (bars, curves, points, heat maps), histogram and
//!   quality plots, colormaps
//! - [`layout`]: the layout tree
//! - [`render`]: HTML/SVG serialization
//! - [`serve`]: local preview server

pub mod assets;
pub mod deck;
pub mod error;
pub mod layout;
pub mod markdown;
pub mod plot;
pub mod references;
pub mod render;
pub mod serve;
pub mod stats;

pub use deck::{BuildOptions, Deck};
pub use error::{DeckError, Result};
pub use layout::{Document, Node};
pub use plot::PlotSpec;
pub use references::{Reference, ReferenceMap};
pub use render::Resources;

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the crate
    // root and wires together end to end.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _: Resources = Resources::Inline;
        let options = BuildOptions::default();
        assert!(options.local_files);
        assert!(!options.embed_video);
    }

    #[test]
    fn test_end_to_end_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Workshop.deck.json");
        std::fs::write(
            &path,
            r##"{
                "title": "Workshop",
                "header": {"title": "# Workshop Talk", "authors": "By: Someone"},
                "references": "1. First source <https://example.org/one>",
                "sections": [
                    {"title": "Intro", "content": {"type": "markdown", "text": "As shown in [1]"}},
                    {"title": "Data", "content": {"type": "histogram", "values": [0, 1, 1, 2], "bins": [-0.5, 0.5, 1.5, 2.5]}}
                ]
            }"##,
        )
        .unwrap();

        let deck = Deck::load(&path).unwrap();
        let doc = deck.build(&BuildOptions::default()).unwrap();
        render::save(deck.output_path(), &doc, Resources::Inline).unwrap();

        let html = std::fs::read_to_string(dir.path().join("Workshop.html")).unwrap();
        assert!(html.contains("<h1>Workshop Talk</h1>"));
        assert!(html.contains(r#"href="https://example.org/one""#));
        assert!(html.contains("<svg"));
        assert!(!html.contains("d3js.org"));
    }

    #[test]
    fn test_reference_map_from_root() {
        let refs = ReferenceMap::parse("1. Source <https://example.org>");
        assert_eq!(refs.get("1").map(|r| r.url.as_str()), Some("https://example.org"));
    }
}
