//! Deck → layout tree assembly

use super::{BuildOptions, Deck, Element, Placement, Section, Values, DEFAULT_EMBED_HEIGHT};
use crate::assets;
use crate::error::{DeckError, Result};
use crate::layout::{Document, Node, Size};
use crate::markdown;
use crate::plot::{self, bars_layer, quality_grid, HistogramLook, PlotSpec, QualityData};
use crate::references::ReferenceMap;
use crate::stats;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;

const NO_MARGIN: (u32, u32, u32, u32) = (0, 0, 0, 0);

pub(super) fn build(deck: &Deck, options: &BuildOptions) -> Result<Document> {
    if deck.sections.is_empty() {
        return Err(DeckError::EmptyDeck(deck.title.clone()));
    }

    info!("Building '{}' ({} sections)", deck.title, deck.sections.len());

    let references = match deck.references {
        Some(ref text) => ReferenceMap::parse(text),
        None => ReferenceMap::default(),
    };
    debug!("{} references parsed", references.len());

    let ctx = Context { deck, options, references, missing: RefCell::default() };

    let mut page = Vec::new();
    if let Some(ref header) = deck.header {
        let title = ctx.markdown(&header.title)?.with_size(Size::width(deck.width)).with_margin(NO_MARGIN);

        let mut byline = Vec::new();
        if let Some(ref authors) = header.authors {
            byline.push(ctx.markdown(authors)?.with_size(Size::width(280)).with_margin(NO_MARGIN));
        }
        if let Some(ref venue) = header.venue {
            let width = deck.width.saturating_sub(360).max(200);
            byline.push(ctx.markdown(venue)?.with_size(Size::width(width)).with_margin(NO_MARGIN));
        }

        let mut header_children = vec![title];
        if !byline.is_empty() {
            header_children.push(Node::row(byline).with_margin(NO_MARGIN));
        }
        page.push(Node::column(header_children).with_margin(NO_MARGIN));
    }

    page.push(ctx.tabs(&deck.sections)?);

    if let Some(cited) = citation_summary(&ctx.missing.into_inner()) {
        warn!("Deck '{}' cites undefined references: {}", deck.title, cited);
    }

    Ok(Document {
        title: deck.title.clone(),
        root: Node::column(page),
    })
}

struct Context<'a> {
    deck: &'a Deck,
    options: &'a BuildOptions,
    references: ReferenceMap,
    /// Citation numbers seen in slide text with no reference entry
    missing: RefCell<BTreeSet<String>>,
}

impl Context<'_> {
    /// Template vars, then citation links, then markdown
    fn markdown(&self, text: &str) -> Result<Node> {
        let text = markdown::substitute_vars(text, &self.deck.vars)?;
        self.missing.borrow_mut().extend(self.references.missing_citations(&text));
        let text = self.references.link_citations(&text);
        Ok(Node::markdown(&text))
    }

    fn tabs(&self, sections: &[Section]) -> Result<Node> {
        let tabs = sections
            .iter()
            .map(|s| Ok((s.title.clone(), self.element(&s.content)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Node::tabs(tabs).with_margin(NO_MARGIN))
    }

    fn element(&self, element: &Element) -> Result<Node> {
        let deck = self.deck;

        let node = match element {
            Element::Markdown { text, file, placement } => {
                let text = match (text, file) {
                    (Some(text), _) => text.clone(),
                    (None, Some(file)) => {
                        let path = deck.base_dir.join(file);
                        std::fs::read_to_string(&path).map_err(|e| DeckError::io(&path, e))?
                    }
                    (None, None) => String::new(),
                };
                place(self.markdown(&text)?, placement)
            }

            Element::Html { html, placement } => place(Node::html(html.clone()), placement),

            Element::Latex { text, size, placement } => {
                place(Node::html(markdown::latex_to_html(text, *size)), placement)
            }

            Element::Image { file, link, text, image_width, placement } => {
                let link = markdown::substitute_vars(link, &deck.vars)?;
                let path = deck.resolve(&deck.image_dir, file);
                debug!("Embedding image {}", path.display());
                let html = assets::image_link_anchor(&link, &path, text, *image_width)?;
                let placement = Placement {
                    width: placement.width.or(Some(*image_width)),
                    ..*placement
                };
                place(Node::html(html), &placement)
            }

            Element::Video { file, width, height } => {
                let (w, h) = self.embed_size(*width, *height);
                let path = deck.resolve(&deck.resource_dir, file);
                let src = page_relative(&deck.resource_dir, file);
                if self.options.embed_video {
                    debug!("Embedding video {}", path.display());
                }
                let html = assets::video_tag(&path, &src, w, h, self.options.embed_video)?;
                Node::html(html).with_size(Size::fixed(w, h))
            }

            Element::Object { src, width, height } => {
                let (w, h) = self.embed_size(*width, *height);
                let src = markdown::substitute_vars(src, &deck.vars)?;
                Node::html(assets::object_external(&src, w, h)).with_size(Size::fixed(w, h))
            }

            Element::InlineHtml { file, width, height } => {
                let (w, h) = self.embed_size(*width, *height);
                let html = if self.options.local_files {
                    assets::inline_html(deck.resolve(&deck.resource_dir, file))?
                } else {
                    assets::object_external(&page_relative(&deck.resource_dir, file), w, h)
                };
                Node::html(html).with_size(Size::fixed(w, h))
            }

            Element::Plot { file, style, margin } => {
                let plot = PlotSpec::load(deck.resolve(&deck.data_dir, file))?.restyle(style);
                with_margin(Node::plot(plot), *margin)
            }

            Element::Histogram {
                values,
                bins,
                density,
                cumulative,
                overlay_cumulative,
                stats,
                color,
                alpha,
                label,
                style,
                margin,
            } => {
                let values = self.values(values)?;
                let mut hist = stats::histogram(&values, bins, *density)?;
                if *cumulative {
                    hist = hist.cumulative();
                }

                let look = HistogramLook {
                    color: color.clone().unwrap_or_else(|| HistogramLook::default().color),
                    alpha: alpha.unwrap_or(1.0),
                    label: label
                        .clone()
                        .unwrap_or_else(|| (if *density { "Proportion" } else { "Count" }).to_string()),
                };

                let mut plot = PlotSpec::new(350, 350);
                plot.y_label = look.label.clone();
                if *overlay_cumulative {
                    let behind = HistogramLook {
                        color: "red".to_string(),
                        alpha: 0.2,
                        label: "Cumulative".to_string(),
                    };
                    plot.layers.push(bars_layer(&hist.cumulative(), &behind));
                }
                plot.layers.push(bars_layer(&hist, &look));
                if *stats {
                    if let Some(spikes) = plot::stats_spikes(&values) {
                        plot.layers.push(spikes);
                    }
                }

                with_margin(Node::plot(plot.restyle(style)), *margin)
            }

            Element::QualityGrid { file, metrics, title, footer } => {
                let data = QualityData::load(deck.resolve(&deck.data_dir, file))?;
                let rows = quality_grid(&data, metrics)?;

                let mut children = Vec::new();
                if let Some(title) = title {
                    children.push(self.markdown(title)?.with_margin(NO_MARGIN));
                }
                for row in rows {
                    children.push(self.markdown(&format!("#### {}", row.label))?.with_margin(NO_MARGIN));
                    let plots = row.plots.into_iter().map(|p| Node::plot(p).with_margin(NO_MARGIN)).collect();
                    children.push(Node::row(plots).with_margin(NO_MARGIN));
                }
                if let Some(footer) = footer {
                    children.push(self.markdown(footer)?.with_margin(NO_MARGIN));
                }
                Node::column(children).with_margin(NO_MARGIN)
            }

            Element::References { placement } => {
                let text = deck.references.as_deref().unwrap_or("");
                let text = markdown::substitute_vars(text, &deck.vars)?;
                place(Node::markdown(&text), placement)
            }

            Element::Spacer { placement } => Node::spacer(Size {
                width: placement.width,
                height: placement.height,
            }),

            Element::Row { children, placement } => {
                let children = children.iter().map(|c| self.element(c)).collect::<Result<Vec<_>>>()?;
                place(Node::row(children), placement)
            }

            Element::Column { children, placement } => {
                let children = children.iter().map(|c| self.element(c)).collect::<Result<Vec<_>>>()?;
                place(Node::column(children), placement)
            }

            Element::Tabs { tabs, placement } => place(self.tabs(tabs)?, placement),
        };

        Ok(node)
    }

    fn embed_size(&self, width: Option<u32>, height: Option<u32>) -> (u32, u32) {
        (
            width.unwrap_or(self.deck.width),
            height.unwrap_or(DEFAULT_EMBED_HEIGHT),
        )
    }

    fn values(&self, values: &Values) -> Result<Vec<f64>> {
        match values {
            Values::Inline(v) => Ok(v.clone()),
            Values::File { file, field, filter, clamp } => {
                let path = self.deck.resolve(&self.deck.data_dir, file);
                let json = if is_csv(&path) {
                    read_csv_records(&path)?
                } else {
                    let text = std::fs::read_to_string(&path).map_err(|e| DeckError::io(&path, e))?;
                    serde_json::from_str(&text).map_err(|e| DeckError::json(&path, e))?
                };

                let mut values = extract_values(&json, field.as_deref(), filter)
                    .map_err(|msg| DeckError::Histogram(format!("{}: {}", path.display(), msg)))?;
                if let Some(cap) = clamp {
                    for v in &mut values {
                        *v = v.min(*cap);
                    }
                }
                Ok(values)
            }
        }
    }
}

/// `[3], [12]` for the summary warning, `None` when nothing is missing
fn citation_summary(missing: &BTreeSet<String>) -> Option<String> {
    if missing.is_empty() {
        return None;
    }
    let mut numbers: Vec<&String> = missing.iter().collect();
    numbers.sort_by_key(|n| n.parse::<u32>().unwrap_or(u32::MAX));
    Some(numbers.iter().map(|n| format!("[{}]", n)).collect::<Vec<_>>().join(", "))
}

fn place(node: Node, placement: &Placement) -> Node {
    let node = if placement.width.is_some() || placement.height.is_some() {
        node.with_size(Size { width: placement.width, height: placement.height })
    } else {
        node
    };
    with_margin(node, placement.margin)
}

fn with_margin(node: Node, margin: Option<(u32, u32, u32, u32)>) -> Node {
    match margin {
        Some(m) => node.with_margin(m),
        None => node,
    }
}

/// Path as the published page refers to it, one percent-encoded segment
/// per component
fn page_relative(dir: &Path, file: &Path) -> String {
    dir.join(file)
        .to_string_lossy()
        .split(['/', '\\'])
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// A CSV table as an array of records keyed by the header row. Cells that
/// parse as numbers become numbers, empty cells are null, the rest strings.
fn read_csv_records(path: &Path) -> Result<serde_json::Value> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DeckError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| DeckError::csv(path, e))?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| DeckError::csv(path, e))?;
        let record: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.to_string(), csv_cell(cell)))
            .collect();
        records.push(serde_json::Value::Object(record));
    }
    debug!("{}: {} CSV records", path.display(), records.len());
    Ok(serde_json::Value::Array(records))
}

fn csv_cell(cell: &str) -> serde_json::Value {
    if cell.is_empty() {
        return serde_json::Value::Null;
    }
    match cell.parse::<f64>() {
        Ok(v) => serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Err(_) => serde_json::Value::String(cell.to_string()),
    }
}

/// Numbers from a bare array, or `field` of the records matching `filter`
fn extract_values(
    json: &serde_json::Value,
    field: Option<&str>,
    filter: &std::collections::BTreeMap<String, serde_json::Value>,
) -> std::result::Result<Vec<f64>, String> {
    let items = json.as_array().ok_or("expected a JSON array")?;

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match field {
            None => {
                let v = item.as_f64().ok_or_else(|| format!("item {} is not a number", i))?;
                out.push(v);
            }
            Some(field) => {
                let record = item.as_object().ok_or_else(|| format!("item {} is not a record", i))?;
                let matches = filter.iter().all(|(k, want)| match (record.get(k), want) {
                    (Some(got), want) if got == want => true,
                    // 0 and 0.0 are the same value in recorded data
                    (Some(got), want) => matches!((got.as_f64(), want.as_f64()), (Some(a), Some(b)) if a == b),
                    (None, _) => false,
                });
                if !matches {
                    continue;
                }
                let v = record
                    .get(field)
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| format!("item {} has no numeric '{}'", i, field))?;
                out.push(v);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Node;
    use crate::plot::Layer;
    use crate::render::{self, Resources};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::collections::BTreeMap;

    const PIXEL: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

    /// A deck directory with every kind of asset
    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["Images", "Data", "Resources"] {
            std::fs::create_dir(root.join(sub)).unwrap();
        }
        std::fs::write(root.join("Images/qr.png"), PIXEL).unwrap();
        std::fs::write(root.join("Resources/plot.html"), "<div id=\"embedded\">plot</div>").unwrap();
        std::fs::write(root.join("Resources/clip.mp4"), b"fake mp4").unwrap();
        std::fs::write(root.join("summary.md"), "## Summary\nSee [2]").unwrap();
        std::fs::write(
            root.join("Data/lactate.json"),
            r#"[{"Time": 0, "Lactate": 1.0}, {"Time": 0, "Lactate": 3.0}, {"Time": 1, "Lactate": 9.0}]"#,
        )
        .unwrap();
        std::fs::write(
            root.join("Data/quality.json"),
            r#"{"groups": [{"label": "Training Unit Only", "entries": [[1, 0], [0, 3], null]}]}"#,
        )
        .unwrap();
        std::fs::write(
            root.join("Data/mortality.json"),
            r#"{"title": "Old title", "layers": [{"kind": "bars", "bars": [{"left": 0.5, "right": 1.5, "value": 4}]}]}"#,
        )
        .unwrap();
        dir
    }

    fn deck_json() -> String {
        r####"{
            "title": "COVID-19 Ensemble",
            "vars": {"publish_url": "https://example.org/deck.html"},
            "header": {"title": "# The Reference Model", "authors": "By: Author", "venue": "[MSM 2023](https://example.org/msm)"},
            "references": "### References\n\n1. Tracking <https://covidtracking.com/>\n2. MIDAS <https://midasnetwork.us/>\n",
            "sections": [
                {"title": "Introduction", "content": {"type": "column", "children": [
                    {"type": "markdown", "text": "Data [1] published at {{publish_url}}"},
                    {"type": "image", "file": "qr.png", "link": "{{publish_url}}", "text": "View on the web"}
                ]}},
                {"title": "Results", "content": {"type": "tabs", "tabs": [
                    {"title": "Lactate", "content": {"type": "histogram",
                        "values": {"file": "lactate.json", "field": "Lactate", "filter": {"Time": 0}},
                        "bins": {"count": 60, "range": [0, 15]}, "stats": true,
                        "style": {"title": "Lactate", "y_range": [0, 25]}}},
                    {"title": "Quality", "content": {"type": "quality_grid", "file": "quality.json",
                        "metrics": [{"name": "Predict Exact", "boolean": true}, {"name": "Distance", "boolean": false}],
                        "title": "## Encoder Decoder", "footer": "Red = first attempt"}},
                    {"title": "Mortality", "content": {"type": "plot", "file": "mortality.json", "style": {"title": "Mortality", "height": 200}}},
                    {"title": "Model", "content": {"type": "inline_html", "file": "plot.html", "width": 1150, "height": 390}},
                    {"title": "Video", "content": {"type": "video", "file": "clip.mp4", "width": 600, "height": 450}}
                ]}},
                {"title": "Summary", "content": {"type": "row", "children": [
                    {"type": "markdown", "file": "summary.md", "width": 700},
                    {"type": "references"}
                ]}}
            ]
        }"####
        .to_string()
    }

    fn load_fixture(dir: &tempfile::TempDir) -> Deck {
        Deck::parse(&deck_json(), dir.path()).unwrap()
    }

    fn html(deck: &Deck, options: &BuildOptions) -> String {
        render::to_string(&deck.build(options).unwrap(), options.resources)
    }

    // ==========================================================================
    // ASSEMBLY TESTS
    // ==========================================================================

    #[test]
    fn test_top_level_is_header_then_tabs() {
        let dir = fixture();
        let doc = load_fixture(&dir).build(&BuildOptions::default()).unwrap();

        assert_eq!(doc.title, "COVID-19 Ensemble");
        let Node::Column { children, .. } = &doc.root else {
            panic!("root should be a column");
        };
        assert_eq!(children.len(), 2);
        let Node::Tabs { tabs, .. } = &children[1] else {
            panic!("second child should be the section tabs");
        };
        let titles: Vec<_> = tabs.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(titles, vec!["Introduction", "Results", "Summary"]);
    }

    #[test]
    fn test_markdown_gets_vars_and_citations() {
        let dir = fixture();
        let out = html(&load_fixture(&dir), &BuildOptions::default());

        assert!(out.contains(r#"<a href="https://covidtracking.com/" title="Tracking https://covidtracking.com/" target="_blank">[1]</a>"#));
        assert!(out.contains("published at https://example.org/deck.html"));
        // markdown loaded from file is linked too
        assert!(out.contains(r#"<a href="https://midasnetwork.us/""#));
    }

    #[test]
    fn test_undefined_citations_collected_once() {
        let dir = fixture();
        let deck = load_fixture(&dir);
        let options = BuildOptions::default();
        let ctx = Context {
            deck: &deck,
            options: &options,
            references: ReferenceMap::parse(deck.references.as_deref().unwrap_or("")),
            missing: RefCell::default(),
        };

        ctx.markdown("See [1], [7] and [12]").unwrap();
        ctx.markdown("Again [7], then [2]").unwrap();

        let missing = ctx.missing.into_inner();
        assert_eq!(missing.iter().map(String::as_str).collect::<Vec<_>>(), vec!["12", "7"]);
        assert_eq!(citation_summary(&missing).as_deref(), Some("[7], [12]"));
        assert_eq!(citation_summary(&BTreeSet::new()), None);
    }

    #[test]
    fn test_latex_element() {
        let dir = fixture();
        let deck = Deck::parse(
            r#"{"title": "Math", "sections": [{"title": "Eq", "content":
                {"type": "latex", "text": "Einstein said $E = MC^2$", "size": 20, "width": 400}}]}"#,
            dir.path(),
        )
        .unwrap();
        let out = html(&deck, &BuildOptions::default());
        assert!(out.contains(r#"<div class="td-latex" style="font-size: 20px">Einstein said <span class="td-math""#));
        assert!(out.contains("<math"));
        assert!(!out.contains("katex"));

        let cdn = html(&deck, &BuildOptions { resources: Resources::Cdn, ..Default::default() });
        assert!(cdn.contains("katex.min.js"));
    }

    #[test]
    fn test_image_embedded_as_data_uri() {
        let dir = fixture();
        let out = html(&load_fixture(&dir), &BuildOptions::default());
        let encoded = STANDARD.encode(PIXEL);

        assert!(out.contains(&format!("data:image/png;base64,{}", encoded)));
        assert!(out.contains(r#"href="https://example.org/deck.html""#));
    }

    #[test]
    fn test_histogram_from_filtered_records() {
        let dir = fixture();
        let doc = load_fixture(&dir).build(&BuildOptions::default()).unwrap();

        let lactate = doc.root.plots().into_iter().find(|p| p.title == "Lactate").unwrap();
        assert_eq!(lactate.y_range, Some((0.0, 25.0)));
        match (&lactate.layers[0], &lactate.layers[1]) {
            (Layer::Bars { bars, .. }, Layer::Spikes { positions, .. }) => {
                // Only the two Time == 0 records are counted
                assert_eq!(bars.iter().map(|b| b.value).sum::<f64>(), 2.0);
                assert_eq!(positions, &vec![1.0, 2.0, 3.0]);
            }
            other => panic!("unexpected layers {:?}", other),
        }
    }

    #[test]
    fn test_loaded_plot_is_restyled() {
        let dir = fixture();
        let doc = load_fixture(&dir).build(&BuildOptions::default()).unwrap();
        let plot = doc.root.plots().into_iter().find(|p| p.title == "Mortality").unwrap();
        assert_eq!(plot.height, 200);
        assert_eq!(plot.width, 350);
    }

    #[test]
    fn test_loaded_heat_map_takes_cmap_and_hidden_axes() {
        let dir = fixture();
        std::fs::write(
            dir.path().join("Data/proximity.json"),
            r#"{"layers": [{"kind": "heat_map", "colorbar": true, "cells": [
                {"x": "ICU", "y": "Ward", "z": 0.2}, {"x": "Ward", "y": "ICU", "z": 0.9}]}]}"#,
        )
        .unwrap();
        let deck = Deck::parse(
            r#"{"title": "Map", "sections": [{"title": "Proximity", "content": {"type": "plot", "file": "proximity.json",
                "style": {"title": "Proximity Matrix Before Clustering", "cmap": "PuBu", "x_axis": false, "y_axis": false, "width": 400, "height": 400}}}]}"#,
            dir.path(),
        )
        .unwrap();

        let doc = deck.build(&BuildOptions::default()).unwrap();
        let plot = doc.root.plots().into_iter().next().unwrap();
        assert!(!plot.show_x_axis && !plot.show_y_axis);
        match &plot.layers[0] {
            Layer::HeatMap { cmap, .. } => assert_eq!(cmap, "PuBu"),
            other => panic!("expected heat map, got {:?}", other),
        }

        let out = html(&deck, &BuildOptions::default());
        assert!(out.contains(r#"<linearGradient id="td-cmap-pubu""#));
    }

    #[test]
    fn test_quality_grid_plots() {
        let dir = fixture();
        let doc = load_fixture(&dir).build(&BuildOptions::default()).unwrap();
        let titles: Vec<_> = doc.root.plots().iter().map(|p| p.title.clone()).collect();
        assert!(titles.contains(&"Predict Exact".to_string()));
        assert!(titles.contains(&"Distance".to_string()));

        let out = render::to_string(&doc, Resources::Inline);
        assert!(out.contains("<h4>Training Unit Only</h4>"));
        assert!(out.contains("Red = first attempt"));
    }

    // ==========================================================================
    // BUILD OPTION TESTS
    // ==========================================================================

    #[test]
    fn test_local_files_embed_html() {
        let dir = fixture();
        let deck = load_fixture(&dir);

        let embedded = html(&deck, &BuildOptions::default());
        assert!(embedded.contains(r#"<div id="embedded">plot</div>"#));

        let linked = html(&deck, &BuildOptions { local_files: false, ..Default::default() });
        assert!(!linked.contains(r#"<div id="embedded">"#));
        assert!(linked.contains(r#"<object width="1150" height="390" data="Resources/plot.html">"#));
    }

    #[test]
    fn test_embed_video() {
        let dir = fixture();
        let deck = load_fixture(&dir);

        let linked = html(&deck, &BuildOptions::default());
        assert!(linked.contains(r#"<source src="Resources/clip.mp4" type="video/mp4">"#));

        let embedded = html(&deck, &BuildOptions { embed_video: true, ..Default::default() });
        assert!(embedded.contains(&format!("data:video/mp4;base64,{}", STANDARD.encode(b"fake mp4"))));
    }

    #[test]
    fn test_linked_names_are_percent_encoded() {
        assert_eq!(page_relative(Path::new("Resources"), Path::new("clip.mp4")), "Resources/clip.mp4");
        assert_eq!(
            page_relative(Path::new("Resources"), Path::new("talks/my clip#1.mp4")),
            "Resources/talks/my%20clip%231.mp4"
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let dir = fixture();
        let deck = load_fixture(&dir);
        for resources in [Resources::Inline, Resources::Cdn] {
            let options = BuildOptions { resources, ..Default::default() };
            assert_eq!(html(&deck, &options), html(&deck, &options));
        }
    }

    // ==========================================================================
    // FAILURE TESTS
    // ==========================================================================

    #[test]
    fn test_missing_image_fails() {
        let dir = fixture();
        std::fs::remove_file(dir.path().join("Images/qr.png")).unwrap();
        let err = load_fixture(&dir).build(&BuildOptions::default()).unwrap_err();
        assert!(matches!(err, DeckError::Io { ref path, .. } if path.ends_with("Images/qr.png")));
    }

    #[test]
    fn test_unknown_var_fails() {
        let dir = fixture();
        let mut deck = load_fixture(&dir);
        deck.vars.clear();
        assert!(matches!(deck.build(&BuildOptions::default()), Err(DeckError::UnknownVar(_))));
    }

    #[test]
    fn test_empty_deck_fails() {
        let deck = Deck::parse(r#"{"title": "Empty", "sections": []}"#, ".").unwrap();
        assert!(matches!(deck.build(&BuildOptions::default()), Err(DeckError::EmptyDeck(_))));
    }

    // ==========================================================================
    // VALUE EXTRACTION TESTS
    // ==========================================================================

    #[test]
    fn test_histogram_from_csv_records() {
        let dir = fixture();
        std::fs::write(
            dir.path().join("Data/lactate.csv"),
            "Time, Lactate, Arm\n0, 1.0, A\n0, 3.0, B\n1, 9.0, A\n0, , A\n",
        )
        .unwrap();
        let deck = Deck::parse(
            r#"{"title": "CSV", "sections": [{"title": "Lactate", "content": {"type": "histogram",
                "values": {"file": "lactate.csv", "field": "Lactate", "filter": {"Time": 0, "Arm": "A"}},
                "bins": [0, 5, 10]}}]}"#,
            dir.path(),
        )
        .unwrap();
        let options = BuildOptions::default();
        let ctx = Context {
            deck: &deck,
            options: &options,
            references: ReferenceMap::default(),
            missing: RefCell::default(),
        };

        let Element::Histogram { values, .. } = &deck.sections[0].content else {
            panic!("expected histogram");
        };
        // The Time 0 / Arm A row with an empty Lactate cell is an error, not a zero
        assert!(matches!(ctx.values(values), Err(DeckError::Histogram(_))));

        std::fs::write(dir.path().join("Data/lactate.csv"), "Time,Lactate,Arm\n0,1.0,A\n0,3.0,B\n1,9.0,A\n0,2.5,A\n").unwrap();
        assert_eq!(ctx.values(values).unwrap(), vec![1.0, 2.5]);
    }

    #[test]
    fn test_csv_cells() {
        assert_eq!(csv_cell("2"), serde_json::json!(2.0));
        assert_eq!(csv_cell("-0.5"), serde_json::json!(-0.5));
        assert_eq!(csv_cell("Ward"), serde_json::json!("Ward"));
        assert_eq!(csv_cell(""), serde_json::Value::Null);
        assert!(is_csv(Path::new("Data/records.CSV")));
        assert!(!is_csv(Path::new("Data/records.json")));
    }

    #[test]
    fn test_bad_csv_names_the_file() {
        let dir = fixture();
        let path = dir.path().join("Data/binary.csv");
        std::fs::write(&path, b"Time,Lactate\n0,\xff\xfe\n").unwrap();
        let err = read_csv_records(&path).unwrap_err();
        assert!(matches!(err, DeckError::Csv { .. }));
        assert!(err.to_string().contains("binary.csv"));
    }

    #[test]
    fn test_extract_bare_numbers() {
        let json = serde_json::json!([1, 2.5, 3]);
        assert_eq!(extract_values(&json, None, &BTreeMap::new()).unwrap(), vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_extract_filter_matches_int_and_float() {
        let json = serde_json::json!([{"Death": 1.0, "Time": 4}, {"Death": 0, "Time": 7}]);
        let mut filter = BTreeMap::new();
        filter.insert("Death".to_string(), serde_json::json!(1));
        assert_eq!(extract_values(&json, Some("Time"), &filter).unwrap(), vec![4.0]);
    }

    #[test]
    fn test_extract_rejects_bad_shapes() {
        assert!(extract_values(&serde_json::json!({"a": 1}), None, &BTreeMap::new()).is_err());
        assert!(extract_values(&serde_json::json!(["x"]), None, &BTreeMap::new()).is_err());
        assert!(extract_values(&serde_json::json!([{"b": 1}]), Some("a"), &BTreeMap::new()).is_err());
    }
}
