//! Static SVG rendering of plots
//!
//! Used for inline resources. Hover values come from SVG `<title>` elements,
//! which every browser shows as a tooltip without any script.

use super::escape_html;
use crate::plot::{colormap, Layer, PlotSpec, Tick};
use std::collections::HashMap;
use std::fmt::Write;

const MARGIN_LEFT: f64 = 45.0;
const MARGIN_RIGHT: f64 = 10.0;
const MARGIN_TOP: f64 = 25.0;
const MARGIN_BOTTOM: f64 = 38.0;
const Y_TICKS: usize = 4;
/// Room right of a heat map for its color scale
const COLORBAR_SPACE: f64 = 60.0;
/// Category axes label at most this many categories
const MAX_CATEGORY_LABELS: usize = 30;

struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn new(plot: &PlotSpec) -> Self {
        let (x0, x1) = plot.x_extent();
        let (y0, y1) = plot.y_extent();
        Self {
            x0,
            x1,
            y0,
            y1,
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: (plot.width as f64 - MARGIN_LEFT - MARGIN_RIGHT).max(10.0),
            height: (plot.height as f64 - MARGIN_TOP - MARGIN_BOTTOM).max(10.0),
        }
    }

    fn sx(&self, x: f64) -> f64 {
        self.left + (x - self.x0) / (self.x1 - self.x0) * self.width
    }

    fn sy(&self, y: f64) -> f64 {
        let t = ((y - self.y0) / (self.y1 - self.y0)).clamp(0.0, 1.0);
        self.top + self.height - t * self.height
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Short numeric label: at most two decimals, trailing zeros dropped
pub fn fmt_num(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Render a plot as a standalone `<svg>` element
pub fn render(plot: &PlotSpec) -> String {
    let frame = Frame::new(plot);
    let font = plot.font_size.unwrap_or(12);
    let tick_font = font.saturating_sub(2).max(6);
    let mut out = String::new();

    let _ = write!(
        out,
        r#"<svg class="td-svg" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = plot.width,
        h = plot.height
    );

    if !plot.title.is_empty() {
        let _ = write!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="{}" font-weight="600">{}</text>"#,
            plot.width as f64 / 2.0,
            MARGIN_TOP - 8.0,
            font,
            escape_html(&plot.title)
        );
    }

    if plot.is_heat_map() {
        write_heat_map(&mut out, plot, font, tick_font);
        out.push_str("</svg>");
        return out;
    }

    for layer in &plot.layers {
        match layer {
            Layer::Bars { bars, color, alpha, label } => {
                let color = escape_html(color);
                for bar in bars {
                    let x = frame.sx(bar.left);
                    let w = (frame.sx(bar.right) - x).max(0.0);
                    let y = frame.sy(bar.value.max(frame.y0));
                    let h = (frame.sy(frame.y0) - y).max(0.0);
                    let _ = write!(
                        out,
                        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" fill-opacity="{}" stroke="white" stroke-width="0.5"><title>{} – {}: {}</title></rect>"#,
                        x,
                        y,
                        w,
                        h,
                        color,
                        alpha,
                        fmt_num(bar.left),
                        fmt_num(bar.right),
                        escape_html(format!("{} {}", label, fmt_num(bar.value)).trim_start())
                    );
                }
            }
            Layer::Spikes { positions, color, length, label } => {
                let color = escape_html(color);
                for &p in positions {
                    let x = frame.sx(p);
                    let _ = write!(
                        out,
                        r#"<line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke="{}" stroke-width="2"><title>{}</title></line>"#,
                        frame.bottom(),
                        frame.bottom() - length,
                        color,
                        escape_html(format!("{} {}", label, fmt_num(p)).trim_start()),
                        x = x
                    );
                }
            }
            Layer::Curve { points, color, width, label } => {
                let coords: Vec<String> = points
                    .iter()
                    .filter(|p| p.x.is_finite() && p.y.is_finite())
                    .map(|p| format!("{:.2},{:.2}", frame.sx(p.x), frame.sy(p.y)))
                    .collect();
                if coords.is_empty() {
                    continue;
                }
                let _ = write!(
                    out,
                    r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}"><title>{}</title></polyline>"#,
                    coords.join(" "),
                    escape_html(color),
                    width,
                    escape_html(label)
                );
            }
            Layer::Points { points, color, size, label } => {
                let color = escape_html(color);
                for p in points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
                    let _ = write!(
                        out,
                        r#"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}"><title>{}</title></circle>"#,
                        frame.sx(p.x),
                        frame.sy(p.y),
                        size,
                        color,
                        escape_html(format!("{} {}, {}", label, fmt_num(p.x), fmt_num(p.y)).trim_start())
                    );
                }
            }
            Layer::HeatMap { .. } => {}
        }
    }

    write_axes(&mut out, plot, &frame, font, tick_font);
    out.push_str("</svg>");
    out
}

/// Every `step`-th index, so long category lists stay legible
fn label_step(count: usize) -> usize {
    count.div_ceil(MAX_CATEGORY_LABELS).max(1)
}

fn write_heat_map(out: &mut String, plot: &PlotSpec, font: u32, tick_font: u32) {
    let (xs, ys) = plot.categories();
    let (z0, z1) = plot.z_extent();
    let colorbar = plot.layers.iter().find_map(|l| match l {
        Layer::HeatMap { colorbar: true, cmap, .. } => Some(cmap.as_str()),
        _ => None,
    });

    let right = MARGIN_RIGHT + if colorbar.is_some() { COLORBAR_SPACE } else { 0.0 };
    let width = (plot.width as f64 - MARGIN_LEFT - right).max(10.0);
    let height = (plot.height as f64 - MARGIN_TOP - MARGIN_BOTTOM).max(10.0);
    let bottom = MARGIN_TOP + height;
    let cell_w = width / xs.len().max(1) as f64;
    let cell_h = height / ys.len().max(1) as f64;

    let x_index: HashMap<&str, usize> = xs.iter().enumerate().map(|(i, x)| (*x, i)).collect();
    let y_index: HashMap<&str, usize> = ys.iter().enumerate().map(|(i, y)| (*y, i)).collect();

    for layer in &plot.layers {
        let Layer::HeatMap { cells, cmap, label, .. } = layer else {
            continue;
        };
        for cell in cells.iter().filter(|c| c.z.is_finite()) {
            let (Some(&i), Some(&j)) = (x_index.get(cell.x.as_str()), y_index.get(cell.y.as_str())) else {
                continue;
            };
            let t = (cell.z - z0) / (z1 - z0);
            let value = if label.is_empty() {
                fmt_num(cell.z)
            } else {
                format!("{} {}", label, fmt_num(cell.z))
            };
            let _ = write!(
                out,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"><title>{}</title></rect>"#,
                MARGIN_LEFT + i as f64 * cell_w,
                bottom - (j + 1) as f64 * cell_h,
                cell_w,
                cell_h,
                colormap::color_at(cmap, t),
                escape_html(&format!("{}, {}: {}", cell.x, cell.y, value))
            );
        }
    }

    if plot.show_x_axis {
        let step = label_step(xs.len());
        for (i, x) in xs.iter().enumerate().step_by(step) {
            let cx = MARGIN_LEFT + (i as f64 + 0.5) * cell_w;
            let ty = bottom + 4.0;
            let _ = write!(
                out,
                r#"<text x="{cx:.2}" y="{ty:.2}" transform="rotate(-90 {cx:.2} {ty:.2})" text-anchor="end" dominant-baseline="middle" font-size="{}">{}</text>"#,
                tick_font,
                escape_html(x),
                cx = cx,
                ty = ty
            );
        }
    }
    if plot.show_y_axis {
        let step = label_step(ys.len());
        for (j, y) in ys.iter().enumerate().step_by(step) {
            let cy = bottom - (j as f64 + 0.5) * cell_h;
            let _ = write!(
                out,
                r#"<text x="{:.2}" y="{:.2}" text-anchor="end" font-size="{}">{}</text>"#,
                MARGIN_LEFT - 4.0,
                cy + tick_font as f64 / 3.0,
                tick_font,
                escape_html(y)
            );
        }
    }

    if let Some(cmap) = colorbar {
        write_colorbar(out, cmap, (z0, z1), MARGIN_LEFT + width + 12.0, height, tick_font);
    }
    write_labels(out, plot, MARGIN_LEFT + width / 2.0, MARGIN_TOP + height / 2.0, font, tick_font);
}

fn write_colorbar(out: &mut String, cmap: &str, (z0, z1): (f64, f64), x: f64, height: f64, tick_font: u32) {
    let stops = colormap::stops(cmap);
    let id = format!("td-cmap-{}", cmap.to_ascii_lowercase().replace(|c: char| !c.is_ascii_alphanumeric(), "-"));

    let _ = write!(out, r#"<defs><linearGradient id="{}" x1="0" y1="1" x2="0" y2="0">"#, id);
    for (i, color) in stops.iter().enumerate() {
        let offset = if stops.len() > 1 { i as f64 / (stops.len() - 1) as f64 } else { 0.0 };
        let _ = write!(out, r#"<stop offset="{:.3}" stop-color="{}"/>"#, offset, color);
    }
    out.push_str("</linearGradient></defs>");

    let _ = write!(
        out,
        r##"<rect class="td-colorbar" x="{:.2}" y="{:.2}" width="12" height="{:.2}" fill="url(#{})" stroke="#444" stroke-width="0.5"/>"##,
        x,
        MARGIN_TOP,
        height,
        id
    );
    for (z, y) in [(z1, MARGIN_TOP + tick_font as f64), (z0, MARGIN_TOP + height)] {
        let _ = write!(
            out,
            r#"<text x="{:.2}" y="{:.2}" font-size="{}">{}</text>"#,
            x + 16.0,
            y,
            tick_font,
            fmt_num(z)
        );
    }
}

fn write_axes(out: &mut String, plot: &PlotSpec, frame: &Frame, font: u32, tick_font: u32) {
    let bottom = frame.bottom();
    let right = frame.left + frame.width;

    if plot.show_x_axis {
        let _ = write!(
            out,
            r##"<line class="td-axis" x1="{l:.2}" y1="{b:.2}" x2="{r:.2}" y2="{b:.2}" stroke="#444"/>"##,
            l = frame.left,
            r = right,
            b = bottom
        );

        let ticks: Vec<Tick> = if plot.x_ticks.is_empty() {
            (0..=4)
                .map(|i| {
                    let v = frame.x0 + (frame.x1 - frame.x0) * i as f64 / 4.0;
                    Tick::new(v, fmt_num(v))
                })
                .collect()
        } else {
            plot.x_ticks.clone()
        };

        for tick in &ticks {
            let x = frame.sx(tick.value);
            let _ = write!(
                out,
                r##"<line x1="{x:.2}" y1="{b:.2}" x2="{x:.2}" y2="{:.2}" stroke="#444"/><text x="{x:.2}" y="{:.2}" text-anchor="middle" font-size="{}">{}</text>"##,
                bottom + 4.0,
                bottom + 6.0 + tick_font as f64,
                tick_font,
                escape_html(&tick.label),
                x = x,
                b = bottom
            );
        }
    }

    if plot.show_y_axis {
        let _ = write!(
            out,
            r##"<line class="td-axis" x1="{l:.2}" y1="{t:.2}" x2="{l:.2}" y2="{b:.2}" stroke="#444"/>"##,
            l = frame.left,
            t = frame.top,
            b = bottom
        );

        for i in 0..=Y_TICKS {
            let v = frame.y0 + (frame.y1 - frame.y0) * i as f64 / Y_TICKS as f64;
            let y = frame.sy(v);
            let _ = write!(
                out,
                r##"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="#444"/><text x="{:.2}" y="{:.2}" text-anchor="end" font-size="{}">{}</text>"##,
                frame.left - 4.0,
                frame.left,
                frame.left - 6.0,
                y + tick_font as f64 / 3.0,
                tick_font,
                fmt_num(v),
                y = y
            );
        }
    }

    write_labels(out, plot, frame.left + frame.width / 2.0, frame.top + frame.height / 2.0, font, tick_font);
}

/// Axis titles, centered on the plot area; hidden axes lose their title too
fn write_labels(out: &mut String, plot: &PlotSpec, cx: f64, cy: f64, font: u32, tick_font: u32) {
    if plot.show_x_axis && !plot.x_label.is_empty() {
        let _ = write!(
            out,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="{}">{}</text>"#,
            cx,
            plot.height as f64 - 4.0,
            tick_font.max(font.saturating_sub(1)),
            escape_html(&plot.x_label)
        );
    }

    if plot.show_y_axis && !plot.y_label.is_empty() {
        let _ = write!(
            out,
            r#"<text x="{x:.2}" y="{cy:.2}" transform="rotate(-90 {x:.2} {cy:.2})" text-anchor="middle" font-size="{}">{}</text>"#,
            tick_font,
            escape_html(&plot.y_label),
            x = 10.0 + tick_font as f64 / 2.0,
            cy = cy
        );
    }
}
