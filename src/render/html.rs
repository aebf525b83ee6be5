//! HTML document generation

use super::{escape_html, svg, Resources};
use crate::layout::{Document, Margin, Node, Size};
use crate::plot::{colormap, PlotSpec};
use std::io::{self, Write};

const D3_URL: &str = "https://d3js.org/d3.v7.min.js";
const KATEX_CSS_URL: &str = "https://cdn.jsdelivr.net/npm/katex@0.16.11/dist/katex.min.css";
const KATEX_JS_URL: &str = "https://cdn.jsdelivr.net/npm/katex@0.16.11/dist/katex.min.js";

pub fn write<W: Write>(writer: &mut W, doc: &Document, resources: Resources) -> io::Result<()> {
    let mut body = Body::new(resources);
    body.node(&doc.root);

    let d3_script = match resources {
        Resources::Cdn if !body.plots.is_empty() => format!(r#"<script src="{}"></script>"#, D3_URL),
        _ => String::new(),
    };

    // Inline pages keep the MathML; CDN pages re-typeset it with KaTeX
    let has_math = body.out.contains(r#"class="td-math"#);
    let (katex_head, math_script) = match resources {
        Resources::Cdn if has_math => (
            format!(
                r#"<link rel="stylesheet" href="{}">
    <script src="{}"></script>"#,
                KATEX_CSS_URL, KATEX_JS_URL
            ),
            MATH_SCRIPT,
        ),
        _ => (String::new(), ""),
    };

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="talkdeck">
    <title>{title}</title>
    {d3_script}
    {katex_head}
    <style>
        :root {{
            --bg: #ffffff;
            --text: #1f2328;
            --dim: #656d76;
            --border: #d0d7de;
            --accent: #0969da;
            --tab-bg: #f6f8fa;
        }}
        * {{ box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.45;
            margin: 0;
            padding: 8px;
        }}
        a {{ color: var(--accent); }}
        img, video, object {{ max-width: 100%; }}

        /* Layout */
        .td-row {{ display: flex; flex-direction: row; flex-wrap: nowrap; align-items: flex-start; }}
        .td-column {{ display: flex; flex-direction: column; }}
        .td-markdown, .td-html, .td-plot {{ margin: 5px 10px; overflow-wrap: break-word; }}
        .td-markdown h1, .td-markdown h2, .td-markdown h3, .td-markdown h4 {{ margin: 0.3em 0; }}
        .td-markdown table {{ border-collapse: collapse; }}
        .td-markdown th, .td-markdown td {{ border: 1px solid var(--border); padding: 4px 8px; }}
        .td-markdown pre {{ background: var(--tab-bg); padding: 8px; overflow-x: auto; }}

        /* Math */
        .td-math-display {{ display: block; text-align: center; margin: 0.5em 0; }}
        .td-latex {{ white-space: pre-wrap; }}

        /* Tabs */
        .td-tab-bar {{
            display: flex;
            flex-wrap: wrap;
            border-bottom: 1px solid var(--border);
        }}
        .td-tab {{
            background: none;
            border: 1px solid transparent;
            border-bottom: none;
            border-radius: 6px 6px 0 0;
            color: var(--dim);
            cursor: pointer;
            font: inherit;
            padding: 6px 14px;
            margin-bottom: -1px;
        }}
        .td-tab:hover {{ color: var(--text); }}
        .td-tab.active {{
            background: var(--bg);
            border-color: var(--border);
            color: var(--text);
            font-weight: 600;
        }}
        .td-tab-panel {{ display: none; }}
        .td-tab-panel.active {{ display: block; }}

        /* Plots */
        .td-svg text {{ fill: var(--text); font-family: inherit; }}
        .td-svg rect:hover {{ fill-opacity: 0.7; }}
        .td-tooltip {{
            position: fixed;
            pointer-events: none;
            background: rgba(31,35,40,0.9);
            color: #fff;
            border-radius: 4px;
            padding: 4px 8px;
            font-size: 12px;
            display: none;
            z-index: 10;
        }}
    </style>
</head>
<body>
{body}
<script>
    document.querySelectorAll('.td-tab').forEach(function (tab) {{
        tab.addEventListener('click', function () {{
            const group = tab.closest('.td-tabs');
            group.querySelectorAll(':scope > .td-tab-bar > .td-tab').forEach(function (t) {{
                t.classList.toggle('active', t === tab);
            }});
            group.querySelectorAll(':scope > .td-tab-panel').forEach(function (p) {{
                p.classList.toggle('active', p.id === tab.dataset.tab);
            }});
        }});
    }});
</script>
{plot_script}
{math_script}
</body>
</html>
"#,
        title = escape_html(&doc.title),
        d3_script = d3_script,
        katex_head = katex_head,
        math_script = math_script,
        body = body.out,
        plot_script = body.plot_script(),
    )?;

    Ok(())
}

const MATH_SCRIPT: &str = r#"<script>
    document.querySelectorAll('.td-math').forEach(function (el) {
        katex.render(el.dataset.tex, el, {
            displayMode: el.classList.contains('td-math-display'),
            throwOnError: false
        });
    });
</script>"#;

/// Walks the tree, emitting markup and collecting plots for the D3 script
struct Body {
    resources: Resources,
    out: String,
    next_id: usize,
    /// `(element id, plot json)` for CDN rendering
    plots: Vec<(String, String)>,
}

impl Body {
    fn new(resources: Resources) -> Self {
        Self { resources, out: String::new(), next_id: 0, plots: Vec::new() }
    }

    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Markdown { html, size, margin } => {
                self.open("td-markdown", *size, *margin, true);
                self.out.push_str(html);
                self.out.push_str("</div>\n");
            }
            Node::Html { html, size, margin } => {
                self.open("td-html", *size, *margin, false);
                self.out.push_str(html);
                self.out.push_str("</div>\n");
            }
            Node::Plot { plot, margin } => self.plot(plot, *margin),
            Node::Row { children, size, margin } => {
                self.open("td-row", *size, *margin, true);
                for child in children {
                    self.node(child);
                }
                self.out.push_str("</div>\n");
            }
            Node::Column { children, size, margin } => {
                self.open("td-column", *size, *margin, true);
                for child in children {
                    self.node(child);
                }
                self.out.push_str("</div>\n");
            }
            Node::Tabs { tabs, size, margin } => self.tabs(tabs, *size, *margin),
            Node::Spacer { size } => {
                self.open("td-spacer", *size, None, false);
                self.out.push_str("</div>\n");
            }
        }
    }

    fn tabs(&mut self, tabs: &[(String, Node)], size: Size, margin: Option<Margin>) {
        let group = self.id("tabs");
        let ids: Vec<String> = (0..tabs.len()).map(|i| format!("{}-{}", group, i)).collect();

        self.open("td-tabs", size, margin, true);
        self.out.push_str(r#"<div class="td-tab-bar">"#);
        for (i, (title, _)) in tabs.iter().enumerate() {
            self.out.push_str(&format!(
                r#"<button class="td-tab{}" data-tab="{}">{}</button>"#,
                if i == 0 { " active" } else { "" },
                ids[i],
                escape_html(title)
            ));
        }
        self.out.push_str("</div>\n");

        for (i, (_, child)) in tabs.iter().enumerate() {
            self.out.push_str(&format!(
                r#"<div class="td-tab-panel{}" id="{}">"#,
                if i == 0 { " active" } else { "" },
                ids[i]
            ));
            self.out.push('\n');
            self.node(child);
            self.out.push_str("</div>\n");
        }
        self.out.push_str("</div>\n");
    }

    fn plot(&mut self, plot: &PlotSpec, margin: Option<Margin>) {
        let size = Size::fixed(plot.width, plot.height);
        match self.resources {
            Resources::Inline => {
                self.open("td-plot", size, margin, false);
                self.out.push_str(&svg::render(plot));
                self.out.push_str("</div>\n");
            }
            Resources::Cdn => {
                let id = self.id("plot");
                self.out.push_str(&format!(r#"<div class="td-plot" id="{}" style="{}"></div>"#, id, style(size, margin, false)));
                self.out.push('\n');
                let json = serde_json::to_string(plot).unwrap_or_else(|_| "null".to_string());
                self.plots.push((id, json));
            }
        }
    }

    /// Open a `<div>`; `grow` uses min-height so text is never clipped
    fn open(&mut self, class: &str, size: Size, margin: Option<Margin>, grow: bool) {
        let style = style(size, margin, grow);
        if style.is_empty() {
            self.out.push_str(&format!(r#"<div class="{}">"#, class));
        } else {
            self.out.push_str(&format!(r#"<div class="{}" style="{}">"#, class, style));
        }
    }

    fn plot_script(&self) -> String {
        if self.plots.is_empty() {
            return String::new();
        }

        let entries: Vec<String> = self
            .plots
            .iter()
            .map(|(id, json)| format!(r#"{{"id": "{}", "spec": {}}}"#, id, script_safe(json)))
            .collect();

        format!(r#"<div class="td-tooltip" id="td-tooltip"></div>
<script>
    const plots = [{entries}];
    const colormaps = {colormaps};

    const tooltip = document.getElementById('td-tooltip');
    function showTooltip(event, text) {{
        tooltip.textContent = text;
        tooltip.style.display = 'block';
        tooltip.style.left = (event.clientX + 12) + 'px';
        tooltip.style.top = (event.clientY + 12) + 'px';
    }}
    function hideTooltip() {{ tooltip.style.display = 'none'; }}
    function hover(label, value) {{ return label ? label + ' ' + value : value; }}

    function widen(lo, hi) {{
        if (!Number.isFinite(lo) || !Number.isFinite(hi)) return [0, 1];
        return lo === hi ? [lo - 0.5, hi + 0.5] : [lo, hi];
    }}

    function xExtent(spec) {{
        let lo = Infinity, hi = -Infinity;
        const see = v => {{ if (Number.isFinite(v)) {{ lo = Math.min(lo, v); hi = Math.max(hi, v); }} }};
        spec.layers.forEach(l => {{
            if (l.kind === 'bars') l.bars.forEach(b => {{ see(b.left); see(b.right); }});
            else if (l.kind === 'spikes') l.positions.forEach(see);
            else if (l.kind === 'curve' || l.kind === 'points') l.points.forEach(p => see(p.x));
        }});
        spec.x_ticks.forEach(t => see(t.value));
        return widen(lo, hi);
    }}

    function yExtent(spec) {{
        if (spec.y_range) return widen(spec.y_range[0], spec.y_range[1]);
        let lo = 0, hi = 0;
        spec.layers.forEach(l => {{
            if (l.kind === 'bars') l.bars.forEach(b => {{ if (Number.isFinite(b.value)) hi = Math.max(hi, b.value); }});
            else if (l.kind === 'curve' || l.kind === 'points') l.points.forEach(p => {{
                if (Number.isFinite(p.y)) {{ lo = Math.min(lo, p.y); hi = Math.max(hi, p.y); }}
            }});
        }});
        return widen(lo, hi);
    }}

    function colormap(name) {{
        return colormaps[(name || '').toLowerCase()] || colormaps.viridis;
    }}

    function finite(points) {{
        return points.filter(p => Number.isFinite(p.x) && Number.isFinite(p.y));
    }}

    function drawLayers(svg, spec, font) {{
        const margin = {{ top: 25, right: 10, bottom: 38, left: 45 }};
        const width = Math.max(spec.width - margin.left - margin.right, 10);
        const height = Math.max(spec.height - margin.top - margin.bottom, 10);
        const g = svg.append('g').attr('transform', `translate(${{margin.left}},${{margin.top}})`);

        const x = d3.scaleLinear().domain(xExtent(spec)).range([0, width]);
        const y = d3.scaleLinear().domain(yExtent(spec)).range([height, 0]).clamp(true);
        const base = y.domain()[0];

        spec.layers.forEach(layer => {{
            if (layer.kind === 'bars') {{
                g.selectAll(null).data(layer.bars).enter().append('rect')
                    .attr('x', b => x(b.left))
                    .attr('width', b => Math.max(x(b.right) - x(b.left), 0))
                    .attr('y', b => y(Math.max(b.value, base)))
                    .attr('height', b => Math.max(y(base) - y(Math.max(b.value, base)), 0))
                    .attr('fill', layer.color)
                    .attr('fill-opacity', layer.alpha)
                    .attr('stroke', 'white')
                    .attr('stroke-width', 0.5)
                    .on('mousemove', (event, b) => showTooltip(event, `${{b.left}} – ${{b.right}}: ` + hover(layer.label, d3.format('~g')(b.value))))
                    .on('mouseout', hideTooltip);
            }} else if (layer.kind === 'spikes') {{
                g.selectAll(null).data(layer.positions).enter().append('line')
                    .attr('x1', p => x(p)).attr('x2', p => x(p))
                    .attr('y1', height).attr('y2', height - layer.length)
                    .attr('stroke', layer.color)
                    .attr('stroke-width', 2)
                    .on('mousemove', (event, p) => showTooltip(event, hover(layer.label, d3.format('.2f')(p))))
                    .on('mouseout', hideTooltip);
            }} else if (layer.kind === 'curve') {{
                g.append('path').datum(finite(layer.points))
                    .attr('d', d3.line().x(p => x(p.x)).y(p => y(p.y)))
                    .attr('fill', 'none')
                    .attr('stroke', layer.color)
                    .attr('stroke-width', layer.width)
                    .on('mousemove', event => showTooltip(event, layer.label))
                    .on('mouseout', hideTooltip);
            }} else if (layer.kind === 'points') {{
                g.selectAll(null).data(finite(layer.points)).enter().append('circle')
                    .attr('cx', p => x(p.x)).attr('cy', p => y(p.y))
                    .attr('r', layer.size)
                    .attr('fill', layer.color)
                    .on('mousemove', (event, p) => showTooltip(event, hover(layer.label, `${{d3.format('~g')(p.x)}}, ${{d3.format('~g')(p.y)}}`)))
                    .on('mouseout', hideTooltip);
            }}
        }});

        const tickFont = Math.max(font - 2, 6) + 'px';
        if (spec.show_x_axis) {{
            const xAxis = d3.axisBottom(x);
            if (spec.x_ticks.length) {{
                const labels = new Map(spec.x_ticks.map(t => [t.value, t.label]));
                xAxis.tickValues(spec.x_ticks.map(t => t.value)).tickFormat(v => labels.get(v));
            }} else {{
                xAxis.ticks(5);
            }}
            g.append('g').attr('transform', `translate(0,${{height}})`).call(xAxis)
                .selectAll('text').style('font-size', tickFont);
        }}
        if (spec.show_y_axis) {{
            g.append('g').call(d3.axisLeft(y).ticks(4))
                .selectAll('text').style('font-size', tickFont);
        }}
        return {{ margin, width, height }};
    }}

    function drawHeatMap(svg, spec, font) {{
        const heat = spec.layers.filter(l => l.kind === 'heat_map');
        const xs = [...new Set(heat.flatMap(l => l.cells.map(c => c.x)))];
        const ys = [...new Set(heat.flatMap(l => l.cells.map(c => c.y)))];
        const zs = heat.flatMap(l => l.cells.map(c => c.z)).filter(Number.isFinite);
        const [z0, z1] = zs.length ? widen(d3.min(zs), d3.max(zs)) : [0, 1];
        const bar = heat.find(l => l.colorbar);

        const margin = {{ top: 25, right: 10 + (bar ? 60 : 0), bottom: 38, left: 45 }};
        const width = Math.max(spec.width - margin.left - margin.right, 10);
        const height = Math.max(spec.height - margin.top - margin.bottom, 10);
        const g = svg.append('g').attr('transform', `translate(${{margin.left}},${{margin.top}})`);

        // First category at the bottom
        const x = d3.scaleBand().domain(xs).range([0, width]);
        const y = d3.scaleBand().domain(ys).range([height, 0]);

        heat.forEach(layer => {{
            const color = d3.scaleSequential().domain([z0, z1])
                .interpolator(d3.piecewise(d3.interpolateRgb, colormap(layer.cmap)));
            g.selectAll(null).data(layer.cells.filter(c => Number.isFinite(c.z))).enter().append('rect')
                .attr('x', c => x(c.x)).attr('y', c => y(c.y))
                .attr('width', x.bandwidth()).attr('height', y.bandwidth())
                .attr('fill', c => color(c.z))
                .on('mousemove', (event, c) => showTooltip(event, `${{c.x}}, ${{c.y}}: ` + hover(layer.label, d3.format('~g')(c.z))))
                .on('mouseout', hideTooltip);
        }});

        const every = n => Math.max(Math.ceil(n / 30), 1);
        const tickFont = Math.max(font - 2, 6) + 'px';
        if (spec.show_x_axis) {{
            g.append('g').attr('transform', `translate(0,${{height}})`)
                .call(d3.axisBottom(x).tickValues(xs.filter((_, i) => i % every(xs.length) === 0)))
                .selectAll('text').style('font-size', tickFont)
                .attr('transform', 'rotate(-90)').attr('text-anchor', 'end').attr('dx', '-0.6em').attr('dy', '-0.3em');
        }}
        if (spec.show_y_axis) {{
            g.append('g').call(d3.axisLeft(y).tickValues(ys.filter((_, i) => i % every(ys.length) === 0)))
                .selectAll('text').style('font-size', tickFont);
        }}

        if (bar) {{
            const stops = colormap(bar.cmap);
            const id = 'td-cmap-' + (bar.cmap || 'viridis').toLowerCase().replace(/[^a-z0-9]/g, '-');
            const gradient = svg.append('defs').append('linearGradient')
                .attr('id', id).attr('x1', 0).attr('y1', 1).attr('x2', 0).attr('y2', 0);
            stops.forEach((c, i) => gradient.append('stop')
                .attr('offset', stops.length > 1 ? i / (stops.length - 1) : 0).attr('stop-color', c));
            const left = width + 12;
            g.append('rect').attr('class', 'td-colorbar').attr('x', left).attr('y', 0)
                .attr('width', 12).attr('height', height)
                .attr('fill', `url(#${{id}})`).attr('stroke', '#444').attr('stroke-width', 0.5);
            g.append('g').attr('transform', `translate(${{left + 12}},0)`)
                .call(d3.axisRight(d3.scaleLinear().domain([z0, z1]).range([height, 0])).ticks(4))
                .selectAll('text').style('font-size', tickFont);
        }}
        return {{ margin, width, height }};
    }}

    function drawPlot(id, spec) {{
        const font = spec.font_size || 12;
        const svg = d3.select('#' + id).append('svg')
            .attr('class', 'td-svg')
            .attr('width', spec.width)
            .attr('height', spec.height);

        const heatMap = spec.layers.some(l => l.kind === 'heat_map');
        const {{ margin, width, height }} = heatMap ? drawHeatMap(svg, spec, font) : drawLayers(svg, spec, font);

        if (spec.title) {{
            svg.append('text').attr('x', spec.width / 2).attr('y', margin.top - 8)
                .attr('text-anchor', 'middle').style('font-size', font + 'px').style('font-weight', 600)
                .text(spec.title);
        }}
        if (spec.show_x_axis && spec.x_label) {{
            svg.append('text').attr('x', margin.left + width / 2).attr('y', spec.height - 4)
                .attr('text-anchor', 'middle').style('font-size', Math.max(font - 1, 6) + 'px')
                .text(spec.x_label);
        }}
        if (spec.show_y_axis && spec.y_label) {{
            svg.append('text').attr('transform', `translate(12,${{margin.top + height / 2}}) rotate(-90)`)
                .attr('text-anchor', 'middle').style('font-size', Math.max(font - 2, 6) + 'px')
                .text(spec.y_label);
        }}
    }}

    plots.forEach(p => drawPlot(p.id, p.spec));
</script>"#,
            entries = entries.join(", "),
            colormaps = script_safe(&colormap::to_json())
        )
    }
}

/// Inline CSS for a sized element
fn style(size: Size, margin: Option<Margin>, grow: bool) -> String {
    let mut parts = Vec::new();
    if let Some(w) = size.width {
        parts.push(format!("width: {}px", w));
    }
    if let Some(h) = size.height {
        if grow {
            parts.push(format!("min-height: {}px", h));
        } else {
            parts.push(format!("height: {}px", h));
        }
    }
    if let Some((t, r, b, l)) = margin {
        parts.push(format!("margin: {}px {}px {}px {}px", t, r, b, l));
    }
    parts.join("; ")
}

/// Keep embedded JSON from closing the surrounding `<script>`
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}
