//! Markdown rendering and template substitution
//!
//! Slide text goes through three passes, in this order:
//!
//! 1. `{{name}}` placeholders are filled from the deck's `vars`
//! 2. `[n]` citations are linked (see [`crate::references`])
//! 3. the result is rendered to HTML with CommonMark plus tables
//!
//! Raw HTML inside markdown (colored `<span>`s, `<br>`, links produced by
//! step 2) passes through untouched.
//!
//! ## Math
//!
//! `$…$` and `$$…$$` in markdown are equations, as is the older
//! `~~~tex~~~` / `~~~tex$size~~~` form where `size` is a font size in px.
//! Each becomes a `<span class="td-math">` holding MathML, with the TeX
//! source kept in `data-tex` so the CDN build can re-typeset it with KaTeX.
//! TeX that cannot be converted is shown as code and logged.

use crate::error::{DeckError, Result};
use crate::render::escape_html;
use latex2mathml::{latex_to_mathml, DisplayStyle};
use log::warn;
use pulldown_cmark::{html, CowStr, Event, Options, Parser};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Font size of `~~~tex~~~` equations without an explicit size
pub const DEFAULT_EQUATION_SIZE: u32 = 11;

// Private-use code points bracket the index of a pre-rendered equation
const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid var regex"))
}

fn equation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"~~~(.*?)~~~").expect("valid equation regex"))
}

fn slot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("\u{E000}(\\d+)\u{E001}").expect("valid slot regex"))
}

fn latex_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\$\$(.+?)\$\$|\\\[(.+?)\\\]|\$(.+?)\$|\\\((.+?)\\\)").expect("valid latex regex")
    })
}

/// Fill `{{name}}` placeholders from `vars`
pub fn substitute_vars(text: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut unknown = None;

    let out = var_pattern().replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match vars.get(name) {
            Some(value) => value.clone(),
            None => {
                unknown.get_or_insert_with(|| name.to_string());
                caps[0].to_string()
            }
        }
    });

    match unknown {
        Some(name) => Err(DeckError::UnknownVar(name)),
        None => Ok(out.into_owned()),
    }
}

/// Render markdown to an HTML fragment
pub fn to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_MATH);

    // `~~~…~~~` equations are rendered up front and parked in slots, so the
    // markdown pass never sees their TeX
    let mut equations = Vec::new();
    let text = equation_pattern().replace_all(text, |caps: &Captures| {
        let (tex, size) = split_size(&caps[1]);
        equations.push(math_html(tex, false, Some(size)));
        format!("{}{}{}", SLOT_OPEN, equations.len() - 1, SLOT_CLOSE)
    });

    let parser = Parser::new_ext(&text, options).map(|event| match event {
        Event::InlineMath(tex) => Event::InlineHtml(CowStr::from(math_html(&tex, false, None))),
        Event::DisplayMath(tex) => Event::InlineHtml(CowStr::from(math_html(&tex, true, None))),
        other => other,
    });
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);

    if equations.is_empty() {
        return out;
    }
    slot_pattern()
        .replace_all(&out, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| equations.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// `E=mc^2$14` → (`E=mc^2`, 14). A missing or unreadable size falls back to
/// [`DEFAULT_EQUATION_SIZE`].
fn split_size(body: &str) -> (&str, u32) {
    match body.rsplit_once('$') {
        Some((tex, size)) => match size.trim().parse() {
            Ok(size) => (tex, size),
            Err(_) => {
                warn!("Bad equation size '{}', using {}", size, DEFAULT_EQUATION_SIZE);
                (tex, DEFAULT_EQUATION_SIZE)
            }
        },
        None => (body, DEFAULT_EQUATION_SIZE),
    }
}

/// One equation as MathML, wrapped so the page can find it again
pub fn math_html(tex: &str, display: bool, size: Option<u32>) -> String {
    let tex = tex.trim();
    let style = if display { DisplayStyle::Block } else { DisplayStyle::Inline };
    let body = match latex_to_mathml(tex, style) {
        Ok(mathml) => mathml,
        Err(e) => {
            warn!("Could not convert LaTeX '{}': {}", tex, e);
            format!("<code>{}</code>", escape_html(tex))
        }
    };

    let class = if display { "td-math td-math-display" } else { "td-math" };
    let style = size.map(|px| format!(r#" style="font-size: {}px""#, px)).unwrap_or_default();
    format!(r#"<span class="{}" data-tex="{}"{}>{}</span>"#, class, escape_html(tex), style, body)
}

/// A LaTeX text block: prose with `$…$`, `$$…$$`, `\(…\)` or `\[…\]` math.
/// Everything outside the delimiters is plain text, not markdown.
pub fn latex_to_html(text: &str, size: Option<u32>) -> String {
    let mut out = String::from(r#"<div class="td-latex""#);
    if let Some(px) = size {
        out.push_str(&format!(r#" style="font-size: {}px""#, px));
    }
    out.push('>');

    let mut last = 0;
    for caps in latex_pattern().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&escape_html(&text[last..whole.start()]));
        let (tex, display) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(m), _, _, _) | (_, Some(m), _, _) => (m.as_str(), true),
            (_, _, Some(m), _) | (_, _, _, Some(m)) => (m.as_str(), false),
            _ => continue,
        };
        out.push_str(&math_html(tex, display, None));
        last = whole.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out.push_str("</div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<String, String> {
        let mut v = BTreeMap::new();
        v.insert("publish_url".to_string(), "https://example.org/deck.html".to_string());
        v.insert("code_url".to_string(), "https://example.org/code".to_string());
        v
    }

    #[test]
    fn test_substitute_vars() {
        let text = "Accessible [here]({{publish_url}}), code [here]({{ code_url }}).";
        let out = substitute_vars(text, &vars()).unwrap();
        assert_eq!(out, "Accessible [here](https://example.org/deck.html), code [here](https://example.org/code).");
    }

    #[test]
    fn test_substitute_leaves_latex_braces() {
        let text = r"$\frac{a}{b}$ and {single}";
        assert_eq!(substitute_vars(text, &vars()).unwrap(), text);
    }

    #[test]
    fn test_substitute_unknown_var() {
        let err = substitute_vars("{{venue_url}}", &vars()).unwrap_err();
        assert!(matches!(err, DeckError::UnknownVar(ref n) if n == "venue_url"));
    }

    #[test]
    fn test_to_html_headings_and_links() {
        let html = to_html("# Title\n\nBy: ***[Author](https://example.org)***");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains(r#"<a href="https://example.org">Author</a>"#));
    }

    #[test]
    fn test_to_html_passes_raw_html() {
        let html = to_html(r#"### <span style="color:magenta">Summary</span>"#);
        assert!(html.contains(r#"<span style="color:magenta">Summary</span>"#));
    }

    #[test]
    fn test_to_html_tables() {
        let html = to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>2</td>"));
    }

    // ==========================================================================
    // MATH TESTS
    // ==========================================================================

    #[test]
    fn test_dollar_math_is_not_emphasis() {
        let html = to_html("Loss is $a_i * b_i$ per step");
        assert!(html.contains(r#"<span class="td-math" data-tex="a_i * b_i">"#));
        assert!(html.contains("<math"));
        assert!(!html.contains("<em>"));
        assert!(html.starts_with("<p>Loss is "));
    }

    #[test]
    fn test_display_math() {
        let html = to_html("$$\\frac{1}{n}\\sum_i x_i$$");
        assert!(html.contains(r#"class="td-math td-math-display""#));
        assert!(html.contains(r#"data-tex="\frac{1}{n}\sum_i x_i""#));
    }

    #[test]
    fn test_tilde_equations_keep_size() {
        let html = to_html("Rate ~~~\\lambda_i$14~~~ and ~~~x^2~~~ here");
        assert!(html.contains(r#"data-tex="\lambda_i" style="font-size: 14px""#));
        assert!(html.contains(r#"data-tex="x^2" style="font-size: 11px""#));
        assert!(!html.contains('\u{E000}'));
        assert!(!html.contains("~~~"));
    }

    #[test]
    fn test_split_size() {
        assert_eq!(split_size("E=mc^2$14"), ("E=mc^2", 14));
        assert_eq!(split_size("E=mc^2"), ("E=mc^2", DEFAULT_EQUATION_SIZE));
        assert_eq!(split_size("x$big"), ("x", DEFAULT_EQUATION_SIZE));
    }

    #[test]
    fn test_bad_tex_falls_back_to_code() {
        let html = math_html(r"\begin{nosuchenv}x\end{nosuchenv}", false, None);
        assert!(html.contains(r"<code>\begin{nosuchenv}x\end{nosuchenv}</code>"));
        assert!(!html.contains("<math"));
    }

    #[test]
    fn test_latex_block_mixes_text_and_math() {
        let html = latex_to_html("Einstein said $E = MC^2$ & \\(x<y\\)", Some(20));
        assert!(html.starts_with(r#"<div class="td-latex" style="font-size: 20px">Einstein said "#));
        assert!(html.contains(r#"data-tex="E = MC^2""#));
        assert!(html.contains(" &amp; "));
        assert!(html.contains(r#"data-tex="x&lt;y""#));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn test_latex_block_display_forms() {
        let html = latex_to_html("$$a+b$$ then \\[c\\]", None);
        assert_eq!(html.matches("td-math-display").count(), 2);
        assert!(html.starts_with(r#"<div class="td-latex">"#));
    }
}
