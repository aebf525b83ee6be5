//! Reference list parsing and citation hyperlinking
//!
//! Decks carry their bibliography as a literal numbered markdown list:
//!
//! ```text
//! ### References
//!
//! 1. The COVID tracking project. Accessed: July 3, 2020: <https://covidtracking.com/>
//! 2. MIDAS, Models of Infectious Disease Agent Study. Online: <https://midasnetwork.us/>
//! ```
//!
//! [`ReferenceMap::parse`] turns it into a lookup from citation number to
//! `(url, text)`, and [`ReferenceMap::link_citations`] rewrites every `[n]`
//! in body text into a link to that URL, with the full reference as hover
//! text. Only one- and two-digit citations are recognized.

use crate::render::escape_html;
use log::{debug, warn};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

fn citation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\d\]|\[\d\d\]").expect("valid citation regex"))
}

/// One bibliography entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// First `<http...>` token of the entry, empty if there was none
    pub url: String,
    /// Entry text with angle brackets removed
    pub text: String,
}

/// Citation number (as written, e.g. `"12"`) to reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReferenceMap {
    entries: BTreeMap<String, Reference>,
}

impl ReferenceMap {
    /// Parse a numbered reference block
    ///
    /// Lines that don't start with `<positive integer>.` are skipped. An
    /// entry without a URL is kept with an empty link and a warning is
    /// logged, since a broken bibliography should not block a talk.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();

        for line in text.lines() {
            let Some((prefix, rest)) = line.split_once('.') else {
                continue;
            };
            let number = match prefix.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => continue,
            };

            let body = rest.trim();
            let url = body
                .split_whitespace()
                .find(|token| token.starts_with("<http") && token.ends_with('>'))
                .map(|token| token[1..token.len() - 1].to_string())
                .unwrap_or_default();

            if url.is_empty() {
                warn!("Check Reference: {}", line);
            }

            let text = body.replace(['<', '>'], "");
            entries.insert(number.to_string(), Reference { url, text });
        }

        Self { entries }
    }

    pub fn get(&self, number: &str) -> Option<&Reference> {
        self.entries.get(number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace each `[n]` with a link to reference `n`
    ///
    /// Citations with no matching entry are left as-is. Callers report them
    /// through [`ReferenceMap::missing_citations`].
    pub fn link_citations(&self, text: &str) -> String {
        citation_pattern()
            .replace_all(text, |caps: &Captures| {
                let cited = &caps[0];
                let number = &cited[1..cited.len() - 1];
                match self.entries.get(number) {
                    Some(reference) => format!(
                        r#"<a href="{}" title="{}" target="_blank">{}</a>"#,
                        escape_html(&reference.url),
                        escape_html(&reference.text),
                        cited
                    ),
                    None => {
                        debug!("Citation {} has no matching reference", cited);
                        cited.to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Citation numbers used in `text` that the map does not define
    pub fn missing_citations(&self, text: &str) -> BTreeSet<String> {
        citation_pattern()
            .find_iter(text)
            .map(|m| {
                let cited = m.as_str();
                cited[1..cited.len() - 1].to_string()
            })
            .filter(|n| !self.entries.contains_key(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCES: &str = "### References

1. The COVID tracking project at the Atlantic. (2020). Accessed: July 3, 2020: <https://covidtracking.com/>

2. MIDAS, Models of Infectious Disease Agent Study. Online: <https://midasnetwork.us/>

5. Barhak J , The Reference Model. Cureus.  <http://dx.doi.org/10.7759/cureus.9455> , Online: <https://www.cureus.com/articles/36677>

12. A reference that was never given a link

27. Last one <https://example.org/27>
";

    // ==========================================================================
    // PARSING TESTS
    // ==========================================================================

    #[test]
    fn test_parse_numbers_and_urls() {
        let refs = ReferenceMap::parse(REFERENCES);

        assert_eq!(refs.len(), 5);
        assert_eq!(refs.get("1").unwrap().url, "https://covidtracking.com/");
        assert_eq!(refs.get("2").unwrap().url, "https://midasnetwork.us/");
        assert_eq!(refs.get("27").unwrap().url, "https://example.org/27");
    }

    #[test]
    fn test_parse_takes_first_url() {
        let refs = ReferenceMap::parse(REFERENCES);
        assert_eq!(refs.get("5").unwrap().url, "http://dx.doi.org/10.7759/cureus.9455");
    }

    #[test]
    fn test_parse_strips_angle_brackets_from_text() {
        let refs = ReferenceMap::parse(REFERENCES);
        let text = &refs.get("2").unwrap().text;
        assert_eq!(text, "MIDAS, Models of Infectious Disease Agent Study. Online: https://midasnetwork.us/");
    }

    #[test]
    fn test_parse_missing_url_is_not_fatal() {
        let refs = ReferenceMap::parse(REFERENCES);
        let entry = refs.get("12").unwrap();
        assert_eq!(entry.url, "");
        assert_eq!(entry.text, "A reference that was never given a link");
    }

    #[test]
    fn test_parse_ignores_non_numbered_lines() {
        let refs = ReferenceMap::parse("### References\nSee also. Other things\n0. zero is not a number here\n");
        assert!(refs.is_empty());
    }

    // ==========================================================================
    // LINKING TESTS
    // ==========================================================================
    //
    // Every [n] with n < 100 must link to the URL parsed from line n.
    // ==========================================================================

    #[test]
    fn test_link_every_citation() {
        let refs = ReferenceMap::parse(REFERENCES);
        let body = "Data from [1] and [2], modeled as in [5][27].";
        let linked = refs.link_citations(body);

        for (n, url) in [("1", "https://covidtracking.com/"), ("2", "https://midasnetwork.us/"), ("27", "https://example.org/27")] {
            let anchor = format!(r#"<a href="{}""#, url);
            assert!(linked.contains(&anchor), "missing link for [{}]", n);
            assert!(linked.contains(&format!(r#"target="_blank">[{}]</a>"#, n)));
        }
        assert!(linked.contains(r#"<a href="http://dx.doi.org/10.7759/cureus.9455""#));
    }

    #[test]
    fn test_link_three_digit_citation_untouched() {
        let refs = ReferenceMap::parse("100. Far away <https://example.org/100>\n");
        assert_eq!(refs.link_citations("see [100]"), "see [100]");
    }

    #[test]
    fn test_link_unknown_citation_left_as_text() {
        let refs = ReferenceMap::parse(REFERENCES);
        assert_eq!(refs.link_citations("see [9]"), "see [9]");
    }

    #[test]
    fn test_link_escapes_title() {
        let refs = ReferenceMap::parse("3. \"Quoted\" title & more <https://example.org/3>\n");
        let linked = refs.link_citations("[3]");
        assert!(linked.contains(r#"title="&quot;Quoted&quot; title &amp; more https://example.org/3""#));
    }

    #[test]
    fn test_missing_citations() {
        let refs = ReferenceMap::parse(REFERENCES);
        let missing = refs.missing_citations("[1] [3] [44] [3]");
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["3".to_string(), "44".to_string()]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let refs = ReferenceMap::parse("1. One <https://one.org>\n");
        let json = serde_json::to_string(&refs).unwrap();
        assert_eq!(json, r#"{"1":{"url":"https://one.org","text":"One https://one.org"}}"#);
    }
}
