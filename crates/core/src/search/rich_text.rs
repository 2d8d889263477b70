//! Result-line highlighting over a small rich-text model
//!
//! A search result line is a sequence of [`Inline`] nodes. Highlighting wraps
//! every occurrence of a query term in a [`Inline::Mark`], descending into
//! links so that they survive, and leaving existing marks untouched.

use crate::search::query::{query_terms, terms_regex};
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inline {
    Text { text: String },
    Link { href: String, children: Vec<Inline> },
    Mark { text: String },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn link(href: impl Into<String>, children: Vec<Inline>) -> Self {
        Self::Link {
            href: href.into(),
            children,
        }
    }

    pub fn mark(text: impl Into<String>) -> Self {
        Self::Mark { text: text.into() }
    }

    fn push_plain(&self, out: &mut String) {
        match self {
            Self::Text { text } | Self::Mark { text } => out.push_str(text),
            Self::Link { children, .. } => children.iter().for_each(|child| child.push_plain(out)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct RichLine(pub Vec<Inline>);

impl RichLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self(vec![Inline::text(text)])
    }

    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        self.0.iter().for_each(|node| node.push_plain(&mut out));
        out
    }

    pub fn marks(&self) -> Vec<&str> {
        fn collect<'a>(nodes: &'a [Inline], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    Inline::Mark { text } => out.push(text),
                    Inline::Link { children, .. } => collect(children, out),
                    Inline::Text { .. } => {}
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.0, &mut out);
        out
    }

    /// Wraps every case-insensitive occurrence of the query's terms.
    pub fn highlight(&self, query: &str) -> RichLine {
        match terms_regex(&query_terms(query)) {
            Some(regex) => RichLine(wrap_nodes(&self.0, &regex)),
            None => self.clone(),
        }
    }
}

fn wrap_nodes(nodes: &[Inline], regex: &Regex) -> Vec<Inline> {
    let mut out = Vec::with_capacity(nodes.len());

    for node in nodes {
        match node {
            Inline::Text { text } => wrap_text(text, regex, &mut out),
            Inline::Link { href, children } => {
                out.push(Inline::link(href.clone(), wrap_nodes(children, regex)))
            }
            Inline::Mark { .. } => out.push(node.clone()),
        }
    }

    out
}

fn wrap_text(text: &str, regex: &Regex, out: &mut Vec<Inline>) {
    let mut cursor = 0;

    for found in regex.find_iter(text) {
        if found.start() == found.end() {
            continue;
        }
        if found.start() > cursor {
            out.push(Inline::text(&text[cursor..found.start()]));
        }
        out.push(Inline::mark(found.as_str()));
        cursor = found.end();
    }

    if cursor < text.len() {
        out.push(Inline::text(&text[cursor..]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_wrapped_case_insensitively() {
        let line = RichLine::plain("The Tyger burning bright, tyger!");
        let highlighted = line.highlight("tyger");

        assert_eq!(
            highlighted.0,
            vec![
                Inline::text("The "),
                Inline::mark("Tyger"),
                Inline::text(" burning bright, "),
                Inline::mark("tyger"),
                Inline::text("!"),
            ]
        );
        assert_eq!(highlighted.to_plain_text(), line.to_plain_text());
    }

    #[test]
    fn quoted_query_highlights_each_term() {
        let highlighted = RichLine::plain("burning bright").highlight("\"bright burning\"");

        assert_eq!(highlighted.marks(), vec!["burning", "bright"]);
    }

    #[test]
    fn links_survive_highlighting() {
        let line = RichLine(vec![
            Inline::text("see "),
            Inline::link("#page-12", vec![Inline::text("Songs of Experience")]),
        ]);

        let highlighted = line.highlight("songs");
        let expected = vec![Inline::mark("Songs"), Inline::text(" of Experience")];

        assert_eq!(highlighted.0[1], Inline::link("#page-12", expected));
    }

    #[test]
    fn highlighting_twice_does_not_nest_marks() {
        let line = RichLine::plain("fearful symmetry");
        let once = line.highlight("symmetry");
        let twice = once.highlight("symmetry");

        assert_eq!(once, twice);
    }

    #[test]
    fn empty_query_leaves_line_alone() {
        let line = RichLine::plain("what the hammer");

        assert_eq!(line.highlight("   "), line);
    }
}
