//! Search match highlighting over rendered text nodes
//!
//! A match inside a span is located by character offsets. The offsets are
//! turned into fractions of the span's length and laid over the span's
//! projected rectangle. This assumes every character in a span is equally
//! wide, so highlights on proportional fonts are approximate.

use crate::model::SpanKey;
use crate::search::query::SearchPattern;
use crate::text_layer::TextNode;
use scanview_scheduler::Debouncer;
use serde::Serialize;
use std::time::Duration;
use viewer_core::Rect;

pub type HighlightId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRect {
    pub key: SpanKey,
    pub rect: Rect,
}

/// Sub-rectangles of every match of `pattern`, in reading order.
pub fn compute_match_rects(pattern: &SearchPattern, nodes: &[TextNode]) -> Vec<MatchRect> {
    let mut matches = Vec::new();

    for node in nodes {
        let total = node.text.chars().count();
        if total == 0 {
            continue;
        }

        for range in pattern.find_char_ranges(&node.text) {
            let start = range.start as f32 / total as f32;
            let length = range.len() as f32 / total as f32;
            matches.push(MatchRect {
                key: node.key,
                rect: Rect::new(
                    node.rect.x + node.rect.width * start,
                    node.rect.y,
                    node.rect.width * length,
                    node.rect.height,
                ),
            });
        }
    }

    matches
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightElement {
    pub id: HighlightId,
    pub key: SpanKey,
    pub rect: Rect,
}

/// Changes to apply to the rendered highlight elements.
///
/// `retired` must be removed before `added` is inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightUpdate {
    pub retired: Vec<HighlightId>,
    pub added: Vec<HighlightElement>,
}

impl HighlightUpdate {
    pub fn first_match(&self) -> Option<Rect> {
        self.added.first().map(|element| element.rect)
    }
}

/// Highlight elements of one page surface
#[derive(Debug, Clone)]
pub struct HighlightLayer {
    debouncer: Debouncer,
    pattern: Option<SearchPattern>,
    query: String,
    active: Vec<HighlightElement>,
    next_id: HighlightId,
}

impl HighlightLayer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(debounce),
            pattern: None,
            query: String::new(),
            active: Vec::new(),
            next_id: 1,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn active(&self) -> &[HighlightElement] {
        &self.active
    }

    pub fn match_rects(&self) -> Vec<Rect> {
        self.active.iter().map(|element| element.rect).collect()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.debouncer.deadline()
    }

    /// Change the query. Recomputation happens after the quiet period.
    pub fn set_query(&mut self, query: &str, now: Duration) {
        if query == self.query {
            return;
        }

        self.query = query.to_string();
        self.pattern = SearchPattern::compile(query);
        self.debouncer.trigger(now);
    }

    /// The text or its rendered size changed.
    pub fn invalidate(&mut self, now: Duration) {
        self.debouncer.trigger(now);
    }

    /// Recompute if the quiet period has elapsed.
    pub fn poll(&mut self, now: Duration, nodes: &[TextNode]) -> Option<HighlightUpdate> {
        self.debouncer.fire(now).then(|| self.recompute(nodes))
    }

    /// Retire every current element and compute a fresh set.
    pub fn recompute(&mut self, nodes: &[TextNode]) -> HighlightUpdate {
        self.debouncer.cancel();
        let retired = self.retire_all();

        let matches = match &self.pattern {
            Some(pattern) => compute_match_rects(pattern, nodes),
            None => Vec::new(),
        };

        for found in matches {
            let id = self.next_id;
            self.next_id += 1;
            self.active.push(HighlightElement {
                id,
                key: found.key,
                rect: found.rect,
            });
        }

        if !self.query.is_empty() {
            log::debug!("query {:?}: {} highlight(s)", self.query, self.active.len());
        }

        HighlightUpdate {
            retired,
            added: self.active.clone(),
        }
    }

    pub fn clear(&mut self) -> Vec<HighlightId> {
        self.debouncer.cancel();
        self.query.clear();
        self.pattern = None;
        self.retire_all()
    }

    fn retire_all(&mut self) -> Vec<HighlightId> {
        self.active.drain(..).map(|element| element.id).collect()
    }
}
