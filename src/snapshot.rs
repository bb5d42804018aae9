use scraper::Html;
use serde::{Deserialize, Serialize};

/// Rendered layout numbers for one leaf text node, captured from the live
/// tab. Entries are listed in document order and aligned to parsed leaves by
/// trimmed text plus occurrence index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafMetrics {
    pub text: String,
    pub font_size: f64,
    pub font_weight: u32,
    pub area: f64,
    pub visible: bool,
    pub line_through: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsOverlay {
    entries: Vec<LeafMetrics>,
}

impl MetricsOverlay {
    pub fn new(entries: Vec<LeafMetrics>) -> Self {
        MetricsOverlay { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The nth overlay entry carrying this trimmed text, in document order.
    pub fn lookup(&self, text: &str, occurrence: usize) -> Option<&LeafMetrics> {
        self.entries.iter().filter(|e| e.text == text).nth(occurrence)
    }
}

/// One client-side state object read off the page, e.g. `runParams`.
#[derive(Debug, Clone)]
pub struct StateBlob {
    pub name: String,
    pub value: serde_json::Value,
}

/// Everything a resolution pass needs from the page, captured at one point
/// in time. Candidate collection never touches the live tab, so a snapshot
/// built from a plain HTML string behaves identically in tests.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    html: String,
    state: Vec<StateBlob>,
    overlay: MetricsOverlay,
}

impl PageSnapshot {
    pub fn from_html(html: impl Into<String>) -> Self {
        PageSnapshot {
            html: html.into(),
            state: Vec::new(),
            overlay: MetricsOverlay::default(),
        }
    }

    pub fn with_state(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.state.push(StateBlob {
            name: name.into(),
            value,
        });
        self
    }

    pub fn with_overlay(mut self, overlay: MetricsOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Parse the captured HTML. Parsing is cheap relative to capture and a
    /// pass parses once, so the snapshot does not cache the document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn state_blobs(&self) -> &[StateBlob] {
        &self.state
    }

    pub fn overlay(&self) -> &MetricsOverlay {
        &self.overlay
    }
}
