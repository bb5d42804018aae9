use scraper::{ElementRef, Html, Selector};

use crate::extract::first_match;

/// Where a probe reads its value from.
#[derive(Debug, Clone, Copy)]
pub enum ProbeValue {
    Text,
    Attr(&'static str),
}

/// One selector/value probe in an ordered fallback list.
#[derive(Debug, Clone, Copy)]
pub struct FieldProbe {
    pub selector: &'static str,
    pub value: ProbeValue,
}

const TITLE_PROBES: &[FieldProbe] = &[
    FieldProbe {
        selector: r#"[data-pl="product-title"]"#,
        value: ProbeValue::Text,
    },
    FieldProbe {
        selector: r#"h1[class*="title"]"#,
        value: ProbeValue::Text,
    },
    FieldProbe {
        selector: "h1",
        value: ProbeValue::Text,
    },
];

const DESCRIPTION_PROBES: &[FieldProbe] = &[
    FieldProbe {
        selector: r#"[data-pl="product-description"]"#,
        value: ProbeValue::Text,
    },
    FieldProbe {
        selector: r#"meta[name="description"]"#,
        value: ProbeValue::Attr("content"),
    },
];

/// Ordered fallback through the shared first-match combinator: the first
/// probe yielding a non-empty trimmed value wins. These fields rarely have
/// ambiguous duplicates, so no scoring.
pub fn resolve_field(doc: &Html, probes: &[FieldProbe]) -> String {
    let strategies = probes.iter().map(|probe| move || run_probe(doc, probe));
    first_match(strategies, |value: &String| !value.is_empty()).unwrap_or_default()
}

fn run_probe(doc: &Html, probe: &FieldProbe) -> Option<String> {
    let selector = Selector::parse(probe.selector).ok()?;
    doc.select(&selector)
        .map(|element| probe_value(element, probe.value))
        .find(|value| !value.is_empty())
}

fn probe_value(element: ElementRef, value: ProbeValue) -> String {
    let raw = match value {
        ProbeValue::Text => element.text().collect::<String>(),
        ProbeValue::Attr(name) => element.value().attr(name).unwrap_or_default().to_string(),
    };
    raw.trim().to_string()
}

pub fn extract_title(doc: &Html) -> String {
    resolve_field(doc, TITLE_PROBES)
}

pub fn extract_description(doc: &Html) -> String {
    resolve_field(doc, DESCRIPTION_PROBES)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub title: String,
    pub description: String,
}

pub fn extract(doc: &Html) -> ProductFields {
    ProductFields {
        title: extract_title(doc),
        description: extract_description(doc),
    }
}
