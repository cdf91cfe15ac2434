//! Citation numbering
//!
//! Markers look like `[n]` and refer to the n-th source of their scope.
//! Two passes keep them consistent:
//!
//! 1. [`normalize_local`] renumbers one bundle's summary by first appearance
//!    and rejects markers pointing outside its source list.
//! 2. [`CitationRegistry::merge`] maps a normalised bundle onto the global
//!    numbering of the accumulated note set. A URL that already has a number
//!    keeps it, so merged numbers stay contiguous from 1 with no reuse.
//!
//! Only summaries carry citations. Key excerpts are quoted text and may hold
//! the source page's own footnotes (`...2020.[12]`), so they are never parsed
//! or rewritten.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::state::{CitedSource, EvidenceBundle, Stance};

/// Citation marker. Four-digit brackets such as `[2020]` are not markers.
fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\[(\d{1,3})\]").expect("citation marker pattern is valid"))
}

/// Marker numbers in order of appearance, repeats included
pub fn cited_numbers(text: &str) -> Vec<usize> {
    marker_regex()
        .captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

/// Text without the markers (and whitespace) that trail it
pub fn trim_trailing_markers(text: &str) -> &str {
    let mut rest = text.trim_end();
    while let Some(m) = marker_regex()
        .find_iter(rest)
        .last()
        .filter(|m| m.end() == rest.len())
    {
        rest = rest[..m.start()].trim_end();
    }
    rest
}

/// Rewrite all markers at once; numbers missing from `mapping` are kept
pub fn rewrite_markers(text: &str, mapping: &HashMap<usize, usize>) -> String {
    marker_regex()
        .replace_all(text, |caps: &Captures| {
            match caps[1].parse::<usize>().ok().and_then(|n| mapping.get(&n)) {
                Some(new) => format!("[{}]", new),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Un-numbered source as a model reports it; position `i` is marker `[i+1]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
}

/// Build a bundle whose summary markers run 1..m in first-appearance order.
///
/// Cited sources come first in citation order; uncited sources follow in
/// their original order. Excerpts are kept as given. Returns a description
/// of the first marker that points outside `sources`.
pub fn normalize_local(
    summary: &str,
    stance: Stance,
    key_excerpts: &[String],
    sources: &[SourceRef],
) -> Result<EvidenceBundle, String> {
    let mut order: Vec<usize> = Vec::new();
    for n in cited_numbers(summary) {
        if n == 0 || n > sources.len() {
            return Err(format!(
                "citation [{}] does not match any of the {} listed sources",
                n,
                sources.len()
            ));
        }
        if !order.contains(&n) {
            order.push(n);
        }
    }
    for n in 1..=sources.len() {
        if !order.contains(&n) {
            order.push(n);
        }
    }

    let mapping: HashMap<usize, usize> = order
        .iter()
        .enumerate()
        .map(|(new_idx, &old)| (old, new_idx + 1))
        .collect();

    let renumbered = order
        .iter()
        .enumerate()
        .map(|(new_idx, &old)| {
            let source = &sources[old - 1];
            CitedSource::new(new_idx + 1, source.title.clone(), source.url.clone())
        })
        .collect();

    Ok(EvidenceBundle {
        summary: rewrite_markers(summary, &mapping),
        stance,
        key_excerpts: key_excerpts.to_vec(),
        sources: renumbered,
    })
}

fn url_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

/// Global source numbering across the merged note set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRegistry {
    sources: Vec<CitedSource>,
}

impl CitationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number for a source; known URLs keep their first number
    pub fn register(&mut self, title: &str, url: &str) -> usize {
        let key = url_key(url);
        if let Some(existing) = self.sources.iter().find(|s| url_key(&s.url) == key) {
            return existing.number;
        }
        let number = self.sources.len() + 1;
        self.sources.push(CitedSource::new(number, title, url));
        number
    }

    /// Map a locally-normalised bundle onto the global numbering
    pub fn merge(&mut self, bundle: &EvidenceBundle) -> EvidenceBundle {
        let mut mapping = HashMap::new();
        let mut sources: Vec<CitedSource> = Vec::new();

        for source in &bundle.sources {
            let global = self.register(&source.title, &source.url);
            mapping.insert(source.number, global);
            if !sources.iter().any(|s| s.number == global) {
                sources.push(CitedSource::new(global, source.title.clone(), source.url.clone()));
            }
        }

        EvidenceBundle {
            summary: rewrite_markers(&bundle.summary, &mapping),
            stance: bundle.stance,
            key_excerpts: bundle.key_excerpts.clone(),
            sources,
        }
    }

    /// All numbered sources, ascending
    pub fn sources(&self) -> &[CitedSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// `[n] Title: URL` lines, one per source
    pub fn render(&self) -> String {
        self.sources
            .iter()
            .map(|s| format!("[{}] {}: {}", s.number, s.title, s.url))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Merge bundles in order into a fresh registry
pub fn merge_all(bundles: &[EvidenceBundle]) -> (Vec<EvidenceBundle>, CitationRegistry) {
    let mut registry = CitationRegistry::new();
    let merged = bundles.iter().map(|b| registry.merge(b)).collect();
    (merged, registry)
}
