//! Evidence compression
//!
//! Turns one worker transcript into one [`EvidenceBundle`]. The model does
//! the judging; this side enforces the contract:
//! - fixed schema (summary, stance from the enum, at most five excerpts)
//! - every excerpt is copied verbatim from a successful search observation
//!   and kept exactly as found there
//! - every source URL was actually returned by a search
//! - summary citation markers point inside the source list, renumbered locally
//!
//! A response breaking any rule is a `SchemaViolation`, never coerced.

use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::citations::{normalize_local, trim_trailing_markers, SourceRef};
use super::prompts::FactCheckPrompts;
use super::state::{render_transcript, EvidenceBundle, ResearchTask, Stance, ToolInvocation};
use crate::error::{Boundary, FactCheckError};
use crate::llm::{parse_structured, LanguageModel, Validate};

#[derive(Debug, Deserialize)]
struct CompressedFindings {
    summary: String,
    stance: Stance,
    key_excerpts: Vec<String>,
    #[serde(default)]
    sources: Vec<SourceRef>,
}

impl Validate for CompressedFindings {
    fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary is empty".to_string());
        }
        if self.key_excerpts.len() > EvidenceBundle::MAX_EXCERPTS {
            return Err(format!(
                "{} key excerpts exceed the limit of {}",
                self.key_excerpts.len(),
                EvidenceBundle::MAX_EXCERPTS
            ));
        }
        if self.key_excerpts.iter().any(|e| e.trim().is_empty()) {
            return Err("key excerpt is empty".to_string());
        }
        Ok(())
    }
}

/// Model-backed transcript compressor
pub struct EvidenceCompressor {
    model: Arc<dyn LanguageModel>,
}

impl EvidenceCompressor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Compress a transcript into a locally-numbered bundle.
    ///
    /// A transcript without a single successful search yields an empty
    /// `Unclear` bundle and no model call.
    pub async fn compress(
        &self,
        task: &ResearchTask,
        transcript: &[ToolInvocation],
    ) -> Result<EvidenceBundle, FactCheckError> {
        let evidence: Vec<&str> = transcript.iter().filter_map(|t| t.evidence_text()).collect();
        if evidence.is_empty() {
            debug!(task_id = %task.id, "No successful searches, skipping compression");
            return Ok(EvidenceBundle::empty(format!(
                "No search results were available for: {}",
                task.instructions
            )));
        }

        let raw = self
            .model
            .complete(
                &FactCheckPrompts::compress_system(),
                &FactCheckPrompts::compress_request(&task.instructions, &render_transcript(task, transcript)),
            )
            .await?;

        let findings: CompressedFindings = parse_structured(Boundary::Compression, &raw)?;
        let excerpts = verbatim_excerpts(&findings.key_excerpts, &evidence)?;
        check_sources(&findings.sources, transcript)?;

        let bundle = normalize_local(
            findings.summary.trim(),
            findings.stance,
            &excerpts,
            &findings.sources,
        )
        .map_err(|detail| FactCheckError::schema(Boundary::Compression, detail))?;

        debug!(
            task_id = %task.id,
            stance = %bundle.stance,
            excerpts = bundle.key_excerpts.len(),
            sources = bundle.sources.len(),
            "Compressed research findings"
        );

        Ok(bundle)
    }
}

/// Each excerpt as it appears in an observation.
///
/// An excerpt found as written is kept unchanged, footnotes included. One
/// that only matches once citation markers appended to it are dropped is
/// kept without them.
fn verbatim_excerpts(excerpts: &[String], evidence: &[&str]) -> Result<Vec<String>, FactCheckError> {
    excerpts
        .iter()
        .enumerate()
        .map(|(i, excerpt)| {
            let exact = excerpt.trim();
            let unmarked = trim_trailing_markers(exact);
            [exact, unmarked]
                .into_iter()
                .filter(|candidate| !candidate.is_empty())
                .find(|candidate| evidence.iter().any(|obs| obs.contains(candidate)))
                .map(str::to_string)
                .ok_or_else(|| {
                    FactCheckError::schema(
                        Boundary::Compression,
                        format!("key excerpt {} is not a verbatim quote from the search results", i + 1),
                    )
                })
        })
        .collect()
}

fn check_sources(sources: &[SourceRef], transcript: &[ToolInvocation]) -> Result<(), FactCheckError> {
    let key = |url: &str| url.trim().trim_end_matches('/').to_lowercase();
    let seen: Vec<String> = transcript
        .iter()
        .filter_map(|t| match t {
            ToolInvocation::Search { hits, failed: false, .. } => Some(hits),
            _ => None,
        })
        .flatten()
        .map(|h| key(&h.url))
        .collect();

    match sources.iter().find(|s| !seen.contains(&key(&s.url))) {
        Some(unknown) => Err(FactCheckError::schema(
            Boundary::Compression,
            format!("source {} was not returned by any search", unknown.url),
        )),
        None => Ok(()),
    }
}
