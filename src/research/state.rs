//! Research state definitions
//!
//! Data shared between the supervisor, its workers and the compressor:
//! - `ClaimStatement`: the single assertion under investigation
//! - `ResearchTask`: one standalone sub-claim handed to one worker
//! - `ToolInvocation`: the append-only worker transcript
//! - `EvidenceBundle`: the compressed, stance-labelled worker result
//! - `SupervisorState`: everything the supervisor owns across rounds

use serde::{Deserialize, Serialize};
use std::fmt;

use super::citations::CitationRegistry;
use crate::tools::SearchHit;

/// The single verifiable assertion under investigation. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimStatement(String);

impl ClaimStatement {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClaimStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Claim complexity, which selects the worker's search ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// A single statistic, date, quote or event
    #[default]
    Simple,
    /// Several facts or dimensions inside one sub-claim
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// One sub-claim assigned to one research worker.
///
/// Instructions are standalone: a worker never sees other tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchTask {
    pub id: String,
    pub instructions: String,
    pub complexity: Complexity,
    pub status: TaskStatus,
}

impl ResearchTask {
    pub fn new(instructions: impl Into<String>, complexity: Complexity) -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("task-{}", &uuid[..8]),
            instructions: instructions.into(),
            complexity,
            status: TaskStatus::Pending,
        }
    }

    /// Replace the generated id (tests and replays want stable ids)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Tag of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    Search,
    Reflect,
}

/// One entry of a worker transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolInvocation {
    Search {
        query: String,
        /// Rendered result, or the error text for a failed call
        observation: String,
        hits: Vec<SearchHit>,
        failed: bool,
    },
    Reflect {
        thought: String,
        observation: String,
    },
}

impl ToolInvocation {
    pub fn search_succeeded(query: impl Into<String>, observation: String, hits: Vec<SearchHit>) -> Self {
        Self::Search {
            query: query.into(),
            observation,
            hits,
            failed: false,
        }
    }

    pub fn search_failed(query: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::Search {
            query: query.into(),
            observation: format!("Search error: {}", error),
            hits: Vec::new(),
            failed: true,
        }
    }

    pub fn reflection(thought: impl Into<String>, observation: impl Into<String>) -> Self {
        Self::Reflect {
            thought: thought.into(),
            observation: observation.into(),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Search { .. } => ToolKind::Search,
            Self::Reflect { .. } => ToolKind::Reflect,
        }
    }

    /// Query for a search, thought for a reflection
    pub fn input(&self) -> &str {
        match self {
            Self::Search { query, .. } => query,
            Self::Reflect { thought, .. } => thought,
        }
    }

    pub fn observation(&self) -> &str {
        match self {
            Self::Search { observation, .. } | Self::Reflect { observation, .. } => observation,
        }
    }

    /// Observation text of a search that returned results
    pub fn evidence_text(&self) -> Option<&str> {
        match self {
            Self::Search {
                observation,
                hits,
                failed: false,
                ..
            } if !hits.is_empty() => Some(observation),
            _ => None,
        }
    }
}

/// Render a transcript as the raw note kept alongside compressed evidence
pub fn render_transcript(task: &ResearchTask, transcript: &[ToolInvocation]) -> String {
    let mut out = format!("### Research task {}\n{}\n\n", task.id, task.instructions);
    for (i, entry) in transcript.iter().enumerate() {
        let label = match entry.kind() {
            ToolKind::Search => "search",
            ToolKind::Reflect => "reflect",
        };
        out.push_str(&format!("[{}] {}: {}\n{}\n\n", i + 1, label, entry.input(), entry.observation()));
    }
    out
}

/// Position of a piece of evidence relative to the claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    Supports,
    Contradicts,
    Mixed,
    Unclear,
}

impl Stance {
    /// Confirmed, refuted or mixed: enough to write a verdict on
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Self::Unclear)
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Supports => "Supports",
            Self::Contradicts => "Contradicts",
            Self::Mixed => "Mixed",
            Self::Unclear => "Unclear",
        };
        f.write_str(s)
    }
}

/// A numbered source. The number is valid within its current scope: the
/// bundle after compression, the merged note set after assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedSource {
    pub number: usize,
    pub title: String,
    pub url: String,
}

impl CitedSource {
    pub fn new(number: usize, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Compressed result of one research worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub summary: String,
    pub stance: Stance,
    /// Verbatim quotes from search observations, at most five
    pub key_excerpts: Vec<String>,
    pub sources: Vec<CitedSource>,
}

impl EvidenceBundle {
    /// Maximum number of key excerpts per bundle
    pub const MAX_EXCERPTS: usize = 5;

    /// Bundle of a worker that gathered nothing
    pub fn empty(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            stance: Stance::Unclear,
            key_excerpts: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Whether the bundle carries anything a report can cite
    pub fn is_evidence_bearing(&self) -> bool {
        !self.key_excerpts.is_empty() || !self.sources.is_empty()
    }

    /// Render as a compressed note
    pub fn to_note(&self) -> String {
        let mut out = format!("**Stance:** {}\n\n{}\n", self.stance, self.summary);

        if !self.key_excerpts.is_empty() {
            out.push_str("\n**Key excerpts:**\n");
            for excerpt in &self.key_excerpts {
                out.push_str(&format!("- \"{}\"\n", excerpt));
            }
        }

        if !self.sources.is_empty() {
            out.push_str("\n**Sources:**\n");
            for source in &self.sources {
                out.push_str(&format!("[{}] {}: {}\n", source.number, source.title, source.url));
            }
        }

        out
    }
}

/// Supervisor phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SupervisorPhase {
    #[default]
    Planning,
    Dispatching,
    Awaiting,
    Assessing,
    Complete,
    BudgetExhausted,
}

impl SupervisorPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::BudgetExhausted)
    }
}

/// Why the supervisor stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// Every evidence-bearing bundle of the last round had a definitive stance
    Sufficient,
    /// The planner declared research complete
    PlannerComplete,
    /// The combined budget ran out
    BudgetExhausted,
    /// A round produced no evidence at all
    NoProgress,
}

/// State owned exclusively by the supervisor.
///
/// Workers never touch it; their results are merged during assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorState {
    pub claim: ClaimStatement,
    pub phase: SupervisorPhase,
    pub round_count: usize,
    /// Dispatches plus planner reflections still allowed
    pub budget_remaining: usize,
    /// Dispatches plus planner reflections taken so far
    pub actions_taken: usize,
    /// Compressed notes, globally renumbered, in merge order
    pub notes: Vec<String>,
    /// Raw transcripts, in merge order
    pub raw_notes: Vec<String>,
    /// Merged bundles behind `notes`
    pub evidence: Vec<EvidenceBundle>,
    pub citations: CitationRegistry,
    /// Dispatched tasks with their final status, in dispatch order
    pub tasks: Vec<ResearchTask>,
    pub failed_tasks: usize,
    pub stop_reason: Option<StopReason>,
}

impl SupervisorState {
    pub fn new(claim: ClaimStatement, budget: usize) -> Self {
        Self {
            claim,
            phase: SupervisorPhase::Planning,
            round_count: 0,
            budget_remaining: budget,
            actions_taken: 0,
            notes: Vec::new(),
            raw_notes: Vec::new(),
            evidence: Vec::new(),
            citations: CitationRegistry::default(),
            tasks: Vec::new(),
            failed_tasks: 0,
            stop_reason: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Charge `units` supervisor actions against the combined budget
    pub fn charge(&mut self, units: usize) {
        self.budget_remaining = self.budget_remaining.saturating_sub(units);
        self.actions_taken += units;
    }

    pub fn finish(&mut self, phase: SupervisorPhase, reason: StopReason) {
        self.phase = phase;
        self.stop_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_trimmed() {
        let claim = ClaimStatement::new("  I claim the sky is green.  ");
        assert_eq!(claim.as_str(), "I claim the sky is green.");
        assert_eq!(claim.to_string(), "I claim the sky is green.");
    }

    #[test]
    fn test_task_ids_unique() {
        let a = ResearchTask::new("a", Complexity::Simple);
        let b = ResearchTask::new("b", Complexity::Simple);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("task-"));
        assert_eq!(a.status, TaskStatus::Pending);
    }

    #[test]
    fn test_stance_serde_is_strict() {
        let s: Stance = serde_json::from_str("\"Contradicts\"").unwrap();
        assert_eq!(s, Stance::Contradicts);
        assert!(serde_json::from_str::<Stance>("\"Maybe\"").is_err());
        assert!(serde_json::from_str::<Stance>("\"supports\"").is_err());
    }

    #[test]
    fn test_stance_definitive() {
        assert!(Stance::Supports.is_definitive());
        assert!(Stance::Mixed.is_definitive());
        assert!(!Stance::Unclear.is_definitive());
    }

    #[test]
    fn test_evidence_text_only_for_successful_search() {
        let hit = SearchHit::new("t", "https://a.org/x", "body");
        let ok = ToolInvocation::search_succeeded("q", "obs".to_string(), vec![hit]);
        let empty = ToolInvocation::search_succeeded("q", "No results found for: q".to_string(), vec![]);
        let failed = ToolInvocation::search_failed("q", "timeout");
        let thought = ToolInvocation::reflection("hmm", "continue");

        assert_eq!(ok.evidence_text(), Some("obs"));
        assert_eq!(empty.evidence_text(), None);
        assert_eq!(failed.evidence_text(), None);
        assert_eq!(thought.evidence_text(), None);
        assert_eq!(failed.observation(), "Search error: timeout");
        assert_eq!(thought.kind(), ToolKind::Reflect);
    }

    #[test]
    fn test_bundle_note_rendering() {
        let bundle = EvidenceBundle {
            summary: "The agency reported 21.88% [1].".to_string(),
            stance: Stance::Contradicts,
            key_excerpts: vec!["Headline inflation rate eased to 21.88%".to_string()],
            sources: vec![CitedSource::new(1, "NBS", "https://nigerianstat.gov.ng")],
        };
        let note = bundle.to_note();
        assert!(note.starts_with("**Stance:** Contradicts"));
        assert!(note.contains("- \"Headline inflation rate eased to 21.88%\""));
        assert!(note.contains("[1] NBS: https://nigerianstat.gov.ng"));
        assert!(bundle.is_evidence_bearing());
        assert!(!EvidenceBundle::empty("nothing").is_evidence_bearing());
    }

    #[test]
    fn test_supervisor_charge_saturates() {
        let mut state = SupervisorState::new(ClaimStatement::new("c"), 2);
        state.charge(1);
        assert_eq!(state.budget_remaining, 1);
        state.charge(5);
        assert_eq!(state.budget_remaining, 0);
        assert_eq!(state.actions_taken, 6);
        assert!(!state.is_done());
        state.finish(SupervisorPhase::BudgetExhausted, StopReason::BudgetExhausted);
        assert!(state.is_done());
    }

    #[test]
    fn test_render_transcript() {
        let task = ResearchTask::new("Check WHO guidance", Complexity::Simple).with_id("task-1");
        let transcript = vec![
            ToolInvocation::search_failed("who masks", "rate limited"),
            ToolInvocation::reflection("nothing yet", "Insufficient; continue"),
        ];
        let raw = render_transcript(&task, &transcript);
        assert!(raw.contains("### Research task task-1"));
        assert!(raw.contains("[1] search: who masks"));
        assert!(raw.contains("[2] reflect: nothing yet"));
    }
}
