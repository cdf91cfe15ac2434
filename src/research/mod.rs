//! Supervised fact-checking research
//!
//! One claim becomes rounds of parallel, bounded research:
//!
//! ```text
//!                     ┌────────────┐
//!  ClaimStatement ───▶│ Supervisor │◀──── Planner (model or heuristic)
//!                     └─────┬──────┘
//!             dispatch ≤ K  │  join all, merge in dispatch order
//!          ┌────────────────┼────────────────┐
//!          ▼                ▼                ▼
//!   ResearchWorker   ResearchWorker   ResearchWorker
//!   search/reflect   search/reflect   search/reflect
//!          │                │                │
//!          ▼                ▼                ▼
//!   EvidenceCompressor (verbatim excerpts, local citations)
//!          └────────────────┼────────────────┘
//!                           ▼
//!        CitationRegistry (global numbering) → notes
//! ```

pub mod citations;
pub mod compressor;
pub mod planner;
pub mod prompts;
pub mod state;
pub mod supervisor;
pub mod worker;

pub use citations::{merge_all, CitationRegistry, SourceRef};
pub use compressor::EvidenceCompressor;
pub use planner::{HeuristicPlanner, ModelPlanner, Planner, PlanningContext, RoundPlan};
pub use prompts::FactCheckPrompts;
pub use state::{
    ClaimStatement, CitedSource, Complexity, EvidenceBundle, ResearchTask, Stance, StopReason,
    SupervisorPhase, SupervisorState, TaskStatus, ToolInvocation, ToolKind,
};
pub use supervisor::{StanceSufficiency, SufficiencyPolicy, Supervisor, SupervisorLimits};
pub use worker::{
    Assessment, Decision, ModelReflector, Reflection, Reflector, ResearchWorker, Researcher,
    SearchCeilings, WorkerOutput,
};
