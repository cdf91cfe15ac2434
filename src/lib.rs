//! factcheck-agent: supervised multi-agent fact-checking on Rig
//!
//! A claim is clarified, rewritten as a first-person statement, researched by
//! rounds of bounded parallel workers, compressed into citation-numbered
//! evidence and finally written up as a verdict report.
//! - LanguageModel trait: every model boundary (Ollama via Rig in production)
//! - SearchCapability trait: Tavily or DuckDuckGo web search
//! - Supervisor: budgeted rounds of concurrent ResearchWorkers
//! - EvidenceCompressor: verbatim excerpts, stance, local citations
//! - FactCheckPipeline / Session: clarify → brief → supervise → report
//!
//! # Usage
//!
//! ```rust,ignore
//! use factcheck_agent::{Config, FactCheckPipeline, PipelineOutcome};
//!
//! let config = Config::from_env()?;
//! let pipeline = FactCheckPipeline::from_config(&config);
//! let mut session = pipeline.session();
//!
//! match session.submit("Both WHO and CDC recommended mask mandates in 2020").await? {
//!     PipelineOutcome::NeedsClarification { question } => println!("{}", question),
//!     PipelineOutcome::Report { report, .. } => println!("{}", report.markdown),
//!     PipelineOutcome::InsufficientEvidence { claim, .. } => println!("No evidence for {}", claim),
//! }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod research;
pub mod tools;

// Re-exports for convenience
pub use config::Config;
pub use error::{Boundary, FactCheckError, Result, SearchError};
pub use llm::{LanguageModel, OllamaModel, Validate};
pub use tools::{search_from_config, DuckDuckGoSearch, SearchCapability, SearchHit, SearchResults, TavilySearch};

// Pipeline exports
pub use pipeline::{
    BriefWriter, Clarification, Clarifier, Conversation, FactCheckPipeline, FactCheckReport,
    PipelineOutcome, ReportWriter, Session, Verdict,
};

// Research exports
pub use research::{
    CitationRegistry, CitedSource, ClaimStatement, Complexity, EvidenceBundle, EvidenceCompressor,
    HeuristicPlanner, ModelPlanner, ModelReflector, Planner, Reflector, ResearchTask, ResearchWorker,
    Researcher, SearchCeilings, Stance, StanceSufficiency, StopReason, SufficiencyPolicy, Supervisor,
    SupervisorLimits, SupervisorPhase, SupervisorState,
};
