//! Top-level fact-checking flow
//!
//! ```text
//! Clarify ──need info?──▶ NeedsClarification (caller resubmits)
//!    │
//!    ▼
//! Brief ──▶ Supervisor ──▶ notes empty? ──▶ InsufficientEvidence
//!                              │
//!                              ▼
//!                            Report
//! ```
//!
//! Clarify is the only branch. A [`Session`] keeps the conversation so a
//! resubmission restarts from Clarify with every earlier turn in view.

pub mod report;
pub mod scope;

pub use report::{FactCheckReport, ModelReportWriter, ReportWriter, Verdict};
pub use scope::{
    is_interrogative, BriefWriter, Clarification, Clarifier, Conversation, Message, ModelBriefWriter,
    ModelClarifier, Role,
};

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::FactCheckError;
use crate::llm::{LanguageModel, OllamaModel};
use crate::research::{
    ClaimStatement, EvidenceCompressor, ModelPlanner, ModelReflector, ResearchWorker, SearchCeilings,
    Supervisor, SupervisorLimits, SupervisorState,
};
use crate::tools::search_from_config;

/// Terminal result of one submission
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The pipeline halted before research; ask the user this
    NeedsClarification { question: String },
    /// A verdict report backed by the merged evidence
    Report {
        report: FactCheckReport,
        evidence: SupervisorState,
    },
    /// Research finished with no citable evidence at all
    InsufficientEvidence {
        claim: ClaimStatement,
        evidence: SupervisorState,
    },
}

/// Clarify, brief, supervise, report
pub struct FactCheckPipeline {
    clarifier: Arc<dyn Clarifier>,
    brief_writer: Arc<dyn BriefWriter>,
    supervisor: Supervisor,
    report_writer: Arc<dyn ReportWriter>,
}

impl FactCheckPipeline {
    pub fn new(
        clarifier: Arc<dyn Clarifier>,
        brief_writer: Arc<dyn BriefWriter>,
        supervisor: Supervisor,
        report_writer: Arc<dyn ReportWriter>,
    ) -> Self {
        Self {
            clarifier,
            brief_writer,
            supervisor,
            report_writer,
        }
    }

    /// Wire every boundary to the configured Ollama model and search provider
    pub fn from_config(config: &Config) -> Self {
        let model: Arc<dyn LanguageModel> = Arc::new(OllamaModel::from_config(config));
        let search = search_from_config(config);

        let worker = ResearchWorker::new(
            search,
            Arc::new(ModelReflector::new(model.clone())),
            EvidenceCompressor::new(model.clone()),
        )
        .with_ceilings(SearchCeilings::from_config(config));

        let supervisor = Supervisor::new(Arc::new(ModelPlanner::new(model.clone())), Arc::new(worker))
            .with_limits(SupervisorLimits::from_config(config));

        Self::new(
            Arc::new(ModelClarifier::new(model.clone())),
            Arc::new(ModelBriefWriter::new(model.clone())),
            supervisor,
            Arc::new(ModelReportWriter::new(model)),
        )
    }

    /// Run the whole flow over a conversation
    pub async fn run(&self, conversation: &Conversation) -> Result<PipelineOutcome, FactCheckError> {
        let clarification = self.clarifier.clarify(conversation).await?;
        if clarification.need_clarification {
            info!("Clarification needed, halting before research");
            return Ok(PipelineOutcome::NeedsClarification {
                question: clarification.question,
            });
        }
        if !clarification.verification.is_empty() {
            info!(acknowledgement = %clarification.verification, "Claim accepted");
        }

        let claim = self.brief_writer.write_brief(conversation).await?;
        info!(claim = %claim, "Claim statement written");

        let evidence = self.supervisor.run(claim.clone()).await;
        if evidence.notes.is_empty() {
            info!(stop_reason = ?evidence.stop_reason, "No evidence gathered");
            return Ok(PipelineOutcome::InsufficientEvidence { claim, evidence });
        }

        let report = self
            .report_writer
            .write_report(&claim, &evidence.notes, &evidence.citations)
            .await?;
        info!(verdict = %report.verdict, "Report written");

        Ok(PipelineOutcome::Report { report, evidence })
    }

    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }
}

/// Caller-facing submit/resubmit cycle
pub struct Session<'a> {
    pipeline: &'a FactCheckPipeline,
    conversation: Conversation,
}

impl<'a> Session<'a> {
    pub fn new(pipeline: &'a FactCheckPipeline) -> Self {
        Self {
            pipeline,
            conversation: Conversation::new(),
        }
    }

    /// Add a user turn and run the pipeline from Clarify
    pub async fn submit(&mut self, text: impl Into<String>) -> Result<PipelineOutcome, FactCheckError> {
        self.conversation.push_user(text);
        let outcome = self.pipeline.run(&self.conversation).await?;
        if let PipelineOutcome::NeedsClarification { question } = &outcome {
            self.conversation.push_assistant(question.clone());
        }
        Ok(outcome)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}
