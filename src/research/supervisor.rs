//! Research supervisor
//!
//! A bounded state machine over rounds of concurrent research:
//!
//! ```text
//! Planning ──▶ Dispatching ──▶ Awaiting ──▶ Assessing ──┐
//!    ▲                                                  │
//!    └──────────────── gaps remain, budget left ────────┤
//!                                                       ▼
//!                                   Complete | BudgetExhausted
//! ```
//!
//! Budget: every dispatched task costs one unit, and so does a planner
//! reflection. Budget is checked at round boundaries only; a round already
//! in flight always finishes. Workers of a round run as spawned tasks and
//! are joined in dispatch order, so merge order (and therefore citation
//! numbering) does not depend on which worker finishes first.

use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::planner::{HeuristicPlanner, Planner, PlanningContext, RoundPlan};
use super::state::{
    ClaimStatement, EvidenceBundle, ResearchTask, StopReason, SupervisorPhase, SupervisorState,
    TaskStatus,
};
use super::worker::{Researcher, WorkerOutput};
use crate::config::Config;
use crate::error::FactCheckError;

/// Decides whether merged evidence suffices for a verdict
pub trait SufficiencyPolicy: Send + Sync {
    /// `round` holds the evidence-bearing bundles merged this round
    fn is_sufficient(&self, claim: &ClaimStatement, round: &[EvidenceBundle], all: &[EvidenceBundle]) -> bool;
}

/// Sufficient when every evidence-bearing bundle of the round is
/// confirmed, refuted or mixed
#[derive(Debug, Clone, Copy, Default)]
pub struct StanceSufficiency;

impl SufficiencyPolicy for StanceSufficiency {
    fn is_sufficient(&self, _claim: &ClaimStatement, round: &[EvidenceBundle], _all: &[EvidenceBundle]) -> bool {
        let mut bearing = round.iter().filter(|b| b.is_evidence_bearing()).peekable();
        bearing.peek().is_some() && bearing.all(|b| b.stance.is_definitive())
    }
}

/// Budget and concurrency limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorLimits {
    /// Combined dispatch + reflection budget
    pub budget: usize,
    /// K: tasks per round
    pub max_parallel: usize,
}

impl Default for SupervisorLimits {
    fn default() -> Self {
        Self {
            budget: 6,
            max_parallel: 3,
        }
    }
}

impl SupervisorLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            budget: config.max_researcher_iterations,
            max_parallel: config.max_concurrent_research_units.max(1),
        }
    }
}

/// Orchestrates rounds of research for one claim
pub struct Supervisor {
    planner: Arc<dyn Planner>,
    fallback: HeuristicPlanner,
    researcher: Arc<dyn Researcher>,
    policy: Arc<dyn SufficiencyPolicy>,
    limits: SupervisorLimits,
}

impl Supervisor {
    pub fn new(planner: Arc<dyn Planner>, researcher: Arc<dyn Researcher>) -> Self {
        Self {
            planner,
            fallback: HeuristicPlanner::new(),
            researcher,
            policy: Arc::new(StanceSufficiency),
            limits: SupervisorLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SupervisorLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn SufficiencyPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn limits(&self) -> SupervisorLimits {
        self.limits
    }

    /// Run rounds until a terminal phase and hand back the final state.
    ///
    /// Component failures (planner, workers) never abort the run: a failing
    /// planner falls back to the heuristic rules for that round, and a
    /// failing worker only removes its own evidence.
    pub async fn run(&self, claim: ClaimStatement) -> SupervisorState {
        let mut state = SupervisorState::new(claim, self.limits.budget);
        let mut dispatched: Vec<String> = Vec::new();

        info!(
            claim = %state.claim,
            budget = self.limits.budget,
            max_parallel = self.limits.max_parallel,
            planner = self.planner.name(),
            "Supervisor started"
        );

        while !state.is_done() {
            state.phase = SupervisorPhase::Planning;
            if state.budget_remaining == 0 {
                state.finish(SupervisorPhase::BudgetExhausted, StopReason::BudgetExhausted);
                break;
            }

            let round = state.round_count + 1;
            let plan = self.plan_round(&state, round, &dispatched).await;

            if plan.reflection.is_some() {
                state.charge(1);
                debug!(round, budget_remaining = state.budget_remaining, "Planner reflection charged");
            }

            if plan.complete || plan.tasks.is_empty() {
                info!(round, "Planner declared research complete");
                state.finish(SupervisorPhase::Complete, StopReason::PlannerComplete);
                break;
            }

            let allowed = self.limits.max_parallel.min(state.budget_remaining);
            if allowed == 0 {
                state.finish(SupervisorPhase::BudgetExhausted, StopReason::BudgetExhausted);
                break;
            }

            let mut tasks = plan.tasks;
            if tasks.len() > allowed {
                debug!(proposed = tasks.len(), allowed, "Truncating round to limits");
                tasks.truncate(allowed);
            }

            let span = info_span!("round", round, budget_remaining = state.budget_remaining);
            self.execute_round(&mut state, round, tasks, &mut dispatched)
                .instrument(span)
                .await;
        }

        info!(
            rounds = state.round_count,
            actions = state.actions_taken,
            notes = state.notes.len(),
            failed_tasks = state.failed_tasks,
            stop_reason = ?state.stop_reason,
            "Supervisor finished"
        );
        state
    }

    async fn plan_round(&self, state: &SupervisorState, round: usize, dispatched: &[String]) -> RoundPlan {
        let ctx = PlanningContext {
            claim: &state.claim,
            round,
            max_tasks: self.limits.max_parallel,
            budget_remaining: state.budget_remaining,
            notes: &state.notes,
            evidence: &state.evidence,
            dispatched,
        };

        match self.planner.plan(&ctx).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(round, error = %e, "Planner failed, using heuristic rules for this round");
                self.fallback
                    .plan(&ctx)
                    .await
                    .unwrap_or_else(|_| RoundPlan::complete())
            }
        }
    }

    async fn execute_round(
        &self,
        state: &mut SupervisorState,
        round: usize,
        tasks: Vec<ResearchTask>,
        dispatched: &mut Vec<String>,
    ) {
        // Dispatching
        state.phase = SupervisorPhase::Dispatching;
        state.round_count = round;

        let mut handles: Vec<(ResearchTask, JoinHandle<Result<WorkerOutput, FactCheckError>>)> = Vec::new();
        for mut task in tasks {
            state.charge(1);
            dispatched.push(task.instructions.clone());
            task.status = TaskStatus::Running;
            info!(task_id = %task.id, instructions = %task.instructions, "Dispatching research task");

            let researcher = Arc::clone(&self.researcher);
            let assigned = task.clone();
            handles.push((task, tokio::spawn(async move { researcher.research(assigned).await }.in_current_span())));
        }

        // Awaiting: join-all barrier, in dispatch order
        state.phase = SupervisorPhase::Awaiting;
        let (running, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let outputs: Vec<_> = running
            .into_iter()
            .zip(join_all(handles).await)
            .map(|(task, joined)| {
                let result = joined
                    .unwrap_or_else(|join_error| Err(FactCheckError::task(&task.id, join_error.to_string())));
                (task, result)
            })
            .collect();

        // Assessing
        state.phase = SupervisorPhase::Assessing;
        let mut round_evidence = Vec::new();
        for (mut task, result) in outputs {
            match result {
                Ok(output) => {
                    task.status = TaskStatus::Completed;
                    state.raw_notes.push(output.raw_notes);
                    if output.bundle.is_evidence_bearing() {
                        let merged = state.citations.merge(&output.bundle);
                        state.notes.push(merged.to_note());
                        state.evidence.push(merged.clone());
                        round_evidence.push(merged);
                    } else {
                        debug!(task_id = %task.id, "Task produced no citable evidence");
                    }
                }
                Err(e) => {
                    task.status = TaskStatus::Failed;
                    state.failed_tasks += 1;
                    warn!(task_id = %task.id, error = %e, "Research task failed, continuing with survivors");
                }
            }
            state.tasks.push(task);
        }

        info!(
            merged = round_evidence.len(),
            total_sources = state.citations.len(),
            budget_remaining = state.budget_remaining,
            "Round assessed"
        );

        if self.policy.is_sufficient(&state.claim, &round_evidence, &state.evidence) {
            state.finish(SupervisorPhase::Complete, StopReason::Sufficient);
        } else if state.budget_remaining == 0 {
            state.finish(SupervisorPhase::BudgetExhausted, StopReason::BudgetExhausted);
        } else if round_evidence.is_empty() {
            warn!(round, "Round produced no evidence, stopping");
            state.finish(SupervisorPhase::Complete, StopReason::NoProgress);
        }
    }
}
