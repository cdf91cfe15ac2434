//! Decomposition policy
//!
//! A [`Planner`] decides what the next round dispatches. Its judgement is
//! pluggable; the supervisor only enforces the budget and concurrency
//! contract around whatever the planner proposes.
//!
//! - [`ModelPlanner`]: lead-researcher prompt, reflects on gathered evidence
//!   (one budget unit per reflection) and proposes standalone tasks
//! - [`HeuristicPlanner`]: deterministic rules, no model and no reflection

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::prompts::FactCheckPrompts;
use super::state::{ClaimStatement, Complexity, EvidenceBundle, ResearchTask};
use crate::error::{Boundary, FactCheckError};
use crate::llm::{complete_structured, LanguageModel, Validate};

/// What a planner sees at the start of a round
#[derive(Debug, Clone, Copy)]
pub struct PlanningContext<'a> {
    pub claim: &'a ClaimStatement,
    /// 1-based number of the round being planned
    pub round: usize,
    /// K: most tasks the round may dispatch
    pub max_tasks: usize,
    pub budget_remaining: usize,
    pub notes: &'a [String],
    pub evidence: &'a [EvidenceBundle],
    /// Instructions of every task dispatched in earlier rounds
    pub dispatched: &'a [String],
}

/// A planner's proposal for one round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundPlan {
    /// Present when the planner reflected; costs one budget unit
    pub reflection: Option<String>,
    pub tasks: Vec<ResearchTask>,
    /// The planner considers research complete
    pub complete: bool,
}

impl RoundPlan {
    pub fn dispatch(tasks: Vec<ResearchTask>) -> Self {
        Self {
            reflection: None,
            tasks,
            complete: false,
        }
    }

    pub fn complete() -> Self {
        Self {
            reflection: None,
            tasks: Vec::new(),
            complete: true,
        }
    }

    pub fn with_reflection(mut self, reflection: impl Into<String>) -> Self {
        self.reflection = Some(reflection.into());
        self
    }
}

/// Pluggable decomposition policy
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, ctx: &PlanningContext<'_>) -> Result<RoundPlan, FactCheckError>;

    fn name(&self) -> &str;
}

/// Lowercased, whitespace-collapsed form used to spot repeated tasks
fn normalized(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop duplicates and tasks already dispatched, then cap at `max`
fn dedup_tasks(tasks: Vec<ResearchTask>, dispatched: &[String], max: usize) -> Vec<ResearchTask> {
    let mut seen: Vec<String> = dispatched.iter().map(|d| normalized(d)).collect();
    let mut kept = Vec::new();
    for task in tasks {
        let key = normalized(&task.instructions);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        kept.push(task);
        if kept.len() == max {
            break;
        }
    }
    kept
}

// =============================================================================
// MODEL PLANNER
// =============================================================================

#[derive(Debug, Deserialize)]
struct PlannedTask {
    instructions: String,
    #[serde(default)]
    complexity: Complexity,
}

#[derive(Debug, Deserialize)]
struct PlannerOutput {
    #[serde(default)]
    reflection: String,
    #[serde(default)]
    research_complete: bool,
    #[serde(default)]
    tasks: Vec<PlannedTask>,
}

impl Validate for PlannerOutput {
    fn validate(&self) -> Result<(), String> {
        if self.tasks.iter().any(|t| t.instructions.trim().is_empty()) {
            return Err("task with empty instructions".to_string());
        }
        Ok(())
    }
}

/// Lead-researcher planner backed by a language model
pub struct ModelPlanner {
    model: Arc<dyn LanguageModel>,
}

impl ModelPlanner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Planner for ModelPlanner {
    async fn plan(&self, ctx: &PlanningContext<'_>) -> Result<RoundPlan, FactCheckError> {
        let output: PlannerOutput = complete_structured(
            self.model.as_ref(),
            Boundary::Planning,
            &FactCheckPrompts::lead_researcher(ctx.max_tasks, ctx.budget_remaining),
            &FactCheckPrompts::planning_request(ctx.claim.as_str(), ctx.round, &ctx.notes.join("\n\n")),
        )
        .await?;

        let proposed = output.tasks.len();
        let tasks = dedup_tasks(
            output
                .tasks
                .into_iter()
                .map(|t| ResearchTask::new(t.instructions.trim(), t.complexity))
                .collect(),
            ctx.dispatched,
            ctx.max_tasks,
        );
        debug!(round = ctx.round, proposed, kept = tasks.len(), "Model planner proposal");

        let mut plan = if output.research_complete || tasks.is_empty() {
            RoundPlan::complete()
        } else {
            RoundPlan::dispatch(tasks)
        };
        plan.reflection = Some(output.reflection);
        Ok(plan)
    }

    fn name(&self) -> &str {
        "model"
    }
}

// =============================================================================
// HEURISTIC PLANNER
// =============================================================================

/// Rule-based planner.
///
/// Round 1 splits "both A and B ..." / "A and B ..." over named entities
/// into one task per entity and keeps anything else whole. Later rounds
/// issue one broader follow-up while no definitive evidence exists, then
/// declare completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPlanner;

impl HeuristicPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Tasks for the first round
    pub fn decompose(&self, claim: &ClaimStatement, max_tasks: usize) -> Vec<ResearchTask> {
        let body = strip_claim_prefix(claim.as_str());

        if let Some((entities, predicate)) = split_entities(body) {
            return entities
                .iter()
                .take(max_tasks.max(1))
                .map(|entity| {
                    ResearchTask::new(
                        format!("Verify whether {} {}", entity, predicate),
                        Complexity::Simple,
                    )
                })
                .collect();
        }

        let complexity = if is_compound(body) {
            Complexity::Complex
        } else {
            Complexity::Simple
        };
        vec![ResearchTask::new(format!("Verify the claim: {}", body), complexity)]
    }

    fn follow_up(&self, claim: &ClaimStatement) -> ResearchTask {
        ResearchTask::new(
            format!(
                "Find authoritative primary sources (official statements, datasets, fact-checking organisations) that confirm or refute: {}",
                strip_claim_prefix(claim.as_str())
            ),
            Complexity::Complex,
        )
    }
}

#[async_trait]
impl Planner for HeuristicPlanner {
    async fn plan(&self, ctx: &PlanningContext<'_>) -> Result<RoundPlan, FactCheckError> {
        if ctx.round == 1 {
            let tasks = dedup_tasks(self.decompose(ctx.claim, ctx.max_tasks), ctx.dispatched, ctx.max_tasks);
            return Ok(RoundPlan::dispatch(tasks));
        }

        if ctx.evidence.iter().any(|b| b.stance.is_definitive()) {
            return Ok(RoundPlan::complete());
        }

        let tasks = dedup_tasks(vec![self.follow_up(ctx.claim)], ctx.dispatched, ctx.max_tasks);
        if tasks.is_empty() {
            Ok(RoundPlan::complete())
        } else {
            Ok(RoundPlan::dispatch(tasks))
        }
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

fn strip_claim_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    for prefix in ["I claim that ", "I claim "] {
        if let Some(rest) = trimmed
            .get(..prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(prefix))
            .and_then(|_| trimmed.get(prefix.len()..))
        {
            return rest.trim();
        }
    }
    trimmed
}

fn is_named(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Split a leading list of named entities from the predicate.
///
/// "Both WHO and CDC recommended X" gives `(["WHO", "CDC"], "recommended X")`.
/// Needs at least two entities joined by "and".
fn split_entities(text: &str) -> Option<(Vec<String>, String)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut idx = 0;
    if tokens.first().is_some_and(|t| t.eq_ignore_ascii_case("both")) {
        idx = 1;
    }

    let mut entities: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut joined = false;

    while idx < tokens.len() {
        let token = tokens[idx];
        let word = token.trim_end_matches(',');
        if word.eq_ignore_ascii_case("and") && !current.is_empty() {
            entities.push(current.join(" "));
            current.clear();
            joined = true;
        } else if is_named(word) {
            current.push(word);
            if token.ends_with(',') {
                entities.push(current.join(" "));
                current.clear();
            }
        } else {
            break;
        }
        idx += 1;
    }
    if !current.is_empty() {
        entities.push(current.join(" "));
    }

    let predicate = tokens[idx..].join(" ");
    (joined && entities.len() >= 2 && !predicate.is_empty()).then_some((entities, predicate))
}

fn is_compound(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains(" and ") || lower.contains(';') || lower.contains(" while ") || lower.contains(" but ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::research::state::Stance;

    fn ctx<'a>(claim: &'a ClaimStatement, round: usize, evidence: &'a [EvidenceBundle], dispatched: &'a [String]) -> PlanningContext<'a> {
        PlanningContext {
            claim,
            round,
            max_tasks: 3,
            budget_remaining: 6,
            notes: &[],
            evidence,
            dispatched,
        }
    }

    #[test]
    fn test_single_fact_claim_one_task() {
        let claim = ClaimStatement::new("I claim that Nigeria's inflation rate hit 30% in July 2025.");
        let tasks = HeuristicPlanner.decompose(&claim, 3);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].complexity, Complexity::Simple);
        assert!(tasks[0].instructions.contains("Nigeria's inflation rate hit 30% in July 2025"));
    }

    #[test]
    fn test_two_entity_claim_two_tasks() {
        let claim = ClaimStatement::new("Both WHO and CDC recommended mask mandates in 2020");
        let tasks = HeuristicPlanner.decompose(&claim, 3);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].instructions, "Verify whether WHO recommended mask mandates in 2020");
        assert_eq!(tasks[1].instructions, "Verify whether CDC recommended mask mandates in 2020");
    }

    #[test]
    fn test_entity_list_capped() {
        let claim = ClaimStatement::new("France, Germany, Spain and Italy banned plastic bags in 2019");
        assert_eq!(HeuristicPlanner.decompose(&claim, 3).len(), 3);
        assert_eq!(HeuristicPlanner.decompose(&claim, 5).len(), 4);
    }

    #[test]
    fn test_compound_claim_kept_whole() {
        let claim = ClaimStatement::new("The bridge opened in 1990 and cost $2 billion");
        let tasks = HeuristicPlanner.decompose(&claim, 3);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].complexity, Complexity::Complex);
    }

    #[test]
    fn test_non_ascii_claim_kept_whole() {
        let claim = ClaimStatement::new("中国的GDP在2023年增长了5.2%");
        let tasks = HeuristicPlanner.decompose(&claim, 3);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].instructions, "Verify the claim: 中国的GDP在2023年增长了5.2%");

        assert_eq!(strip_claim_prefix("Ich behaupte, dass München größer ist"), "Ich behaupte, dass München größer ist");
        assert_eq!(strip_claim_prefix("I claim that 中国的GDP增长了"), "中国的GDP增长了");
    }

    #[test]
    fn test_split_entities_requires_and() {
        assert!(split_entities("Nigeria's inflation hit 30%").is_none());
        assert!(split_entities("WHO and CDC").is_none());
    }

    #[test]
    fn test_dedup_tasks() {
        let tasks = vec![
            ResearchTask::new("Check  WHO", Complexity::Simple),
            ResearchTask::new("check who", Complexity::Simple),
            ResearchTask::new("Check CDC", Complexity::Simple),
            ResearchTask::new("Check NIH", Complexity::Simple),
        ];
        let kept = dedup_tasks(tasks, &["check cdc".to_string()], 3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].instructions, "Check NIH");
    }

    #[tokio::test]
    async fn test_heuristic_follow_up_then_complete() {
        let claim = ClaimStatement::new("The moon is made of cheese");
        let planner = HeuristicPlanner;

        let unclear = vec![EvidenceBundle::empty("nothing")];
        let plan = planner.plan(&ctx(&claim, 2, &unclear, &[])).await.unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert!(plan.reflection.is_none());

        let dispatched = vec![plan.tasks[0].instructions.clone()];
        let plan = planner.plan(&ctx(&claim, 3, &unclear, &dispatched)).await.unwrap();
        assert!(plan.complete);

        let mut settled = EvidenceBundle::empty("x");
        settled.stance = Stance::Contradicts;
        let plan = planner.plan(&ctx(&claim, 2, &[settled], &[])).await.unwrap();
        assert!(plan.complete);
    }

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _p: &str, _q: &str) -> Result<String, FactCheckError> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_model_planner_caps_and_reflects() {
        let model = FixedModel(
            r#"{"reflection": "Split per agency", "research_complete": false, "tasks": [
                {"instructions": "Did WHO recommend masks in 2020?", "complexity": "simple"},
                {"instructions": "Did CDC recommend masks in 2020?"},
                {"instructions": "did cdc recommend masks in 2020?"},
                {"instructions": "Did ECDC recommend masks in 2020?"},
                {"instructions": "Did NHS recommend masks in 2020?"}
            ]}"#,
        );
        let planner = ModelPlanner::new(Arc::new(model));
        let claim = ClaimStatement::new("claim");
        let plan = planner.plan(&ctx(&claim, 1, &[], &[])).await.unwrap();

        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.reflection.as_deref(), Some("Split per agency"));
        assert!(!plan.complete);
    }

    #[tokio::test]
    async fn test_model_planner_complete() {
        let model = FixedModel(r#"{"reflection": "Enough", "research_complete": true, "tasks": []}"#);
        let claim = ClaimStatement::new("claim");
        let plan = ModelPlanner::new(Arc::new(model)).plan(&ctx(&claim, 2, &[], &[])).await.unwrap();
        assert!(plan.complete);
        assert!(plan.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_model_planner_schema_violation() {
        let model = FixedModel(r#"{"tasks": [{"instructions": "  "}]}"#);
        let claim = ClaimStatement::new("claim");
        let err = ModelPlanner::new(Arc::new(model)).plan(&ctx(&claim, 1, &[], &[])).await.unwrap_err();
        assert!(err.is_schema_violation());
    }
}
