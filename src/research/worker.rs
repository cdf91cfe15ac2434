//! Research worker
//!
//! One worker verifies one [`ResearchTask`] with a bounded loop:
//!
//! ```text
//! ┌─────────┐    ┌─────────┐
//! │ search  │───▶│ reflect │──▶ stop? ──yes──▶ compress
//! └─────────┘    └─────────┘      │
//!      ▲                          no
//!      └──────────────────────────┘   (until the search ceiling)
//! ```
//!
//! The ceiling depends on the task's complexity and is never exceeded. A
//! failed search is recorded and still counts. Retries belong to the search
//! capability, not here.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::compressor::EvidenceCompressor;
use super::prompts::FactCheckPrompts;
use super::state::{
    render_transcript, Complexity, EvidenceBundle, ResearchTask, Stance, TaskStatus, ToolInvocation,
};
use crate::config::Config;
use crate::error::{Boundary, FactCheckError};
use crate::llm::{complete_structured, LanguageModel, Validate};
use crate::tools::SearchCapability;

/// Longest query handed to a search capability
const MAX_QUERY_CHARS: usize = 400;

/// Independent hosts after which a worker stops early
const SOURCE_TARGET: usize = 3;

/// How the latest search result bears on the sub-claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assessment {
    Supports,
    Contradicts,
    Unclear,
    Insufficient,
}

impl Assessment {
    fn resolves(&self) -> bool {
        matches!(self, Self::Supports | Self::Contradicts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Continue,
    Stop,
}

/// Result of the mandatory reflection after each search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reflection {
    pub thought: String,
    pub assessment: Assessment,
    pub decision: Decision,
    #[serde(default)]
    pub next_query: String,
}

impl Validate for Reflection {}

impl Reflection {
    fn observation(&self) -> String {
        format!(
            "assessment: {:?}; decision: {:?}; next query: {}",
            self.assessment,
            self.decision,
            if self.next_query.is_empty() { "-" } else { self.next_query.as_str() }
        )
    }
}

/// Reflection capability consulted after every search
#[async_trait]
pub trait Reflector: Send + Sync {
    async fn reflect(
        &self,
        task: &ResearchTask,
        transcript: &[ToolInvocation],
        searches_left: usize,
        ceiling: usize,
    ) -> Result<Reflection, FactCheckError>;
}

/// Model-backed reflection
pub struct ModelReflector {
    model: Arc<dyn LanguageModel>,
}

impl ModelReflector {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Reflector for ModelReflector {
    async fn reflect(
        &self,
        task: &ResearchTask,
        transcript: &[ToolInvocation],
        searches_left: usize,
        ceiling: usize,
    ) -> Result<Reflection, FactCheckError> {
        complete_structured(
            self.model.as_ref(),
            Boundary::Reflection,
            &FactCheckPrompts::researcher_reflection(ceiling),
            &FactCheckPrompts::reflection_request(
                &task.instructions,
                &render_transcript(task, transcript),
                searches_left,
            ),
        )
        .await
    }
}

/// Search ceilings per complexity class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCeilings {
    pub simple: usize,
    pub complex: usize,
}

impl Default for SearchCeilings {
    fn default() -> Self {
        Self { simple: 3, complex: 5 }
    }
}

impl SearchCeilings {
    /// Clamp into the allowed ranges: simple 2..=3, complex up to 5
    pub fn new(simple: usize, complex: usize) -> Self {
        let simple = simple.clamp(2, 3);
        Self {
            simple,
            complex: complex.clamp(simple, 5),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.simple_search_ceiling, config.complex_search_ceiling)
    }

    pub fn for_complexity(&self, complexity: Complexity) -> usize {
        match complexity {
            Complexity::Simple => self.simple,
            Complexity::Complex => self.complex,
        }
    }
}

/// Everything a finished worker hands back to the supervisor
#[derive(Debug, Clone)]
pub struct WorkerOutput {
    pub task: ResearchTask,
    pub transcript: Vec<ToolInvocation>,
    pub raw_notes: String,
    pub bundle: EvidenceBundle,
    pub searches: usize,
}

/// Dispatch target of the supervisor: one task in, one result out
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, task: ResearchTask) -> Result<WorkerOutput, FactCheckError>;
}

/// Bounded search/reflect loop followed by compression
pub struct ResearchWorker {
    search: Arc<dyn SearchCapability>,
    reflector: Arc<dyn Reflector>,
    compressor: EvidenceCompressor,
    ceilings: SearchCeilings,
}

impl ResearchWorker {
    pub fn new(
        search: Arc<dyn SearchCapability>,
        reflector: Arc<dyn Reflector>,
        compressor: EvidenceCompressor,
    ) -> Self {
        Self {
            search,
            reflector,
            compressor,
            ceilings: SearchCeilings::default(),
        }
    }

    pub fn with_ceilings(mut self, ceilings: SearchCeilings) -> Self {
        self.ceilings = ceilings;
        self
    }

    async fn run(&self, mut task: ResearchTask) -> Result<WorkerOutput, FactCheckError> {
        task.status = TaskStatus::Running;
        let ceiling = self.ceilings.for_complexity(task.complexity);
        let mut query = truncate_query(&task.instructions);
        let mut transcript = Vec::new();
        let mut searches = 0;
        let mut resolved = false;
        let mut exhausted = true;

        while searches < ceiling {
            searches += 1;
            match self.search.search(&query).await {
                Ok(results) => {
                    debug!(query = %query, hits = results.hits.len(), "Search returned");
                    transcript.push(ToolInvocation::search_succeeded(
                        query.clone(),
                        results.to_observation(),
                        results.hits,
                    ));
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "Search failed, recording observation");
                    transcript.push(ToolInvocation::search_failed(query.clone(), &e));
                }
            }

            let searches_left = ceiling - searches;
            match self
                .reflector
                .reflect(&task, &transcript, searches_left, ceiling)
                .await
            {
                Ok(reflection) => {
                    resolved = reflection.assessment.resolves();
                    let stop = reflection.decision == Decision::Stop;
                    if !reflection.next_query.trim().is_empty() {
                        query = truncate_query(&reflection.next_query);
                    }
                    transcript.push(ToolInvocation::reflection(
                        reflection.thought.clone(),
                        reflection.observation(),
                    ));
                    if stop {
                        debug!(searches, "Reflection decided to stop");
                        exhausted = false;
                        break;
                    }
                }
                Err(e) if e.is_schema_violation() => {
                    return Err(FactCheckError::task(&task.id, e.to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "Reflection failed, recording observation");
                    transcript.push(ToolInvocation::reflection(
                        String::new(),
                        format!("Reflection unavailable: {}", e),
                    ));
                }
            }

            if distinct_hosts(&transcript) >= SOURCE_TARGET {
                debug!(searches, "Enough independent sources, stopping");
                resolved = true;
                exhausted = false;
                break;
            }
        }

        let mut bundle = self
            .compressor
            .compress(&task, &transcript)
            .await
            .map_err(|e| FactCheckError::task(&task.id, e.to_string()))?;

        if exhausted && !resolved && bundle.stance != Stance::Unclear {
            debug!(stance = %bundle.stance, "Ceiling reached without resolution, downgrading stance");
            bundle.stance = Stance::Unclear;
        }

        task.status = TaskStatus::Completed;
        info!(searches, stance = %bundle.stance, "Research task finished");

        Ok(WorkerOutput {
            raw_notes: render_transcript(&task, &transcript),
            task,
            transcript,
            bundle,
            searches,
        })
    }
}

#[async_trait]
impl Researcher for ResearchWorker {
    async fn research(&self, task: ResearchTask) -> Result<WorkerOutput, FactCheckError> {
        let span = info_span!("research_task", task_id = %task.id, complexity = ?task.complexity);
        self.run(task).instrument(span).await
    }
}

fn truncate_query(text: &str) -> String {
    text.trim().chars().take(MAX_QUERY_CHARS).collect()
}

/// Distinct hosts across successful searches
fn distinct_hosts(transcript: &[ToolInvocation]) -> usize {
    transcript
        .iter()
        .filter_map(|t| match t {
            ToolInvocation::Search { hits, failed: false, .. } => Some(hits),
            _ => None,
        })
        .flatten()
        .filter_map(|h| h.host())
        .map(|h| h.trim_start_matches("www.").to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::tools::{SearchHit, SearchResults};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingSearch {
        calls: AtomicUsize,
        fail: bool,
        hosts: Vec<&'static str>,
    }

    impl CountingSearch {
        fn new(hosts: Vec<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                hosts,
            }
        }
    }

    #[async_trait]
    impl SearchCapability for CountingSearch {
        async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::Timeout);
            }
            let host = self.hosts[n % self.hosts.len()];
            Ok(SearchResults::new(
                query,
                vec![SearchHit::new("Report", format!("https://{}/page", host), "quoted text")],
            ))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct ScriptedReflector {
        replies: Mutex<VecDeque<Result<Reflection, FactCheckError>>>,
    }

    impl ScriptedReflector {
        fn new(replies: Vec<Result<Reflection, FactCheckError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl Reflector for ScriptedReflector {
        async fn reflect(
            &self,
            _task: &ResearchTask,
            _transcript: &[ToolInvocation],
            _searches_left: usize,
            _ceiling: usize,
        ) -> Result<Reflection, FactCheckError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(keep_going(Assessment::Insufficient)))
        }
    }

    struct FixedModel(String);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _p: &str, _q: &str) -> Result<String, FactCheckError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn keep_going(assessment: Assessment) -> Reflection {
        Reflection {
            thought: "need more".to_string(),
            assessment,
            decision: Decision::Continue,
            next_query: "narrower query".to_string(),
        }
    }

    fn compressor(stance: &str) -> EvidenceCompressor {
        let json = format!(
            r#"{{"summary": "Findings [1].", "stance": "{}", "key_excerpts": ["quoted text"], "sources": [{{"title": "Report", "url": "https://a.org/page"}}]}}"#,
            stance
        );
        EvidenceCompressor::new(Arc::new(FixedModel(json)))
    }

    fn worker(search: Arc<CountingSearch>, reflector: ScriptedReflector, stance: &str) -> ResearchWorker {
        ResearchWorker::new(search, Arc::new(reflector), compressor(stance))
    }

    #[test]
    fn test_ceilings_clamped() {
        assert_eq!(SearchCeilings::new(1, 9), SearchCeilings { simple: 2, complex: 5 });
        assert_eq!(SearchCeilings::new(3, 2), SearchCeilings { simple: 3, complex: 3 });
        assert_eq!(SearchCeilings::default().for_complexity(Complexity::Complex), 5);
    }

    #[test]
    fn test_distinct_hosts_ignore_port_and_userinfo() {
        let hits = vec![
            SearchHit::new("a", "https://who.int/a", "x"),
            SearchHit::new("b", "https://who.int:443/b", "x"),
            SearchHit::new("c", "https://editor@www.WHO.int/c", "x"),
            SearchHit::new("d", "https://cdc.gov/d", "x"),
        ];
        let transcript = vec![ToolInvocation::search_succeeded("q", "obs".to_string(), hits)];
        assert_eq!(distinct_hosts(&transcript), 2);
    }

    #[test]
    fn test_truncate_query() {
        assert_eq!(truncate_query(&"x".repeat(1000)).len(), MAX_QUERY_CHARS);
        assert_eq!(truncate_query("  short  "), "short");
    }

    #[tokio::test]
    async fn test_simple_task_respects_ceiling() {
        let search = Arc::new(CountingSearch::new(vec!["a.org"]));
        let w = worker(search.clone(), ScriptedReflector::new(vec![]), "Mixed");
        let out = w
            .research(ResearchTask::new("check", Complexity::Simple))
            .await
            .unwrap();

        assert_eq!(out.searches, 3);
        assert_eq!(search.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out.transcript.len(), 6);
        assert_eq!(out.bundle.stance, Stance::Unclear);
        assert_eq!(out.task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_complex_task_ceiling_is_five() {
        let search = Arc::new(CountingSearch::new(vec!["a.org"]));
        let w = worker(search.clone(), ScriptedReflector::new(vec![]), "Unclear");
        w.research(ResearchTask::new("check", Complexity::Complex)).await.unwrap();
        assert_eq!(search.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_stop_decision_ends_loop() {
        let search = Arc::new(CountingSearch::new(vec!["a.org"]));
        let stop = Reflection {
            thought: "clear".to_string(),
            assessment: Assessment::Contradicts,
            decision: Decision::Stop,
            next_query: String::new(),
        };
        let w = worker(search.clone(), ScriptedReflector::new(vec![Ok(stop)]), "Contradicts");
        let out = w.research(ResearchTask::new("check", Complexity::Simple)).await.unwrap();

        assert_eq!(out.searches, 1);
        assert_eq!(out.bundle.stance, Stance::Contradicts);
    }

    #[tokio::test]
    async fn test_three_hosts_stop_early() {
        let search = Arc::new(CountingSearch::new(vec!["a.org", "b.org", "c.org"]));
        let w = worker(search.clone(), ScriptedReflector::new(vec![]), "Supports");
        let out = w.research(ResearchTask::new("check", Complexity::Complex)).await.unwrap();

        assert_eq!(out.searches, 3);
        assert_eq!(out.bundle.stance, Stance::Supports);
    }

    #[tokio::test]
    async fn test_failed_searches_count_and_yield_unclear() {
        let search = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            fail: true,
            hosts: vec!["a.org"],
        });
        let w = worker(search.clone(), ScriptedReflector::new(vec![]), "Supports");
        let out = w.research(ResearchTask::new("check", Complexity::Simple)).await.unwrap();

        assert_eq!(search.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out.bundle.stance, Stance::Unclear);
        assert!(!out.bundle.is_evidence_bearing());
        assert!(out.raw_notes.contains("Search error"));
    }

    #[tokio::test]
    async fn test_reflection_schema_violation_fails_task() {
        let search = Arc::new(CountingSearch::new(vec!["a.org"]));
        let bad = Err(FactCheckError::schema(Boundary::Reflection, "missing decision"));
        let w = worker(search, ScriptedReflector::new(vec![bad]), "Supports");
        let err = w
            .research(ResearchTask::new("check", Complexity::Simple).with_id("task-x"))
            .await
            .unwrap_err();

        assert!(matches!(err, FactCheckError::TaskFailure { ref task_id, .. } if task_id == "task-x"));
    }

    #[tokio::test]
    async fn test_reflection_capability_failure_is_degraded() {
        let search = Arc::new(CountingSearch::new(vec!["a.org"]));
        let down = Err(FactCheckError::capability("ollama", "connection refused"));
        let w = worker(search.clone(), ScriptedReflector::new(vec![down]), "Unclear");
        let out = w.research(ResearchTask::new("check", Complexity::Simple)).await.unwrap();

        assert_eq!(search.calls.load(Ordering::SeqCst), 3);
        assert!(out.raw_notes.contains("Reflection unavailable"));
    }
}
