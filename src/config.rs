//! # Configuration Module
//!
//! Loads the fact-checker's settings from environment variables (and a `.env`
//! file when present). CLI flags override individual fields afterwards, and
//! `validate` is called once before the pipeline is built.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Runtime configuration for the fact-checking pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// The Ollama model used at every model boundary (e.g., "llama3.2")
    pub model: String,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// Sampling temperature (default 0.0)
    pub temperature: f32,

    /// Results requested per search call
    pub max_search_results: usize,

    /// Combined supervisor budget: dispatched tasks plus planner reflections
    pub max_researcher_iterations: usize,

    /// K: research tasks dispatched concurrently per round
    pub max_concurrent_research_units: usize,

    /// Worker search ceiling for single-fact claims
    pub simple_search_ceiling: usize,

    /// Worker search ceiling for multi-part claims
    pub complex_search_ceiling: usize,

    /// Tavily key; DuckDuckGo is used when absent
    pub tavily_api_key: Option<String>,

    /// Directory the CLI writes reports into
    pub report_dir: PathBuf,

    /// Log level for the application
    pub log_level: String,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.0,
            max_search_results: 5,
            max_researcher_iterations: 6,
            max_concurrent_research_units: 3,
            simple_search_ceiling: 3,
            complex_search_ceiling: 5,
            tavily_api_key: None,
            report_dir: PathBuf::from("final_reports"),
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; set-but-unparseable variables are
    /// an error rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("OLLAMA_MODEL") {
            config.model = val;
        }

        if let Ok(val) = env::var("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Ok(val) = env::var("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.0)")?;
        }

        config.max_search_results = parse_usize("MAX_SEARCH_RESULTS", config.max_search_results)?;
        config.max_researcher_iterations =
            parse_usize("MAX_RESEARCHER_ITERATIONS", config.max_researcher_iterations)?;
        config.max_concurrent_research_units = parse_usize(
            "MAX_CONCURRENT_RESEARCH_UNITS",
            config.max_concurrent_research_units,
        )?;
        config.simple_search_ceiling =
            parse_usize("SIMPLE_SEARCH_CEILING", config.simple_search_ceiling)?;
        config.complex_search_ceiling =
            parse_usize("COMPLEX_SEARCH_CEILING", config.complex_search_ceiling)?;

        config.tavily_api_key = env::var("TAVILY_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Ok(val) = env::var("REPORT_DIR") {
            config.report_dir = PathBuf::from(val);
        }

        if let Ok(val) = env::var("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if !(1..=20).contains(&self.max_search_results) {
            anyhow::bail!(
                "MAX_SEARCH_RESULTS must be between 1 and 20, got: {}",
                self.max_search_results
            );
        }

        if self.max_researcher_iterations == 0 {
            anyhow::bail!("MAX_RESEARCHER_ITERATIONS must be at least 1");
        }

        if !(1..=5).contains(&self.max_concurrent_research_units) {
            anyhow::bail!(
                "MAX_CONCURRENT_RESEARCH_UNITS must be between 1 and 5, got: {}",
                self.max_concurrent_research_units
            );
        }

        if !(2..=3).contains(&self.simple_search_ceiling) {
            anyhow::bail!(
                "SIMPLE_SEARCH_CEILING must be 2 or 3, got: {}",
                self.simple_search_ceiling
            );
        }

        if self.complex_search_ceiling < self.simple_search_ceiling || self.complex_search_ceiling > 5 {
            anyhow::bail!(
                "COMPLEX_SEARCH_CEILING must be between SIMPLE_SEARCH_CEILING and 5, got: {}",
                self.complex_search_ceiling
            );
        }

        if self.model.is_empty() {
            anyhow::bail!("OLLAMA_MODEL cannot be empty");
        }

        Ok(())
    }
}

fn parse_usize(name: &str, current: usize) -> Result<usize> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid positive integer", name)),
        Err(_) => Ok(current),
    }
}
