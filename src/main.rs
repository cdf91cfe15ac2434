//! # Fact-Check Agent
//!
//! Command-line driver for the supervised fact-checking pipeline.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "Both WHO and CDC recommended mask mandates in 2020"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use factcheck_agent::{Config, FactCheckPipeline, PipelineOutcome, StopReason};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "factcheck-agent",
    version,
    about = "Checks a claim against web evidence with parallel research agents",
    long_about = r#"
Fact-Check Agent - evidence-backed verdicts for a single claim.

The claim is clarified, rewritten as a statement, researched by bounded
parallel agents and written up as a report with numbered citations
(True / False / Misleading / Unverified).

PREREQUISITES:
  1. Install Ollama: https://ollama.ai
  2. Pull a model: ollama pull llama3.2
  3. Start Ollama: ollama serve
  4. Optional: TAVILY_API_KEY for Tavily search (DuckDuckGo otherwise)

EXAMPLES:
  factcheck-agent "Nigeria's inflation rate hit 30% in July 2025"
  factcheck-agent --budget 4 --parallel 2 "Both WHO and CDC recommended mask mandates in 2020"
  factcheck-agent --no-save --model qwen2.5 "The Eiffel Tower was completed in 1889"
"#
)]
struct Args {
    /// The claim to check (prompted for on stdin when omitted)
    #[arg(value_name = "CLAIM")]
    claim: Option<String>,

    /// The Ollama model to use (overrides OLLAMA_MODEL env var)
    #[arg(short = 'm', long = "model", env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Combined supervisor budget (dispatches plus reflections)
    #[arg(short = 'b', long = "budget")]
    budget: Option<usize>,

    /// Research tasks per round
    #[arg(short = 'p', long = "parallel")]
    parallel: Option<usize>,

    /// Directory reports are saved into
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print the report without saving it
    #[arg(long = "no-save", default_value = "false")]
    no_save: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(budget) = self.budget {
            config.max_researcher_iterations = budget;
        }
        if let Some(parallel) = self.parallel {
            config.max_concurrent_research_units = parallel;
        }
        if let Some(output) = &self.output {
            config.report_dir = output.clone();
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    args.apply(&mut config);

    init_logging(args.verbose, &config.log_level)?;
    config.validate()?;

    info!(
        model = %config.model,
        host = %config.ollama_host,
        budget = config.max_researcher_iterations,
        parallel = config.max_concurrent_research_units,
        search = if config.tavily_api_key.is_some() { "tavily" } else { "duckduckgo" },
        "Configuration loaded"
    );

    let mut input = match &args.claim {
        Some(claim) => claim.clone(),
        None => prompt_line("What claim would you like me to fact-check?")?,
    };

    let pipeline = FactCheckPipeline::from_config(&config);
    let mut session = pipeline.session();

    loop {
        let outcome = match session.submit(input.clone()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Fact-check failed");
                eprintln!("\nFact-check failed: {}", e);
                if e.to_string().contains("ollama") {
                    eprintln!("\nTip: make sure Ollama is running (ollama serve) and the model is pulled.");
                }
                return Err(e.into());
            }
        };

        match outcome {
            PipelineOutcome::NeedsClarification { question } => {
                println!("\nNeed more information to verify this claim:\n{}\n", question);
                input = prompt_line("Please provide additional details")?;
            }
            PipelineOutcome::Report { report, evidence } => {
                println!("\n{}", "=".repeat(60));
                println!("FACT-CHECK REPORT ({})", report.verdict);
                println!("{}\n", "=".repeat(60));
                println!("{}", report.markdown);
                println!("\n{}", "=".repeat(60));

                if evidence.stop_reason == Some(StopReason::BudgetExhausted) {
                    println!("Research budget was exhausted; evidence may be partial.");
                }

                if !args.no_save {
                    let path = report.save_to_dir(&config.report_dir)?;
                    println!("Report saved to: {}", path.display());
                }
                break;
            }
            PipelineOutcome::InsufficientEvidence { claim, evidence } => {
                println!("\nInsufficient evidence to fact-check: {}", claim);
                println!(
                    "Rounds: {}, failed research tasks: {}, stop reason: {:?}",
                    evidence.round_count, evidence.failed_tasks, evidence.stop_reason
                );
                break;
            }
        }
    }

    info!("Fact-check completed");
    Ok(())
}

/// Print a prompt and read one non-empty line from stdin
fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}: ", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("No input provided");
    }
    Ok(line)
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// `--verbose` forces DEBUG; otherwise the configured level (`RUST_LOG`)
/// is used, falling back to INFO when it doesn't parse.
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["test", "The Eiffel Tower was completed in 1889"]);
        assert_eq!(args.claim.as_deref(), Some("The Eiffel Tower was completed in 1889"));
        assert!(!args.no_save);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_without_claim() {
        let args = Args::parse_from(["test"]);
        assert!(args.claim.is_none());
    }

    #[test]
    fn test_args_with_flags() {
        let args = Args::parse_from([
            "test",
            "--budget",
            "4",
            "--parallel",
            "2",
            "--output",
            "/tmp/reports",
            "--no-save",
            "--verbose",
            "--model",
            "llama3.2",
            "Claim text",
        ]);

        assert_eq!(args.claim.as_deref(), Some("Claim text"));
        assert_eq!(args.budget, Some(4));
        assert_eq!(args.parallel, Some(2));
        assert!(args.no_save);
        assert!(args.verbose);

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.max_researcher_iterations, 4);
        assert_eq!(config.max_concurrent_research_units, 2);
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.model, "llama3.2");
    }
}
