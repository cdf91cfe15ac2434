//! Verdict report synthesis and persistence

use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::info;

use crate::error::{Boundary, FactCheckError};
use crate::llm::LanguageModel;
use crate::research::{CitationRegistry, ClaimStatement, FactCheckPrompts};

const REPORT_PREAMBLE: &str = "You are a professional fact-checker writing a standalone verdict report in Markdown.";

const DEFAULT_FILE_STEM: &str = "fact_check_report";

const MAX_FILE_STEM_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    True,
    False,
    Misleading,
    Unverified,
}

impl Verdict {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "misleading" => Some(Self::Misleading),
            "unverified" => Some(Self::Unverified),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "True",
            Self::False => "False",
            Self::Misleading => "Misleading",
            Self::Unverified => "Unverified",
        };
        f.write_str(s)
    }
}

/// A finished verdict report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactCheckReport {
    pub claim: ClaimStatement,
    pub verdict: Verdict,
    pub markdown: String,
}

impl FactCheckReport {
    /// Parse the verdict out of the `## Verdict` section
    pub fn parse(claim: ClaimStatement, markdown: impl Into<String>) -> Result<Self, FactCheckError> {
        let markdown = markdown.into();
        let verdict = parse_verdict(&markdown)
            .ok_or_else(|| FactCheckError::schema(Boundary::Report, "missing or unknown verdict"))?;
        Ok(Self {
            claim,
            verdict,
            markdown,
        })
    }

    /// Text of the first `# ` heading
    pub fn title(&self) -> Option<&str> {
        self.markdown
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix("# "))
            .map(str::trim)
    }

    /// File name derived from the title
    pub fn file_name(&self) -> String {
        format!("{}.md", file_stem(self.title().unwrap_or(DEFAULT_FILE_STEM)))
    }

    /// Write the report into `dir`, creating it if needed
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf, FactCheckError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.markdown)?;
        info!(path = %path.display(), "Report saved");
        Ok(path)
    }
}

fn parse_verdict(markdown: &str) -> Option<Verdict> {
    let mut lines = markdown.lines().map(str::trim);
    let heading = lines.find(|l| {
        l.strip_prefix("##")
            .map(|rest| rest.trim_start_matches('#').trim().to_lowercase().starts_with("verdict"))
            .unwrap_or(false)
    })?;

    let inline = heading
        .trim_start_matches('#')
        .trim()
        .get("verdict".len()..)
        .unwrap_or("")
        .to_string();
    let body = lines.take_while(|l| !l.starts_with('#')).find(|l| !l.is_empty());

    let verdict = [Some(inline.as_str()), body]
        .into_iter()
        .flatten()
        .find_map(first_verdict_word);
    verdict
}

fn first_verdict_word(line: &str) -> Option<Verdict> {
    let cleaned: String = line
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let mut words = cleaned.split_whitespace();
    let mut word = words.next()?;
    if word.eq_ignore_ascii_case("verdict") {
        word = words.next()?;
    }
    Verdict::from_word(word)
}

fn file_stem(title: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let non_word = NON_WORD.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid pattern"));
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[-\s]+").expect("valid pattern"));

    let cleaned = non_word.replace_all(title, "");
    let joined = separators.replace_all(&cleaned, "_");
    let stem: String = joined.chars().take(MAX_FILE_STEM_CHARS).collect();
    if stem.trim_matches('_').is_empty() {
        DEFAULT_FILE_STEM.to_string()
    } else {
        stem
    }
}

/// Turns the merged evidence into a verdict report
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write_report(
        &self,
        claim: &ClaimStatement,
        notes: &[String],
        sources: &CitationRegistry,
    ) -> Result<FactCheckReport, FactCheckError>;
}

/// Model-backed report writer
pub struct ModelReportWriter {
    model: Arc<dyn LanguageModel>,
}

impl ModelReportWriter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ReportWriter for ModelReportWriter {
    async fn write_report(
        &self,
        claim: &ClaimStatement,
        notes: &[String],
        sources: &CitationRegistry,
    ) -> Result<FactCheckReport, FactCheckError> {
        let prompt = FactCheckPrompts::final_report(claim.as_str(), &notes.join("\n\n---\n\n"), &sources.render());
        let markdown = self.model.complete(REPORT_PREAMBLE, &prompt).await?;
        FactCheckReport::parse(claim.clone(), markdown.trim())
    }
}
