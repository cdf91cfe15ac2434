//! Fact-checking prompt templates
//!
//! Prompts for every model boundary of the pipeline:
//! - Scope: clarification and claim brief
//! - Supervisor: lead-researcher planning
//! - Worker: search reflection
//! - Compressor: transcript to evidence bundle
//! - Report: final verdict document
//!
//! Structured boundaries ask for a single JSON object; the exact keys are
//! listed in each prompt and enforced by the typed result on our side.

use chrono::Utc;

/// Prompt templates for the fact-checking pipeline
pub struct FactCheckPrompts;

impl FactCheckPrompts {
    /// Get the current date formatted for prompts
    fn current_date() -> String {
        Utc::now().format("%a %b %-d, %Y").to_string()
    }

    /// Decide whether the conversation holds a checkable claim
    pub fn clarify(messages: &str) -> String {
        format!(
            r#"These are the conversations exchanged so far with the user:
<Messages>
{messages}
</Messages>

The current date is {date}.

Determine whether a clarifying question is needed, or if the provided details are sufficient to begin fact-checking.

Important:
- If the user input is a **question** (e.g., "Is X true?" or "What is Y?"), it is **not acceptable** as a fact to check.
- If acronyms, vague wording, or ambiguous details appear, request clarification from the user.
- If the user's input is a factual claim or statement, proceed to fact-check.

When asking a clarifying question:
- Be concise but make sure the claim becomes a verifiable fact.
- Ask for the **exact claim** in statement form and any missing **context** (timeframe, location, people, organization).

Respond with a single JSON object with exactly these keys:
{{"need_clarification": true|false, "question": "<clarifying question or empty>", "verification": "<acknowledgement or empty>"}}

When no clarification is needed, the verification message confirms the claim is clear, restates it briefly and says fact-checking will now begin."#,
            messages = messages,
            date = Self::current_date(),
        )
    }

    /// Turn the conversation into one first-person claim statement
    pub fn brief(messages: &str) -> String {
        format!(
            r#"You will be given the messages exchanged so far between yourself and the user.
Translate them into a **clear, verifiable factual claim** that will guide fact-checking.

<Messages>
{messages}
</Messages>

Today's date is {date}.

Guidelines:
1. Frame it as a factual statement, never a question.
   - WRONG "Is COVID-19 caused by 5G?" → CORRECT "COVID-19 is caused by 5G."
2. Include context if available (timeframe, region, organization, person).
3. If information is missing, mark it as unspecified. Do not invent it.
4. Make the claim precise enough to fact-check.
5. Use first person phrasing as if I (the user) am asserting the claim.

Respond with a single JSON object: {{"claim": "I claim that ..."}}"#,
            messages = messages,
            date = Self::current_date(),
        )
    }

    /// System prompt of the lead researcher (decomposition and gap planning)
    pub fn lead_researcher(max_concurrent_research_units: usize, budget_remaining: usize) -> String {
        format!(
            r#"You are a fact-checking supervisor. You plan verification research that specialised sub-agents will carry out.
For context, today's date is {date}.

<Task>
Decide which independent research tasks to delegate next for the claim, or declare research complete when the evidence gathered (supporting and opposing) is enough for a verdict.
</Task>

<Instructions>
1. Read the claim carefully: what exactly needs to be verified?
2. Break it into distinct sub-questions only when they are independent and clearly separable.
3. Review the evidence already gathered: what is missing, redundant or unclear?
</Instructions>

<Hard Limits>
- Return at most {max_units} tasks.
- Favor a single task for simple claims.
- Never split overlapping or dependent sub-questions.
- {budget} supervisor actions remain in the budget.
</Hard Limits>

<Scaling Rules>
- Simple fact check (single statistic, date, quote, or event): one task.
  Example: "Nigeria's inflation rate hit 30% in July 2025" → 1 task
- Comparisons or multi-entity claims: one task per entity.
  Example: "Both WHO and CDC recommended mask mandates in 2020" → 2 tasks
- Complex claims: split by geography, timeframe or sub-claim, only along non-overlapping axes.
</Scaling Rules>

<Important Reminders>
- Sub-agents cannot see each other's work. Every task must be standalone.
- Never use acronyms or ambiguous terms without expansion.
- Do NOT write the verdict yourself.
</Important Reminders>

Respond with a single JSON object:
{{"reflection": "<your assessment of the evidence so far>", "research_complete": true|false, "tasks": [{{"instructions": "<standalone sub-claim to verify>", "complexity": "simple"|"complex"}}]}}
Use an empty task list together with "research_complete": true when no further research is needed."#,
            date = Self::current_date(),
            max_units = max_concurrent_research_units,
            budget = budget_remaining,
        )
    }

    /// User message for one planning step
    pub fn planning_request(claim: &str, round: usize, notes: &str) -> String {
        let evidence = if notes.trim().is_empty() {
            "No evidence gathered yet.".to_string()
        } else {
            notes.to_string()
        };
        format!(
            "<Claim>\n{claim}\n</Claim>\n\n<Round>{round}</Round>\n\n<Evidence>\n{evidence}\n</Evidence>"
        )
    }

    /// System prompt of a research worker's reflection step
    pub fn researcher_reflection(search_ceiling: usize) -> String {
        format!(
            r#"You are a research assistant conducting **fact-checking** on one sub-claim.
For context, today's date is {date}.

<Task>
You have just run a web search. Reflect on the results:
- Did this evidence support or contradict the claim?
- Which aspects are verified, unclear, or disproven?
- Do I have enough to reach a verdict?
</Task>

<Instructions>
1. Start broad, then narrow searches to specific details (official statements, data).
2. Stop when the claim is clearly confirmed, refuted, or mixed, or when you have 3+ credible sources.
3. You may run at most {ceiling} searches in total.
</Instructions>

Respond with a single JSON object:
{{"thought": "<your reflection>", "assessment": "supports"|"contradicts"|"unclear"|"insufficient", "decision": "continue"|"stop", "next_query": "<next search query, empty when stopping>"}}"#,
            date = Self::current_date(),
            ceiling = search_ceiling,
        )
    }

    /// User message for one reflection step
    pub fn reflection_request(instructions: &str, transcript: &str, searches_left: usize) -> String {
        format!(
            "<Sub-claim>\n{instructions}\n</Sub-claim>\n\n<Transcript>\n{transcript}\n</Transcript>\n\nSearches left: {searches_left}"
        )
    }

    /// System prompt of the evidence compressor
    pub fn compress_system() -> String {
        format!(
            r#"You are cleaning up research findings gathered by a fact-checking researcher.
Today's date is {date}.

<Task>
- Keep only **factual evidence** found.
- Remove duplicate or irrelevant info.
- Preserve all quotes, statistics, and direct statements.
- State whether the evidence supports or contradicts the claim.
</Task>

<Rules>
1. "key_excerpts" holds at most 5 quotes, each copied character-for-character from the search results. Never paraphrase an excerpt.
2. "summary" keeps numbers, dates, names and direct statements exactly as found.
3. "stance" is exactly one of: "Supports", "Contradicts", "Mixed", "Unclear".
4. Cite with inline markers [1], [2], [3] in "summary" only; marker [n] refers to the n-th entry of "sources". Do not add markers to excerpts.
5. "sources" lists every page the evidence came from, as {{"title": ..., "url": ...}}.
</Rules>

Respond with a single JSON object:
{{"summary": "...", "stance": "Supports", "key_excerpts": ["..."], "sources": [{{"title": "...", "url": "..."}}]}}"#,
            date = Self::current_date(),
        )
    }

    /// User message for compression
    pub fn compress_request(instructions: &str, transcript: &str) -> String {
        format!(
            r#"All messages below are research conducted for the following fact-checking sub-claim:

CLAIM: {instructions}

<Transcript>
{transcript}
</Transcript>

Clean up these findings while preserving ALL factual information relevant to verifying or refuting the claim.
- DO NOT paraphrase quoted evidence; keep it verbatim
- DO NOT lose any details, facts, quotes, names, dates, or statistics
- Keep citations consistent with the sources list"#
        )
    }

    /// Final report prompt
    pub fn final_report(claim: &str, findings: &str, sources: &str) -> String {
        format!(
            r#"Based on the research conducted, create a fact-checking report:

<Claim>
{claim}
</Claim>

<Date>
{date}
</Date>

<Findings>
{findings}
</Findings>

<Sources>
{sources}
</Sources>

Your report must:
1. State clearly if the claim is **True, False, Misleading, or Unverified**.
2. Provide supporting and opposing evidence.
3. Use inline citations [1], [2], [3] exactly as numbered in the findings.
4. End with a ### Sources section, one source per line formatted as:
  [1] Source Title: URL

Structure:
# <short descriptive title>
## Claim
## Verdict
(the first word of this section is one of: True, False, Misleading, Unverified)
## Evidence For
## Evidence Against
## Mixed/Unclear Evidence
## Conclusion
### Sources

- Be precise: readers rely on citations to verify information.
- DO NOT refer to yourself, AI, the research process, or the tools. The report must read like a standalone professional document.
- Default to paragraphs; use bullet points where lists help."#,
            claim = claim,
            date = Self::current_date(),
            findings = findings,
            sources = sources,
        )
    }
}
