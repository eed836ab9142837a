// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
//! Find where each formatted clause ended up in a rewritten paragraph.
//!
//! A clause is first looked up directly (punctuation- and case-insensitive, whole
//! words). Only when that fails is the LLM asked to name the equivalent phrase, and
//! its answer is kept only if it literally occurs in the rewritten text.

use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::formatting::{Clause, FormattingDescriptor};
use crate::api::llm::{strip_reasoning, GenerateRequest, LlmTransport};
use crate::api::prompts::clause_match_prompt;

const IGNORED_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '(', ')'];
const PUNCTUATION_CLASS: &str = r"[.,;:!?()]*";

/// A substring of the final text and the formatting to put back on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingMatch {
    pub matched_text: String,
    pub formatting: FormattingDescriptor,
}

impl From<&Clause> for FormattingMatch {
    fn from(clause: &Clause) -> Self {
        Self { matched_text: clause.text.clone(), formatting: clause.formatting }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelocationReport {
    pub matches: Vec<FormattingMatch>,
    /// Clauses found without asking the LLM
    pub direct: usize,
    /// Clauses placed from a validated LLM answer
    pub disambiguated: usize,
    /// Clauses whose formatting is dropped
    pub discarded: usize,
    pub llm_calls: usize,
}

/// Lowercase, drop the ignored punctuation and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !IGNORED_PUNCTUATION.contains(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Wrap `body` in `\b` on each side where the edge character is a word character.
fn bounded(body: String, edge_source: &str) -> String {
    let lead = match edge_source.chars().next() {
        Some(c) if is_word_char(c) => r"\b",
        _ => "",
    };
    let tail = match edge_source.chars().last() {
        Some(c) if is_word_char(c) => r"\b",
        _ => "",
    };
    format!("{}{}{}", lead, body, tail)
}

/// Pattern matching `normalized` in un-normalized text: any case, ignored punctuation
/// allowed between characters, any whitespace between words.
fn recovery_pattern(normalized: &str) -> String {
    let words: Vec<String> = normalized
        .split(' ')
        .map(|word| {
            word.chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect::<Vec<_>>()
                .join(PUNCTUATION_CLASS)
        })
        .collect();
    let separator = format!(r"{}\s+{}", PUNCTUATION_CLASS, PUNCTUATION_CLASS);
    format!("(?i){}", bounded(words.join(&separator), normalized))
}

/// Look the clause up directly and return the span of `rewritten` it corresponds to,
/// with the rewritten text's own case and punctuation.
pub fn find_direct_match(clause: &str, rewritten: &str) -> Option<String> {
    let needle = normalize(clause);
    if needle.is_empty() {
        return None;
    }

    let whole_word = match Regex::new(&bounded(regex::escape(&needle), &needle)) {
        Ok(re) => re,
        Err(e) => {
            warn!("[find_direct_match] Could not build pattern for \"{}\": {}", clause, e);
            return None;
        }
    };
    if !whole_word.is_match(&normalize(rewritten)) {
        return None;
    }

    match Regex::new(&recovery_pattern(&needle)) {
        Ok(re) => match re.find(rewritten) {
            Some(found) => Some(found.as_str().to_string()),
            None => {
                debug!("[find_direct_match] \"{}\" matched normalized text but no span recovered", clause);
                None
            }
        },
        Err(e) => {
            warn!("[find_direct_match] Could not build recovery pattern for \"{}\": {}", clause, e);
            None
        }
    }
}

fn clean_answer(answer: &str) -> String {
    strip_reasoning(answer)
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .to_string()
}

/// Place every clause in `rewritten`. `original` is the text the clauses came from.
///
/// At most one LLM call is made per clause, and none for clauses found directly. A
/// transport failure drops that clause's formatting.
pub fn relocate_clauses(
    clauses: &[Clause],
    original: &str,
    rewritten: &str,
    transport: &dyn LlmTransport,
    model: &str,
) -> RelocationReport {
    let mut report = RelocationReport::default();

    for clause in clauses {
        if normalize(&clause.text).is_empty() {
            debug!("[relocate_clauses] Skipping punctuation-only clause \"{}\"", clause.text);
            report.discarded += 1;
            continue;
        }

        if let Some(found) = find_direct_match(&clause.text, rewritten) {
            debug!("[relocate_clauses] Direct match \"{}\" -> \"{}\"", clause.text, found);
            report.matches.push(FormattingMatch { matched_text: found, formatting: clause.formatting });
            report.direct += 1;
            continue;
        }

        let request = GenerateRequest::new(model, clause_match_prompt(original, rewritten, &clause.text))
            .with_context(rewritten);
        report.llm_calls += 1;

        match transport.generate(&request) {
            Ok(answer) => {
                let phrase = clean_answer(&answer);
                if !phrase.is_empty() && rewritten.contains(&phrase) {
                    info!("[relocate_clauses] LLM matched \"{}\" -> \"{}\"", clause.text, phrase);
                    report.matches.push(FormattingMatch { matched_text: phrase, formatting: clause.formatting });
                    report.disambiguated += 1;
                } else {
                    warn!(
                        "[relocate_clauses] Discarding LLM answer \"{}\" for \"{}\": not in rewritten text",
                        phrase, clause.text
                    );
                    report.discarded += 1;
                }
            }
            Err(e) => {
                warn!("[relocate_clauses] Clause match request for \"{}\" failed: {}", clause.text, e);
                report.discarded += 1;
            }
        }
    }

    info!(
        "[relocate_clauses] {} direct, {} via LLM, {} discarded",
        report.direct, report.disambiguated, report.discarded
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::ScriptedTransport;

    fn bold_clause(text: &str) -> Clause {
        Clause { text: text.to_string(), formatting: FormattingDescriptor::plain(11.0).with_bold(true) }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Net income (after tax),   INCREASED! "), "net income after tax increased");
        assert_eq!(normalize("?!"), "");
    }

    #[test]
    fn test_direct_match_recovers_original_case_and_punctuation() {
        let rewritten = "This year, Net Income, increased by ten percent.";
        assert_eq!(
            find_direct_match("net income increased", rewritten).as_deref(),
            Some("Net Income, increased")
        );
    }

    #[test]
    fn test_direct_match_requires_whole_words() {
        assert_eq!(find_direct_match("cat", "The category was scattered."), None);
        assert_eq!(find_direct_match("cat", "The cat sat.").as_deref(), Some("cat"));
    }

    #[test]
    fn test_direct_match_makes_no_llm_call() {
        let transport = ScriptedTransport::new(vec![]);
        let report = relocate_clauses(
            &[bold_clause("net income increased")],
            "Our net income increased this year.",
            "This year our NET INCOME INCREASED strongly.",
            &transport,
            "m",
        );
        assert_eq!(transport.call_count(), 0);
        assert_eq!(report.direct, 1);
        assert_eq!(report.matches[0].matched_text, "NET INCOME INCREASED");
    }

    #[test]
    fn test_llm_answer_not_in_text_is_discarded() {
        let transport = ScriptedTransport::new(vec![Ok("profits went up".to_string())]);
        let report = relocate_clauses(
            &[bold_clause("net income increased")],
            "Our net income increased this year.",
            "Earnings rose sharply this year.",
            &transport,
            "m",
        );
        assert_eq!(transport.call_count(), 1);
        assert!(report.matches.is_empty());
        assert_eq!(report.discarded, 1);
    }

    #[test]
    fn test_llm_answer_validated_and_cleaned() {
        let transport = ScriptedTransport::new(vec![Ok("<think>hm</think> \"Earnings rose\"".to_string())]);
        let report = relocate_clauses(
            &[bold_clause("net income increased")],
            "Our net income increased this year.",
            "Earnings rose sharply this year.",
            &transport,
            "m",
        );
        assert_eq!(report.disambiguated, 1);
        assert_eq!(report.matches[0].matched_text, "Earnings rose");
        assert!(transport.prompts()[0].contains("\"net income increased\""));
    }

    #[test]
    fn test_transport_failure_discards_clause() {
        let transport = ScriptedTransport::failing();
        let report = relocate_clauses(&[bold_clause("gone")], "It is gone.", "Vanished.", &transport, "m");
        assert!(report.matches.is_empty());
        assert_eq!(report.llm_calls, 1);
    }
}
