// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
//! Per-paragraph rewrite pipeline.
//!
//! ```text
//! Idle -> FormatDetected -> LeadExtracted -> LinkDetected -> Generating
//!      -> WordCountCheck -> ClauseMatching -> Done | Failed
//! ```
//!
//! The pipeline only reads from the document. Its result is a pending
//! [`ReimaginedParagraph`] that the reapplier later writes back.

use std::fmt;

use log::{debug, info, warn};

use crate::api::clause_relocator::{relocate_clauses, FormattingMatch};
use crate::api::config::RewriteOptions;
use crate::api::error::{Result, RewriteError};
use crate::api::formatting::{detect_formatting, Clause, FormattingDescriptor, ParagraphFormatting};
use crate::api::host::DocumentHost;
use crate::api::leading_clause::{extract_leading, LeadingSplit};
use crate::api::llm::{strip_reasoning, GenerateRequest, LlmTransport};
use crate::api::prompts::{rewrite_prompt, shorten_prompt};
use crate::api::retry::{retry_until, RetryOutcome};
use crate::api::text_segmenter::count_words;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStage {
    Idle,
    FormatDetected,
    LeadExtracted,
    LinkDetected,
    Generating,
    WordCountCheck,
    ClauseMatching,
    Done,
    Failed,
}

impl fmt::Display for RewriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewriteStage::Idle => "idle",
            RewriteStage::FormatDetected => "format_detected",
            RewriteStage::LeadExtracted => "lead_extracted",
            RewriteStage::LinkDetected => "link_detected",
            RewriteStage::Generating => "generating",
            RewriteStage::WordCountCheck => "word_count_check",
            RewriteStage::ClauseMatching => "clause_matching",
            RewriteStage::Done => "done",
            RewriteStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A hyperlink whose anchor text must survive the rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkInfo {
    pub text: String,
    pub address: String,
}

/// Pending rewrite of one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ReimaginedParagraph {
    /// Leading block plus rewritten remainder, or the original text when reverted
    pub text: String,
    pub formatting_matches: Vec<FormattingMatch>,
    pub leading_format_text: Option<String>,
    pub leading_format: Option<FormattingDescriptor>,
    /// Reapplied after the leading block
    pub modal_format: Option<FormattingDescriptor>,
    pub link: Option<LinkInfo>,
    /// The remainder fell back to the original text
    pub reverted_llm_part: bool,
    pub error: Option<RewriteError>,
}

#[derive(Debug, Clone)]
pub struct ReimagineOutcome {
    pub reimagined: ReimaginedParagraph,
    /// Formatting analysis the rewrite was based on
    pub formatting: ParagraphFormatting,
    /// Done or Failed
    pub stage: RewriteStage,
    pub llm_calls: usize,
}

/// Runs the rewrite pipeline against one transport with fixed options.
pub struct Reimaginer<'a> {
    transport: &'a dyn LlmTransport,
    options: &'a RewriteOptions,
}

struct Pipeline<'p> {
    index: usize,
    stage: RewriteStage,
    llm_calls: usize,
    source: &'p str,
    formatting: ParagraphFormatting,
    split: LeadingSplit,
    link: Option<LinkInfo>,
}

impl<'p> Pipeline<'p> {
    fn advance(&mut self, next: RewriteStage) {
        debug!("[reimagine] Paragraph {}: {} -> {}", self.index + 1, self.stage, next);
        self.stage = next;
    }

    fn trailing_clauses(&self) -> &[Clause] {
        &self.formatting.clauses[self.split.absorbed_clauses..]
    }

    fn assemble(&self, remainder: &str) -> String {
        format!("{}{}", self.split.leading_str(), remainder)
    }

    fn keeps_link(&self, remainder: &str) -> bool {
        match &self.link {
            Some(link) => self.assemble(remainder).contains(&link.text),
            None => true,
        }
    }

    fn link_text(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.text.as_str())
    }

    /// Bundle carrying the untouched source; original clauses still line up with it.
    fn unchanged(&self, error: Option<RewriteError>) -> ReimaginedParagraph {
        ReimaginedParagraph {
            text: self.source.to_string(),
            formatting_matches: self.trailing_clauses().iter().map(FormattingMatch::from).collect(),
            leading_format_text: self.split.leading_text.clone(),
            leading_format: self.split.leading_format,
            modal_format: self.formatting.modal,
            link: self.link.clone(),
            reverted_llm_part: true,
            error,
        }
    }

    fn finish(self, reimagined: ReimaginedParagraph, stage: RewriteStage) -> ReimagineOutcome {
        debug!("[reimagine] Paragraph {}: {} -> {}", self.index + 1, self.stage, stage);
        ReimagineOutcome { reimagined, formatting: self.formatting, stage, llm_calls: self.llm_calls }
    }
}

fn as_generation_error(error: RewriteError) -> RewriteError {
    match error {
        RewriteError::Generation(_) => error,
        other => RewriteError::Generation(other.to_string()),
    }
}

impl<'a> Reimaginer<'a> {
    pub fn new(transport: &'a dyn LlmTransport, options: &'a RewriteOptions) -> Self {
        Self { transport, options }
    }

    fn generate(&self, prompt: String, context: &str) -> Result<String> {
        let request = GenerateRequest::new(self.options.model.as_str(), prompt).with_context(context);
        let text = strip_reasoning(&self.transport.generate(&request)?);
        if text.is_empty() {
            return Err(RewriteError::Generation("LLM returned an empty response".to_string()));
        }
        Ok(text)
    }

    /// Rewrite paragraph `index` whose current text is `source`.
    ///
    /// Never fails as a whole: a generation failure yields a `Failed` outcome whose
    /// bundle carries the original text and the error.
    pub fn reimagine(&self, host: &dyn DocumentHost, index: usize, source: &str) -> ReimagineOutcome {
        info!("[reimagine] Paragraph {} ({} intent)", index + 1, self.options.intent.name());

        let detection = detect_formatting(host, index);
        if let Some(e) = &detection.error {
            warn!("[reimagine] Paragraph {}: continuing without formatting: {}", index + 1, e);
        }
        let formatting = detection.formatting;
        let split = extract_leading(source, &formatting);
        let mut pipeline = Pipeline {
            index,
            stage: RewriteStage::Idle,
            llm_calls: 0,
            source,
            formatting,
            split,
            link: None,
        };
        pipeline.advance(RewriteStage::FormatDetected);

        if let Some(leading) = &pipeline.split.leading_text {
            info!("[reimagine] Paragraph {}: keeping leading block \"{}\"", index + 1, leading);
        }
        pipeline.advance(RewriteStage::LeadExtracted);

        pipeline.link = match host.hyperlinks(index) {
            Ok(links) => links
                .into_iter()
                .find(|l| !l.text.trim().is_empty())
                .map(|l| LinkInfo { text: l.text, address: l.address }),
            Err(e) => {
                warn!("[reimagine] Paragraph {}: could not read hyperlinks: {}", index + 1, e);
                None
            }
        };
        if let Some(link) = &pipeline.link {
            info!("[reimagine] Paragraph {}: protecting link text \"{}\"", index + 1, link.text);
        }
        pipeline.advance(RewriteStage::LinkDetected);

        if pipeline.split.remainder.trim().is_empty() {
            info!("[reimagine] Paragraph {}: nothing left to rewrite after leading block", index + 1);
            let bundle = pipeline.unchanged(None);
            return pipeline.finish(bundle, RewriteStage::Done);
        }

        pipeline.advance(RewriteStage::Generating);
        let (mut remainder, reverted) = match self.generate_remainder(&mut pipeline) {
            Ok(generated) => generated,
            Err(e) => {
                warn!("[reimagine] Paragraph {}: generation failed: {}", index + 1, e);
                let bundle = pipeline.unchanged(Some(as_generation_error(e)));
                return pipeline.finish(bundle, RewriteStage::Failed);
            }
        };

        if !reverted {
            pipeline.advance(RewriteStage::WordCountCheck);
            remainder = self.enforce_word_budget(&mut pipeline, remainder);
        }

        pipeline.advance(RewriteStage::ClauseMatching);
        let formatting_matches = if reverted {
            pipeline.trailing_clauses().iter().map(FormattingMatch::from).collect()
        } else {
            let report = relocate_clauses(
                pipeline.trailing_clauses(),
                &pipeline.split.remainder,
                &remainder,
                self.transport,
                &self.options.model,
            );
            pipeline.llm_calls += report.llm_calls;
            report.matches
        };

        let bundle = ReimaginedParagraph {
            text: pipeline.assemble(&remainder),
            formatting_matches,
            leading_format_text: pipeline.split.leading_text.clone(),
            leading_format: pipeline.split.leading_format,
            modal_format: pipeline.formatting.modal,
            link: pipeline.link.clone(),
            reverted_llm_part: reverted,
            error: None,
        };
        info!(
            "[reimagine] Paragraph {}: done ({} words -> {} words, reverted={})",
            index + 1,
            count_words(source),
            count_words(&bundle.text),
            reverted
        );
        pipeline.finish(bundle, RewriteStage::Done)
    }

    /// Generate the rewritten remainder, retrying while the tracked link text is lost.
    /// Returns the remainder and whether it fell back to the original.
    fn generate_remainder(&self, pipeline: &mut Pipeline<'_>) -> Result<(String, bool)> {
        let prompt = rewrite_prompt(&self.options.intent, &pipeline.split.remainder, pipeline.link_text());
        let mut policy = self.options.link_retry_policy();
        if pipeline.link.is_none() {
            policy.max_attempts = 1;
        }

        let mut calls = 0;
        let outcome = retry_until(
            &policy,
            |attempt| {
                calls += 1;
                if attempt > 1 {
                    info!("[reimagine] Paragraph {}: link text missing, attempt {}", pipeline.index + 1, attempt);
                }
                self.generate(prompt.clone(), &pipeline.split.remainder)
            },
            |draft| pipeline.keeps_link(draft),
        );
        pipeline.llm_calls += calls;

        match outcome {
            RetryOutcome::Accepted { value, .. } => Ok((value, false)),
            RetryOutcome::Exhausted { attempts, .. } => {
                warn!(
                    "[reimagine] Paragraph {}: link text lost after {} attempts, reverting",
                    pipeline.index + 1,
                    attempts
                );
                Ok((pipeline.split.remainder.clone(), true))
            }
            RetryOutcome::Failed { error, attempts: 1 } => Err(error),
            RetryOutcome::Failed { error, attempts } => {
                warn!(
                    "[reimagine] Paragraph {}: link retry {} failed ({}), reverting",
                    pipeline.index + 1,
                    attempts,
                    error
                );
                Ok((pipeline.split.remainder.clone(), true))
            }
        }
    }

    /// Ask for a shorter draft while the assembled text is over budget. A failed or
    /// invalid shortening keeps the longer draft.
    fn enforce_word_budget(&self, pipeline: &mut Pipeline<'_>, mut draft: String) -> String {
        let original_words = count_words(pipeline.source);
        let limit = original_words as f64 * self.options.word_budget_ratio;

        for attempt in 1..=self.options.shorten_attempts {
            let draft_words = count_words(&pipeline.assemble(&draft));
            if draft_words as f64 <= limit {
                break;
            }
            info!(
                "[reimagine] Paragraph {}: {} words exceeds budget of {:.1} (original {}), shortening ({})",
                pipeline.index + 1,
                draft_words,
                limit,
                original_words,
                attempt
            );

            let prompt =
                shorten_prompt(&self.options.intent, &draft, original_words, draft_words, pipeline.link_text());
            pipeline.llm_calls += 1;
            match self.generate(prompt, &draft) {
                Ok(shorter) if pipeline.keeps_link(&shorter) => {
                    debug!(
                        "[reimagine] Paragraph {}: shortened to {} words",
                        pipeline.index + 1,
                        count_words(&pipeline.assemble(&shorter))
                    );
                    draft = shorter;
                }
                Ok(_) => {
                    warn!("[reimagine] Paragraph {}: shortened draft lost link text, keeping longer draft", pipeline.index + 1);
                    break;
                }
                Err(e) => {
                    warn!("[reimagine] Paragraph {}: shortening failed ({}), keeping longer draft", pipeline.index + 1, e);
                    break;
                }
            }
        }
        draft
    }
}
