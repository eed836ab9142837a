// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
// Rewrite options and named rewrite intents.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::api::error::{Result, RewriteError};
use crate::api::retry::{Backoff, RetryPolicy};

const PROFESSIONAL_PROMPT: &str = "Rewrite this and make it sound more professional while not leaving out any info. Do NOT increase the word count, reduce if possible.";
const CONCISE_PROMPT: &str = "Reduce the word count as much as possible while retaining the key points";
const CUSTOM_PLACEHOLDER: &str = "Replace this with your own prompt";

/// The rewrite instruction chosen by the user.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum PromptIntent {
    /// Make the paragraph sound more professional
    #[default]
    Professional,

    /// Cut the word count as far as possible
    Concise,

    /// User-supplied instruction
    Custom(String),
}

impl PromptIntent {
    /// Parse an intent from its selector name ("professional", "concise", "custom").
    /// Unknown names fall back to professional.
    pub fn from_name(name: &str, custom_text: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "concise" => PromptIntent::Concise,
            "custom" => PromptIntent::Custom(custom_text.to_string()),
            _ => PromptIntent::Professional,
        }
    }

    /// Get the base instruction text.
    ///
    /// An empty custom instruction, or the untouched placeholder, falls back to
    /// the professional instruction.
    pub fn instruction(&self) -> &str {
        match self {
            PromptIntent::Professional => PROFESSIONAL_PROMPT,
            PromptIntent::Concise => CONCISE_PROMPT,
            PromptIntent::Custom(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed == CUSTOM_PLACEHOLDER {
                    PROFESSIONAL_PROMPT
                } else {
                    trimmed
                }
            }
        }
    }

    /// Get the intent name for logging
    pub fn name(&self) -> &str {
        match self {
            PromptIntent::Professional => "professional",
            PromptIntent::Concise => "concise",
            PromptIntent::Custom(_) => "custom",
        }
    }
}

/// Options for one rewrite pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Model identifier passed through to the transport untouched
    pub model: String,
    /// Which rewrite instruction to use
    pub intent: PromptIntent,
    /// Rewritten paragraphs above `original_words * ratio` get one shorten request
    pub word_budget_ratio: f64,
    /// Additional generations allowed when the tracked hyperlink text goes missing
    pub link_retry_attempts: u32,
    /// Base delay between hyperlink retries (grows linearly)
    pub link_retry_delay_ms: u64,
    /// Number of follow-up shorten requests
    pub shorten_attempts: u32,
    /// Maximum chunk length for the reapplier's chunked search fallback
    pub search_chunk_chars: usize,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            model: "qwq:latest".to_string(),
            intent: PromptIntent::Professional,
            word_budget_ratio: 1.1,
            link_retry_attempts: 3,
            link_retry_delay_ms: 500,
            shorten_attempts: 1,
            search_chunk_chars: 100,
        }
    }
}

impl RewriteOptions {
    /// Parse options from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: RewriteOptions =
            serde_json::from_str(json).map_err(|e| RewriteError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file {}", path.display()))?;
        Ok(Self::from_json_str(&raw)?)
    }

    fn validate(&self) -> Result<()> {
        if !(self.word_budget_ratio.is_finite() && self.word_budget_ratio >= 1.0) {
            return Err(RewriteError::Config(format!(
                "word_budget_ratio must be >= 1.0, got {}",
                self.word_budget_ratio
            )));
        }
        if self.search_chunk_chars == 0 {
            return Err(RewriteError::Config("search_chunk_chars must be positive".to_string()));
        }
        Ok(())
    }

    /// Retry policy for hyperlink preservation: first attempt plus `link_retry_attempts`,
    /// linearly increasing delay, transport failures end the loop.
    pub fn link_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.link_retry_attempts + 1,
            base_delay: Duration::from_millis(self.link_retry_delay_ms),
            backoff: Backoff::Linear,
            retry_on_error: false,
        }
    }
}
