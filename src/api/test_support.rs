// rust/src/api/test_support.rs
//
// Shared fixtures for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::api::config::RewriteOptions;
use crate::api::error::{Result, RewriteError};
use crate::api::formatting::FormattingDescriptor;
use crate::api::llm::{GenerateRequest, LlmTransport};

/// Replays scripted replies in order and records every prompt. Runs out into
/// transport errors.
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<String>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self { replies: RefCell::new(replies.into()), prompts: RefCell::new(Vec::new()) }
    }

    /// A transport whose every call fails.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl LlmTransport for ScriptedTransport {
    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        self.prompts.borrow_mut().push(request.prompt.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(RewriteError::Transport("connection refused".to_string())))
    }
}

/// Plain 11pt body text.
pub fn body() -> FormattingDescriptor {
    FormattingDescriptor::plain(11.0)
}

/// Default options without retry delays.
pub fn fast_options() -> RewriteOptions {
    RewriteOptions { link_retry_delay_ms: 0, ..RewriteOptions::default() }
}

/// `n` distinct words separated by single spaces.
pub fn words(n: usize) -> String {
    (1..=n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
}
