// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
//! Capabilities the rewrite pipeline needs from the document editor.
//!
//! Mutations are queued by the host and only become observable after [`DocumentHost::sync`].
//! A range obtained before a sync that changed its paragraph must not be reused.

use serde::{Deserialize, Serialize};

use crate::api::error::Result;
use crate::api::formatting::FormattingDescriptor;

/// Default single-search length limit of word-processor hosts.
pub const DEFAULT_MAX_SEARCH_CHARS: usize = 255;

/// A span inside one paragraph, in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub paragraph: usize,
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A formatting-homogeneous run as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub formatting: FormattingDescriptor,
}

/// A hyperlink inside a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    pub text: String,
    pub address: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SearchOptions {
    pub match_case: bool,
    pub match_whole_word: bool,
}

pub trait DocumentHost {
    /// Plain text of every paragraph, in document order.
    fn paragraph_texts(&self) -> Result<Vec<String>>;

    /// Range covering the whole paragraph.
    fn paragraph_range(&self, paragraph: usize) -> Result<TextRange>;

    /// Runs split on the space character, covering the paragraph contiguously.
    fn paragraph_runs(&self, paragraph: usize) -> Result<Vec<TextRun>>;

    fn hyperlinks(&self, paragraph: usize) -> Result<Vec<Hyperlink>>;

    /// Zero or more matches of `needle` inside the paragraph. Needles longer than
    /// [`DocumentHost::max_search_chars`] fail with `SearchTooLong`.
    fn search(&self, paragraph: usize, needle: &str, options: SearchOptions) -> Result<Vec<TextRange>>;

    /// Queue replacing the paragraph's whole text.
    fn replace_paragraph_text(&mut self, paragraph: usize, text: &str) -> Result<()>;

    /// Queue setting every specified attribute of `formatting` on `range`; `None`
    /// attributes are left untouched.
    fn set_formatting(&mut self, range: TextRange, formatting: &FormattingDescriptor) -> Result<()>;

    /// Queue setting (or clearing, with `None`) the hyperlink target of `range`.
    fn set_hyperlink(&mut self, range: TextRange, address: Option<&str>) -> Result<()>;

    /// Commit all queued mutations.
    fn sync(&mut self) -> Result<()>;

    fn max_search_chars(&self) -> usize {
        DEFAULT_MAX_SEARCH_CHARS
    }
}
