// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
// In-memory document host with deferred commit semantics.

use log::debug;

use crate::api::error::{Result, RewriteError};
use crate::api::formatting::FormattingDescriptor;
use crate::api::host::{
    DocumentHost, Hyperlink, SearchOptions, TextRange, TextRun, DEFAULT_MAX_SEARCH_CHARS,
};
use crate::api::text_segmenter::space_delimited_runs;

#[derive(Debug, Clone, PartialEq)]
struct MemoryParagraph {
    chars: Vec<char>,
    /// Fully specified formatting per character
    formats: Vec<FormattingDescriptor>,
    links: Vec<Option<String>>,
}

impl MemoryParagraph {
    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    fn check_range(&self, range: &TextRange) -> Result<()> {
        if range.start > range.end || range.end > self.chars.len() {
            return Err(RewriteError::Document(format!(
                "range {}..{} outside paragraph {} ({} chars)",
                range.start,
                range.end,
                range.paragraph,
                self.chars.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Mutation {
    Replace { paragraph: usize, text: String },
    Format { range: TextRange, formatting: FormattingDescriptor },
    Link { range: TextRange, address: Option<String> },
}

/// A document held in memory.
///
/// Reads observe committed state only; mutations queue until [`DocumentHost::sync`].
/// Replacing a paragraph's text gives the new text the first character's formatting
/// and drops its hyperlinks, like a word processor's replace.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    paragraphs: Vec<MemoryParagraph>,
    pending: Vec<Mutation>,
    max_search_chars: usize,
    runs_unavailable: bool,
    sync_count: usize,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            paragraphs: Vec::new(),
            pending: Vec::new(),
            max_search_chars: DEFAULT_MAX_SEARCH_CHARS,
            runs_unavailable: false,
            sync_count: 0,
        }
    }

    /// Build a document of uniformly formatted paragraphs.
    pub fn from_texts(texts: &[&str], formatting: FormattingDescriptor) -> Self {
        let mut doc = Self::new();
        for text in texts {
            doc.push_paragraph(&[(text, formatting)]);
        }
        doc
    }

    /// Append a paragraph made of formatted spans. Unspecified attributes default to
    /// plain 11pt text.
    pub fn push_paragraph(&mut self, spans: &[(&str, FormattingDescriptor)]) -> usize {
        let mut paragraph = MemoryParagraph { chars: Vec::new(), formats: Vec::new(), links: Vec::new() };
        for (text, formatting) in spans {
            let mut concrete = FormattingDescriptor::plain(11.0);
            concrete.apply_patch(formatting);
            for ch in text.chars() {
                paragraph.chars.push(ch);
                paragraph.formats.push(concrete);
                paragraph.links.push(None);
            }
        }
        self.paragraphs.push(paragraph);
        self.paragraphs.len() - 1
    }

    /// Attach a hyperlink to the first occurrence of `text` in a paragraph.
    pub fn add_link(&mut self, paragraph: usize, text: &str, address: &str) -> Result<()> {
        let range = self
            .search(paragraph, text, SearchOptions { match_case: true, match_whole_word: false })?
            .into_iter()
            .next()
            .ok_or_else(|| RewriteError::InvalidInput(format!("\"{}\" not in paragraph {}", text, paragraph)))?;
        let para = self.paragraph_mut(paragraph)?;
        for link in &mut para.links[range.start..range.end] {
            *link = Some(address.to_string());
        }
        Ok(())
    }

    /// Edit a paragraph outside the pipeline (another user, undo, ...). Applied immediately.
    pub fn overwrite_paragraph(&mut self, paragraph: usize, text: &str) -> Result<()> {
        self.replace_now(paragraph, text)
    }

    /// Delete a paragraph immediately.
    pub fn remove_paragraph(&mut self, paragraph: usize) -> Result<()> {
        if paragraph >= self.paragraphs.len() {
            return Err(RewriteError::Document(format!("paragraph {} does not exist", paragraph)));
        }
        self.paragraphs.remove(paragraph);
        Ok(())
    }

    /// Simulate a host that cannot report per-run formatting.
    pub fn set_runs_unavailable(&mut self, unavailable: bool) {
        self.runs_unavailable = unavailable;
    }

    pub fn set_max_search_chars(&mut self, max: usize) {
        self.max_search_chars = max;
    }

    /// Committed text of a paragraph.
    pub fn text(&self, paragraph: usize) -> Option<String> {
        self.paragraphs.get(paragraph).map(MemoryParagraph::text)
    }

    /// Committed formatting of one character.
    pub fn format_at(&self, paragraph: usize, char_index: usize) -> Option<FormattingDescriptor> {
        self.paragraphs.get(paragraph).and_then(|p| p.formats.get(char_index).copied())
    }

    /// Committed hyperlink target of one character.
    pub fn link_at(&self, paragraph: usize, char_index: usize) -> Option<String> {
        self.paragraphs.get(paragraph).and_then(|p| p.links.get(char_index).cloned().flatten())
    }

    pub fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    pub fn sync_count(&self) -> usize {
        self.sync_count
    }

    fn paragraph(&self, paragraph: usize) -> Result<&MemoryParagraph> {
        self.paragraphs
            .get(paragraph)
            .ok_or_else(|| RewriteError::Document(format!("paragraph {} does not exist", paragraph)))
    }

    fn paragraph_mut(&mut self, paragraph: usize) -> Result<&mut MemoryParagraph> {
        self.paragraphs
            .get_mut(paragraph)
            .ok_or_else(|| RewriteError::Document(format!("paragraph {} does not exist", paragraph)))
    }

    fn replace_now(&mut self, paragraph: usize, text: &str) -> Result<()> {
        let para = self.paragraph_mut(paragraph)?;
        let carried = para.formats.first().copied().unwrap_or_else(|| FormattingDescriptor::plain(11.0));
        para.chars = text.chars().collect();
        para.formats = vec![carried; para.chars.len()];
        para.links = vec![None; para.chars.len()];
        Ok(())
    }

    fn apply(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::Replace { paragraph, text } => self.replace_now(paragraph, &text),
            Mutation::Format { range, formatting } => {
                let para = self.paragraph_mut(range.paragraph)?;
                para.check_range(&range)?;
                for format in &mut para.formats[range.start..range.end] {
                    format.apply_patch(&formatting);
                }
                Ok(())
            }
            Mutation::Link { range, address } => {
                let para = self.paragraph_mut(range.paragraph)?;
                para.check_range(&range)?;
                for link in &mut para.links[range.start..range.end] {
                    *link = address.clone();
                }
                Ok(())
            }
        }
    }
}

/// Combine per-character values: `Some` when every character agrees.
fn uniform<T: PartialEq + Copy>(values: impl Iterator<Item = Option<T>>) -> Option<T> {
    let mut result: Option<Option<T>> = None;
    for value in values {
        match result {
            None => result = Some(value),
            Some(existing) if existing != value => return None,
            _ => {}
        }
    }
    result.flatten()
}

fn fold_char(ch: char, match_case: bool) -> char {
    if match_case {
        ch
    } else {
        ch.to_lowercase().next().unwrap_or(ch)
    }
}

impl DocumentHost for MemoryDocument {
    fn paragraph_texts(&self) -> Result<Vec<String>> {
        Ok(self.paragraphs.iter().map(MemoryParagraph::text).collect())
    }

    fn paragraph_range(&self, paragraph: usize) -> Result<TextRange> {
        let para = self.paragraph(paragraph)?;
        Ok(TextRange { paragraph, start: 0, end: para.chars.len() })
    }

    fn paragraph_runs(&self, paragraph: usize) -> Result<Vec<TextRun>> {
        if self.runs_unavailable {
            return Err(RewriteError::Document("run formatting not available".to_string()));
        }
        let para = self.paragraph(paragraph)?;
        let text = para.text();

        let mut runs = Vec::new();
        let mut start = 0;
        for run_text in space_delimited_runs(&text) {
            let len = run_text.chars().count();
            let formats = &para.formats[start..start + len];
            let formatting = FormattingDescriptor {
                bold: uniform(formats.iter().map(|f| f.bold)),
                italic: uniform(formats.iter().map(|f| f.italic)),
                size: uniform(formats.iter().map(|f| f.size)),
                underline: uniform(formats.iter().map(|f| f.underline)),
            };
            runs.push(TextRun { text: run_text.to_string(), formatting });
            start += len;
        }
        Ok(runs)
    }

    fn hyperlinks(&self, paragraph: usize) -> Result<Vec<Hyperlink>> {
        let para = self.paragraph(paragraph)?;
        let mut links = Vec::new();
        let mut i = 0;
        while i < para.links.len() {
            match &para.links[i] {
                Some(address) => {
                    let start = i;
                    while i < para.links.len() && para.links[i].as_ref() == Some(address) {
                        i += 1;
                    }
                    links.push(Hyperlink {
                        text: para.chars[start..i].iter().collect(),
                        address: address.clone(),
                        range: TextRange { paragraph, start, end: i },
                    });
                }
                None => i += 1,
            }
        }
        Ok(links)
    }

    fn search(&self, paragraph: usize, needle: &str, options: SearchOptions) -> Result<Vec<TextRange>> {
        let para = self.paragraph(paragraph)?;
        let needle: Vec<char> = needle.chars().map(|c| fold_char(c, options.match_case)).collect();
        if needle.len() > self.max_search_chars {
            return Err(RewriteError::SearchTooLong { len: needle.len(), max: self.max_search_chars });
        }
        if needle.is_empty() || needle.len() > para.chars.len() {
            return Ok(Vec::new());
        }

        let hay: Vec<char> = para.chars.iter().map(|&c| fold_char(c, options.match_case)).collect();
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let mut matches = Vec::new();
        let mut start = 0;
        while start + needle.len() <= hay.len() {
            let end = start + needle.len();
            let mut hit = hay[start..end] == needle[..];
            if hit && options.match_whole_word {
                let before_ok = start == 0 || !is_word(hay[start - 1]);
                let after_ok = end == hay.len() || !is_word(hay[end]);
                hit = before_ok && after_ok;
            }
            if hit {
                matches.push(TextRange { paragraph, start, end });
                start = end;
            } else {
                start += 1;
            }
        }
        Ok(matches)
    }

    fn replace_paragraph_text(&mut self, paragraph: usize, text: &str) -> Result<()> {
        self.paragraph(paragraph)?;
        self.pending.push(Mutation::Replace { paragraph, text: text.to_string() });
        Ok(())
    }

    fn set_formatting(&mut self, range: TextRange, formatting: &FormattingDescriptor) -> Result<()> {
        self.pending.push(Mutation::Format { range, formatting: *formatting });
        Ok(())
    }

    fn set_hyperlink(&mut self, range: TextRange, address: Option<&str>) -> Result<()> {
        self.pending.push(Mutation::Link { range, address: address.map(str::to_string) });
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        debug!("[memory_document] Committing {} mutations", pending.len());
        self.sync_count += 1;
        for mutation in pending {
            self.apply(mutation)?;
        }
        Ok(())
    }

    fn max_search_chars(&self) -> usize {
        self.max_search_chars
    }
}
