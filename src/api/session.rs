// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
//! Document session: paragraph records, the rewrite selection and the user-facing
//! operations (load, select, rewrite, apply, navigate).
//!
//! A session is built from the document at load time and replaced wholesale on
//! refresh. Rewrites only touch the session; apply is the only path that writes to
//! the document, and it always re-checks the live paragraph text first.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::api::config::RewriteOptions;
use crate::api::error::{Result, RewriteError};
use crate::api::formatting::ParagraphFormatting;
use crate::api::host::DocumentHost;
use crate::api::llm::LlmTransport;
use crate::api::reapplier::{reapply, ReapplyReport};
use crate::api::rewrite::{ReimaginedParagraph, Reimaginer};
use crate::api::text_segmenter::should_skip_paragraph;

/// One paragraph of the loaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphRecord {
    /// Text as of load or last apply
    pub source: String,
    /// Pending rewrite, cleared by apply
    pub reimagined: Option<ReimaginedParagraph>,
    /// Selected for the next rewrite pass
    pub reimagine_state: bool,
}

impl ParagraphRecord {
    fn new(source: String) -> Self {
        Self { source, reimagined: None, reimagine_state: false }
    }

    pub fn is_eligible(&self) -> bool {
        !should_skip_paragraph(&self.source)
    }
}

/// Counts for a batch rewrite or apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: usize,
    pub errors: usize,
    pub skipped: usize,
    /// Stopped before every paragraph was visited
    pub cancelled: bool,
}

/// Stop request for a running batch, checked before each paragraph.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentSession {
    paragraphs: Vec<ParagraphRecord>,
    selected: BTreeSet<usize>,
    formatting_cache: HashMap<usize, ParagraphFormatting>,
    current: usize,
}

impl DocumentSession {
    /// Read every paragraph from the host. Fails only if the paragraph list itself
    /// cannot be read.
    pub fn load(host: &dyn DocumentHost) -> Result<Self> {
        let texts = host.paragraph_texts()?;
        info!("[load] Loaded {} paragraphs from document", texts.len());

        let mut session = Self {
            paragraphs: texts.into_iter().map(ParagraphRecord::new).collect(),
            ..Default::default()
        };
        session.current = session.first_eligible().unwrap_or(0);
        Ok(session)
    }

    /// Rebuild from the live document, dropping pending rewrites and the selection.
    pub fn refresh(&mut self, host: &dyn DocumentHost) -> Result<()> {
        let current = self.current;
        *self = Self::load(host)?;
        if current < self.paragraphs.len() {
            self.current = current;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn paragraph(&self, index: usize) -> Option<&ParagraphRecord> {
        self.paragraphs.get(index)
    }

    pub fn paragraphs(&self) -> &[ParagraphRecord] {
        &self.paragraphs
    }

    /// Selected indices in document order.
    pub fn selected(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    /// Formatting analysis from the most recent rewrite of a paragraph.
    pub fn formatting(&self, index: usize) -> Option<&ParagraphFormatting> {
        self.formatting_cache.get(&index)
    }

    pub fn is_eligible(&self, index: usize) -> bool {
        self.paragraphs.get(index).map_or(false, ParagraphRecord::is_eligible)
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut ParagraphRecord> {
        let count = self.paragraphs.len();
        self.paragraphs
            .get_mut(index)
            .ok_or_else(|| RewriteError::InvalidInput(format!("paragraph {} out of range ({} loaded)", index, count)))
    }

    fn deselect(&mut self, index: usize) {
        self.selected.remove(&index);
        if let Some(record) = self.paragraphs.get_mut(index) {
            record.reimagine_state = false;
        }
    }

    fn first_eligible(&self) -> Option<usize> {
        self.paragraphs.iter().position(ParagraphRecord::is_eligible)
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Set whether a paragraph is selected for rewriting. Ineligible paragraphs are
    /// never selected. Returns the resulting state.
    pub fn toggle_selected(&mut self, index: usize, selected: bool) -> Result<bool> {
        let eligible = self.record_mut(index)?.is_eligible();
        if selected && !eligible {
            info!("[toggle_selected] Paragraph {} is not eligible for rewriting", index + 1);
            self.deselect(index);
            return Ok(false);
        }

        if selected {
            self.selected.insert(index);
            self.record_mut(index)?.reimagine_state = true;
        } else {
            self.deselect(index);
        }
        Ok(selected)
    }

    /// Select every eligible paragraph. Returns the selection size.
    pub fn select_all_eligible(&mut self) -> usize {
        for (index, record) in self.paragraphs.iter_mut().enumerate() {
            if record.is_eligible() {
                record.reimagine_state = true;
                self.selected.insert(index);
            }
        }
        info!("[select_all] {} paragraphs selected", self.selected.len());
        self.selected.len()
    }

    pub fn unselect_all(&mut self) {
        self.selected.clear();
        for record in &mut self.paragraphs {
            record.reimagine_state = false;
        }
        info!("[unselect_all] All paragraphs unselected");
    }

    // ------------------------------------------------------------------------
    // Rewrite
    // ------------------------------------------------------------------------

    /// Rewrite every selected paragraph, one at a time, in document order.
    ///
    /// Indices that no longer match the document are dropped from the selection and
    /// counted as errors. Failed and reverted paragraphs stay selected.
    pub fn rewrite_selected(
        &mut self,
        host: &dyn DocumentHost,
        transport: &dyn LlmTransport,
        options: &RewriteOptions,
        stop: Option<&StopSignal>,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        if self.selected.is_empty() {
            info!("[rewrite_selected] No paragraphs selected");
            return Ok(report);
        }

        let live = host.paragraph_texts()?;
        let reimaginer = Reimaginer::new(transport, options);

        for index in self.selected() {
            if stop.map_or(false, StopSignal::is_stopped) {
                info!("[rewrite_selected] Stopped before paragraph {}", index + 1);
                report.cancelled = true;
                break;
            }

            let source = match (self.paragraphs.get(index), live.get(index)) {
                (Some(record), Some(text)) if record.source == *text => record.source.clone(),
                _ => {
                    warn!("[rewrite_selected] Paragraph {} no longer matches the document, dropping it", index + 1);
                    self.deselect(index);
                    report.errors += 1;
                    continue;
                }
            };
            if should_skip_paragraph(&source) {
                self.deselect(index);
                report.skipped += 1;
                continue;
            }

            let outcome = reimaginer.reimagine(host, index, &source);
            self.formatting_cache.insert(index, outcome.formatting);
            if outcome.reimagined.error.is_some() {
                report.errors += 1;
            } else {
                report.processed += 1;
            }
            if let Some(record) = self.paragraphs.get_mut(index) {
                record.reimagined = Some(outcome.reimagined);
            }
        }

        info!(
            "[rewrite_selected] {} processed, {} errors, {} skipped{}",
            report.processed,
            report.errors,
            report.skipped,
            if report.cancelled { " (stopped)" } else { "" }
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Apply
    // ------------------------------------------------------------------------

    /// Write one paragraph's pending rewrite into the document.
    pub fn apply(
        &mut self,
        host: &mut dyn DocumentHost,
        index: usize,
        options: &RewriteOptions,
    ) -> Result<ReapplyReport> {
        let record = self.record_mut(index)?;
        let bundle = match &record.reimagined {
            Some(bundle) => bundle.clone(),
            None => {
                return Err(RewriteError::InvalidInput(format!("no pending rewrite for paragraph {}", index + 1)))
            }
        };
        if let Some(e) = &bundle.error {
            return Err(RewriteError::InvalidInput(format!(
                "paragraph {} rewrite failed and cannot be applied: {}",
                index + 1,
                e
            )));
        }

        let live = host.paragraph_texts()?;
        let reason = match live.get(index) {
            None => Some("paragraph no longer exists".to_string()),
            Some(text) if *text != record.source => Some("paragraph text changed since load".to_string()),
            Some(_) => None,
        };
        if let Some(reason) = reason {
            warn!("[apply] Paragraph {}: {}", index + 1, reason);
            self.deselect(index);
            return Err(RewriteError::StaleParagraph { index, reason });
        }

        let report = reapply(host, index, &bundle, options.search_chunk_chars)?;

        let record = self.record_mut(index)?;
        record.source = bundle.text;
        record.reimagined = None;
        self.deselect(index);
        self.formatting_cache.remove(&index);
        info!("[apply] Applied changes to paragraph {}", index + 1);
        Ok(report)
    }

    pub fn apply_current(&mut self, host: &mut dyn DocumentHost, options: &RewriteOptions) -> Result<ReapplyReport> {
        self.apply(host, self.current, options)
    }

    /// Apply every selected paragraph's pending rewrite. Paragraphs without a usable
    /// rewrite are skipped and stay selected.
    pub fn apply_all(&mut self, host: &mut dyn DocumentHost, options: &RewriteOptions) -> Result<BatchReport> {
        host.paragraph_texts()?;
        let mut report = BatchReport::default();

        for index in self.selected() {
            let usable = self
                .paragraphs
                .get(index)
                .and_then(|r| r.reimagined.as_ref())
                .map_or(false, |b| b.error.is_none());
            if !usable {
                info!("[apply_all] No applicable rewrite for paragraph {}", index + 1);
                report.skipped += 1;
                continue;
            }

            match self.apply(host, index, options) {
                Ok(_) => report.processed += 1,
                Err(e) => {
                    warn!("[apply_all] Paragraph {}: {}", index + 1, e);
                    report.errors += 1;
                }
            }
        }

        info!(
            "[apply_all] {} paragraphs updated, {} skipped, {} errors",
            report.processed, report.skipped, report.errors
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Editing and display
    // ------------------------------------------------------------------------

    /// Store the user's edit of the rewritten text. Empty text, or text equal to the
    /// source, discards the pending rewrite.
    pub fn set_user_edit(&mut self, index: usize, text: &str) -> Result<()> {
        let modal = self.formatting_cache.get(&index).and_then(|f| f.modal);
        let record = self.record_mut(index)?;

        if text.trim().is_empty() || text.trim() == record.source.trim() {
            record.reimagined = None;
            return Ok(());
        }

        match record.reimagined.as_mut() {
            Some(bundle) => {
                bundle.text = text.to_string();
                bundle.error = None;
                bundle.reverted_llm_part = false;
            }
            None => {
                record.reimagined = Some(ReimaginedParagraph {
                    text: text.to_string(),
                    formatting_matches: Vec::new(),
                    leading_format_text: None,
                    leading_format: None,
                    modal_format: modal,
                    link: None,
                    reverted_llm_part: false,
                    error: None,
                });
            }
        }
        info!("[set_user_edit] Saved modified text for paragraph {}", index + 1);
        Ok(())
    }

    /// Contents of the rewritten-text box: the pending text, or empty.
    pub fn display_text(&self, index: usize) -> String {
        self.paragraphs
            .get(index)
            .and_then(|r| r.reimagined.as_ref())
            .map(|b| b.text.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn go_to(&mut self, index: usize) -> Result<()> {
        self.record_mut(index)?;
        self.current = index;
        Ok(())
    }

    /// Move to the next eligible paragraph; stays put if only ineligible ones follow.
    pub fn move_down(&mut self) -> usize {
        let last = match self.paragraphs.len().checked_sub(1) {
            Some(last) => last,
            None => return self.current,
        };
        if self.current >= last {
            return self.current;
        }

        let mut next = self.current + 1;
        while next < last && !self.is_eligible(next) {
            next += 1;
        }
        if next == last && !self.is_eligible(next) {
            next = self.current;
        }
        self.current = next;
        self.current
    }

    /// Move to the previous eligible paragraph; stays put if only ineligible ones precede.
    pub fn move_up(&mut self) -> usize {
        if self.current == 0 {
            return self.current;
        }

        let mut prev = self.current - 1;
        while prev > 0 && !self.is_eligible(prev) {
            prev -= 1;
        }
        if prev == 0 && !self.is_eligible(prev) {
            prev = self.current;
        }
        self.current = prev;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory_document::MemoryDocument;
    use crate::api::test_support::{body, fast_options, ScriptedTransport};

    const LONG_A: &str = "The committee has decided to postpone the meeting until next week.";
    const LONG_B: &str = "Our team will prepare the updated budget figures before that date.";

    fn sample_doc() -> MemoryDocument {
        MemoryDocument::from_texts(&["Title", LONG_A, "Is this ok?", LONG_B, "Short line here"], body())
    }

    #[test]
    fn test_load_and_eligibility() {
        let session = DocumentSession::load(&sample_doc()).unwrap();
        assert_eq!(session.len(), 5);
        assert!(!session.is_eligible(0));
        assert!(session.is_eligible(1));
        assert!(!session.is_eligible(2));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_selection_respects_eligibility() {
        let mut session = DocumentSession::load(&sample_doc()).unwrap();
        assert_eq!(session.toggle_selected(0, true).unwrap(), false);
        assert_eq!(session.toggle_selected(1, true).unwrap(), true);
        assert!(session.toggle_selected(9, true).is_err());
        assert_eq!(session.selected(), vec![1]);

        assert_eq!(session.select_all_eligible(), 2);
        assert_eq!(session.selected(), vec![1, 3]);
        assert!(session.paragraph(3).unwrap().reimagine_state);

        session.unselect_all();
        assert!(session.selected().is_empty());
        assert!(!session.paragraph(1).unwrap().reimagine_state);
    }

    #[test]
    fn test_apply_then_reload_is_clean() {
        let mut doc = sample_doc();
        let mut session = DocumentSession::load(&doc).unwrap();
        session.toggle_selected(1, true).unwrap();
        let transport = ScriptedTransport::new(vec![Ok("The committee postponed the meeting to next week.".to_string())]);
        let options = fast_options();

        let report = session.rewrite_selected(&doc, &transport, &options, None).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(session.display_text(1), "The committee postponed the meeting to next week.");
        assert!(session.formatting(1).is_some());

        session.go_to(1).unwrap();
        session.apply_current(&mut doc, &options).unwrap();
        assert_eq!(doc.text(1).as_deref(), Some("The committee postponed the meeting to next week."));
        assert!(session.formatting(1).is_none());

        session.refresh(&doc).unwrap();
        let record = session.paragraph(1).unwrap();
        assert_eq!(record.reimagined, None);
        assert!(!record.reimagine_state);
        assert_eq!(record.source, "The committee postponed the meeting to next week.");
        assert!(session.selected().is_empty());
    }

    #[test]
    fn test_formatting_survives_rewrite_and_apply() {
        let bold = body().with_bold(true);
        let mut doc = MemoryDocument::new();
        doc.push_paragraph(&[
            ("Summary: ", bold),
            ("This quarter our ", body()),
            ("net income increased ", body().with_italic(true)),
            ("because of careful cost control and good sales.", body()),
        ]);
        let mut session = DocumentSession::load(&doc).unwrap();
        session.toggle_selected(0, true).unwrap();
        let transport = ScriptedTransport::new(vec![Ok(
            "Net income increased this quarter thanks to cost control and strong sales.".to_string(),
        )]);
        let options = fast_options();

        session.rewrite_selected(&doc, &transport, &options, None).unwrap();
        let report = session.apply(&mut doc, 0, &options).unwrap();
        assert!(report.leading_applied);
        assert_eq!(report.clauses_applied, 1);

        let text = doc.text(0).unwrap();
        assert_eq!(text, "Summary: Net income increased this quarter thanks to cost control and strong sales.");
        assert_eq!(doc.format_at(0, 0).and_then(|f| f.bold), Some(true));
        assert_eq!(doc.format_at(0, 9).and_then(|f| f.bold), Some(false));
        assert_eq!(doc.format_at(0, 9).and_then(|f| f.italic), Some(true));
        assert_eq!(doc.format_at(0, 30).and_then(|f| f.italic), Some(false));
    }

    #[test]
    fn test_edited_text_without_lead_in_is_not_all_bold() {
        let mut doc = MemoryDocument::new();
        doc.push_paragraph(&[
            ("IMPORTANT: ", body().with_bold(true)),
            ("please read the rest of this long paragraph carefully now.", body()),
        ]);
        let mut session = DocumentSession::load(&doc).unwrap();
        session.toggle_selected(0, true).unwrap();
        let transport = ScriptedTransport::new(vec![Ok("please read this whole paragraph with care.".to_string())]);
        let options = fast_options();
        session.rewrite_selected(&doc, &transport, &options, None).unwrap();

        session.set_user_edit(0, "Kindly read this whole paragraph with care.").unwrap();
        let report = session.apply(&mut doc, 0, &options).unwrap();

        assert!(!report.leading_applied);
        assert_eq!(doc.text(0).as_deref(), Some("Kindly read this whole paragraph with care."));
        let len = doc.text(0).unwrap().chars().count();
        assert!((0..len).all(|i| doc.format_at(0, i).and_then(|f| f.bold) == Some(false)));
        assert_eq!(doc.format_at(0, 20).and_then(|f| f.bold), Some(false));
    }

    #[test]
    fn test_stale_paragraph_not_applied() {
        let mut doc = sample_doc();
        let mut session = DocumentSession::load(&doc).unwrap();
        session.toggle_selected(1, true).unwrap();
        let transport = ScriptedTransport::new(vec![Ok("The meeting moves to next week.".to_string())]);
        let options = fast_options();
        session.rewrite_selected(&doc, &transport, &options, None).unwrap();

        doc.overwrite_paragraph(1, "Someone else edited this paragraph meanwhile today.").unwrap();
        let err = session.apply(&mut doc, 1, &options).unwrap_err();
        assert!(matches!(err, RewriteError::StaleParagraph { index: 1, .. }));
        assert!(session.selected().is_empty());
        assert_eq!(doc.text(1).as_deref(), Some("Someone else edited this paragraph meanwhile today."));
    }

    #[test]
    fn test_removed_paragraph_dropped_from_selection() {
        let mut doc = sample_doc();
        let mut session = DocumentSession::load(&doc).unwrap();
        session.select_all_eligible();
        doc.remove_paragraph(4).unwrap();
        doc.remove_paragraph(3).unwrap();

        let transport = ScriptedTransport::new(vec![Ok("The meeting moves to next week.".to_string())]);
        let report = session.rewrite_selected(&doc, &transport, &fast_options(), None).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(session.selected(), vec![1]);
        assert!(!session.paragraph(3).unwrap().reimagine_state);
    }

    #[test]
    fn test_failed_rewrite_stays_selected_and_is_not_applied() {
        let mut doc = sample_doc();
        let mut session = DocumentSession::load(&doc).unwrap();
        session.toggle_selected(1, true).unwrap();
        let transport = ScriptedTransport::failing();
        let options = fast_options();

        let report = session.rewrite_selected(&doc, &transport, &options, None).unwrap();
        assert_eq!(report.errors, 1);
        assert_eq!(session.selected(), vec![1]);
        assert_eq!(session.display_text(1), LONG_A);
        assert!(matches!(session.apply(&mut doc, 1, &options), Err(RewriteError::InvalidInput(_))));

        let all = session.apply_all(&mut doc, &options).unwrap();
        assert_eq!(all.skipped, 1);
        assert_eq!(all.processed, 0);
        assert_eq!(doc.text(1).as_deref(), Some(LONG_A));
    }

    #[test]
    fn test_apply_all() {
        let mut doc = sample_doc();
        let mut session = DocumentSession::load(&doc).unwrap();
        session.select_all_eligible();
        let transport = ScriptedTransport::new(vec![
            Ok("The meeting moves to next week.".to_string()),
            Ok("The team will update the budget figures first.".to_string()),
        ]);
        let options = fast_options();
        session.rewrite_selected(&doc, &transport, &options, None).unwrap();

        let report = session.apply_all(&mut doc, &options).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(doc.text(1).as_deref(), Some("The meeting moves to next week."));
        assert_eq!(doc.text(3).as_deref(), Some("The team will update the budget figures first."));
        assert!(session.selected().is_empty());
    }

    #[test]
    fn test_stop_signal_cancels_before_next_paragraph() {
        let doc = sample_doc();
        let mut session = DocumentSession::load(&doc).unwrap();
        session.select_all_eligible();
        let stop = StopSignal::new();
        stop.stop();
        let transport = ScriptedTransport::new(vec![]);

        let report = session.rewrite_selected(&doc, &transport, &fast_options(), Some(&stop)).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_user_edit_rules() {
        let mut session = DocumentSession::load(&sample_doc()).unwrap();
        session.set_user_edit(1, "My own wording of the meeting notice.").unwrap();
        assert_eq!(session.display_text(1), "My own wording of the meeting notice.");

        session.set_user_edit(1, &format!("  {}  ", LONG_A)).unwrap();
        assert_eq!(session.paragraph(1).unwrap().reimagined, None);

        session.set_user_edit(1, "Another edit.").unwrap();
        session.set_user_edit(1, "   ").unwrap();
        assert_eq!(session.display_text(1), "");
    }

    #[test]
    fn test_navigation_skips_ineligible() {
        let mut session = DocumentSession::load(&sample_doc()).unwrap();
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.move_down(), 3);
        // Last paragraph is ineligible, so there is nowhere further to go
        assert_eq!(session.move_down(), 3);
        assert_eq!(session.move_up(), 1);
        // First paragraph is ineligible
        assert_eq!(session.move_up(), 1);
    }

    #[test]
    fn test_load_failure_aborts() {
        struct Broken;
        impl DocumentHost for Broken {
            fn paragraph_texts(&self) -> Result<Vec<String>> {
                Err(RewriteError::Document("host unavailable".to_string()))
            }
            fn paragraph_range(&self, _: usize) -> Result<crate::api::host::TextRange> {
                unreachable!()
            }
            fn paragraph_runs(&self, _: usize) -> Result<Vec<crate::api::host::TextRun>> {
                unreachable!()
            }
            fn hyperlinks(&self, _: usize) -> Result<Vec<crate::api::host::Hyperlink>> {
                unreachable!()
            }
            fn search(
                &self,
                _: usize,
                _: &str,
                _: crate::api::host::SearchOptions,
            ) -> Result<Vec<crate::api::host::TextRange>> {
                unreachable!()
            }
            fn replace_paragraph_text(&mut self, _: usize, _: &str) -> Result<()> {
                unreachable!()
            }
            fn set_formatting(
                &mut self,
                _: crate::api::host::TextRange,
                _: &crate::api::formatting::FormattingDescriptor,
            ) -> Result<()> {
                unreachable!()
            }
            fn set_hyperlink(&mut self, _: crate::api::host::TextRange, _: Option<&str>) -> Result<()> {
                unreachable!()
            }
            fn sync(&mut self) -> Result<()> {
                unreachable!()
            }
        }
        assert!(matches!(DocumentSession::load(&Broken), Err(RewriteError::Document(_))));
    }
}
