// rust/src/api/reapplier.rs
//
// Writes a pending rewrite into the document and puts formatting and the
// hyperlink back. Every mutation is committed before the next range is looked up.

use log::{debug, info, warn};
use text_splitter::TextSplitter;
use unicode_segmentation::UnicodeSegmentation;

use crate::api::clause_relocator::FormattingMatch;
use crate::api::error::{Result, RewriteError};
use crate::api::formatting::FormattingDescriptor;
use crate::api::host::{DocumentHost, SearchOptions, TextRange};
use crate::api::rewrite::{LinkInfo, ReimaginedParagraph};

/// Chunks shorter than this are too ambiguous to search for.
const MIN_CHUNK_CHARS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReapplyReport {
    pub leading_applied: bool,
    pub link_applied: bool,
    pub clauses_applied: usize,
    pub clauses_skipped: usize,
}

/// Cut `text` to at most `max_chars` characters without splitting a grapheme.
fn truncate_graphemes(text: &str, max_chars: usize) -> &str {
    let mut end = 0;
    let mut chars = 0;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        if chars + len > max_chars {
            break;
        }
        chars += len;
        end += grapheme.len();
    }
    &text[..end]
}

/// Replace the paragraph text and reapply leading format, hyperlink and clause formats.
///
/// Only the text replacement is fatal; formatting misses are logged and skipped.
pub fn reapply(
    host: &mut dyn DocumentHost,
    index: usize,
    bundle: &ReimaginedParagraph,
    chunk_chars: usize,
) -> Result<ReapplyReport> {
    info!("[reapply] Paragraph {}: writing {} chars", index + 1, bundle.text.chars().count());
    host.replace_paragraph_text(index, &bundle.text)?;
    host.sync()?;

    let mut report = ReapplyReport::default();

    if let (Some(leading), Some(format)) = (&bundle.leading_format_text, &bundle.leading_format) {
        match apply_leading(host, index, leading, format, bundle.modal_format.as_ref()) {
            Ok(applied) => report.leading_applied = applied,
            Err(e) => warn!("[reapply] Paragraph {}: leading format not applied: {}", index + 1, e),
        }
    }

    if let Some(link) = &bundle.link {
        match apply_link(host, index, link, &bundle.text) {
            Ok(applied) => report.link_applied = applied,
            Err(e) => warn!("[reapply] Paragraph {}: hyperlink not applied: {}", index + 1, e),
        }
    }

    for clause in &bundle.formatting_matches {
        match apply_clause(host, index, clause, chunk_chars) {
            Ok(true) => report.clauses_applied += 1,
            Ok(false) => report.clauses_skipped += 1,
            Err(e) => {
                warn!("[reapply] Paragraph {}: \"{}\" not formatted: {}", index + 1, clause.matched_text, e);
                report.clauses_skipped += 1;
            }
        }
    }

    info!(
        "[reapply] Paragraph {}: leading={}, link={}, {} clauses applied, {} skipped",
        index + 1,
        report.leading_applied,
        report.link_applied,
        report.clauses_applied,
        report.clauses_skipped
    );
    Ok(report)
}

fn apply_leading(
    host: &mut dyn DocumentHost,
    index: usize,
    leading: &str,
    format: &FormattingDescriptor,
    modal: Option<&FormattingDescriptor>,
) -> Result<bool> {
    let trimmed = leading.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }

    let paragraph = host.paragraph_range(index)?;
    let needle = truncate_graphemes(trimmed, host.max_search_chars());
    let hit = host
        .search(index, needle, SearchOptions { match_case: true, match_whole_word: false })?
        .into_iter()
        .next();

    // Replace carries the first character's format over the whole paragraph, so the
    // modal format goes back on everything after the block, or on all of it when the
    // block is gone.
    let lead_end = match hit {
        Some(hit) if hit.start == paragraph.start => {
            let end = (hit.start + trimmed.chars().count()).min(paragraph.end);
            host.set_formatting(TextRange { paragraph: index, start: hit.start, end }, format)?;
            host.sync()?;
            Some(end)
        }
        _ => {
            debug!("[reapply] Paragraph {}: leading block not at paragraph start", index + 1);
            None
        }
    };

    if let Some(modal) = modal {
        let start = lead_end.unwrap_or(paragraph.start);
        if start < paragraph.end {
            host.set_formatting(TextRange { paragraph: index, start, end: paragraph.end }, modal)?;
            host.sync()?;
        }
    }
    Ok(lead_end.is_some())
}

fn apply_link(host: &mut dyn DocumentHost, index: usize, link: &LinkInfo, text: &str) -> Result<bool> {
    if !text.contains(&link.text) {
        return Ok(false);
    }
    let hit = host
        .search(index, &link.text, SearchOptions { match_case: true, match_whole_word: false })?
        .into_iter()
        .next();
    match hit {
        Some(range) => {
            host.set_hyperlink(range, Some(&link.address))?;
            host.sync()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn apply_clause(
    host: &mut dyn DocumentHost,
    index: usize,
    clause: &FormattingMatch,
    chunk_chars: usize,
) -> Result<bool> {
    if clause.formatting.is_unspecified() {
        return Ok(false);
    }
    let needle = clause.matched_text.trim();
    if needle.is_empty() {
        return Ok(false);
    }

    match find_clause_range(host, index, needle, chunk_chars)? {
        Some(range) => {
            host.set_formatting(range, &clause.formatting)?;
            host.sync()?;
            Ok(true)
        }
        None => {
            debug!("[reapply] Paragraph {}: \"{}\" not found", index + 1, needle);
            Ok(false)
        }
    }
}

/// Case-insensitive search for the whole text, then chunk by chunk. A chunk hit
/// yields that chunk's range only.
fn find_clause_range(
    host: &dyn DocumentHost,
    index: usize,
    needle: &str,
    chunk_chars: usize,
) -> Result<Option<TextRange>> {
    let options = SearchOptions::default();
    match host.search(index, needle, options) {
        Ok(hits) if !hits.is_empty() => return Ok(hits.into_iter().next()),
        Ok(_) => {}
        Err(RewriteError::SearchTooLong { len, max }) => {
            debug!("[reapply] \"{}...\" is {} chars (limit {}), searching in chunks", truncate_graphemes(needle, 20), len, max);
        }
        Err(e) => return Err(e),
    }

    let splitter = TextSplitter::new(chunk_chars.min(host.max_search_chars()).max(1));
    for chunk in splitter.chunks(needle) {
        let chunk = chunk.trim();
        if chunk.chars().count() < MIN_CHUNK_CHARS {
            continue;
        }
        match host.search(index, chunk, options) {
            Ok(hits) => {
                if let Some(range) = hits.into_iter().next() {
                    return Ok(Some(range));
                }
            }
            Err(e) => debug!("[reapply] Chunk search failed: {}", e),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory_document::MemoryDocument;
    use crate::api::test_support::body;

    fn bundle(text: &str) -> ReimaginedParagraph {
        ReimaginedParagraph {
            text: text.to_string(),
            formatting_matches: Vec::new(),
            leading_format_text: None,
            leading_format: None,
            modal_format: Some(body()),
            link: None,
            reverted_llm_part: false,
            error: None,
        }
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("héllo world", 5), "héllo");
        assert_eq!(truncate_graphemes("short", 50), "short");
    }

    #[test]
    fn test_leading_format_does_not_leak() {
        let mut doc = MemoryDocument::from_texts(&["Old paragraph text."], body());
        let mut pending = bundle("NOTE: the new shorter text.");
        pending.leading_format_text = Some("NOTE: ".to_string());
        pending.leading_format = Some(body().with_bold(true));

        let report = reapply(&mut doc, 0, &pending, 100).unwrap();
        assert!(report.leading_applied);
        assert_eq!(doc.text(0).as_deref(), Some("NOTE: the new shorter text."));
        assert_eq!(doc.format_at(0, 0).and_then(|f| f.bold), Some(true));
        assert_eq!(doc.format_at(0, 4).and_then(|f| f.bold), Some(true));
        assert_eq!(doc.format_at(0, 5).and_then(|f| f.bold), Some(false));
        assert_eq!(doc.format_at(0, 10).and_then(|f| f.bold), Some(false));
    }

    #[test]
    fn test_leading_not_at_start_is_skipped() {
        let mut doc = MemoryDocument::from_texts(&["Old."], body());
        let mut pending = bundle("Rewritten text mentions NOTE: later.");
        pending.leading_format_text = Some("NOTE: ".to_string());
        pending.leading_format = Some(body().with_bold(true));

        let report = reapply(&mut doc, 0, &pending, 100).unwrap();
        assert!(!report.leading_applied);
        assert_eq!(doc.format_at(0, 24).and_then(|f| f.bold), Some(false));
    }

    #[test]
    fn test_link_and_clauses_applied() {
        let mut doc = MemoryDocument::from_texts(&["Old."], body());
        let mut pending = bundle("Profit rose sharply, see the annual report.");
        pending.link = Some(LinkInfo { text: "annual report".to_string(), address: "https://example.com/ar".to_string() });
        pending.formatting_matches = vec![
            FormattingMatch { matched_text: "PROFIT ROSE".to_string(), formatting: body().with_italic(true) },
            FormattingMatch { matched_text: "missing words".to_string(), formatting: body().with_bold(true) },
        ];

        let report = reapply(&mut doc, 0, &pending, 100).unwrap();
        assert!(report.link_applied);
        assert_eq!(report.clauses_applied, 1);
        assert_eq!(report.clauses_skipped, 1);
        assert_eq!(doc.link_at(0, 29).as_deref(), Some("https://example.com/ar"));
        assert_eq!(doc.link_at(0, 5), None);
        assert_eq!(doc.format_at(0, 0).and_then(|f| f.italic), Some(true));
        assert_eq!(doc.format_at(0, 12).and_then(|f| f.italic), Some(false));
    }

    #[test]
    fn test_unspecified_attributes_left_untouched() {
        let mut doc = MemoryDocument::from_texts(&["Old."], body());
        let mut pending = bundle("Mixed emphasis here.");
        let partial = FormattingDescriptor { underline: Some(true), ..Default::default() };
        pending.formatting_matches = vec![
            FormattingMatch { matched_text: "emphasis".to_string(), formatting: partial },
            FormattingMatch { matched_text: "here".to_string(), formatting: FormattingDescriptor::default() },
        ];

        let report = reapply(&mut doc, 0, &pending, 100).unwrap();
        assert_eq!(report.clauses_applied, 1);
        assert_eq!(report.clauses_skipped, 1);
        assert_eq!(doc.format_at(0, 6), Some(body().with_underline(true)));
    }

    #[test]
    fn test_long_clause_falls_back_to_chunks() {
        let mut doc = MemoryDocument::from_texts(&["Old."], body());
        doc.set_max_search_chars(30);
        let long = "this clause is far longer than the host search limit allows";
        let mut pending = bundle(&format!("Start: {} end.", long));
        pending.formatting_matches =
            vec![FormattingMatch { matched_text: long.to_string(), formatting: body().with_bold(true) }];

        let report = reapply(&mut doc, 0, &pending, 25).unwrap();
        assert_eq!(report.clauses_applied, 1);
        // First chunk only
        assert_eq!(doc.format_at(0, 7).and_then(|f| f.bold), Some(true));
        assert_eq!(doc.format_at(0, 7 + long.len() - 1).and_then(|f| f.bold), Some(false));
    }

    #[test]
    fn test_replace_failure_is_fatal() {
        let mut doc = MemoryDocument::from_texts(&["Only paragraph."], body());
        assert!(reapply(&mut doc, 3, &bundle("New."), 100).is_err());
    }
}
