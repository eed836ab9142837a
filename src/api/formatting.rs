// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
// Licensed under the MIT License. You may obtain a copy of the License at
// https://opensource.org/licenses/MIT
//
// This software is provided "AS IS", without warranty of any kind, express or
// implied, including but not limited to the warranties of merchantability,
// fitness for a particular purpose, and noninfringement. In no event shall the
// authors or copyright holders be liable for any claim, damages, or other
// liability arising from the use of this software.
//
//! Modal-format detection and non-modal clause extraction.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::api::error::RewriteError;
use crate::api::host::{DocumentHost, TextRun};

/// Character formatting of a run. `None` means unspecified (mixed inside the run, or
/// not applicable), which is distinct from `Some(false)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FormattingDescriptor {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub size: Option<f64>,
    pub underline: Option<bool>,
}

impl FormattingDescriptor {
    /// Fully specified formatting.
    pub fn new(bold: bool, italic: bool, size: f64, underline: bool) -> Self {
        Self {
            bold: Some(bold),
            italic: Some(italic),
            size: Some(size),
            underline: Some(underline),
        }
    }

    /// Regular body text at the given size.
    pub fn plain(size: f64) -> Self {
        Self::new(false, false, size, false)
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = Some(underline);
        self
    }

    /// True when no attribute is specified, so applying it would change nothing.
    pub fn is_unspecified(&self) -> bool {
        self.bold.is_none() && self.italic.is_none() && self.size.is_none() && self.underline.is_none()
    }

    /// Overlay the specified attributes of `patch` onto `self`.
    pub fn apply_patch(&mut self, patch: &FormattingDescriptor) {
        if let Some(bold) = patch.bold {
            self.bold = Some(bold);
        }
        if let Some(italic) = patch.italic {
            self.italic = Some(italic);
        }
        if let Some(size) = patch.size {
            self.size = Some(size);
        }
        if let Some(underline) = patch.underline {
            self.underline = Some(underline);
        }
    }
}

/// A maximal run of paragraph text whose formatting differs from the modal format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub text: String,
    pub formatting: FormattingDescriptor,
}

/// Formatting analysis of one paragraph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphFormatting {
    /// `None` only for a paragraph without any runs
    pub modal: Option<FormattingDescriptor>,
    /// Non-overlapping, in document order
    pub clauses: Vec<Clause>,
}

impl ParagraphFormatting {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Result of reading and analysing a paragraph's runs. A host failure yields empty
/// formatting plus the error, so the rewrite can continue without formatting.
#[derive(Debug, Clone)]
pub struct FormattingDetection {
    pub formatting: ParagraphFormatting,
    pub error: Option<RewriteError>,
}

/// Modal format: the format covering the most characters. Ties go to the format seen
/// first.
pub fn modal_format(runs: &[TextRun]) -> Option<FormattingDescriptor> {
    let mut weights: Vec<(FormattingDescriptor, usize)> = Vec::new();

    for run in runs {
        let weight = run.text.chars().count();
        match weights.iter_mut().find(|(format, _)| *format == run.formatting) {
            Some((_, total)) => *total += weight,
            None => weights.push((run.formatting, weight)),
        }
    }

    let mut best: Option<(FormattingDescriptor, usize)> = None;
    for (format, weight) in weights {
        match best {
            Some((_, best_weight)) if weight <= best_weight => {}
            _ => best = Some((format, weight)),
        }
    }
    best.map(|(format, _)| format)
}

/// Compute the modal format and the non-modal clauses of a paragraph.
pub fn analyze_runs(runs: &[TextRun]) -> ParagraphFormatting {
    let modal = match modal_format(runs) {
        Some(modal) => modal,
        None => return ParagraphFormatting::empty(),
    };

    let mut clauses = Vec::new();
    let mut open: Option<(String, FormattingDescriptor)> = None;

    for run in runs {
        if run.formatting == modal {
            flush_phrase(&mut open, &mut clauses);
            continue;
        }

        match open.as_mut() {
            Some((text, format)) if *format == run.formatting => text.push_str(&run.text),
            _ => {
                flush_phrase(&mut open, &mut clauses);
                open = Some((run.text.clone(), run.formatting));
            }
        }
    }
    flush_phrase(&mut open, &mut clauses);

    ParagraphFormatting { modal: Some(modal), clauses }
}

fn flush_phrase(open: &mut Option<(String, FormattingDescriptor)>, clauses: &mut Vec<Clause>) {
    if let Some((text, formatting)) = open.take() {
        let trimmed = text.trim_end();
        if !trimmed.trim_start().is_empty() {
            clauses.push(Clause { text: trimmed.to_string(), formatting });
        }
    }
}

/// Read a paragraph's runs from the host and analyse them.
pub fn detect_formatting(host: &dyn DocumentHost, index: usize) -> FormattingDetection {
    match host.paragraph_runs(index) {
        Ok(runs) => {
            let formatting = analyze_runs(&runs);
            info!(
                "[detect_formatting] Paragraph {}: modal={:?}, {} non-modal clauses",
                index + 1,
                formatting.modal,
                formatting.clauses.len()
            );
            for clause in &formatting.clauses {
                debug!("[detect_formatting] \"{}\": {:?}", clause.text, clause.formatting);
            }
            FormattingDetection { formatting, error: None }
        }
        Err(e) => {
            warn!("[detect_formatting] Paragraph {}: could not read runs: {}", index + 1, e);
            FormattingDetection { formatting: ParagraphFormatting::empty(), error: Some(e) }
        }
    }
}
