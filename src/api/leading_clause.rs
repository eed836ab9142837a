// rust/src/api/leading_clause.rs
//
// Leading-block detection: a run of non-modal clauses at the very start of a
// paragraph is kept out of the rewrite and reattached verbatim.

use crate::api::formatting::{Clause, FormattingDescriptor, ParagraphFormatting};

/// Split of a paragraph into its leading block and the text to rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadingSplit {
    /// Absorbed clauses plus interstitial and trailing whitespace
    pub leading_text: Option<String>,
    /// Format of the first absorbed clause
    pub leading_format: Option<FormattingDescriptor>,
    /// Number of clauses absorbed (always a prefix of the clause list)
    pub absorbed_clauses: usize,
    /// Text sent to the LLM
    pub remainder: String,
}

impl LeadingSplit {
    fn none(text: &str) -> Self {
        Self {
            leading_text: None,
            leading_format: None,
            absorbed_clauses: 0,
            remainder: text.to_string(),
        }
    }

    pub fn leading_str(&self) -> &str {
        self.leading_text.as_deref().unwrap_or("")
    }
}

/// Absorb clauses from the start of `text` while each one begins exactly at the scan
/// cursor. Whitespace after an absorbed clause is absorbed with it.
pub fn extract_leading(text: &str, formatting: &ParagraphFormatting) -> LeadingSplit {
    let modal = match formatting.modal {
        Some(modal) => modal,
        None => return LeadingSplit::none(text),
    };

    let mut cursor = 0;
    let mut absorbed: Vec<&Clause> = Vec::new();

    for clause in &formatting.clauses {
        if clause.formatting == modal || clause.text.is_empty() {
            break;
        }
        if !text[cursor..].starts_with(clause.text.as_str()) {
            break;
        }
        cursor += clause.text.len();
        let rest = &text[cursor..];
        cursor += rest.len() - rest.trim_start().len();
        absorbed.push(clause);
    }

    match absorbed.first() {
        Some(first) => LeadingSplit {
            leading_text: Some(text[..cursor].to_string()),
            leading_format: Some(first.formatting),
            absorbed_clauses: absorbed.len(),
            remainder: text[cursor..].to_string(),
        },
        None => LeadingSplit::none(text),
    }
}
