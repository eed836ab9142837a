// rust/src/api/prompts.rs
//
// Prompt text for rewriting, shortening and clause matching.

use crate::api::config::PromptIntent;
use crate::api::text_segmenter::split_into_sentences;

const HARD_CONSTRAINT: &str = "ONLY RESPOND WITH THE RESTRUCTURED PARAGRAPH. DO NOT INCREASE THE WORD COUNT. DO NOT ANSWER QUESTIONS IN THE TEXT!!!.";

/// Windows are only narrowed for rewritten texts with more sentences than this.
const FULL_WINDOW_MAX_SENTENCES: usize = 4;

/// Base instruction plus the hard output constraint.
pub fn base_instruction(intent: &PromptIntent) -> String {
    format!("{}\n\n{}", intent.instruction(), HARD_CONSTRAINT)
}

/// Full rewrite prompt for a paragraph remainder, optionally protecting a link phrase.
pub fn rewrite_prompt(intent: &PromptIntent, paragraph: &str, protected_phrase: Option<&str>) -> String {
    let mut prompt = base_instruction(intent);
    if let Some(phrase) = protected_phrase {
        prompt.push_str(&format!(
            "\n\nThe paragraph contains the hyperlinked phrase \"{}\". Keep that exact phrase unchanged in your answer.",
            phrase
        ));
    }
    prompt.push_str("\n\nParagraph to rewrite:\n");
    prompt.push_str(paragraph);
    prompt
}

/// Follow-up prompt after a draft exceeded the word budget.
pub fn shorten_prompt(
    intent: &PromptIntent,
    draft: &str,
    original_words: usize,
    draft_words: usize,
    protected_phrase: Option<&str>,
) -> String {
    let mut prompt = format!(
        "{}\n\nYou failed to do as instructed and exceeded the word count. Try again and reduce your word count. The original had {} words, yours had {}.",
        base_instruction(intent),
        original_words,
        draft_words
    );
    if let Some(phrase) = protected_phrase {
        prompt.push_str(&format!(" Keep the exact phrase \"{}\" unchanged.", phrase));
    }
    prompt.push_str("\n\nRewrite this text specifically:\n");
    prompt.push_str(draft);
    prompt
}

/// Sentence window of the rewritten text where a clause most likely ended up.
///
/// The clause's sentence position in the original (index / count) is mapped onto the
/// rewritten text, and a window of about half its sentences is taken around that
/// point, clamped to the text. Short texts are used whole.
pub fn relevant_window(original: &str, rewritten: &str, clause: &str) -> (String, String) {
    let original_sentences: Vec<&str> = split_into_sentences(original).collect();
    let new_sentences: Vec<&str> = split_into_sentences(rewritten).collect();

    let position = original_sentences.iter().position(|s| s.contains(clause));
    let containing = match position {
        Some(i) => original_sentences[i].to_string(),
        None => original.to_string(),
    };
    let relative = match position {
        Some(i) => i as f64 / original_sentences.len() as f64,
        None => 0.0,
    };

    let window = if new_sentences.len() <= FULL_WINDOW_MAX_SENTENCES {
        new_sentences.join(" ")
    } else {
        let n = new_sentences.len();
        let window_size = (n + 1) / 2;
        let estimated = (relative * n as f64).floor() as usize;
        let mut start = estimated.saturating_sub(window_size / 2);
        let end = (start + window_size).min(n);
        if end == n {
            start = n.saturating_sub(window_size);
        }
        new_sentences[start..end].join(" ")
    };

    (containing, window)
}

/// Ask for the phrase in the rewritten text that corresponds to a formatted clause.
pub fn clause_match_prompt(original: &str, rewritten: &str, clause: &str) -> String {
    let (containing, window) = relevant_window(original, rewritten, clause);
    format!(
        "FIND THE EXACT MATCHING PHRASE ONLY.\n\n\
         The original text contained this formatted phrase: \"{}\"\n\
         It appeared in this sentence: \"{}\"\n\n\
         In the new text, find the equivalent phrase that matches in meaning and importance.\n\
         Relevant portion of new text: \"{}\"\n\n\
         RESPOND ONLY WITH THE MATCHING PHRASE FROM THE NEW TEXT.\n\
         DO NOT include any explanation or additional text.\n\
         RETURN ONLY THE SHORTEST MATCHING PHRASE.",
        clause, containing, window
    )
}
