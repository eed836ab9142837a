// rust/src/api/text_segmenter.rs
//
// Sentence splitting, whitespace-run segmentation and paragraph eligibility.

/// Paragraphs with fewer words than this are never rewritten.
pub const MIN_WORDS: usize = 7;

/// Count whitespace-delimited words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Returns true if a paragraph must never be selected for rewriting:
/// empty after trimming, ends with a question mark, or has fewer than 7 words.
pub fn should_skip_paragraph(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.ends_with('?') {
        return true;
    }
    count_words(trimmed) < MIN_WORDS
}

/// Split text into sentences.
///
/// Boundaries are `.`, `!` or `?` followed by whitespace or the end of text. A period
/// preceded by a letter whose second following character is also a letter is not a
/// boundary, which keeps "U.S. market" together.
///
/// Known limitation: that guard also suppresses ordinary boundaries such as
/// "It rained. Then" (letter, period, space, letter), and initials or decimal numbers
/// followed by a space may split early. The result is only used to pick a search
/// window, so the approximation is accepted.
///
/// The returned iterator is cheap to clone, so it can be restarted.
pub fn split_into_sentences(text: &str) -> Sentences<'_> {
    Sentences { text, pos: 0 }
}

/// Iterator over trimmed, non-empty sentences of a text.
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Sentences<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos < self.text.len() {
            let start = self.pos;
            let rest = &self.text[start..];
            let end = match find_boundary(self.text, start) {
                Some(boundary) => boundary,
                None => start + rest.len(),
            };
            self.pos = end;
            let sentence = self.text[start..end].trim();
            if !sentence.is_empty() {
                return Some(sentence);
            }
        }
        None
    }
}

/// Byte offset just past the next sentence terminator at or after `from`.
fn find_boundary(text: &str, from: usize) -> Option<usize> {
    let mut prev: Option<char> = text[..from].chars().next_back();
    let mut chars = text[from..].char_indices();

    while let Some((i, ch)) = chars.next() {
        let before = prev.replace(ch);
        if ch != '.' && ch != '!' && ch != '?' {
            continue;
        }

        let mut ahead = chars.clone();
        let next = ahead.next().map(|(_, c)| c);
        if next.map_or(false, |c| !c.is_whitespace()) {
            continue;
        }

        // "U.S. Army": letter before, letter right after the space
        if ch == '.'
            && before.map_or(false, char::is_alphabetic)
            && ahead.next().map_or(false, |(_, c)| c.is_alphabetic())
        {
            continue;
        }

        return Some(from + i + ch.len_utf8());
    }
    None
}

/// A token of a whitespace segmentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub is_space: bool,
}

/// Split text into alternating word and whitespace tokens.
pub fn split_whitespace_tokens(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current_is_space: Option<bool> = None;

    for (i, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match current_is_space {
            Some(kind) if kind != is_space => {
                tokens.push(Token { text: &text[start..i], is_space: kind });
                start = i;
                current_is_space = Some(is_space);
            }
            None => current_is_space = Some(is_space),
            _ => {}
        }
    }

    if let Some(kind) = current_is_space {
        tokens.push(Token { text: &text[start..], is_space: kind });
    }
    tokens
}

/// Space-delimited runs: each word keeps the whitespace that follows it, so the runs
/// cover the text contiguously. Leading whitespace forms its own run.
pub fn space_delimited_runs(text: &str) -> Vec<&str> {
    let tokens = split_whitespace_tokens(text);
    let mut runs = Vec::with_capacity(tokens.len() / 2 + 1);
    let mut start = 0;
    let mut offset = 0;

    for (i, token) in tokens.iter().enumerate() {
        offset += token.text.len();
        let closes_run = token.is_space || tokens.get(i + 1).is_none();
        if closes_run {
            runs.push(&text[start..offset]);
            start = offset;
        }
    }
    runs
}
