/*!
 * Splitting of over-long text into subtitle lines.
 *
 * A split only ever happens on the whitespace between two tokens, so words
 * are never cut and every piece remembers the exact whitespace that preceded
 * it. Joining `separator + text` over all pieces gives back the input.
 *
 * Candidate boundaries are classified by `BoundaryRule`. The rules are tried
 * in priority order; the first rule with an admissible candidate wins and,
 * within it, the candidate closest to the midpoint of the text is taken
 * (earlier position on ties).
 */

use std::collections::HashSet;
use std::fmt;

use crate::app_config::SplitterConfig;
use super::segment::WordRange;

/// Kind of boundary between two tokens, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoundaryRule {
    /// After sentence-final punctuation
    SentenceEnd,
    /// After a comma, semicolon, colon or dash
    Clause,
    /// Before a conjunction
    Conjunction,
    /// Before a preposition
    Preposition,
    /// Any other whitespace
    WordBoundary,
}

impl BoundaryRule {
    /// All rules, highest priority first
    pub const ORDERED: [BoundaryRule; 5] = [
        BoundaryRule::SentenceEnd,
        BoundaryRule::Clause,
        BoundaryRule::Conjunction,
        BoundaryRule::Preposition,
        BoundaryRule::WordBoundary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SentenceEnd => "sentence-end",
            Self::Clause => "clause",
            Self::Conjunction => "conjunction",
            Self::Preposition => "preposition",
            Self::WordBoundary => "word",
        }
    }
}

impl fmt::Display for BoundaryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One line produced by the splitter
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPiece {
    // @field: Line text, a verbatim slice of the input
    pub text: String,

    // @field: Whitespace that preceded the line in the input
    pub separator: String,

    // @field: Token indices of the line within the input
    pub tokens: WordRange,

    // @field: Still longer than a line because it is a single token
    pub overlong: bool,
}

// Byte span and char offsets of one whitespace-free token
#[derive(Debug, Clone, Copy)]
struct Token {
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    char_end: usize,
}

impl Token {
    fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.byte_start..self.byte_end]
    }
}

// Chars that may trail sentence or clause punctuation
const CLOSERS: &[char] = &['"', '\'', '»', '”', '’', ')', ']'];

/// Splits text at linguistically motivated boundaries
#[derive(Debug, Clone)]
pub struct SegmentSplitter {
    max_chars: usize,
    sentence_marks: Vec<char>,
    clause_marks: Vec<char>,
    conjunctions: HashSet<String>,
    prepositions: HashSet<String>,
}

impl SegmentSplitter {
    pub fn new(max_chars: usize, config: &SplitterConfig) -> Self {
        Self {
            max_chars: max_chars.max(1),
            sentence_marks: config.sentence_marks.chars().collect(),
            clause_marks: config.clause_marks.chars().collect(),
            conjunctions: config.conjunctions.iter().map(|w| w.to_lowercase()).collect(),
            prepositions: config.prepositions.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split text into lines no longer than the line limit
    ///
    /// Text that already fits comes back as a single piece. A piece is only
    /// left over-long when it is a single token.
    pub fn split(&self, text: &str) -> Vec<SplitPiece> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut ranges = Vec::new();
        self.split_range(text, &tokens, 0, tokens.len() - 1, &mut ranges);
        ranges
            .into_iter()
            .map(|(first, last)| self.piece(text, &tokens, first, last))
            .collect()
    }

    /// Split text into exactly two pieces at the best boundary, whatever its length
    ///
    /// Returns `None` for text with fewer than two tokens.
    pub fn split_in_two(&self, text: &str) -> Option<(SplitPiece, SplitPiece)> {
        let tokens = tokenize(text);
        if tokens.len() < 2 {
            return None;
        }
        let last = tokens.len() - 1;
        let k = self.choose_boundary(text, &tokens, 0, last, false)?;
        Some((
            self.piece(text, &tokens, 0, k),
            self.piece(text, &tokens, k + 1, last),
        ))
    }

    /// Classify the boundary between `before` and `after`
    pub fn classify(&self, before: &str, after: &str) -> BoundaryRule {
        let stripped = before.trim_end_matches(CLOSERS);
        if let Some(mark) = stripped.chars().last() {
            if self.sentence_marks.contains(&mark) {
                return BoundaryRule::SentenceEnd;
            }
            if self.clause_marks.contains(&mark) || stripped == "-" {
                return BoundaryRule::Clause;
            }
        }

        let next = after
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if self.conjunctions.contains(&next) {
            BoundaryRule::Conjunction
        } else if self.prepositions.contains(&next) {
            BoundaryRule::Preposition
        } else {
            BoundaryRule::WordBoundary
        }
    }

    fn split_range(&self, text: &str, tokens: &[Token], first: usize, last: usize, out: &mut Vec<(usize, usize)>) {
        let length = tokens[last].char_end - tokens[first].char_start;
        if length <= self.max_chars || first == last {
            out.push((first, last));
            return;
        }

        match self.choose_boundary(text, tokens, first, last, true) {
            Some(k) => {
                self.split_range(text, tokens, first, k, out);
                self.split_range(text, tokens, k + 1, last, out);
            }
            None => out.push((first, last)),
        }
    }

    // Boundary k sits between token k and token k + 1
    fn choose_boundary(&self, text: &str, tokens: &[Token], first: usize, last: usize, fit_lines: bool) -> Option<usize> {
        if first >= last {
            return None;
        }
        let total = tokens[last].char_end - tokens[first].char_start;

        let candidates: Vec<(BoundaryRule, usize, usize, usize, usize)> = (first..last)
            .map(|k| {
                let left = tokens[k].char_end - tokens[first].char_start;
                let right = tokens[last].char_end - tokens[k + 1].char_start;
                let rule = self.classify(tokens[k].slice(text), tokens[k + 1].slice(text));
                (rule, left.abs_diff(right), k, left, right)
            })
            .collect();

        let best = |admissible: &dyn Fn(usize, usize) -> bool| {
            candidates
                .iter()
                .filter(|(_, _, _, left, right)| admissible(*left, *right))
                .min_by_key(|(rule, balance, k, _, _)| (*rule, *balance, *k))
                .map(|(_, _, k, _, _)| *k)
        };

        // Both halves fit on a line
        if fit_lines {
            if let Some(k) = best(&|left, right| left <= self.max_chars && right <= self.max_chars) {
                return Some(k);
            }
        }

        // Reasonably balanced halves
        let quarter = total / 4;
        if let Some(k) = best(&|left, right| left >= quarter && right >= quarter) {
            return Some(k);
        }

        // Any word boundary, nearest the midpoint
        candidates
            .iter()
            .min_by_key(|(_, balance, k, _, _)| (*balance, *k))
            .map(|(_, _, k, _, _)| *k)
    }

    fn piece(&self, text: &str, tokens: &[Token], first: usize, last: usize) -> SplitPiece {
        let byte_start = tokens[first].byte_start;
        let separator = if first == 0 {
            String::new()
        } else {
            text[tokens[first - 1].byte_end..byte_start].to_string()
        };
        let line = &text[byte_start..tokens[last].byte_end];
        SplitPiece {
            text: line.to_string(),
            separator,
            tokens: WordRange::new(first, last),
            overlong: line.chars().count() > self.max_chars,
        }
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut char_index = 0;

    for (byte_index, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some((byte_start, char_start)) = current.take() {
                tokens.push(Token {
                    byte_start,
                    byte_end: byte_index,
                    char_start,
                    char_end: char_index,
                });
            }
        } else if current.is_none() {
            current = Some((byte_index, char_index));
        }
        char_index += 1;
    }

    if let Some((byte_start, char_start)) = current {
        tokens.push(Token {
            byte_start,
            byte_end: text.len(),
            char_start,
            char_end: char_index,
        });
    }

    tokens
}
