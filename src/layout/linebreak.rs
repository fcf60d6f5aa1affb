use std::collections::HashSet;

use super::{Line, Measurer};

/// Characters that may not begin a line: closing brackets, trailing
/// punctuation, small kana, iteration marks, prolonged sound marks and the
/// ASCII space (so a wrapped space stays at the end of the previous line).
pub const DEFAULT_START_PROHIBITED: &str = concat!(
    " ,.:;?!)]}>",
    "、。，．・：；？！゛゜‐゠–〜～…‥",
    "）］｝」』】〕〉》〙〗〟’”｠»",
    "ヽヾゝゞ々〻ー",
    "ぁぃぅぇぉっゃゅょゎゕゖ",
    "ァィゥェォッャュョヮヵヶ",
    "ㇰㇱㇲㇳㇴㇵㇶㇷㇸㇹㇺㇻㇼㇽㇾㇿ",
    "\u{3099}\u{309A}",
);

/// Characters that may not end a line: opening brackets and quotes.
pub const DEFAULT_END_PROHIBITED: &str = "([{<（［｛「『【〔〈《〘〖〝‘“｟«";

pub fn default_start_prohibited() -> HashSet<char> {
    let mut set: HashSet<char> = DEFAULT_START_PROHIBITED.chars().collect();
    // Combining diacritical marks never start a line either.
    set.extend(('\u{0300}'..='\u{036F}').collect::<Vec<_>>());
    set
}

pub fn default_end_prohibited() -> HashSet<char> {
    DEFAULT_END_PROHIBITED.chars().collect()
}

/// ASCII letters, digits, `_` and `-`: runs of these are kept together when wrapping.
pub fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Splits text into display lines no wider than a pixel limit, honouring
/// manual newlines, start/end prohibition rules and ASCII word boundaries.
pub struct LineBreaker<'a> {
    measurer: Measurer<'a>,
    start_prohibited: &'a HashSet<char>,
    end_prohibited: &'a HashSet<char>,
}

impl<'a> LineBreaker<'a> {
    pub fn new(
        measurer: Measurer<'a>,
        start_prohibited: &'a HashSet<char>,
        end_prohibited: &'a HashSet<char>,
    ) -> Self {
        Self {
            measurer,
            start_prohibited,
            end_prohibited,
        }
    }

    pub fn measurer(&self) -> &Measurer<'a> {
        &self.measurer
    }

    /// Empty text yields no lines. A manual newline always ends a line; empty
    /// segments between consecutive newlines produce nothing.
    pub fn split(&self, text: &str, max_width: f32) -> Vec<Line> {
        let mut lines = Vec::new();
        for segment in text.split('\n') {
            let segment = segment.strip_suffix('\r').unwrap_or(segment);
            if segment.is_empty() {
                continue;
            }
            let chars: Vec<char> = segment.chars().collect();
            self.split_segment(&chars, max_width, &mut lines);
        }
        lines
    }

    fn split_segment(&self, chars: &[char], max_width: f32, lines: &mut Vec<Line>) {
        let mut current: Vec<char> = Vec::new();
        let mut current_width = 0.0;
        let mut idx = 0;

        while idx < chars.len() {
            let pending = chars[idx];
            let extended = self.measurer.extend(current_width, current.len(), pending);
            if current.is_empty() || extended <= max_width {
                current.push(pending);
                current_width = extended;
                idx += 1;
                continue;
            }

            if self.start_prohibited.contains(&pending) {
                while idx < chars.len() && self.start_prohibited.contains(&chars[idx]) {
                    current.push(chars[idx]);
                    idx += 1;
                }
                lines.push(Line::new(std::mem::take(&mut current)));
                current_width = 0.0;
                continue;
            }

            if current
                .last()
                .is_some_and(|last| self.end_prohibited.contains(last))
            {
                if current.len() > 1 {
                    let carried = self.take_end_prohibited_tail(&mut current);
                    lines.push(Line::new(std::mem::replace(&mut current, carried)));
                    current_width = self.measurer.width(&current);
                    // The pending character is retried against the carried tail.
                    continue;
                }
                lines.push(Line::new(std::mem::take(&mut current)));
                current_width = 0.0;
                continue;
            }

            if is_word_char(pending) {
                let split_at = self.word_break_point(&current);
                if split_at > 0 && split_at < current.len() {
                    let word = current.split_off(split_at);
                    lines.push(Line::new(std::mem::replace(&mut current, word)));
                    current_width = self.measurer.width(&current);
                    continue;
                }
            }

            lines.push(Line::new(std::mem::take(&mut current)));
            current_width = 0.0;
        }

        if !current.is_empty() {
            lines.push(Line::new(current));
        }
    }

    /// Removes the trailing run of end-prohibited characters from `current`,
    /// always leaving at least one character behind.
    /// Start of the trailing word, moved back over any end-prohibited
    /// characters in front of it so they travel with the word.
    fn word_break_point(&self, current: &[char]) -> usize {
        let mut start = word_start(current);
        if start == current.len() {
            return start;
        }
        while start > 0 && self.end_prohibited.contains(&current[start - 1]) {
            start -= 1;
        }
        start
    }

    fn take_end_prohibited_tail(&self, current: &mut Vec<char>) -> Vec<char> {
        let mut keep = current.len();
        while keep > 1 && self.end_prohibited.contains(&current[keep - 1]) {
            keep -= 1;
        }
        current.split_off(keep)
    }
}

/// Index where the word run at the end of `line` begins; `line.len()` when
/// the line does not end in a word character.
fn word_start(line: &[char]) -> usize {
    let mut start = line.len();
    while start > 0 && is_word_char(line[start - 1]) {
        start -= 1;
    }
    start
}
