//! Typewriter output for the interactive chat.
//!
//! Purely a presentation concern: characters are paced as they are printed,
//! and the pace slows for emotionally weighted words so heavy sentences do
//! not rush past. The text itself is never altered.

use std::io::Write;
use std::time::Duration;

/// Words that slow the typing pace when they appear.
const EMOTION_WORDS: &[&str] = &[
    "stress",
    "stressed",
    "anxious",
    "anxiety",
    "sad",
    "sadness",
    "lonely",
    "alone",
    "worry",
    "worried",
    "afraid",
    "fear",
    "tired",
    "overwhelmed",
    "breathe",
    "breathing",
    "calm",
    "gentle",
];

/// Per-character delays for normal and emotional words.
const BASE_DELAY: Duration = Duration::from_millis(15);
const SLOW_DELAY: Duration = Duration::from_millis(45);

/// Paced character-by-character writer.
#[derive(Debug, Clone)]
pub struct Typewriter {
    enabled: bool,
}

impl Typewriter {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// A typewriter that prints instantly. Used for `--plain` and in tests.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Write `text` followed by a newline, pacing each character.
    pub fn write_line(&self, out: &mut impl Write, text: &str) -> std::io::Result<()> {
        if !self.enabled {
            return writeln!(out, "{}", text);
        }

        for word in split_inclusive_whitespace(text) {
            let delay = if is_emotional(&word) {
                SLOW_DELAY
            } else {
                BASE_DELAY
            };

            for ch in word.chars() {
                write!(out, "{}", ch)?;
                out.flush()?;
                std::thread::sleep(delay);
            }
        }

        writeln!(out)
    }
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into words, keeping the trailing whitespace with each word.
fn split_inclusive_whitespace(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            in_space = true;
        } else if in_space {
            words.push(std::mem::take(&mut current));
            in_space = false;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Whether a word carries emotional weight.
fn is_emotional(word: &str) -> bool {
    let cleaned: String = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_lowercase();
    EMOTION_WORDS.contains(&cleaned.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_writes_text_verbatim() {
        let mut out = Vec::new();
        Typewriter::disabled()
            .write_line(&mut out, "Take a deep breath.")
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Take a deep breath.\n");
    }

    #[test]
    fn test_emotional_word_detection() {
        assert!(is_emotional("stressed"));
        assert!(is_emotional("Stressed,"));
        assert!(is_emotional("breathing!"));
        assert!(!is_emotional("compiler"));
        assert!(!is_emotional(""));
    }

    #[test]
    fn test_split_preserves_text() {
        let text = "hello  world\nagain";
        let joined: String = split_inclusive_whitespace(text).concat();
        assert_eq!(joined, text);
    }
}
