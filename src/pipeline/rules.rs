//! Precompiled removal matchers.
//!
//! Compiled once when the `Transformer` is built and reused for every
//! message. Each rule deletes its matches outright; collapsing the gaps they
//! leave is the whitespace stage's job.

use regex::Regex;

/// URL tokens: `http://`, `https://` or `www.` up to the next whitespace.
const URL_PATTERN: &str = r"(?i)(?:https?://|www\.)\S+";

/// `#` followed by word characters (stops at whitespace and punctuation).
const HASHTAG_PATTERN: &str = r"#\w+";

/// `@` followed by word characters.
const MENTION_PATTERN: &str = r"@\w+";

/// Pictographs plus the modifiers, flags, keycaps and joiners that attach to them.
/// Digits, `#` and `*` are emoji bases too but are deliberately left alone.
const EMOJI_PATTERN: &str = r"[\p{Extended_Pictographic}\p{Emoji_Modifier}\x{1F1E6}-\x{1F1FF}\x{FE0E}\x{FE0F}\x{200D}\x{20E3}\x{E0020}-\x{E007F}]+";

const WHITESPACE_PATTERN: &str = r"\s+";

/// Which removal rule a matcher implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Url,
    Hashtag,
    Mention,
    Emoji,
}

/// Compiled matchers for every text rule.
#[derive(Debug, Clone)]
pub struct TextRules {
    url: Regex,
    hashtag: Regex,
    mention: Regex,
    emoji: Regex,
    whitespace: Regex,
}

impl TextRules {
    /// Compile the built-in patterns.
    pub fn new() -> Self {
        Self {
            url: Regex::new(URL_PATTERN).unwrap(),
            hashtag: Regex::new(HASHTAG_PATTERN).unwrap(),
            mention: Regex::new(MENTION_PATTERN).unwrap(),
            emoji: Regex::new(EMOJI_PATTERN).unwrap(),
            whitespace: Regex::new(WHITESPACE_PATTERN).unwrap(),
        }
    }

    fn matcher(&self, kind: RuleKind) -> &Regex {
        match kind {
            RuleKind::Url => &self.url,
            RuleKind::Hashtag => &self.hashtag,
            RuleKind::Mention => &self.mention,
            RuleKind::Emoji => &self.emoji,
        }
    }

    /// Delete every match of `kind` from `text`.
    pub fn remove(&self, kind: RuleKind, text: &str) -> String {
        self.matcher(kind).replace_all(text, "").into_owned()
    }

    /// Whether `text` still contains a match of `kind`.
    pub fn is_match(&self, kind: RuleKind, text: &str) -> bool {
        self.matcher(kind).is_match(text)
    }

    /// Collapse whitespace runs into one space and strip both ends.
    pub fn collapse_whitespace(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }
}

impl Default for TextRules {
    fn default() -> Self {
        Self::new()
    }
}
