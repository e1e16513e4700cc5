//! Transformer — turns raw message text into a publish/skip decision.
//!
//! Stages run in a fixed order:
//! 1. URL removal
//! 2. Hashtag removal
//! 3. Mention removal
//! 4. Emoji removal
//! 5. Whitespace trimming
//! 6. Prefix/suffix decoration
//! 7. Length decision on the decorated text
//!
//! Removal runs before decoration so a prefix or suffix is never stripped by
//! the content rules, and the length check always sees the literal outbound
//! text.

use crate::config::TransformSettings;
use crate::pipeline::rules::{RuleKind, TextRules};
use crate::pipeline::types::{PipelineResult, SkipReason};

/// Pure text pipeline bound to one set of settings.
#[derive(Debug, Clone)]
pub struct Transformer {
    settings: TransformSettings,
    rules: TextRules,
}

impl Transformer {
    /// Create a transformer, compiling the matchers once.
    pub fn new(settings: TransformSettings) -> Self {
        Self {
            settings,
            rules: TextRules::new(),
        }
    }

    /// Run every enabled stage and decide whether to publish.
    pub fn transform(&self, text: &str) -> PipelineResult {
        let body = self.clean(text);
        let settings = &self.settings;

        let decorated = self.wrap(&body);
        let length = char_len(&decorated);

        if length == 0 {
            return PipelineResult::Skip {
                reason: SkipReason::Empty,
            };
        }

        if length <= settings.max_length {
            return PipelineResult::Publish { text: decorated };
        }

        if settings.skip_long_posts {
            return PipelineResult::Skip {
                reason: SkipReason::TooLong {
                    length,
                    max_length: settings.max_length,
                },
            };
        }

        PipelineResult::Publish {
            text: truncate_decorated(&settings.prefix, &body, &settings.suffix, settings.max_length),
        }
    }

    /// Stages 1-6 without the length decision: the full candidate post.
    pub fn decorate(&self, text: &str) -> String {
        self.wrap(&self.clean(text))
    }

    fn wrap(&self, body: &str) -> String {
        format!("{}{}{}", self.settings.prefix, body, self.settings.suffix)
    }

    /// Stages 1-5: the enabled removal rules, then whitespace trimming.
    pub fn clean(&self, text: &str) -> String {
        let settings = &self.settings;
        let stages = [
            (settings.remove_urls, RuleKind::Url),
            (settings.remove_hashtags, RuleKind::Hashtag),
            (settings.remove_mentions, RuleKind::Mention),
            (settings.remove_emojis, RuleKind::Emoji),
        ];

        let mut body = text.to_string();
        for (enabled, kind) in stages {
            if enabled {
                body = self.rules.remove(kind, &body);
            }
        }

        if settings.trim_extra_spaces {
            body = self.rules.collapse_whitespace(&body);
        }
        body
    }
}

/// Length in the unit the limit is expressed in (Unicode scalar values).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Hard-cut `prefix + body + suffix` to `max_length` characters.
///
/// The prefix always survives (cut itself only if it alone is over the
/// limit). When the whole suffix fits after the prefix the body is cut to
/// make room for it; otherwise the decorated text is cut at the limit.
fn truncate_decorated(prefix: &str, body: &str, suffix: &str, max_length: usize) -> String {
    let prefix_len = char_len(prefix);
    if prefix_len >= max_length {
        return truncate_chars(prefix, max_length).to_string();
    }

    let remaining = max_length - prefix_len;
    let suffix_len = char_len(suffix);

    if suffix_len <= remaining {
        let body = truncate_chars(body, remaining - suffix_len);
        format!("{prefix}{body}{suffix}")
    } else {
        let decorated = format!("{prefix}{body}{suffix}");
        truncate_chars(&decorated, max_length).to_string()
    }
}
