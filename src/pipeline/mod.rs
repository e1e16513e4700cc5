//! Message transformation pipeline.
//!
//! Every relayed message flows through:
//! 1. `TextRules` — precompiled removal matchers (URLs, hashtags, mentions, emoji)
//! 2. `Transformer::transform()` — ordered stages, decoration, length decision
//!
//! The pipeline is pure: no I/O, no shared state, no error path. It returns
//! either text to publish or a reason to skip.

pub mod processor;
pub mod rules;
pub mod types;

pub use processor::{Transformer, char_len, truncate_chars};
pub use rules::TextRules;
pub use types::{Media, MediaKind, PipelineResult, RawMessage, SkipReason};
