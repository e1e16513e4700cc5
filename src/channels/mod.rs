//! Channel abstraction for message I/O.

pub mod channel;
pub mod oauth;
pub mod telegram;
pub mod twitter;

pub use channel::*;
pub use telegram::TelegramChannel;
pub use twitter::TwitterClient;
