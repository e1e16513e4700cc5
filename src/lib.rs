//! Smart Relay — republishes Telegram channel posts to X/Twitter.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod pipeline;
