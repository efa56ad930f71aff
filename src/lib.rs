//! memos-relay — forwards Memos webhooks to Bark and Telegram.

pub mod channels;
pub mod config;
pub mod error;
pub mod format;
pub mod forward;
pub mod memo;
pub mod webhook;
