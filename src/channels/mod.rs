//! Outbound notification channels.

pub mod bark;
pub mod channel;
pub mod recipients;
pub mod telegram;

pub use bark::BarkChannel;
pub use channel::*;
pub use recipients::RecipientDirectory;
pub use telegram::TelegramChannel;
