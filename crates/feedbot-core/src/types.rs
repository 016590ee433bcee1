//! Shared primitive types.

/// Numeric chat identifier, the unit of subscription.
///
/// Telegram chat ids are signed 64-bit (groups are negative).
pub type ChatId = i64;

/// Name of the Telegram transport, used to route outbound messages.
pub const TELEGRAM: &str = "telegram";
