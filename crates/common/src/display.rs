// Human-facing rendering helpers. Stateless; the sync core never calls these
// for ordering decisions.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::timestamp::Timestamp;
use crate::types::Message;

/// Sender name the server uses for messages posted from this client.
pub const SELF_SENDER_ALIAS: &str = "you";

/// Render a timestamp as `Mon D HH:MM` (24-hour) in UTC.
///
/// A missing or unparsable timestamp renders as `now`.
pub fn format_display_time(timestamp: Option<&Timestamp>, now: DateTime<Utc>) -> String {
    format_display_time_in(timestamp, now, &Utc.fix())
}

/// Like [`format_display_time`] but shifted into a fixed UTC offset.
pub fn format_display_time_in(
    timestamp: Option<&Timestamp>,
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> String {
    let instant = timestamp.and_then(Timestamp::instant).unwrap_or(now);
    instant.with_timezone(offset).format("%b %-d %H:%M").to_string()
}

/// Whether a message was posted by this client.
pub fn is_own_message(message: &Message, client_name: &str) -> bool {
    message.sender == client_name || message.sender == SELF_SENDER_ALIAS
}

/// `You: <text>` for own messages, `<sender>: <text>` otherwise.
pub fn display_label(message: &Message, client_name: &str) -> String {
    if is_own_message(message, client_name) {
        format!("You: {}", message.text)
    } else {
        format!("{}: {}", message.sender, message.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 9, 8, 5, 0).single().expect("valid test instant")
    }

    #[test]
    fn formats_month_day_and_24h_time() {
        let ts = Timestamp::new("2024-01-05 14:03:59");
        assert_eq!(format_display_time(Some(&ts), now()), "Jan 5 14:03");
    }

    #[test]
    fn falls_back_to_now_for_missing_or_malformed() {
        assert_eq!(format_display_time(None, now()), "Jun 9 08:05");
        let garbage = Timestamp::new("not-a-time");
        assert_eq!(format_display_time(Some(&garbage), now()), "Jun 9 08:05");
    }

    #[test]
    fn applies_fixed_offset() {
        let ts = Timestamp::new("2024-01-05T22:30:00Z");
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid offset");
        assert_eq!(format_display_time_in(Some(&ts), now(), &ist), "Jan 6 04:00");
    }

    #[test]
    fn labels_own_messages_by_name_or_alias() {
        let mine = Message::new("DefaultUser", "hello", Timestamp::default());
        let alias = Message::new("you", "hey", Timestamp::default());
        let theirs = Message::new("bob", "hi", Timestamp::default());

        assert_eq!(display_label(&mine, "DefaultUser"), "You: hello");
        assert_eq!(display_label(&alias, "DefaultUser"), "You: hey");
        assert_eq!(display_label(&theirs, "DefaultUser"), "bob: hi");
        assert!(!is_own_message(&theirs, "DefaultUser"));
    }
}
