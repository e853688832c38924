pub mod backup_codes;
pub mod outbox_events;
pub mod password_reset_tokens;
pub mod sessions;
pub mod users;
