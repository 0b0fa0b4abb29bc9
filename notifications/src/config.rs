/// Upper bound on messages per gateway request. The provider accepts up to
/// 100; we stay at 80 to keep a safety margin.
pub const MAX_MESSAGES_PER_REQUEST: usize = 80;

/// Dispatcher settings, built once at startup and handed to the constructor.
#[derive(Debug, Clone)]
pub struct NotificationsConfig {
    /// Default day window for the daily reminder run, used when the trigger
    /// does not carry an explicit override.
    pub reminder_window_days: u16,
}
