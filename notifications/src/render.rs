use chrono::{DateTime, Utc};

/// Renders the reminder body from the time remaining until the appointment.
///
/// The phrasing tiers on the coarsest unit that applies: under a minute we
/// say "a few minutes", under an hour just minutes, under a day hours plus
/// leftover minutes, otherwise days plus leftover hours. Integer division
/// truncates toward zero throughout.
pub(crate) fn reminder_body(scheduled_for: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (scheduled_for - now).num_seconds();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let remaining = if minutes == 0 {
        "a few minutes".to_string()
    } else if hours == 0 {
        format!("{minutes} minute(s)")
    } else if days == 0 {
        format!("{hours} hour(s) {} minute(s)", minutes % 60)
    } else {
        format!("{days} day(s) {} hour(s)", hours % 24)
    };

    format!("You have an appointment coming up in {remaining}.")
}
