use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Asia::Taipei;

/// TWSE regular session (the trading window gate, stage 1 of the
/// veto chain): 09:00–13:30 Asia/Taipei, Monday through Friday. Holidays
/// are not modeled here — they come from the bar feed simply not producing
/// bars on those days.
fn session_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid literal time")
}

fn session_close() -> NaiveTime {
    NaiveTime::from_hms_opt(13, 30, 0).expect("valid literal time")
}

/// Whether `now` falls inside the regular trading session in Taipei local
/// time. Used as the engine's window gate (veto chain stage 1) ahead of
/// any strategy or risk computation.
pub fn is_within_trading_window(now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&Taipei);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let clock = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second()).unwrap_or_else(session_open);
    clock >= session_open() && clock <= session_close()
}

/// Margin ahead of the session close at which open positions are
/// force-flattened, so the close-out order has a tick to fill before the
/// window actually ends.
const FORCE_FLATTEN_EPSILON_SECS: i64 = 5;

/// True once `now` is within [`FORCE_FLATTEN_EPSILON_SECS`] of the session
/// close (inclusive), on a trading day. The engine force-flattens every
/// open position for as long as this holds (§4.3 step 1, seed scenario 6).
pub fn is_at_or_past_window_close(now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&Taipei);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let clock = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second()).unwrap_or_else(session_open);
    clock >= session_close() - chrono::Duration::seconds(FORCE_FLATTEN_EPSILON_SECS)
}
