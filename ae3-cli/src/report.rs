//! Session summary table
//!
//! A pilot-friendly per-file overview: one row per session with start, end,
//! duration, record count, max propeller speed and max coolant temperature,
//! plus a totals footer.

use ae3_decoder::Session;
use chrono::Duration;

/// Channel code of the propeller speed signal
const PROPELLER_SPEED: u16 = 802;

/// Channel code of the coolant temperature signal
const COOLANT_TEMP: u16 = 806;

/// Render the summary table for one decoded container
pub fn render_summary(sessions: &[Session], filename: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nAE3 Summary: {}\n", filename));
    out.push_str(&"=".repeat(95));
    out.push('\n');
    out.push_str(&format!(
        " {:>3}   {:<20}{:<20}{:>9}  {:>7}  {:>7}  {:>11}\n",
        "#", "Start", "End", "Duration", "Records", "Max RPM", "Max Coolant"
    ));
    out.push_str(&format!(
        " {:>3}   {:<20}{:<20}{:>9}  {:>7}  {:>7}  {:>11}\n",
        "---",
        "-".repeat(19),
        "-".repeat(19),
        "-".repeat(9),
        "-".repeat(7),
        "-".repeat(7),
        "-".repeat(11)
    ));

    let mut total_seconds = 0i64;
    for session in sessions {
        let max_rpm = session.max_value(PROPELLER_SPEED).unwrap_or(0.0);
        let coolant = session
            .max_value(COOLANT_TEMP)
            .map(|c| format!("{:.1} C", c))
            .unwrap_or_else(|| "N/A".to_string());

        // Undecodable starts and runs still open at dump time are labelled
        // rather than shown as computed timestamps.
        let start = if session.start_decoded {
            session.start_time.format("%Y-%m-%d %H:%M").to_string()
        } else {
            "unknown".to_string()
        };
        let end = if session.closed {
            session.end_time().format("%Y-%m-%d %H:%M").to_string()
        } else {
            "in progress".to_string()
        };

        out.push_str(&format!(
            " {:3}   {:<20}{:<20}{:>9}  {:>7}  {:>7.0}  {:>11}\n",
            session.index + 1,
            start,
            end,
            format_duration(session.duration()),
            session.record_count(),
            max_rpm,
            coolant
        ));
        total_seconds += session.record_count() as i64;
    }

    let latest = sessions
        .iter()
        .filter(|s| s.start_decoded)
        .map(|s| s.start_time)
        .max()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    out.push_str(&"=".repeat(95));
    out.push('\n');
    out.push_str(&format!(
        " {} sessions | {} total engine time | Latest: {}\n",
        sessions.len(),
        format_duration(Duration::seconds(total_seconds)),
        latest
    ));
    out
}

/// `H:MM:SS`
fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let (hours, rest) = (total / 3600, total % 3600);
    format!("{}:{:02}:{:02}", hours, rest / 60, rest % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ae3_decoder::ChannelRecord;
    use chrono::{TimeZone, Utc};

    fn session(records: usize) -> Session {
        let start = Utc.with_ymd_and_hms(2024, 7, 26, 17, 6, 0).unwrap();
        Session {
            index: 0,
            start_time: start,
            start_decoded: true,
            closed: true,
            channels: vec![802, 806],
            records: (0..records)
                .map(|s| ChannelRecord {
                    timestamp: start + Duration::seconds(s as i64),
                    values: vec![2100.0 + s as f64, 88.5],
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(0)), "0:00:00");
        assert_eq!(format_duration(Duration::seconds(61)), "0:01:01");
        assert_eq!(format_duration(Duration::seconds(3725)), "1:02:05");
    }

    #[test]
    fn test_summary_contains_session_row() {
        let text = render_summary(&[session(120)], "MyHexDump.ae3");
        assert!(text.contains("AE3 Summary: MyHexDump.ae3"));
        assert!(text.contains("2024-07-26 17:06"));
        assert!(text.contains("0:02:00"));
        assert!(text.contains("2219")); // max rpm over 120 records
        assert!(text.contains("88.5 C"));
        assert!(text.contains("1 sessions"));
    }

    #[test]
    fn test_open_session_shown_in_progress() {
        let mut open = session(60);
        open.closed = false;
        let text = render_summary(&[open], "MyHexDump.ae3");
        assert!(text.contains("in progress"));
        // Only the start column carries a timestamp.
        assert_eq!(text.matches("2024-07-26 17:06").count(), 1);
    }

    #[test]
    fn test_unknown_start_is_labelled() {
        let mut s = session(60);
        s.start_decoded = false;
        let text = render_summary(&[s], "MyHexDump.ae3");
        assert!(text.contains("unknown"));
        assert!(text.contains("Latest: unknown"));
    }

    #[test]
    fn test_summary_of_empty_file() {
        let text = render_summary(&[], "empty.ae3");
        assert!(text.contains("0 sessions"));
        assert!(text.contains("Latest: unknown"));
    }
}
