//! Row-formatting helpers shared by the data pages.
//!
//! Datatable rows arrive as raw JSON documents; pages pull fields out with
//! dotted paths and render them with the formatters here.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Looks up a dotted path in a row document, e.g. `field(row, "process.mem")`.
#[must_use]
pub fn field<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = row;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// The field as display text. Strings come through verbatim; objects and
/// arrays collapse to compact JSON; missing and null become empty.
#[must_use]
pub fn text(row: &Value, path: &str) -> String {
    match field(row, path) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric field with a zero default.
#[must_use]
pub fn num(row: &Value, path: &str) -> f64 {
    field(row, path).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Integer field with a zero default.
#[must_use]
pub fn int(row: &Value, path: &str) -> u64 {
    field(row, path).and_then(Value::as_u64).unwrap_or(0)
}

/// Leading characters of an id, enough to tell rows apart on screen.
#[must_use]
pub fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}

/// Bytes in human units with one decimal, e.g. `"45.3M"`.
#[must_use]
pub fn bytes(n: f64) -> String {
    const UNITS: [(f64, &str); 3] = [
        (1024.0 * 1024.0 * 1024.0, "G"),
        (1024.0 * 1024.0, "M"),
        (1024.0, "K"),
    ];
    if n <= 0.0 {
        return "0B".to_owned();
    }
    for (scale, unit) in UNITS {
        if n >= scale {
            return format!("{:.1}{unit}", n / scale);
        }
    }
    format!("{n:.0}B")
}

/// Age of an epoch-seconds timestamp, like `"2m ago"`. Zero, missing and
/// future timestamps show as `"-"`.
#[must_use]
pub fn since(epoch_secs: f64) -> String {
    since_at(epoch_secs, Utc::now().timestamp_millis())
}

fn since_at(epoch_secs: f64, now_ms: i64) -> String {
    if epoch_secs <= 0.0 {
        return "-".to_owned();
    }
    #[allow(clippy::cast_possible_truncation)]
    let then_ms = (epoch_secs * 1000.0) as i64;
    let elapsed_ms = now_ms.saturating_sub(then_ms);
    if elapsed_ms < 0 {
        return "-".to_owned();
    }
    #[allow(clippy::cast_sign_loss)]
    let elapsed = std::time::Duration::from_millis(elapsed_ms as u64);
    format!("{} ago", pagekit::humanize(elapsed))
}

/// Absolute clock time for an epoch-seconds value, `"-"` when unset.
#[must_use]
pub fn clock(epoch_secs: f64) -> String {
    if epoch_secs <= 0.0 {
        return "-".to_owned();
    }
    #[allow(clippy::cast_possible_truncation)]
    DateTime::<Utc>::from_timestamp(epoch_secs as i64, 0)
        .map_or_else(|| "-".to_owned(), |t| t.format("%H:%M:%S").to_string())
}

/// One-line preview of a JSON value, clipped to `max` characters.
#[must_use]
pub fn json_preview(value: &Value, max: usize) -> String {
    let line = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    clip(&line.replace('\n', " "), max)
}

/// Clips a string to `max` characters, marking the cut with `…`.
#[must_use]
pub fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Speed with two decimals, blank until there is one.
#[must_use]
pub fn speed_cell(speed: f64) -> String {
    if speed == 0.0 {
        String::new()
    } else {
        format!("{speed:.2}/s")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn field_walks_dotted_paths() {
        let row = json!({"process": {"mem": 1024, "cpu": 12.5}});
        assert_eq!(field(&row, "process.mem"), Some(&json!(1024)));
        assert_eq!(field(&row, "process.gone"), None);
        assert_eq!(field(&row, "gone.mem"), None);
    }

    #[test]
    fn text_renders_each_shape() {
        let row = json!({"s": "plain", "n": 7, "o": {"a": 1}, "z": null});
        assert_eq!(text(&row, "s"), "plain");
        assert_eq!(text(&row, "n"), "7");
        assert_eq!(text(&row, "o"), "{\"a\":1}");
        assert_eq!(text(&row, "z"), "");
        assert_eq!(text(&row, "missing"), "");
    }

    #[test]
    fn num_and_int_default_to_zero() {
        let row = json!({"f": 2.5, "i": 9});
        assert!((num(&row, "f") - 2.5).abs() < f64::EPSILON);
        assert_eq!(int(&row, "i"), 9);
        assert_eq!(int(&row, "f"), 0);
        assert_eq!(int(&row, "missing"), 0);
    }

    #[test]
    fn short_id_clips() {
        assert_eq!(short_id("5f3a9c2b1d4e8f0011223344"), "5f3a9c2b1d4e");
        assert_eq!(short_id("tiny"), "tiny");
    }

    #[test]
    fn bytes_picks_units() {
        assert_eq!(bytes(0.0), "0B");
        assert_eq!(bytes(512.0), "512B");
        assert_eq!(bytes(2048.0), "2.0K");
        assert_eq!(bytes(45.3 * 1024.0 * 1024.0), "45.3M");
        assert_eq!(bytes(3.0 * 1024.0 * 1024.0 * 1024.0), "3.0G");
    }

    #[test]
    fn since_formats_age() {
        // 90 seconds before "now".
        assert_eq!(since_at(1.0, 91_000), "1m30s ago");
        assert_eq!(since_at(0.0, 91_000), "-");
        // Clock skew: timestamp in the future.
        assert_eq!(since_at(200.0, 100_000), "-");
    }

    #[test]
    fn clock_formats_or_dashes() {
        assert_eq!(clock(0.0), "-");
        assert_eq!(clock(86_400.0 + 3_661.0), "01:01:01");
    }

    #[test]
    fn json_preview_clips_and_flattens() {
        let v = json!({"key": "value", "more": [1, 2, 3]});
        let preview = json_preview(&v, 16);
        assert_eq!(preview.chars().count(), 16);
        assert!(preview.ends_with('…'));
        assert_eq!(json_preview(&json!("short"), 16), "short");
        assert_eq!(json_preview(&Value::Null, 16), "");
    }

    #[test]
    fn speed_cell_hides_zero() {
        assert_eq!(speed_cell(0.0), "");
        assert_eq!(speed_cell(1.5), "1.50/s");
    }
}
