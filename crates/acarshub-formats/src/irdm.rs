//! IRDM (iridium-toolkit) formatter. The toolkit reports frequency as
//! a raw channel index rather than MHz; channels snap to a 1616 MHz base at
//! 10 MHz / (30 * 8) spacing.

use crate::errcount::count_err_true;
use crate::util::icao_hex_from_json;
use acarshub_protocol::{CanonicalMessage, DecoderType, RawDecoderJson};
use serde_json::Value;

const IRIDIUM_BASE_MHZ: f64 = 1616.0;
const CHANNEL_WIDTH_MHZ: f64 = 10.0 / (30.0 * 8.0);

fn channel_to_mhz(channel: f64) -> f64 {
    IRIDIUM_BASE_MHZ + channel * CHANNEL_WIDTH_MHZ
}

pub fn format(raw: &RawDecoderJson, ingest_time: i64) -> CanonicalMessage {
    let timestamp = raw
    .get("time")
    .and_then(Value::as_str)
    .and_then(parse_iso_timestamp)
    .unwrap_or(ingest_time);

    let mut msg = CanonicalMessage::new(DecoderType::Irdm, timestamp);

    msg.station_id = raw
    .get("source")
    .and_then(|v| v.get("station_id"))
    .and_then(Value::as_str)
    .map(str::to_owned);

    msg.freq = raw
    .get("freq")
    .or_else(|| raw.get("channel"))
    .and_then(Value::as_f64)
    .map(|ch| format!("{:.6}", channel_to_mhz(ch)));

    msg.level = raw.get("level").and_then(Value::as_f64);
    msg.icao = icao_hex_from_json(raw.get("icao"));
    msg.tail = str_field(raw, "tail");
    msg.flight = str_field(raw, "flight");
    msg.msg_text = str_field(raw, "text").or_else(|| str_field(raw, "payload"));

    msg.error = count_err_true(raw);

    msg
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|v| v.as_str()).map(str::to_owned)
}

/// Parse `YYYY-MM-DDTHH:MM:SS(.fff)?Z` without pulling in a datetime crate:
/// iridium-toolkit timestamps are always UTC and always this exact shape.
fn parse_iso_timestamp(s: &str) -> Option<i64> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    let (date, time) = s.split_once('T')?;
    let mut date_parts = date.split('-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: i64 = date_parts.next()?.parse().ok()?;
    let day: i64 = date_parts.next()?.parse().ok()?;

    let time = time.split('.').next().unwrap_or(time);
    let mut time_parts = time.split(':');
    let hour: i64 = time_parts.next()?.parse().ok()?;
    let minute: i64 = time_parts.next()?.parse().ok()?;
    let second: i64 = time_parts.next()?.parse().ok()?;

    let days = days_from_civil(year, month, day);
    Some(days * 86_400 + hour * 3_600 + minute * 60 + second)
}

/// Howard Hinnant's `days_from_civil` algorithm: proleptic-Gregorian day
/// count since the Unix epoch, valid for any year.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snaps_channel_to_base_frequency() {
        let raw = json!({"channel": 0});
        let msg = format(&raw, 0);
        assert_eq!(msg.freq.as_deref(), Some("1616.000000"));
    }

    #[test]
    fn parses_iso_timestamp() {
        let raw = json!({"time": "2024-01-01T00:00:00Z"});
        let msg = format(&raw, 0);
        assert_eq!(msg.timestamp, 1_704_067_200);
    }

    #[test]
    fn falls_back_to_ingest_time_on_bad_timestamp() {
        let raw = json!({"time": "not-a-date"});
        let msg = format(&raw, 77);
        assert_eq!(msg.timestamp, 77);
    }
}
