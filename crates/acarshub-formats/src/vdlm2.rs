//! VDL-M2 formatter. Frequency arrives as a raw integer count of Hz
//! (`136975`) and is reformatted to MHz (`136.975`), trailing zeros trimmed
//! but keeping at least one decimal digit.

use crate::errcount::count_err_true;
use crate::util::{format_mhz_trim, icao_hex_from_json};
use acarshub_protocol::{empty_to_none, CanonicalMessage, DecoderType, RawDecoderJson};
use serde_json::Value;

pub fn format(raw: &RawDecoderJson, ingest_time: i64) -> CanonicalMessage {
    let vdl2 = raw.get("vdl2");

    let timestamp = vdl2
    .and_then(|v| v.get("t"))
    .and_then(|t| t.get("sec"))
    .and_then(Value::as_i64)
    .unwrap_or(ingest_time);

    let mut msg = CanonicalMessage::new(DecoderType::Vdlm2, timestamp);

    msg.station_id = vdl2
    .and_then(|v| v.get("station"))
    .and_then(Value::as_str)
    .map(str::to_owned);

    msg.freq = vdl2
    .and_then(|v| v.get("freq"))
    .and_then(Value::as_f64)
    .map(|raw_freq| format_mhz_trim(raw_freq / 1000.0));

    msg.level = vdl2.and_then(|v| v.get("sig_level")).and_then(Value::as_f64);

    let avlc = vdl2.and_then(|v| v.get("avlc"));
    let src = avlc.and_then(|v| v.get("src"));

    msg.icao = src.and_then(|v| v.get("addr")).and_then(|v| icao_hex_from_json(Some(v)));

    // src.status == "Airborne" -> 0, anything else -> 2.
    msg.is_onground = src.and_then(|v| v.get("status")).and_then(Value::as_str).map(|status| {
            if status == "Airborne" {
                0
            } else {
                2
            }
    });

    msg.is_response = avlc
    .and_then(|v| v.get("cr"))
    .and_then(Value::as_str)
    .map(|cr| cr == "Response");

    let acars = avlc.and_then(|v| v.get("acars"));
    msg.tail = str_field(acars, "reg");
    msg.flight = str_field(acars, "flight");
    msg.label = str_field(acars, "label");
    msg.block_id = str_field(acars, "block_id");
    msg.msgno = empty_to_none(str_field(acars, "msgno"));
    msg.ack = str_field(acars, "ack");
    msg.msg_text = str_field(acars, "msg_text");

    msg.error = count_err_true(raw);

    msg
}

fn str_field(v: Option<&Value>, key: &str) -> Option<String> {
    v.and_then(|v| v.get(key)).and_then(|v| v.as_str()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_frequency_and_station() {
        let raw = json!({
                "vdl2": {
                    "t": {"sec": 1_700_000_000},
                    "station": "KJFK1",
                    "freq": 136_975,
                    "sig_level": -12.3,
                    "avlc": {
                        "cr": "Response",
                        "src": {"addr": 11_256_099, "status": "Airborne"},
                        "acars": {"reg": "N12345", "flight": "UAL123", "msgno": ""}
                    }
                }
        });
        let msg = format(&raw, 0);
        assert_eq!(msg.timestamp, 1_700_000_000);
        assert_eq!(msg.station_id.as_deref(), Some("KJFK1"));
        assert_eq!(msg.freq.as_deref(), Some("136.975"));
        assert_eq!(msg.tail.as_deref(), Some("N12345"));
        assert_eq!(msg.is_onground, Some(0));
        assert_eq!(msg.is_response, Some(true));
        assert_eq!(msg.msgno, None);
    }

    #[test]
    fn non_airborne_status_maps_to_two() {
        let raw = json!({"vdl2": {"avlc": {"src": {"status": "OnGround"}}}});
        let msg = format(&raw, 0);
        assert_eq!(msg.is_onground, Some(2));
    }
}
