//! HFDL formatter. Frequency is already in kHz upstream; we convert
//! to MHz and trim, matching the VDL-M2/ACARS display convention. Signal
//! level is truncated (not rounded) to one decimal place.

use crate::errcount::count_err_true;
use crate::util::{format_mhz_trim, icao_hex_from_json, truncate_1dp};
use acarshub_protocol::{CanonicalMessage, DecoderType, RawDecoderJson};
use serde_json::Value;

pub fn format(raw: &RawDecoderJson, ingest_time: i64) -> CanonicalMessage {
    let hfdl = raw.get("hfdl");

    let timestamp = hfdl
    .and_then(|v| v.get("t"))
    .and_then(|t| t.get("sec"))
    .and_then(|v| v.as_i64())
    .unwrap_or(ingest_time);

    let mut msg = CanonicalMessage::new(DecoderType::Hfdl, timestamp);

    msg.station_id = hfdl
    .and_then(|v| v.get("station"))
    .and_then(|v| v.as_str())
    .map(str::to_owned);

    msg.freq = hfdl
    .and_then(|v| v.get("freq"))
    .and_then(Value::as_f64)
    .map(|khz| format_mhz_trim(khz / 1000.0));

    msg.level = hfdl
    .and_then(|v| v.get("sig_level"))
    .and_then(Value::as_f64)
    .map(truncate_1dp);

    let spdu = hfdl.and_then(|v| v.get("spdu"));
    let lpdu = hfdl.and_then(|v| v.get("lpdu"));
    let hfnpdu = lpdu.and_then(|v| v.get("hfnpdu"));
    let acars = hfnpdu.and_then(|v| v.get("acars"));

    msg.icao = lpdu
    .and_then(|v| v.get("src"))
    .and_then(|v| v.get("ac_info"))
    .and_then(|v| v.get("icao"))
    .and_then(|v| icao_hex_from_json(Some(v)));

    msg.tail = str_field(acars, "reg");
    msg.flight = str_field(acars, "flight");
    msg.label = str_field(acars, "label");
    msg.block_id = str_field(acars, "block_id");
    msg.msgno = str_field(acars, "msgno");
    msg.ack = str_field(acars, "ack");
    msg.msg_text = str_field(acars, "msg_text");
    msg.is_response = acars.and_then(|v| v.get("is_response")).and_then(Value::as_bool);

    if spdu.is_some() {
        msg.mode = Some("spdu".to_owned());
    }

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
    fn formats_freq_as_mhz_and_truncates_level() {
        let raw = json!({
                "hfdl": {
                    "t": {"sec": 1_700_000_000},
                    "station": "HFDL1",
                    "freq": 10_096.0,
                    "sig_level": -12.39,
                    "lpdu": {
                        "src": {"ac_info": {"icao": "A1B2C3"}},
                        "hfnpdu": {"acars": {"reg": "N12345", "flight": "UAL1"}}
                    }
                }
        });
        let msg = format(&raw, 0);
        assert_eq!(msg.freq.as_deref(), Some("10.096"));
        assert_eq!(msg.level, Some(-12.3));
        assert_eq!(msg.icao.as_deref(), Some("A1B2C3"));
        assert_eq!(msg.tail.as_deref(), Some("N12345"));
    }

    #[test]
    fn spdu_only_message_has_no_acars_fields() {
        let raw = json!({"hfdl": {"spdu": {}}});
        let msg = format(&raw, 5);
        assert_eq!(msg.mode.as_deref(), Some("spdu"));
        assert_eq!(msg.tail, None);
    }
}
