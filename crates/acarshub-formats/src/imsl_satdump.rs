//! IMSL/SatDump formatter. Only called for `source.app.name ==
//! "SatDump"` messages already filtered to `msg_name == "ACARS"` by
//! [`crate::normalize`]. SatDump encodes three control bytes unusually:
//! the DEL byte (0x7f) in the label is replaced with `'d'`, tail
//! registrations carry embedded dots that are stripped, and the ack byte
//! 0x15 (NAK) becomes `'!'`. `end` is the logical negation of
//! `more_to_come`, surfaced here as `is_response` since the canonical
//! schema has no dedicated `end` field.

use crate::errcount::count_err_true;
use crate::util::icao_hex_from_json;
use acarshub_protocol::{CanonicalMessage, DecoderType, RawDecoderJson};
use serde_json::Value;

pub fn format(raw: &RawDecoderJson, ingest_time: i64) -> CanonicalMessage {
    let timestamp = raw
    .get("timestamp")
    .and_then(Value::as_i64)
    .unwrap_or(ingest_time);

    let mut msg = CanonicalMessage::new(DecoderType::Imsl, timestamp);

    msg.station_id = raw
    .get("source")
    .and_then(|v| v.get("station_id"))
    .and_then(Value::as_str)
    .map(str::to_owned);

    msg.icao = icao_hex_from_json(raw.get("icao"));
    msg.flight = str_field(raw, "flight");
    msg.block_id = str_field(raw, "block_id");
    msg.msgno = str_field(raw, "msgno");
    msg.msg_text = str_field(raw, "text");

    msg.label = str_field(raw, "label").map(|l| l.replace('\u{7f}', "d"));
    msg.tail = str_field(raw, "reg").map(|t| t.replace('.', ""));
    msg.ack = str_field(raw, "ack").map(|a| a.replace('\u{15}', "!"));

    let more_to_come = raw.get("more_to_come").and_then(Value::as_bool).unwrap_or(false);
    msg.is_response = Some(!more_to_come);

    msg.error = count_err_true(raw);

    msg
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|v| v.as_str()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_control_bytes_in_label_tail_and_ack() {
        let raw = json!({
                "source": {"app": {"name": "SatDump"}, "station_id": "SATD1"},
                "msg_name": "ACARS",
                "label": "H\u{7f}1",
                "reg": "N.1.2.3.4.5",
                "ack": "\u{15}",
                "more_to_come": false,
        });
        let msg = format(&raw, 0);
        assert_eq!(msg.label.as_deref(), Some("Hd1"));
        assert_eq!(msg.tail.as_deref(), Some("N12345"));
        assert_eq!(msg.ack.as_deref(), Some("!"));
        assert_eq!(msg.is_response, Some(true));
        assert_eq!(msg.station_id.as_deref(), Some("SATD1"));
    }

    #[test]
    fn end_flag_is_negation_of_more_to_come() {
        let raw = json!({"more_to_come": true});
        let msg = format(&raw, 0);
        assert_eq!(msg.is_response, Some(false));
    }
}
