//! Raw ACARS formatter — the fallback when no other decoder shape matches
//!. Fields pass through close to 1:1; `icao` is normalized to
//! 6-char uppercase hex.

use crate::errcount::count_err_true;
use crate::util::icao_hex_from_json;
use acarshub_protocol::{CanonicalMessage, DecoderType, RawDecoderJson};

pub fn format(raw: &RawDecoderJson, ingest_time: i64) -> CanonicalMessage {
    let timestamp = raw
    .get("timestamp")
    .or_else(|| raw.get("time"))
    .and_then(|v| v.as_i64())
    .unwrap_or(ingest_time);

    let mut msg = CanonicalMessage::new(DecoderType::Acars, timestamp);
    msg.station_id = str_field(raw, "station_id");
    msg.toaddr = str_field(raw, "toaddr");
    msg.fromaddr = str_field(raw, "fromaddr");
    msg.icao = icao_hex_from_json(raw.get("icao"));
    msg.tail = str_field(raw, "tail");
    msg.flight = str_field(raw, "flight");
    msg.depa = str_field(raw, "depa");
    msg.dsta = str_field(raw, "dsta");
    msg.eta = str_field(raw, "eta");
    msg.gtout = str_field(raw, "gtout");
    msg.gtin = str_field(raw, "gtin");
    msg.wloff = str_field(raw, "wloff");
    msg.wlin = str_field(raw, "wlin");
    msg.lat = raw.get("lat").and_then(|v| v.as_f64());
    msg.lon = raw.get("lon").and_then(|v| v.as_f64());
    msg.alt = raw.get("alt").and_then(|v| v.as_f64());
    msg.freq = str_field(raw, "freq");
    msg.level = raw.get("level").and_then(|v| v.as_f64());
    msg.ack = str_field(raw, "ack");
    msg.mode = str_field(raw, "mode");
    msg.label = str_field(raw, "label");
    msg.block_id = str_field(raw, "block_id");
    msg.msgno = str_field(raw, "msgno");
    msg.is_response = raw.get("is-response").and_then(|v| v.as_bool());
    msg.is_onground = raw.get("is-onground").and_then(|v| v.as_i64()).map(|v| v as i32);
    msg.msg_text = str_field(raw, "text");
    msg.libacars = raw.get("libacars").map(|v| v.to_string());

    msg.error = raw
    .get("error")
    .and_then(|v| v.as_i64())
    .unwrap_or_else(|| count_err_true(raw));

    msg
}

fn str_field(raw: &RawDecoderJson, key: &str) -> Option<String> {
    raw.get(key).and_then(|v| v.as_str()).map(str::to_owned)
}
