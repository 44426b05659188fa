//! IMSL/JAERO formatter. JAERO emits Inmarsat STD-C ACARS frames
//! wrapped in an `app.name == "JAERO"` envelope. `to_addr`/`from_addr` parse
//! as hex; `icao` is the destination hex, uppercased; `libacars` carries the
//! serialized ARINC-622 sub-object verbatim.

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

    msg.toaddr = icao_hex_from_json(raw.get("to_addr"));
    msg.fromaddr = icao_hex_from_json(raw.get("from_addr"));
    msg.icao = msg.toaddr.clone();

    msg.tail = str_field(raw, "tail").or_else(|| str_field(raw, "reg"));
    msg.flight = str_field(raw, "flight");
    msg.depa = str_field(raw, "depa");
    msg.dsta = str_field(raw, "dsta");
    msg.label = str_field(raw, "label");
    msg.block_id = str_field(raw, "block_id");
    msg.msgno = str_field(raw, "msgno");
    msg.ack = str_field(raw, "ack");
    msg.mode = str_field(raw, "mode");
    msg.is_response = raw.get("is-response").and_then(Value::as_bool);
    msg.msg_text = str_field(raw, "text");
    msg.libacars = raw.get("libacars").map(Value::to_string);

    msg.error = count_err_true(raw);

    msg
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|v| v.as_str()).map(str::to_owned)
}
