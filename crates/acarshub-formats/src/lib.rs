//! Normalizer and per-decoder formatters.
//!
//! [`normalize`] implements the routing rules in order and dispatches to
//! one of five formatters, mirroring the tagged-variant dispatch the design
//! notes call for over the original's ad hoc `if`/`else` chain.

pub mod acars;
pub mod errcount;
pub mod hfdl;
pub mod imsl_jaero;
pub mod imsl_satdump;
pub mod irdm;
pub mod util;
pub mod vdlm2;

use acarshub_protocol::{CanonicalMessage, RawDecoderJson};
use serde_json::Value;

/// Route a raw decoder JSON object to the matching formatter and produce a
/// canonical message. Returns `None` only for shapes that are recognized
/// but explicitly dropped (non-ACARS SatDump messages).
pub fn normalize(raw: &RawDecoderJson, ingest_time: i64) -> Option<CanonicalMessage> {
    if raw.get("vdl2").is_some() {
        return Some(vdlm2::format(raw, ingest_time));
    }
    if raw.get("hfdl").is_some() {
        return Some(hfdl::format(raw, ingest_time));
    }
    if nested_str(raw, &["source", "app", "name"]) == Some("SatDump") {
        if nested_str(raw, &["msg_name"]) == Some("ACARS") {
            return Some(imsl_satdump::format(raw, ingest_time));
        }
        return None;
    }
    if nested_str(raw, &["app", "name"]) == Some("JAERO") {
        return Some(imsl_jaero::format(raw, ingest_time));
    }
    if nested_str(raw, &["app", "name"]) == Some("iridium-toolkit") {
        return Some(irdm::format(raw, ingest_time));
    }
    Some(acars::format(raw, ingest_time))
}

/// Walk a dotted path of object keys, returning the final string value.
pub(crate) fn nested_str<'a>(v: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = v;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str()
}
