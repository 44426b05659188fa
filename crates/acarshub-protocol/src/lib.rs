//! Canonical message shapes and push-event vocabulary shared across the
//! acarshub pipeline crates.
//!
//! `CanonicalMessage` is the normalizer's output; `EnrichedMessage`
//! wraps it with the enricher's derived fields. Both are plain
//! structs rather than a dynamic map — the "delete empty keys" step of the
//! enricher is modeled as `Option<T>` fields that formatters simply leave
//! `None`, which is observably equivalent and considerably harder to get
//! wrong in Rust.

use serde::{Deserialize, Serialize};

/// Raw, not-yet-normalized JSON object as received from a decoder listener.
pub type RawDecoderJson = serde_json::Value;

// ---------------------------------------------------------------------------
// Decoder type
// ---------------------------------------------------------------------------

/// One of the five supported decoder families.
///
/// Sources spell VDLM2 as `VDLM2`/`VDL-M2` and IMSL as `IMSL`/`IMS-L`
/// interchangeably; all spellings canonicalize to one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecoderType {
    Acars,
    Vdlm2,
    Hfdl,
    Imsl,
    Irdm,
}

impl DecoderType {
    pub const ALL: [DecoderType; 5] = [
        DecoderType::Acars,
        DecoderType::Vdlm2,
        DecoderType::Hfdl,
        DecoderType::Imsl,
        DecoderType::Irdm,
    ];

    /// Parse any accepted spelling, case-insensitively.
    pub fn parse(s: &str) -> Option<DecoderType> {
        match s.to_ascii_uppercase().as_str() {
            "ACARS" => Some(DecoderType::Acars),
            "VDLM2" | "VDL-M2" => Some(DecoderType::Vdlm2),
            "HFDL" => Some(DecoderType::Hfdl),
            "IMSL" | "IMS-L" => Some(DecoderType::Imsl),
            "IRDM" => Some(DecoderType::Irdm),
            _ => None,
        }
    }

    /// Canonical `message_type` spelling (no hyphen).
    pub fn message_type_str(&self) -> &'static str {
        match self {
            DecoderType::Acars => "ACARS",
            DecoderType::Vdlm2 => "VDLM2",
            DecoderType::Hfdl => "HFDL",
            DecoderType::Imsl => "IMSL",
            DecoderType::Irdm => "IRDM",
        }
    }

    /// Dictionary key used by signal-level / frequency distributions, which
    /// use the hyphenated spelling for VDLM2/IMSL.
    pub fn histogram_key(&self) -> &'static str {
        match self {
            DecoderType::Acars => "ACARS",
            DecoderType::Vdlm2 => "VDL-M2",
            DecoderType::Hfdl => "HFDL",
            DecoderType::Imsl => "IMSL",
            DecoderType::Irdm => "IRDM",
        }
    }

    /// Lowercase suffix used for per-decoder table names and time-series
    /// column names (`freqs_vdlm`, `vdlm_count`, ...).
    pub fn table_suffix(&self) -> &'static str {
        match self {
            DecoderType::Acars => "acars",
            DecoderType::Vdlm2 => "vdlm",
            DecoderType::Hfdl => "hfdl",
            DecoderType::Imsl => "imsl",
            DecoderType::Irdm => "irdm",
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical message (normalizer output)
// ---------------------------------------------------------------------------

/// The normalizer's output: one decoder-agnostic record. `uid` is `None` until the persister assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub uid: Option<String>,
    pub timestamp: i64,
    pub message_type: DecoderType,
    pub station_id: Option<String>,

    pub toaddr: Option<String>,
    pub fromaddr: Option<String>,
    pub icao: Option<String>,

    pub tail: Option<String>,
    pub flight: Option<String>,
    pub depa: Option<String>,
    pub dsta: Option<String>,
    pub eta: Option<String>,
    pub gtout: Option<String>,
    pub gtin: Option<String>,
    pub wloff: Option<String>,
    pub wlin: Option<String>,

    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,

    pub freq: Option<String>,
    pub level: Option<f64>,
    pub ack: Option<String>,
    pub mode: Option<String>,
    pub label: Option<String>,
    pub block_id: Option<String>,
    pub msgno: Option<String>,
    pub is_response: Option<bool>,
    pub is_onground: Option<i32>,
    pub error: i64,

    pub msg_text: Option<String>,
    pub libacars: Option<String>,
}

impl CanonicalMessage {
    /// A minimal record with only the fields every formatter must set.
    pub fn new(message_type: DecoderType, timestamp: i64) -> Self {
        CanonicalMessage {
            uid: None,
            timestamp,
            message_type,
            station_id: None,
            toaddr: None,
            fromaddr: None,
            icao: None,
            tail: None,
            flight: None,
            depa: None,
            dsta: None,
            eta: None,
            gtout: None,
            gtin: None,
            wloff: None,
            wlin: None,
            lat: None,
            lon: None,
            alt: None,
            freq: None,
            level: None,
            ack: None,
            mode: None,
            label: None,
            block_id: None,
            msgno: None,
            is_response: None,
            is_onground: None,
            error: 0,
            msg_text: None,
            libacars: None,
        }
    }
}

/// Collapse empty-string values to `None`, matching the enricher's "delete
/// keys whose value is null/undefined/empty string" step for string fields.
pub fn empty_to_none(s: Option<String>) -> Option<String> {
    match s {
        Some(ref v) if v.is_empty() => None,
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Enriched message (enricher output / persisted shape)
// ---------------------------------------------------------------------------

/// Message with derived fields attached by the enricher. Produced by
/// a pure function: the input `CanonicalMessage` is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMessage {
    pub message: CanonicalMessage,

    /// 6-char uppercase hex ICAO, always present in canonical form when the
    /// source supplied any ICAO-ish value.
    pub icao_hex: Option<String>,

    pub airline: Option<String>,
    pub iata_flight: Option<String>,
    pub icao_flight: Option<String>,
    pub flight_number: Option<String>,

    pub toaddr_hex: Option<String>,
    pub toaddr_decoded: Option<String>,
    pub fromaddr_hex: Option<String>,
    pub fromaddr_decoded: Option<String>,

    /// Defaults to `"Unknown Message Label"` on lookup miss.
    pub label_type: String,
}

// ---------------------------------------------------------------------------
// Push event vocabulary
// ---------------------------------------------------------------------------

/// Event vocabulary emitted on the injected push transport. The transport
/// itself (wire protocol, client fan-out) is an external collaborator; this
/// enum is the contract the core hands to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum PushEvent {
    #[serde(rename = "acars_msg")]
    AcarsMsg(Box<EnrichedMessage>),
    #[serde(rename = "station_ids")]
    StationIds(Vec<String>),
    #[serde(rename = "timeseries")]
    TimeSeries {
        period: TimeSeriesPeriod,
        snapshot: TimeSeriesSnapshot,
    },
    #[serde(rename = "status")]
    Status(StatusSnapshot),
}

/// Periodic status broadcast payload: queue + cumulative counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total_messages: u64,
    pub good_messages: u64,
    pub error_messages: u64,
    pub nonlogged_good: u64,
    pub nonlogged_errors: u64,
    pub queue_overflow: u64,
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// One of the eight canonical precomputed query windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSeriesPeriod {
    OneHour,
    SixHour,
    TwelveHour,
    TwentyFourHour,
    OneWeek,
    ThirtyDay,
    SixMonth,
    OneYear,
}

impl TimeSeriesPeriod {
    pub const ALL: [TimeSeriesPeriod; 8] = [
        TimeSeriesPeriod::OneHour,
        TimeSeriesPeriod::SixHour,
        TimeSeriesPeriod::TwelveHour,
        TimeSeriesPeriod::TwentyFourHour,
        TimeSeriesPeriod::OneWeek,
        TimeSeriesPeriod::ThirtyDay,
        TimeSeriesPeriod::SixMonth,
        TimeSeriesPeriod::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSeriesPeriod::OneHour => "1hr",
            TimeSeriesPeriod::SixHour => "6hr",
            TimeSeriesPeriod::TwelveHour => "12hr",
            TimeSeriesPeriod::TwentyFourHour => "24hr",
            TimeSeriesPeriod::OneWeek => "1wk",
            TimeSeriesPeriod::ThirtyDay => "30day",
            TimeSeriesPeriod::SixMonth => "6mon",
            TimeSeriesPeriod::OneYear => "1yr",
        }
    }

    /// Span of the window, in seconds.
    pub fn span_secs(&self) -> i64 {
        match self {
            TimeSeriesPeriod::OneHour => 3_600,
            TimeSeriesPeriod::SixHour => 6 * 3_600,
            TimeSeriesPeriod::TwelveHour => 12 * 3_600,
            TimeSeriesPeriod::TwentyFourHour => 24 * 3_600,
            TimeSeriesPeriod::OneWeek => 7 * 24 * 3_600,
            TimeSeriesPeriod::ThirtyDay => 30 * 24 * 3_600,
            TimeSeriesPeriod::SixMonth => 182 * 24 * 3_600,
            TimeSeriesPeriod::OneYear => 365 * 24 * 3_600,
        }
    }

    /// Downsample bucket width, in seconds. 1/6/12hr query raw 1-min rows.
    pub fn bucket_secs(&self) -> i64 {
        match self {
            TimeSeriesPeriod::OneHour | TimeSeriesPeriod::SixHour | TimeSeriesPeriod::TwelveHour => 60,
            TimeSeriesPeriod::TwentyFourHour => 5 * 60,
            TimeSeriesPeriod::OneWeek => 30 * 60,
            TimeSeriesPeriod::ThirtyDay => 3_600,
            TimeSeriesPeriod::SixMonth | TimeSeriesPeriod::OneYear => 6 * 3_600,
        }
    }

    /// Wall-clock refresh interval for the cache refresh schedule.
    pub fn refresh_interval_secs(&self) -> i64 {
        match self {
            TimeSeriesPeriod::OneHour | TimeSeriesPeriod::SixHour | TimeSeriesPeriod::TwelveHour => 60,
            TimeSeriesPeriod::TwentyFourHour => 5 * 60,
            TimeSeriesPeriod::OneWeek => 30 * 60,
            TimeSeriesPeriod::ThirtyDay => 3_600,
            TimeSeriesPeriod::SixMonth | TimeSeriesPeriod::OneYear => 6 * 3_600,
        }
    }
}

/// One row of `timeseries_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub timestamp: i64,
    pub acars_count: i64,
    pub vdlm_count: i64,
    pub hfdl_count: i64,
    pub imsl_count: i64,
    pub irdm_count: i64,
    pub total_count: i64,
    pub error_count: i64,
}

/// One point of a cache response series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp_ms: i64,
    pub acars_count: i64,
    pub vdlm_count: i64,
    pub hfdl_count: i64,
    pub imsl_count: i64,
    pub irdm_count: i64,
    pub total_count: i64,
    pub error_count: i64,
}

/// Immutable precomputed response for one canonical period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesSnapshot {
    pub time_period: TimeSeriesPeriod,
    pub start_ms: i64,
    pub end_ms: i64,
    pub points: usize,
    pub data: Vec<TimeSeriesPoint>,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Time,
    Tail,
    Flight,
}

/// `databaseSearch(params)` input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub flight: Option<String>,
    pub tail: Option<String>,
    pub icao: Option<String>,
    pub depa: Option<String>,
    pub dsta: Option<String>,
    pub label: Option<String>,
    pub text: Option<String>,
    pub freq: Option<String>,
    pub station_id: Option<String>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub sort: SortKey,
    pub sort_desc: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Millisecond-to-unix-second and back round trip helper.
pub fn ms_to_unix(ms: i64) -> i64 {
    ms.div_euclid(1000)
}

pub fn unix_to_ms(secs: i64) -> i64 {
    secs * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_type_parses_all_accepted_spellings() {
        for (s, expected) in [
            ("ACARS", DecoderType::Acars),
            ("vdlm2", DecoderType::Vdlm2),
            ("VDL-M2", DecoderType::Vdlm2),
            ("Vdl-M2", DecoderType::Vdlm2),
            ("HFDL", DecoderType::Hfdl),
            ("IMSL", DecoderType::Imsl),
            ("IMS-L", DecoderType::Imsl),
            ("IRDM", DecoderType::Irdm),
        ] {
            assert_eq!(DecoderType::parse(s), Some(expected), "spelling {s}");
        }
        assert_eq!(DecoderType::parse("bogus"), None);
    }

    #[test]
    fn histogram_keys_use_hyphenated_spelling_for_vdlm_and_imsl() {
        assert_eq!(DecoderType::Vdlm2.histogram_key(), "VDL-M2");
        assert_eq!(DecoderType::Imsl.histogram_key(), "IMSL");
        assert_eq!(DecoderType::Acars.histogram_key(), "ACARS");
    }

    #[test]
    fn empty_to_none_collapses_empty_strings_only() {
        assert_eq!(empty_to_none(Some(String::new())), None);
        assert_eq!(empty_to_none(None), None);
        assert_eq!(
            empty_to_none(Some("x".to_owned())),
            Some("x".to_owned())
        );
    }

    #[test]
    fn unix_ms_round_trip_floors_to_whole_seconds() {
        let t = 1_704_067_200_500i64;
        assert_eq!(unix_to_ms(ms_to_unix(t)), (t / 1000) * 1000);
    }
}
