//! Shared test fixtures for the acarshub workspace: sample messages, a
//! scratch SQLite file, and a recording fan-out double.

use acarshub_protocol::{CanonicalMessage, DecoderType, EnrichedMessage, PushEvent};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// A minimal but fully-populated canonical message for a given decoder,
/// useful anywhere a test needs "some message" without caring about its
/// exact shape.
pub fn sample_canonical_message(decoder: DecoderType) -> CanonicalMessage {
    let mut msg = CanonicalMessage::new(decoder, 1_700_000_000);
    msg.station_id = Some("KJFK1".to_owned());
    msg.icao = Some("A1B2C3".to_owned());
    msg.tail = Some("N12345".to_owned());
    msg.flight = Some("UAL123".to_owned());
    msg.freq = Some("131.550".to_owned());
    msg.label = Some("H1".to_owned());
    msg.msg_text = Some("TEST MESSAGE".to_owned());
    msg
}

/// An enriched message wrapping [`sample_canonical_message`] with
/// plausible derived fields, for tests of the persister, fan-out, or
/// alert matcher that don't exercise the enricher itself.
pub fn sample_enriched_message(decoder: DecoderType) -> EnrichedMessage {
    EnrichedMessage {
        message: sample_canonical_message(decoder),
        icao_hex: Some("A1B2C3".to_owned()),
        airline: Some("United Airlines".to_owned()),
        iata_flight: Some("UAL123".to_owned()),
        icao_flight: Some("UAL123".to_owned()),
        flight_number: Some("123".to_owned()),
        toaddr_hex: None,
        toaddr_decoded: None,
        fromaddr_hex: None,
        fromaddr_decoded: None,
        label_type: "Message type: H1 (General text uplink/downlink)".to_owned(),
    }
}

/// A fresh, empty SQLite file path backed by a [`NamedTempFile`] that is
/// deleted when dropped. The file itself is created but left with zero
/// bytes; callers open it with `rusqlite::Connection::open`.
pub fn temp_db_file() -> NamedTempFile {
    NamedTempFile::new().expect("create temp db file")
}

/// A recording push-fan-out double: captures every event handed to
/// `emit()` in order, for tests to assert against instead of wiring up a
/// real SSE/WebSocket transport.
#[derive(Clone, Default)]
pub struct RecordingFanout {
    events: Arc<Mutex<Vec<PushEvent>>>,
}

impl RecordingFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: PushEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<PushEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_canonical_message_has_required_fields() {
        let msg = sample_canonical_message(DecoderType::Acars);
        assert_eq!(msg.message_type, DecoderType::Acars);
        assert!(msg.flight.is_some());
    }

    #[test]
    fn temp_db_file_exists_and_is_empty() {
        let file = temp_db_file();
        let metadata = std::fs::metadata(file.path()).unwrap();
        assert_eq!(metadata.len(), 0);
    }

    #[test]
    fn recording_fanout_captures_events_in_order() {
        let fanout = RecordingFanout::new();
        fanout.emit(PushEvent::StationIds(vec!["A".to_owned()]));
        fanout.emit(PushEvent::StationIds(vec!["A".to_owned(), "B".to_owned()]));
        assert_eq!(fanout.len(), 2);
        match &fanout.events()[1] {
            PushEvent::StationIds(ids) => assert_eq!(ids.len(), 2),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
