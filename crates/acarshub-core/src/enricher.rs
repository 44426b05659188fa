//! Pure enrichment function. Never mutates the input `CanonicalMessage`.

use crate::lookups::{self, UNKNOWN_LABEL};
use acarshub_protocol::{empty_to_none, CanonicalMessage, EnrichedMessage};
use regex::Regex;
use std::sync::OnceLock;

fn flight_identity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]{2,4})(\d+)$").expect("static regex"))
}

/// Run steps 2-6 of over a canonical message, producing an enriched
/// record. Step 1 (wire-to-presentation field renames) is already applied
/// by the formatters that build `CanonicalMessage` in the first place — its
/// field names are already the presentation names, so there's nothing left
/// to rename here.
pub fn enrich(message: CanonicalMessage) -> EnrichedMessage {
    let icao_hex = message.icao.clone();

    let (airline, iata_flight, icao_flight, flight_number) = message
    .flight
    .as_deref()
    .and_then(extract_flight_identity)
    .map_or((None, None, None, None), |(code, number)| {
            match lookups::airlines().lookup(&code) {
                Some(a) => (
                    Some(a.name.clone()),
                    Some(format!("{code}{number}")),
                    Some(format!("{}{number}", a.icao)),
                    Some(number),
                ),
                None => (None, None, None, None),
            }
    });

    let toaddr_hex = message.toaddr.clone().map(|s| s.to_ascii_uppercase());
    let toaddr_decoded = toaddr_hex.as_deref().and_then(|h| lookups::ground_stations().decode(h));
    let fromaddr_hex = message.fromaddr.clone().map(|s| s.to_ascii_uppercase());
    let fromaddr_decoded = fromaddr_hex
    .as_deref()
    .and_then(|h| lookups::ground_stations().decode(h));

    let label_type = message
    .label
    .as_deref()
    .map(|l| lookups::labels().describe(l))
    .unwrap_or_else(|| UNKNOWN_LABEL.to_owned());

    EnrichedMessage {
        message,
        icao_hex,
        airline,
        iata_flight,
        icao_flight,
        flight_number,
        toaddr_hex: empty_to_none(toaddr_hex),
        toaddr_decoded,
        fromaddr_hex: empty_to_none(fromaddr_hex),
        fromaddr_decoded,
        label_type,
    }
}

fn extract_flight_identity(flight: &str) -> Option<(String, String)> {
    let caps = flight_identity_re().captures(flight)?;
    Some((caps[1].to_owned(), caps[2].to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use acarshub_protocol::DecoderType;

    fn base_message() -> CanonicalMessage {
        CanonicalMessage::new(DecoderType::Acars, 1_700_000_000)
    }

    #[test]
    fn extracts_airline_from_known_flight_code() {
        let mut msg = base_message();
        msg.flight = Some("UAL123".to_owned());
        let enriched = enrich(msg);
        assert_eq!(enriched.airline.as_deref(), Some("United Airlines"));
        assert_eq!(enriched.iata_flight.as_deref(), Some("UAL123"));
        assert_eq!(enriched.flight_number.as_deref(), Some("123"));
    }

    #[test]
    fn unknown_airline_leaves_derived_fields_unset() {
        let mut msg = base_message();
        msg.flight = Some("ZZZ999".to_owned());
        let enriched = enrich(msg);
        assert_eq!(enriched.airline, None);
    }

    #[test]
    fn label_miss_falls_back_to_unknown_label() {
        let mut msg = base_message();
        msg.label = Some("ZZ".to_owned());
        let enriched = enrich(msg);
        assert_eq!(enriched.label_type, UNKNOWN_LABEL);
    }

    #[test]
    fn ground_station_hex_decodes_when_known() {
        let mut msg = base_message();
        msg.toaddr = Some("03a182".to_owned());
        let enriched = enrich(msg);
        assert_eq!(enriched.toaddr_decoded.as_deref(), Some("New York (JFK)"));
        assert_eq!(enriched.toaddr_hex.as_deref(), Some("03A182"));
    }

    #[test]
    fn does_not_mutate_input_message_fields() {
        let mut msg = base_message();
        msg.flight = Some("UAL123".to_owned());
        let original = msg.clone();
        let enriched = enrich(msg);
        assert_eq!(enriched.message, original);
    }
}
