//! Alert-term matcher. Case-insensitive substring match of
//! every configured term against text/icao/tail/flight; a matching ignore
//! term suppresses the whole match rather than just that field.

use acarshub_protocol::EnrichedMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Text,
    Icao,
    Tail,
    Flight,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Text => "text",
            MatchField::Icao => "icao",
            MatchField::Tail => "tail",
            MatchField::Flight => "flight",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMatch {
    pub term: String,
    pub field: MatchField,
}

/// A configured set of alert terms paired with an ignore set, both
/// case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct AlertRules {
    terms: Vec<String>,
    ignore_terms: Vec<String>,
}

impl AlertRules {
    pub fn new(terms: Vec<String>, ignore_terms: Vec<String>) -> Self {
        Self {
            terms: terms.into_iter().map(|t| t.to_ascii_lowercase()).collect(),
            ignore_terms: ignore_terms.into_iter().map(|t| t.to_ascii_lowercase()).collect(),
        }
    }

    fn is_ignored(&self, haystacks: &[&str]) -> bool {
        self.ignore_terms
        .iter()
        .any(|ignore| haystacks.iter().any(|h| h.to_ascii_lowercase().contains(ignore.as_str())))
    }

    /// Evaluate every configured term against the message's text and
    /// identity fields. If any ignore term matches anywhere in those same
    /// fields, no matches are produced for this message at all.
    pub fn evaluate(&self, message: &EnrichedMessage) -> Vec<AlertMatch> {
        let fields: [(MatchField, Option<&str>); 4] = [
            (MatchField::Text, message.message.msg_text.as_deref()),
            (MatchField::Icao, message.message.icao.as_deref()),
            (MatchField::Tail, message.message.tail.as_deref()),
            (MatchField::Flight, message.message.flight.as_deref()),
        ];
        let haystacks: Vec<&str> = fields.iter().filter_map(|(_, v)| *v).collect();

        if self.is_ignored(&haystacks) {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for term in &self.terms {
            for (field, value) in &fields {
                if let Some(value) = value {
                    if value.to_ascii_lowercase().contains(term.as_str()) {
                        matches.push(AlertMatch {
                                term: term.clone(),
                                field: *field,
                        });
                    }
                }
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acarshub_protocol::{CanonicalMessage, DecoderType};

    fn message(text: Option<&str>, flight: Option<&str>) -> EnrichedMessage {
        let mut m = CanonicalMessage::new(DecoderType::Acars, 0);
        m.msg_text = text.map(str::to_owned);
        m.flight = flight.map(str::to_owned);
        EnrichedMessage {
            message: m,
            icao_hex: None,
            airline: None,
            iata_flight: None,
            icao_flight: None,
            flight_number: None,
            toaddr_hex: None,
            toaddr_decoded: None,
            fromaddr_hex: None,
            fromaddr_decoded: None,
            label_type: "Unknown Message Label".to_owned(),
        }
    }

    #[test]
    fn matches_case_insensitive_substring_in_text() {
        let rules = AlertRules::new(vec!["mayday".to_owned()], vec![]);
        let m = message(Some("MAYDAY MAYDAY"), None);
        let matches = rules.evaluate(&m);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].field, MatchField::Text);
    }

    #[test]
    fn ignore_term_suppresses_all_matches_for_the_message() {
        let rules = AlertRules::new(vec!["test".to_owned()], vec!["drill".to_owned()]);
        let m = message(Some("TEST DRILL IN PROGRESS"), None);
        assert!(rules.evaluate(&m).is_empty());
    }

    #[test]
    fn matches_flight_field_independently_of_text() {
        let rules = AlertRules::new(vec!["ual123".to_owned()], vec![]);
        let m = message(None, Some("UAL123"));
        let matches = rules.evaluate(&m);
        assert_eq!(matches[0].field, MatchField::Flight);
    }

    #[test]
    fn no_terms_configured_yields_no_matches() {
        let rules = AlertRules::default();
        let m = message(Some("anything"), None);
        assert!(rules.evaluate(&m).is_empty());
    }
}
