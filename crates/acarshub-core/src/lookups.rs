//! Static reference tables consulted by the enricher: airlines, ground
//! stations, and ACARS message labels. Loaded once into
//! process-wide statics; an override table lets a deployment correct or add
//! entries without editing the built-in data. Overrides are read from an
//! optional YAML file per table, configured by path and installed once at
//! startup via the `init_*_from_path` functions below.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// One row of the airlines table, keyed by IATA code elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Airline {
    pub icao: String,
    pub name: String,
}

/// Airlines table plus an override keyed by IATA code.
pub struct AirlineTable {
    by_iata: HashMap<String, Airline>,
    overrides: HashMap<String, Airline>,
}

impl AirlineTable {
    pub fn new(entries: Vec<(&str, Airline)>) -> Self {
        Self {
            by_iata: entries.into_iter().map(|(k, v)| (k.to_owned(), v)).collect(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Vec<(&str, Airline)>) -> Self {
        self.overrides = overrides.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
        self
    }

    /// Same as [`Self::with_overrides`], for owned keys loaded from a file
    /// at runtime rather than `&'static str` literals.
    pub fn with_overrides_owned(mut self, overrides: Vec<(String, Airline)>) -> Self {
        self.overrides = overrides.into_iter().map(|(k, v)| (k.to_ascii_uppercase(), v)).collect();
        self
    }

    /// Look up an airline code, trying the override table, then IATA, then
    /// an ICAO scan of the main table, in that order.
    pub fn lookup(&self, code: &str) -> Option<&Airline> {
        let code = code.to_ascii_uppercase();
        self.overrides
        .get(&code)
        .or_else(|| self.by_iata.get(&code))
        .or_else(|| self.by_iata.values().find(|a| a.icao == code))
    }
}

/// Ground-station registry keyed by hex address.
pub struct GroundStationTable {
    by_hex: HashMap<String, (String, String)>,
}

impl GroundStationTable {
    pub fn new(entries: Vec<(&str, &str, &str)>) -> Self {
        Self {
            by_hex: entries
            .into_iter()
            .map(|(hex, name, icao)| (hex.to_ascii_uppercase(), (name.to_owned(), icao.to_owned())))
            .collect(),
        }
    }

    /// Formatted `"NAME (ICAO)"` on hit, matching step 5's decoded form.
    pub fn decode(&self, hex: &str) -> Option<String> {
        let (name, icao) = self.by_hex.get(&hex.to_ascii_uppercase())?;
        Some(format!("{name} ({icao})"))
    }

    /// Merge owned entries loaded from a file on top of the existing table,
    /// overwriting any hex address already present.
    pub fn with_entries_owned(mut self, entries: Vec<(String, String, String)>) -> Self {
        for (hex, name, icao) in entries {
            self.by_hex.insert(hex.to_ascii_uppercase(), (name, icao));
        }
        self
    }
}

/// ACARS message-label dictionary; misses fall back to the
/// fixed "Unknown Message Label" string.
pub struct LabelTable {
    by_label: HashMap<String, String>,
}

pub const UNKNOWN_LABEL: &str = "Unknown Message Label";

impl LabelTable {
    pub fn new(entries: Vec<(&str, &str)>) -> Self {
        Self {
            by_label: entries.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
        }
    }

    pub fn describe(&self, label: &str) -> String {
        self.by_label
        .get(label)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_LABEL.to_owned())
    }

    /// Merge owned entries loaded from a file on top of the existing table,
    /// overwriting any label already present.
    pub fn with_entries_owned(mut self, entries: Vec<(String, String)>) -> Self {
        self.by_label.extend(entries);
        self
    }
}

fn default_airlines() -> AirlineTable {
    AirlineTable::new(vec![
            ("UAL", Airline { icao: "UAL".into(), name: "United Airlines".into() }),
            ("AAL", Airline { icao: "AAL".into(), name: "American Airlines".into() }),
            ("DAL", Airline { icao: "DAL".into(), name: "Delta Air Lines".into() }),
            ("SWA", Airline { icao: "SWA".into(), name: "Southwest Airlines".into() }),
            ("BAW", Airline { icao: "BAW".into(), name: "British Airways".into() }),
            ("DLH", Airline { icao: "DLH".into(), name: "Lufthansa".into() }),
            ("ACA", Airline { icao: "ACA".into(), name: "Air Canada".into() }),
            ("JBU", Airline { icao: "JBU".into(), name: "JetBlue Airways".into() }),
            ("FDX", Airline { icao: "FDX".into(), name: "FedEx Express".into() }),
            ("UPS", Airline { icao: "UPS".into(), name: "UPS Airlines".into() }),
    ])
}

fn default_ground_stations() -> GroundStationTable {
    GroundStationTable::new(vec![
            ("03A182", "New York", "JFK"),
            ("09A004", "Chicago", "ORD"),
            ("0DA012", "Miami", "MIA"),
            ("10A220", "San Francisco", "SFO"),
            ("11A331", "Honolulu", "HNL"),
    ])
}

fn default_labels() -> LabelTable {
    LabelTable::new(vec![
            ("H1", "Message type: H1 (General text uplink/downlink)"),
            ("5Z", "Human readable weather message"),
            ("80", "Oceanic clearance request"),
            ("82", "OOOI message"),
            ("A0", "ATC/GND VHF ACARS messages"),
            ("SA", "Airline administrative message"),
            ("_d", "Link test / data"),
            ("Q0", "Link test"),
    ])
}

static AIRLINES: OnceLock<AirlineTable> = OnceLock::new();
static GROUND_STATIONS: OnceLock<GroundStationTable> = OnceLock::new();
static LABELS: OnceLock<LabelTable> = OnceLock::new();

pub fn airlines() -> &'static AirlineTable {
    AIRLINES.get_or_init(default_airlines)
}

pub fn ground_stations() -> &'static GroundStationTable {
    GROUND_STATIONS.get_or_init(default_ground_stations)
}

pub fn labels() -> &'static LabelTable {
    LABELS.get_or_init(default_labels)
}

#[derive(Debug, Deserialize)]
struct AirlineEntry {
    iata: String,
    icao: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GroundStationEntry {
    hex: String,
    name: String,
    icao: String,
}

#[derive(Debug, Deserialize)]
struct LabelEntry {
    label: String,
    description: String,
}

fn parse_airline_overrides(content: &str) -> Result<Vec<(String, Airline)>, serde_yaml::Error> {
    let entries: Vec<AirlineEntry> = serde_yaml::from_str(content)?;
    Ok(entries.into_iter().map(|e| (e.iata, Airline { icao: e.icao, name: e.name })).collect())
}

fn parse_ground_station_overrides(content: &str) -> Result<Vec<(String, String, String)>, serde_yaml::Error> {
    let entries: Vec<GroundStationEntry> = serde_yaml::from_str(content)?;
    Ok(entries.into_iter().map(|e| (e.hex, e.name, e.icao)).collect())
}

fn parse_label_overrides(content: &str) -> Result<Vec<(String, String)>, serde_yaml::Error> {
    let entries: Vec<LabelEntry> = serde_yaml::from_str(content)?;
    Ok(entries.into_iter().map(|e| (e.label, e.description)).collect())
}

/// Load `path` (a YAML list of `{iata, icao, name}`) and install it as
/// overrides on top of the built-in airlines table. No-op if `path` is
/// `None`; logs and falls back to the defaults alone on read/parse failure.
/// Must be called before the first [`airlines`] lookup to take effect.
pub fn init_airlines_from_path(path: Option<&Path>) {
    let Some(path) = path else { return };
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return warn!(path = %path.display(), error = %e, "failed to read airlines file, using defaults"),
    };
    match parse_airline_overrides(&content) {
        Ok(overrides) => {
            let _ = AIRLINES.set(default_airlines().with_overrides_owned(overrides));
        }
        Err(e) => warn!(path = %path.display(), error = %e, "failed to parse airlines file, using defaults"),
    }
}

/// Load `path` (a YAML list of `{hex, name, icao}`) and install it as
/// overrides on top of the built-in ground-stations table. No-op if `path`
/// is `None`; logs and falls back to the defaults alone on read/parse
/// failure. Must be called before the first [`ground_stations`] lookup.
pub fn init_ground_stations_from_path(path: Option<&Path>) {
    let Some(path) = path else { return };
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return warn!(path = %path.display(), error = %e, "failed to read ground stations file, using defaults"),
    };
    match parse_ground_station_overrides(&content) {
        Ok(entries) => {
            let _ = GROUND_STATIONS.set(default_ground_stations().with_entries_owned(entries));
        }
        Err(e) => warn!(path = %path.display(), error = %e, "failed to parse ground stations file, using defaults"),
    }
}

/// Load `path` (a YAML list of `{label, description}`) and install it as
/// overrides on top of the built-in label table. No-op if `path` is
/// `None`; logs and falls back to the defaults alone on read/parse failure.
/// Must be called before the first [`labels`] lookup.
pub fn init_labels_from_path(path: Option<&Path>) {
    let Some(path) = path else { return };
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return warn!(path = %path.display(), error = %e, "failed to read labels file, using defaults"),
    };
    match parse_label_overrides(&content) {
        Ok(entries) => {
            let _ = LABELS.set(default_labels().with_entries_owned(entries));
        }
        Err(e) => warn!(path = %path.display(), error = %e, "failed to parse labels file, using defaults"),
    }
}
