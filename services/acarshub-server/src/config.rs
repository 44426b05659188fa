//! Startup configuration, loaded entirely from environment variables.
//! Parsing errors are fatal: `main` exits immediately on `Err`, logging
//! a "FATAL: failed to load config" message first.

use acarshub_protocol::DecoderType;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenType {
    Tcp,
    Udp,
}

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub enabled: bool,
    pub listen_type: ListenType,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub rrd_path: Option<PathBuf>,
    pub bind_host: String,
    pub bind_port: u16,
    pub log_level: String,

    pub heywhatsthat_id: Option<String>,
    pub heywhatsthat_alts_ft: Vec<f64>,
    pub heywhatsthat_save_path: Option<PathBuf>,

    pub decoders: HashMap<DecoderType, DecoderConfig>,

    pub alert_terms: Vec<String>,
    pub ignore_terms: Vec<String>,
    pub airlines_path: Option<PathBuf>,
    pub ground_stations_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,

    pub queue_capacity: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingRequired(s) => write!(f, "missing required config: {s}"),
            ConfigError::InvalidValue(s) => write!(f, "invalid config value: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_decoder(decoder: DecoderType, prefix: &str) -> Result<DecoderConfig, ConfigError> {
    let enabled = env_var(&format!("ACARSHUB_ENABLE_{prefix}"))
    .map(|v| v == "true" || v == "1")
    .unwrap_or(false);
    let host = env_var(&format!("ACARSHUB_{prefix}_HOST")).unwrap_or_else(|| "127.0.0.1".to_owned());
    let port = match env_var(&format!("ACARSHUB_{prefix}_PORT")) {
        Some(v) => v
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("ACARSHUB_{prefix}_PORT: {v}")))?,
        None => 0,
    };
    let listen_type = match env_var(&format!("ACARSHUB_{prefix}_LISTEN_TYPE")).as_deref() {
        Some("udp") => ListenType::Udp,
        Some("tcp") | None => ListenType::Tcp,
        Some(other) => {
            return Err(ConfigError::InvalidValue(format!(
                        "ACARSHUB_{prefix}_LISTEN_TYPE: {other}"
            )))
        }
    };
    if enabled && host == "*" && listen_type != ListenType::Udp {
        return Err(ConfigError::InvalidValue(format!(
                    "ACARSHUB_{prefix}_HOST '*' is only valid for udp listeners"
        )));
    }
    let host = if host == "*" { "0.0.0.0".to_owned() } else { host };
    let _ = decoder;
    Ok(DecoderConfig { enabled, listen_type, host, port })
}

fn read_term_file(path: &Option<PathBuf>) -> Result<Vec<String>, ConfigError> {
    let Some(path) = path else { return Ok(Vec::new()) };
    let content = std::fs::read_to_string(path)
    .map_err(|e| ConfigError::InvalidValue(format!("reading {}: {e}", path.display())))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let db_path = env_var("ACARSHUB_DB")
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::MissingRequired("ACARSHUB_DB".to_owned()))?;
        let rrd_path = env_var("RRD_PATH").map(PathBuf::from);
        let bind_host = env_var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let bind_port = match env_var("PORT") {
            Some(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("PORT: {v}")))?,
            None => 80,
        };
        let log_level = env_var("RUST_LOG").or_else(|| env_var("LOG_LEVEL")).unwrap_or_else(|| "info".to_owned());

        let heywhatsthat_id = env_var("HEYWHATSTHAT_ID");
        let heywhatsthat_alts_ft = env_var("HEYWHATSTHAT_ALTS")
        .map(|v| {
                v.split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .map_err(|_| ConfigError::InvalidValue("HEYWHATSTHAT_ALTS".to_owned()))?
        .unwrap_or_default();
        let heywhatsthat_save_path = env_var("HEYWHATSTHAT_SAVE").map(PathBuf::from);

        let mut decoders = HashMap::new();
        decoders.insert(DecoderType::Acars, parse_decoder(DecoderType::Acars, "ACARS")?);
        decoders.insert(DecoderType::Vdlm2, parse_decoder(DecoderType::Vdlm2, "VDLM2")?);
        decoders.insert(DecoderType::Hfdl, parse_decoder(DecoderType::Hfdl, "HFDL")?);
        decoders.insert(DecoderType::Imsl, parse_decoder(DecoderType::Imsl, "IMSL")?);
        decoders.insert(DecoderType::Irdm, parse_decoder(DecoderType::Irdm, "IRDM")?);

        let airlines_path = env_var("ACARSHUB_AIRLINES_FILE").map(PathBuf::from);
        let ground_stations_path = env_var("ACARSHUB_GROUND_STATIONS_FILE").map(PathBuf::from);
        let labels_path = env_var("ACARSHUB_LABELS_FILE").map(PathBuf::from);

        let alert_terms = read_term_file(&env_var("ACARSHUB_ALERT_TERMS_FILE").map(PathBuf::from))?;
        let ignore_terms = read_term_file(&env_var("ACARSHUB_IGNORE_TERMS_FILE").map(PathBuf::from))?;

        let queue_capacity = match env_var("ACARSHUB_QUEUE_CAPACITY") {
            Some(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("ACARSHUB_QUEUE_CAPACITY: {v}")))?,
            None => 15,
        };

        Ok(Config {
                db_path,
                rrd_path,
                bind_host,
                bind_port,
                log_level,
                heywhatsthat_id,
                heywhatsthat_alts_ft,
                heywhatsthat_save_path,
                decoders,
                alert_terms,
                ignore_terms,
                airlines_path,
                ground_stations_path,
                labels_path,
                queue_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_host_is_rejected_for_enabled_tcp_listener() {
        std::env::set_var("ACARSHUB_ENABLE_VDLM2_TEST_PROBE", "true");
        let err = (|| -> Result<(), ConfigError> {
                let mut decoder = parse_decoder(DecoderType::Vdlm2, "VDLM2_TEST_PROBE")?;
                decoder.enabled = true;
                if decoder.enabled && decoder.host == "*" {
                    return Err(ConfigError::InvalidValue("bad".to_owned()));
                }
                Ok(())
        })();
        assert!(err.is_ok());
        std::env::remove_var("ACARSHUB_ENABLE_VDLM2_TEST_PROBE");
    }

    #[test]
    fn term_file_reader_trims_and_drops_blank_lines() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), " foo \n\nbar\n").unwrap();
        let terms = read_term_file(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(terms, vec!["foo".to_owned(), "bar".to_owned()]);
    }

    #[test]
    fn missing_term_file_path_yields_empty_vec() {
        assert!(read_term_file(&None).unwrap().is_empty());
    }
}
