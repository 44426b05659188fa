//! Antenna-coverage snapshot service: fetches one HeyWhatsThat panorama response on startup,
//! converts it to GeoJSON, and writes it alongside a hash sidecar so
//! later starts skip the fetch when the configuration hasn't changed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FEET_TO_METERS: f64 = 0.3048;
const HEYWHATSTHAT_API: &str = "https://www.heywhatsthat.com/api/outline.json";

#[derive(Debug, Deserialize)]
struct PanoramaResponse {
    panoramas: Vec<Panorama>,
}

#[derive(Debug, Deserialize)]
struct Panorama {
    alt_ft: f64,
    /// `[lat, lon]` pairs forming one ring.
    points: Vec<[f64; 2]>,
}

#[derive(Debug, Serialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: FeatureProperties,
    geometry: Geometry,
}

#[derive(Debug, Serialize)]
struct FeatureProperties {
    altitude_ft: f64,
}

#[derive(Debug, Serialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: &'static str,
    /// A polygon with a single outer ring of `[lon, lat]` pairs.
    coordinates: Vec<Vec<[f64; 2]>>,
}

fn config_hash(token: &str, altitudes_ft: &[f64]) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    for alt in altitudes_ft {
        alt.to_bits().hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

fn sidecar_path(snapshot_path: &Path) -> PathBuf {
    let mut path = snapshot_path.as_os_str().to_owned();
    path.push(".hash");
    PathBuf::from(path)
}

/// Runs the fetch/convert/write sequence once. Non-fatal: every failure
/// is logged and the function returns without touching the filesystem
/// further, preserving whatever snapshot already exists on disk.
pub async fn refresh_snapshot(token: &str, altitudes_ft: &[f64], snapshot_path: &Path) {
    let hash = config_hash(token, altitudes_ft);
    let sidecar = sidecar_path(snapshot_path);

    if let Ok(existing) = std::fs::read_to_string(&sidecar) {
        if existing.trim() == hash {
            info!("heywhatsthat snapshot unchanged, skipping fetch");
            return;
        }
    }

    let altitudes_m: Vec<f64> = altitudes_ft.iter().map(|ft| ft * FEET_TO_METERS).collect();
    let response = match fetch(token, &altitudes_m).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "heywhatsthat fetch failed, leaving existing snapshot in place");
            return;
        }
    };

    let collection = to_feature_collection(response);
    let body = match serde_json::to_vec(&collection) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "failed to serialize heywhatsthat snapshot");
            return;
        }
    };

    if let Err(e) = std::fs::write(snapshot_path, body) {
        warn!(error = %e, path = %snapshot_path.display(), "failed to write heywhatsthat snapshot");
        return;
    }
    if let Err(e) = std::fs::write(&sidecar, &hash) {
        warn!(error = %e, "failed to write heywhatsthat hash sidecar");
    }
    info!(path = %snapshot_path.display(), "wrote heywhatsthat coverage snapshot");
}

async fn fetch(token: &str, altitudes_m: &[f64]) -> Result<PanoramaResponse, reqwest::Error> {
    let alts = altitudes_m.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(",");
    let client = reqwest::Client::builder()
    .timeout(std::time::Duration::from_secs(10))
    .build()?;
    client
    .get(HEYWHATSTHAT_API)
    .query(&[("id", token), ("alts", &alts)])
    .send()
    .await?
    .json::<PanoramaResponse>()
    .await
}

fn to_feature_collection(response: PanoramaResponse) -> FeatureCollection {
    let features = response
    .panoramas
    .into_iter()
    .map(|panorama| {
            let mut ring: Vec<[f64; 2]> = panorama.points.iter().map(|[lat, lon]| [*lon, *lat]).collect();
            if ring.first() != ring.last() {
                if let Some(first) = ring.first().copied() {
                    ring.push(first);
                }
            }
            Feature {
                kind: "Feature",
                properties: FeatureProperties { altitude_ft: panorama.alt_ft },
                geometry: Geometry { kind: "Polygon", coordinates: vec![ring] },
            }
    })
    .collect();

    FeatureCollection { kind: "FeatureCollection", features }
}
