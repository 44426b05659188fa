use acarshub_core::alerts::AlertRules;
use acarshub_core::stations::StationRegistry;
use acarshub_listeners::{tcp::TcpListenerClient, udp::UdpListenerClient, ListenerEvent};
use acarshub_protocol::{DecoderType, PushEvent, StatusSnapshot};
use acarshub_server::config::{Config, ListenType};
use acarshub_server::db::{CheckpointMode, Database};
use acarshub_server::state::AppState;
use acarshub_server::{coverage, http, importer, persister, repo, scheduler::Scheduler, timeseries};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const STATUS_BROADCAST_INTERVAL: Duration = Duration::from_secs(5);
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(300);

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

#[tokio::main]
async fn main() {
    let config = Config::load().expect("failed to load configuration");
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(config.log_level.clone())).init();

    acarshub_core::lookups::init_airlines_from_path(config.airlines_path.as_deref());
    acarshub_core::lookups::init_ground_stations_from_path(config.ground_stations_path.as_deref());
    acarshub_core::lookups::init_labels_from_path(config.labels_path.as_deref());

    info!("opening database");
    let db = Database::open(&config.db_path).expect("failed to open database");

    if let Some(rrd_path) = &config.rrd_path {
        importer::run(rrd_path, &db).await;
    }

    let station_ids = warm_station_ids(&db).await;

    let mut state = AppState::new(config, db, now_unix());
    state.stations = StationRegistry::seed(station_ids);
    state.alert_rules = Arc::new(AlertRules::new(state.config.alert_terms.clone(), state.config.ignore_terms.clone()));

    spawn_listeners(&state);
    tokio::spawn(persister::run(state.clone()));
    let writer = timeseries::writer::TimeSeriesWriter::spawn(state.db.clone(), state.queue.clone());

    let cache_state = state.clone();
    state.timeseries_cache.clone().init(state.db.clone(), move |period, snapshot| {
            cache_state.emit(PushEvent::TimeSeries { period, snapshot: (*snapshot).clone() });
    }).await;

    let scheduler = Arc::new(Scheduler::new());
    register_scheduled_jobs(&scheduler, &state);

    if let (Some(token), Some(save_path)) = (state.config.heywhatsthat_id.clone(), state.config.heywhatsthat_save_path.clone()) {
        let altitudes = state.config.heywhatsthat_alts_ft.clone();
        tokio::spawn(async move {
                coverage::refresh_snapshot(&token, &altitudes, &save_path).await;
        });
    }

    let router = http::build_router(state.clone());
    let bind_addr = format!("{}:{}", state.config.bind_host, state.config.bind_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.expect("failed to bind HTTP listener");
    info!(addr = %bind_addr, "acarshub-server listening");

    axum::serve(listener, router)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    scheduler.shutdown();
    state.timeseries_cache.stop();
    writer.stop();
    info!("acarshub-server shut down gracefully");
}

async fn warm_station_ids(db: &Database) -> Vec<String> {
    let reader = db.reader();
    tokio::task::spawn_blocking(move || -> Vec<String> {
            let conn = reader.blocking_lock();
            let mut stmt = match conn.prepare("SELECT DISTINCT station_id FROM messages WHERE station_id IS NOT NULL") {
                Ok(stmt) => stmt,
                Err(_) => return Vec::new(),
            };
            stmt.query_map([], |row| row.get::<_, String>(0))
            .map(|rows| rows.filter_map(Result::ok).collect())
            .unwrap_or_default()
    })
    .await
    .unwrap_or_default()
}

fn spawn_listeners(state: &AppState) {
    for decoder in DecoderType::ALL {
        let Some(decoder_config) = state.config.decoders.get(&decoder) else { continue };
        if !decoder_config.enabled {
            continue;
        }
        let (tx, rx) = mpsc::channel::<ListenerEvent>(256);
        match decoder_config.listen_type {
            ListenType::Tcp => {
                let client = TcpListenerClient::new(decoder, decoder_config.host.clone(), decoder_config.port);
                client.start(tx);
            }
            ListenType::Udp => {
                let client = UdpListenerClient::new(decoder, decoder_config.host.clone(), decoder_config.port);
                client.start(tx);
            }
        }
        info!(?decoder, host = %decoder_config.host, port = decoder_config.port, "listener started");
        tokio::spawn(acarshub_server::pipeline::run(state.clone(), decoder, rx));
    }
}

fn register_scheduled_jobs(scheduler: &Arc<Scheduler>, state: &AppState) {
    let status_state = state.clone();
    scheduler.every("status-broadcast", STATUS_BROADCAST_INTERVAL, move || {
            let state = status_state.clone();
            async move { broadcast_status(&state).await }
    });

    let checkpoint_db = state.db.clone();
    scheduler.every("wal-checkpoint", CHECKPOINT_INTERVAL, move || {
            let db = checkpoint_db.clone();
            async move {
                match db.checkpoint(CheckpointMode::Passive).await {
                    Ok(result) => info!(
                        checkpointed = result.frames_checkpointed,
                        remaining = result.frames_remaining,
                        "WAL checkpoint completed"
                    ),
                    Err(e) => warn!(error = %e, "WAL checkpoint failed"),
                }
            }
    });
}

async fn broadcast_status(state: &AppState) {
    let queue_stats = state.queue.get_stats();
    let reader = state.db.reader();
    let saved_dropped = tokio::task::spawn_blocking(move || -> Option<(repo::counters::CumulativeCounts, (i64, i64))> {
            let conn = reader.blocking_lock();
            let saved = repo::counters::get_saved_counts(&conn).ok()?;
            let dropped = repo::counters::get_dropped_counts(&conn).ok()?;
            Some((saved, dropped))
    })
    .await
    .unwrap_or(None);

    let Some((saved, dropped)) = saved_dropped else {
        error!("failed to load cumulative counters for status broadcast");
        return;
    };

    state.emit(PushEvent::Status(StatusSnapshot {
                total_messages: saved.total as u64,
                good_messages: saved.good as u64,
                error_messages: saved.errors as u64,
                nonlogged_good: dropped.0 as u64,
                nonlogged_errors: dropped.1 as u64,
                queue_overflow: queue_stats.overflow,
    }));
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler")
        .recv()
        .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

