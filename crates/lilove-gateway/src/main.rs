use clap::Parser;
use lilove_protocol::rooms::RoomId;
use lilove_social::{ChallengeEngine, ChallengePhase, Transition};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod app;
mod events;
mod http;
mod ws;

#[derive(Parser, Debug)]
#[command(name = "lilove-gateway", about = "LiLove real-time fan-out gateway")]
struct Args {
    /// Path to lilove.toml (default: LILOVE_CONFIG env, then ./lilove.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lilove_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config =
        lilove_core::config::LiloveConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
            warn!("Config load failed ({}), using defaults", e);
            lilove_core::config::LiloveConfig::default()
        });
    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    if let Some(bind) = args.bind {
        config.gateway.bind = bind;
    }

    // initialize SQLite database — single file for all subsystems
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    lilove_users::db::init_db(&db)?;
    lilove_social::db::init_db(&db)?;
    info!("database migrations complete");
    drop(db);

    // build subsystems — each gets its own connection for thread safety
    let users = lilove_users::UserStore::new(rusqlite::Connection::open(&db_path)?);
    let social = lilove_social::SocialStore::new(rusqlite::Connection::open(&db_path)?);
    let coach = lilove_coach::CoachRuntime::from_config(&config.coach, config.limits.max_prompt_len);

    // Resume tokens need a stable secret to survive restarts; without one we
    // mint a process-lifetime secret and reconnects fall back to bearer auth.
    let keyring = match &config.gateway.resume_secret {
        Some(secret) => lilove_users::ResumeKeyring::new(secret),
        None => {
            warn!("no gateway.resume_secret configured — resume tokens will not survive restarts");
            lilove_users::ResumeKeyring::new(&uuid::Uuid::new_v4().to_string())
        }
    };

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, users, social, coach, keyring));
    let router = app::build_router(state.clone());

    // Challenge phase engine: flips upcoming→active→ended rows and hands the
    // fired edges to the fan-out pump below.
    let (fired_tx, mut fired_rx) = tokio::sync::mpsc::channel::<Transition>(256);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine = ChallengeEngine::new(rusqlite::Connection::open(&db_path)?, fired_tx)?;
    tokio::spawn(async move { engine.run(shutdown_rx).await });

    // Transition pump: each phase edge reaches the challenge room, and the
    // owning team's feed when the challenge is team-scoped.
    let state_for_pump = Arc::clone(&state);
    tokio::spawn(async move {
        while let Some(transition) = fired_rx.recv().await {
            let challenge = &transition.challenge;
            let room = RoomId::Challenge(challenge.id.clone().into());
            if let Err(e) = state_for_pump
                .rooms
                .publish(&room, events::challenge_transition(challenge, transition.to))
            {
                warn!(challenge_id = %challenge.id, error = %e, "transition publish failed");
            }

            if let Some(team_id) = &challenge.team_id {
                let kind = match transition.to {
                    ChallengePhase::Ended => "challenge_ended",
                    _ => "challenge_started",
                };
                match state_for_pump.social.add_feed_item(
                    team_id,
                    kind,
                    &challenge.created_by,
                    serde_json::json!({ "challenge_id": challenge.id, "challenge_name": challenge.name }),
                ) {
                    Ok(item) => {
                        let _ = state_for_pump
                            .rooms
                            .publish(&RoomId::Team(team_id.clone().into()), events::feed_item(&item));
                    }
                    Err(e) => warn!(team_id, error = %e, "transition feed write failed"),
                }
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("LiLove gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // signal the challenge engine to stop
    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Create the DB's parent directory if it doesn't exist yet.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
