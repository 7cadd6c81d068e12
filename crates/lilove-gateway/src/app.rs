use axum::{routing::get, Router};
use lilove_coach::CoachRuntime;
use lilove_core::config::LiloveConfig;
use lilove_rooms::RoomRegistry;
use lilove_social::SocialStore;
use lilove_users::{ResumeKeyring, UserStore};
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: LiloveConfig,
    pub rooms: RoomRegistry,
    pub users: UserStore,
    pub social: SocialStore,
    pub coach: CoachRuntime,
    pub keyring: ResumeKeyring,
}

impl AppState {
    pub fn new(
        config: LiloveConfig,
        users: UserStore,
        social: SocialStore,
        coach: CoachRuntime,
        keyring: ResumeKeyring,
    ) -> Self {
        Self {
            config,
            rooms: RoomRegistry::new(),
            users,
            social,
            coach,
            keyring,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        // The PWA is served from a different origin than the gateway.
        .layer(tower_http::cors::CorsLayer::permissive())
}
