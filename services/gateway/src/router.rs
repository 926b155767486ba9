//! The read-only + admin HTTP surface (§6.2). Ambient only — the simulation
//! runtime does not depend on this crate; it exists so the core has the
//! same kind of outer surface the teacher's own services expose.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{competitions, market, participants};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let read_routes = Router::new()
        .route("/competitions", get(competitions::list_competitions))
        .route("/competitions/:id", get(competitions::get_competition))
        .route("/competitions/:id/participants", get(competitions::list_participants))
        .route("/competitions/:id/leaderboard", get(competitions::leaderboard))
        .route("/participants/:id", get(participants::get_participant))
        .route("/participants/:id/positions", get(participants::list_open_positions))
        .route("/participants/:id/trades", get(competitions::list_trades))
        .route("/participants/:id/history", get(competitions::portfolio_history))
        .route("/tickers", get(market::list_tickers))
        .route("/tickers/:symbol", get(market::get_ticker));

    let admin_routes = Router::new()
        .route("/competitions", post(competitions::create_competition))
        .route("/competitions/:id/start", post(competitions::start_competition))
        .route("/competitions/:id/stop", post(competitions::stop_competition))
        .route("/competitions/:id/invoke-all", post(competitions::invoke_all))
        .route("/reset", post(competitions::reset_competition))
        .route("/participants/:id/invoke", post(competitions::invoke_one));

    Router::new()
        .nest("/v1", read_routes)
        .nest("/v1/admin", admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
