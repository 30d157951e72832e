use crate::api::*;
use crate::error::{map_ledger_err_and_code, LedgerError};
use crate::ledger::Ledger;
use crate::settings::Settings;
use crate::store::{MarketStore, MemoryStore, SQLite};
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use axum_macros::debug_handler;
use chrono::Utc;
use clap::Parser;
use env_logger::{Builder, WriteStyle};
use log::{debug, error, info};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

mod api;
#[cfg(test)]
mod client;
mod error;
mod ledger;
mod settings;
mod store;

type SharedLedger = Arc<RwLock<Ledger>>;
type ApiError = (StatusCode, Json<ErrorResponse>);

fn map_rejection(rejection: JsonRejection) -> ApiError {
    map_ledger_err_and_code(LedgerError::from(rejection))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: Utc::now(),
    })
}
async fn get_markets(State(state): State<SharedLedger>) -> Result<Json<Vec<Market>>, ApiError> {
    let ledger = state.read().await;
    let markets = ledger.get_markets().await.map_err(map_ledger_err_and_code)?;
    Ok(Json(markets))
}
async fn get_market(
    State(state): State<SharedLedger>,
    Path(market): Path<MarketId>,
) -> Result<Json<Market>, ApiError> {
    let ledger = state.read().await;
    let market = ledger
        .get_market(&market)
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok(Json(market))
}
#[debug_handler]
async fn new_market(
    State(state): State<SharedLedger>,
    request: Result<Json<NewMarketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Market>), ApiError> {
    let Json(request) = request.map_err(map_rejection)?;
    let mut ledger = state.write().await;
    let market = ledger
        .create_market(request)
        .await
        .map_err(map_ledger_err_and_code)?;
    debug!(
        "Created market {}: {} at {} with odds {}/{}",
        market.id,
        market.applicant_profile_id,
        market.school_name,
        market.current_odds_yes,
        market.current_odds_no
    );
    Ok((StatusCode::CREATED, Json(market)))
}
#[debug_handler]
async fn place_bet(
    State(state): State<SharedLedger>,
    Path(market): Path<MarketId>,
    request: Result<Json<PlaceBetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BetResponse>), ApiError> {
    let Json(request) = request.map_err(map_rejection)?;
    let mut ledger = state.write().await;
    debug!(
        "Adding bet of {} on {} in market {} for user {}",
        request.amount, request.prediction, market, request.user_id
    );
    let response = ledger
        .place_bet(&market, request.user_id, request.prediction, request.amount)
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok((StatusCode::CREATED, Json(response)))
}
async fn close_market(
    State(state): State<SharedLedger>,
    Path(market): Path<MarketId>,
) -> Result<Json<Market>, ApiError> {
    let mut ledger = state.write().await;
    let market = ledger
        .close_market(&market)
        .await
        .map_err(map_ledger_err_and_code)?;
    debug!("Closed betting on market {}", market.id);
    Ok(Json(market))
}
#[debug_handler]
async fn resolve_market(
    State(state): State<SharedLedger>,
    Path(market): Path<MarketId>,
    request: Result<Json<ResolveMarketRequest>, JsonRejection>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let Json(request) = request.map_err(map_rejection)?;
    let mut ledger = state.write().await;
    debug!("Resolving market {} as {}", market, request.result);
    let response = ledger
        .resolve_market(&market, request.result)
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok(Json(response))
}
async fn get_market_activity(
    State(state): State<SharedLedger>,
    Path(market): Path<MarketId>,
) -> Result<Json<Vec<Bet>>, ApiError> {
    let ledger = state.read().await;
    let bets = ledger
        .get_market_activity(&market)
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok(Json(bets))
}
async fn get_trending_markets(
    State(state): State<SharedLedger>,
) -> Result<Json<Vec<Market>>, ApiError> {
    let ledger = state.read().await;
    let markets = ledger
        .get_trending_markets()
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok(Json(markets))
}
async fn get_leaderboard(
    State(state): State<SharedLedger>,
) -> Result<Json<Vec<UserStats>>, ApiError> {
    let ledger = state.read().await;
    let leaderboard = ledger
        .get_leaderboard()
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok(Json(leaderboard))
}
async fn get_user_bets(
    State(state): State<SharedLedger>,
    Path(user): Path<UserId>,
) -> Result<Json<Vec<Bet>>, ApiError> {
    let ledger = state.read().await;
    let bets = ledger
        .get_user_bets(&user)
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok(Json(bets))
}
async fn get_user_stats(
    State(state): State<SharedLedger>,
    Path(user): Path<UserId>,
) -> Result<Json<UserStats>, ApiError> {
    let ledger = state.read().await;
    let stats = ledger
        .get_user_stats(&user)
        .await
        .map_err(map_ledger_err_and_code)?;
    Ok(Json(stats))
}

#[derive(Parser)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    port: Option<u16>,
    /// sqlx SQLite url, e.g. sqlite://markets.db
    #[arg(short, long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Args::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if cli.db.is_some() {
        settings.db = cli.db;
    }
    Builder::default()
        .filter_level(settings.log_filter()?)
        .write_style(WriteStyle::Always)
        .init();
    let (_port, handle) = run_server(&settings).await?;
    handle.await?;
    Ok(())
}

async fn build_ledger(settings: &Settings) -> Result<Ledger> {
    let store: Box<dyn MarketStore + Send + Sync> = match &settings.db {
        Some(url) => {
            info!("Storing markets in {}", url);
            Box::new(SQLite::new(url).await?)
        }
        None => {
            info!("Storing markets in memory, they are lost on shutdown");
            Box::new(MemoryStore::default())
        }
    };
    Ok(Ledger::new(store))
}

fn router(ledger: Ledger) -> Router {
    let state: SharedLedger = Arc::new(RwLock::new(ledger));
    Router::new()
        .route("/health", get(health))
        .route("/markets", get(get_markets).post(new_market))
        .route("/markets/trending", get(get_trending_markets))
        .route("/markets/leaderboard", get(get_leaderboard))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/bet", post(place_bet))
        .route("/markets/:id/close", put(close_market))
        .route("/markets/:id/resolve", put(resolve_market))
        .route("/markets/:id/activity", get(get_market_activity))
        .route("/markets/user/:user_id/bets", get(get_user_bets))
        .route("/markets/user/:user_id/stats", get(get_user_stats))
        .with_state(state)
}

async fn run_server(settings: &Settings) -> Result<(u16, JoinHandle<()>)> {
    let app = router(build_ledger(settings).await?);
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", settings.host, settings.port))?;
    let server = axum::Server::try_bind(&addr)
        .with_context(|| format!("couldn't bind {}", addr))?
        .serve(app.into_make_service());
    let port = server.local_addr().port();
    info!("Listening on {}", server.local_addr());
    let handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Server stopped: {}", e);
        }
    });
    Ok((port, handle))
}
