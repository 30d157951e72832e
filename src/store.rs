use crate::api::*;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{query, Executor, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;

/// Storage for markets and their bets.
///
/// Listings come back in the order records were first saved. Saving a record
/// whose id already exists replaces it in place.
#[async_trait]
pub trait MarketStore {
    async fn get_market(&self, market: &MarketId) -> Result<Option<Market>>;
    async fn list_markets(&self) -> Result<Vec<Market>>;
    async fn save_market(&self, market: &Market) -> Result<()>;
    async fn save_bet(&self, bet: &Bet) -> Result<()>;
    /// Saves the market and the bets as one write: either all of them are
    /// stored or none is.
    async fn save_market_with_bets(&self, market: &Market, bets: &[Bet]) -> Result<()>;
    async fn get_market_bets(&self, market: &MarketId) -> Result<Vec<Bet>>;
    async fn get_user_bets(&self, user: &UserId) -> Result<Vec<Bet>>;
    async fn get_bets(&self) -> Result<Vec<Bet>>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    markets: Mutex<Vec<Market>>,
    bets: Mutex<Vec<Bet>>,
}
#[async_trait]
impl MarketStore for MemoryStore {
    async fn get_market(&self, market: &MarketId) -> Result<Option<Market>> {
        let markets = self.markets.lock().await;
        Ok(markets.iter().find(|m| &m.id == market).cloned())
    }
    async fn list_markets(&self) -> Result<Vec<Market>> {
        Ok(self.markets.lock().await.clone())
    }
    async fn save_market(&self, market: &Market) -> Result<()> {
        upsert_market(&mut *self.markets.lock().await, market);
        Ok(())
    }
    async fn save_bet(&self, bet: &Bet) -> Result<()> {
        upsert_bet(&mut *self.bets.lock().await, bet);
        Ok(())
    }
    async fn save_market_with_bets(&self, market: &Market, bets: &[Bet]) -> Result<()> {
        // lock order is markets, then bets
        let mut markets = self.markets.lock().await;
        let mut stored_bets = self.bets.lock().await;
        for bet in bets {
            upsert_bet(&mut stored_bets, bet);
        }
        upsert_market(&mut markets, market);
        Ok(())
    }
    async fn get_market_bets(&self, market: &MarketId) -> Result<Vec<Bet>> {
        let bets = self.bets.lock().await;
        Ok(bets
            .iter()
            .filter(|bet| &bet.market_id == market)
            .cloned()
            .collect())
    }
    async fn get_user_bets(&self, user: &UserId) -> Result<Vec<Bet>> {
        let bets = self.bets.lock().await;
        Ok(bets
            .iter()
            .filter(|bet| &bet.user_id == user)
            .cloned()
            .collect())
    }
    async fn get_bets(&self) -> Result<Vec<Bet>> {
        Ok(self.bets.lock().await.clone())
    }
}

fn upsert_market(markets: &mut Vec<Market>, market: &Market) {
    if let Some(existing) = markets.iter_mut().find(|m| m.id == market.id) {
        *existing = market.clone();
    } else {
        markets.push(market.clone());
    }
}
fn upsert_bet(bets: &mut Vec<Bet>, bet: &Bet) {
    if let Some(existing) = bets.iter_mut().find(|b| b.id == bet.id) {
        *existing = bet.clone();
    } else {
        bets.push(bet.clone());
    }
}

pub struct SQLite {
    connection: SqlitePool,
}
impl SQLite {
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid sqlite url {}", url))?
            .create_if_missing(true);
        // Every connection to an in-memory database sees its own database,
        // so keep exactly one alive for the lifetime of the pool.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let connection = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("couldn't connect to {}", url))?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS markets (\
                id TEXT PRIMARY KEY,\
                applicant_profile_id TEXT NOT NULL,\
                school_name TEXT NOT NULL,\
                decision_type TEXT NOT NULL,\
                decision_date TEXT NOT NULL,\
                odds_yes TEXT NOT NULL,\
                odds_no TEXT NOT NULL,\
                total_volume TEXT NOT NULL,\
                unique_participants INTEGER NOT NULL,\
                status TEXT NOT NULL,\
                actual_result TEXT,\
                resolved_at TEXT,\
                created_at TEXT NOT NULL,\
                updated_at TEXT NOT NULL\
                )",
            )
            .await
            .context("failed to create markets table")?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS bets (\
                id TEXT PRIMARY KEY,\
                market_id TEXT NOT NULL,\
                user_id TEXT NOT NULL,\
                prediction TEXT NOT NULL,\
                amount TEXT NOT NULL,\
                odds_at_bet TEXT NOT NULL,\
                payout TEXT NOT NULL,\
                created_at TEXT NOT NULL\
                )",
            )
            .await
            .context("failed to create bets table")?;
        Ok(Self { connection })
    }
}
fn market_from_row(row: &SqliteRow) -> Result<Market> {
    Ok(Market {
        id: row.try_get("id")?,
        applicant_profile_id: row.try_get("applicant_profile_id")?,
        school_name: row.try_get("school_name")?,
        decision_type: DecisionType::from_str(row.try_get("decision_type")?)?,
        decision_date: row.try_get("decision_date")?,
        current_odds_yes: Decimal::from_str(row.try_get("odds_yes")?)?,
        current_odds_no: Decimal::from_str(row.try_get("odds_no")?)?,
        total_volume: Decimal::from_str(row.try_get("total_volume")?)?,
        unique_participants: u32::try_from(row.try_get::<i64, _>("unique_participants")?)?,
        status: MarketStatus::from_str(row.try_get("status")?)?,
        actual_result: row
            .try_get::<Option<&str>, _>("actual_result")?
            .map(Outcome::from_str)
            .transpose()?,
        resolved_at: row.try_get::<Option<DateTime<Utc>>, _>("resolved_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
fn bet_from_row(row: &SqliteRow) -> Result<Bet> {
    Ok(Bet {
        id: row.try_get("id")?,
        market_id: row.try_get("market_id")?,
        user_id: row.try_get("user_id")?,
        prediction: Prediction::from_str(row.try_get("prediction")?)?,
        amount: Decimal::from_str(row.try_get("amount")?)?,
        odds_at_bet: Decimal::from_str(row.try_get("odds_at_bet")?)?,
        payout: Decimal::from_str(row.try_get("payout")?)?,
        created_at: row.try_get("created_at")?,
    })
}
fn market_upsert(market: &Market) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    query(
        "INSERT INTO markets (\
        id,\
        applicant_profile_id,\
        school_name,\
        decision_type,\
        decision_date,\
        odds_yes,\
        odds_no,\
        total_volume,\
        unique_participants,\
        status,\
        actual_result,\
        resolved_at,\
        created_at,\
        updated_at) \
        VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?) \
        ON CONFLICT(id) DO UPDATE SET \
        odds_yes = excluded.odds_yes,\
        odds_no = excluded.odds_no,\
        total_volume = excluded.total_volume,\
        unique_participants = excluded.unique_participants,\
        status = excluded.status,\
        actual_result = excluded.actual_result,\
        resolved_at = excluded.resolved_at,\
        updated_at = excluded.updated_at",
    )
    .bind(&market.id)
    .bind(&market.applicant_profile_id)
    .bind(&market.school_name)
    .bind(market.decision_type.to_string())
    .bind(market.decision_date)
    .bind(market.current_odds_yes.to_string())
    .bind(market.current_odds_no.to_string())
    .bind(market.total_volume.to_string())
    .bind(i64::from(market.unique_participants))
    .bind(market.status.to_string())
    .bind(market.actual_result.map(|result| result.to_string()))
    .bind(market.resolved_at)
    .bind(market.created_at)
    .bind(market.updated_at)
}
fn bet_upsert(bet: &Bet) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    query(
        "INSERT INTO bets (\
        id,\
        market_id,\
        user_id,\
        prediction,\
        amount,\
        odds_at_bet,\
        payout,\
        created_at) \
        VALUES (?,?,?,?,?,?,?,?) \
        ON CONFLICT(id) DO UPDATE SET payout = excluded.payout",
    )
    .bind(&bet.id)
    .bind(&bet.market_id)
    .bind(&bet.user_id)
    .bind(bet.prediction.to_string())
    .bind(bet.amount.to_string())
    .bind(bet.odds_at_bet.to_string())
    .bind(bet.payout.to_string())
    .bind(bet.created_at)
}
#[async_trait]
impl MarketStore for SQLite {
    async fn get_market(&self, market: &MarketId) -> Result<Option<Market>> {
        let row = self
            .connection
            .fetch_optional(query("SELECT * FROM markets WHERE id = ?").bind(market))
            .await
            .with_context(|| format!("couldn't get market {}", market))?;
        row.as_ref().map(market_from_row).transpose()
    }
    async fn list_markets(&self) -> Result<Vec<Market>> {
        let rows = self
            .connection
            .fetch_all(query("SELECT * FROM markets ORDER BY rowid"))
            .await
            .context("couldn't list markets")?;
        rows.iter().map(market_from_row).collect()
    }
    async fn save_market(&self, market: &Market) -> Result<()> {
        self.connection
            .execute(market_upsert(market))
            .await
            .with_context(|| format!("couldn't save market {}", market.id))?;
        Ok(())
    }
    async fn save_bet(&self, bet: &Bet) -> Result<()> {
        self.connection
            .execute(bet_upsert(bet))
            .await
            .with_context(|| format!("couldn't save bet {}", bet.id))?;
        Ok(())
    }
    async fn save_market_with_bets(&self, market: &Market, bets: &[Bet]) -> Result<()> {
        let mut tx = self
            .connection
            .begin()
            .await
            .context("couldn't start transaction")?;
        for bet in bets {
            bet_upsert(bet)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("couldn't save bet {}", bet.id))?;
        }
        market_upsert(market)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("couldn't save market {}", market.id))?;
        // dropping the transaction on an error above rolls it back
        tx.commit()
            .await
            .with_context(|| format!("couldn't commit market {}", market.id))?;
        Ok(())
    }
    async fn get_market_bets(&self, market: &MarketId) -> Result<Vec<Bet>> {
        let rows = self
            .connection
            .fetch_all(query("SELECT * FROM bets WHERE market_id = ? ORDER BY rowid").bind(market))
            .await
            .with_context(|| format!("couldn't get bets for market {}", market))?;
        rows.iter().map(bet_from_row).collect()
    }
    async fn get_user_bets(&self, user: &UserId) -> Result<Vec<Bet>> {
        let rows = self
            .connection
            .fetch_all(query("SELECT * FROM bets WHERE user_id = ? ORDER BY rowid").bind(user))
            .await
            .with_context(|| format!("couldn't get bets for user {}", user))?;
        rows.iter().map(bet_from_row).collect()
    }
    async fn get_bets(&self) -> Result<Vec<Bet>> {
        let rows = self
            .connection
            .fetch_all(query("SELECT * FROM bets ORDER BY rowid"))
            .await
            .context("couldn't list bets")?;
        rows.iter().map(bet_from_row).collect()
    }
}
