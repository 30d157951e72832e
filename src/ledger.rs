use crate::api::*;
use crate::error::{LedgerError, NOT_OPEN, NOT_OPEN_FOR_BETTING};
use crate::store::MarketStore;
use chrono::Utc;
use log::{debug, trace};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, LedgerError>;

pub const MIN_ODDS: Odds = dec!(5);
pub const MAX_ODDS: Odds = dec!(95);
pub const DEFAULT_ODDS: Odds = dec!(50);
/// Largest move of the quoted odds a single bet can cause, in percentage points.
pub const MAX_SHIFT: Odds = dec!(10);
pub const ACTIVITY_LIMIT: usize = 20;
pub const TRENDING_LIMIT: usize = 10;
pub const LEADERBOARD_LIMIT: usize = 10;
/// Decimal places kept on quoted odds.
pub const ODDS_DP: u32 = 10;

pub struct Ledger {
    store: Arc<Box<dyn MarketStore + Send + Sync>>,
}
impl Ledger {
    pub fn new(store: Box<dyn MarketStore + Send + Sync>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
    pub async fn create_market(&mut self, request: NewMarketRequest) -> Result<Market> {
        let odds_yes = Self::clamp_odds(request.initial_odds.unwrap_or(DEFAULT_ODDS));
        let now = Utc::now();
        let market = Market {
            id: format!("market-{}", Uuid::new_v4()),
            applicant_profile_id: request.applicant_profile_id,
            school_name: request.school_name,
            decision_type: request.decision_type,
            decision_date: request.decision_date,
            current_odds_yes: odds_yes,
            current_odds_no: Decimal::ONE_HUNDRED - odds_yes,
            total_volume: Decimal::ZERO,
            unique_participants: 0,
            status: MarketStatus::Open,
            actual_result: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.save_market(&market).await?;
        Ok(market)
    }
    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        Ok(self.store.list_markets().await?)
    }
    pub async fn get_market(&self, market: &MarketId) -> Result<Market> {
        self.store
            .get_market(market)
            .await?
            .ok_or(LedgerError::NotFound)
    }
    pub async fn place_bet(
        &mut self,
        market: &MarketId,
        user: UserId,
        prediction: Prediction,
        amount: Credits,
    ) -> Result<BetResponse> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidArgument(format!(
                "Bet amount must be positive but was {}",
                amount
            )));
        }
        let mut market = self.get_market(market).await?;
        if market.status != MarketStatus::Open {
            return Err(LedgerError::InvalidState(NOT_OPEN_FOR_BETTING));
        }
        let total_volume = market.total_volume.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidArgument(format!("Bet amount {} is too large", amount))
        })?;
        let odds_at_bet = match prediction {
            Prediction::Yes => market.current_odds_yes,
            Prediction::No => market.current_odds_no,
        };
        if Self::winning_payout(amount, odds_at_bet).is_none() {
            return Err(LedgerError::InvalidArgument(format!(
                "Bet amount {} is too large to pay out at odds {}",
                amount, odds_at_bet
            )));
        }
        let odds_yes =
            Self::shift_odds(market.current_odds_yes, amount, total_volume, prediction);
        let returning = self
            .store
            .get_market_bets(&market.id)
            .await?
            .iter()
            .any(|bet| bet.user_id == user);

        let now = Utc::now();
        let bet = Bet {
            id: format!("bet-{}", Uuid::new_v4()),
            market_id: market.id.clone(),
            user_id: user,
            prediction,
            amount,
            odds_at_bet,
            payout: Decimal::ZERO,
            created_at: now,
        };
        trace!(
            "Odds for market {} move from {}/{} to {}/{}",
            market.id,
            market.current_odds_yes,
            market.current_odds_no,
            odds_yes,
            Decimal::ONE_HUNDRED - odds_yes
        );
        market.current_odds_yes = odds_yes;
        market.current_odds_no = Decimal::ONE_HUNDRED - odds_yes;
        market.total_volume = total_volume;
        if !returning {
            market.unique_participants += 1;
        }
        market.updated_at = now;

        self.store
            .save_market_with_bets(&market, std::slice::from_ref(&bet))
            .await?;
        Ok(BetResponse { bet, market })
    }
    pub async fn close_market(&mut self, market: &MarketId) -> Result<Market> {
        let mut market = self.get_market(market).await?;
        if market.status != MarketStatus::Open {
            return Err(LedgerError::InvalidState(NOT_OPEN));
        }
        market.status = MarketStatus::Closed;
        market.updated_at = Utc::now();
        self.store.save_market(&market).await?;
        Ok(market)
    }
    /// Settles every bet of the market against `outcome`. Resolution happens
    /// once; a resolved market is never settled again.
    pub async fn resolve_market(
        &mut self,
        market: &MarketId,
        outcome: Outcome,
    ) -> Result<ResolveResponse> {
        let mut market = self.get_market(market).await?;
        if market.status == MarketStatus::Resolved {
            return Err(LedgerError::AlreadyResolved);
        }
        let now = Utc::now();
        market.status = MarketStatus::Resolved;
        market.actual_result = Some(outcome);
        market.resolved_at = Some(now);
        market.updated_at = now;

        let mut bets = self.store.get_market_bets(&market.id).await?;
        let mut paid_out = Decimal::ZERO;
        for bet in bets.iter_mut() {
            bet.payout = Self::calculate_payout(bet, outcome);
            paid_out = paid_out.saturating_add(bet.payout);
        }
        self.store.save_market_with_bets(&market, &bets).await?;
        debug!(
            "Settled {} bets on market {} as {}, paying out {} credits",
            bets.len(),
            market.id,
            outcome,
            paid_out
        );
        Ok(ResolveResponse { market, bets })
    }
    pub async fn get_market_activity(&self, market: &MarketId) -> Result<Vec<Bet>> {
        let mut bets = self.store.get_market_bets(market).await?;
        // Newest insert first among bets stamped with the same time.
        bets.reverse();
        bets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bets.truncate(ACTIVITY_LIMIT);
        Ok(bets)
    }
    pub async fn get_trending_markets(&self) -> Result<Vec<Market>> {
        let mut markets: Vec<Market> = self
            .store
            .list_markets()
            .await?
            .into_iter()
            .filter(|market| market.status == MarketStatus::Open)
            .collect();
        markets.sort_by(|a, b| b.total_volume.cmp(&a.total_volume));
        markets.truncate(TRENDING_LIMIT);
        Ok(markets)
    }
    pub async fn get_user_bets(&self, user: &UserId) -> Result<Vec<Bet>> {
        Ok(self.store.get_user_bets(user).await?)
    }
    pub async fn get_user_stats(&self, user: &UserId) -> Result<UserStats> {
        let ranked = self.rank_users().await?;
        Ok(ranked
            .into_iter()
            .find(|stats| &stats.user_id == user)
            .unwrap_or_else(|| UserStats {
                user_id: user.clone(),
                total_bets: 0,
                correct_predictions: 0,
                accuracy_rate: Decimal::ZERO,
                total_credits_won: Decimal::ZERO,
                total_credits_lost: Decimal::ZERO,
                rank: None,
            }))
    }
    pub async fn get_leaderboard(&self) -> Result<Vec<UserStats>> {
        let mut ranked = self.rank_users().await?;
        ranked.truncate(LEADERBOARD_LIMIT);
        Ok(ranked)
    }
    async fn rank_users(&self) -> Result<Vec<UserStats>> {
        let outcomes: HashMap<MarketId, Outcome> = self
            .store
            .list_markets()
            .await?
            .into_iter()
            .filter_map(|market| market.actual_result.map(|result| (market.id, result)))
            .collect();

        // user -> (stats, settled bet count)
        let mut tally: BTreeMap<UserId, (UserStats, u32)> = BTreeMap::new();
        for bet in self.store.get_bets().await? {
            let (stats, settled) = tally.entry(bet.user_id.clone()).or_insert_with(|| {
                (
                    UserStats {
                        user_id: bet.user_id.clone(),
                        total_bets: 0,
                        correct_predictions: 0,
                        accuracy_rate: Decimal::ZERO,
                        total_credits_won: Decimal::ZERO,
                        total_credits_lost: Decimal::ZERO,
                        rank: None,
                    },
                    0,
                )
            });
            stats.total_bets += 1;
            if let Some(outcome) = outcomes.get(&bet.market_id) {
                *settled += 1;
                if Self::is_winning(bet.prediction, *outcome) {
                    stats.correct_predictions += 1;
                    stats.total_credits_won = stats.total_credits_won.saturating_add(bet.payout);
                } else {
                    stats.total_credits_lost = stats.total_credits_lost.saturating_add(bet.amount);
                }
            }
        }
        let mut ranked: Vec<UserStats> = tally
            .into_values()
            .map(|(mut stats, settled)| {
                if settled > 0 {
                    stats.accuracy_rate = (Decimal::from(stats.correct_predictions)
                        / Decimal::from(settled))
                    .round_dp(4);
                }
                stats
            })
            .collect();
        // BTreeMap order keeps ties sorted by user id
        ranked.sort_by(|a, b| {
            b.total_credits_won
                .cmp(&a.total_credits_won)
                .then(b.accuracy_rate.cmp(&a.accuracy_rate))
        });
        for (position, stats) in ranked.iter_mut().enumerate() {
            stats.rank = Some(position as u32 + 1);
        }
        Ok(ranked)
    }
    pub fn clamp_odds(odds: Odds) -> Odds {
        odds.clamp(MIN_ODDS, MAX_ODDS)
    }
    /// Returns the new "yes" odds after a bet of `amount`.
    ///
    /// The shift is the bet's share of the volume after the bet, scaled to at
    /// most [`MAX_SHIFT`]. Only the "yes" side is clamped; the "no" side is
    /// always its complement to 100.
    pub fn shift_odds(
        odds_yes: Odds,
        amount: Credits,
        total_volume: Credits,
        prediction: Prediction,
    ) -> Odds {
        let weight = amount / total_volume;
        let shift = weight * MAX_SHIFT;
        let odds_yes = match prediction {
            Prediction::Yes => odds_yes + shift,
            Prediction::No => odds_yes - shift,
        };
        Self::clamp_odds(odds_yes.round_dp(ODDS_DP))
    }
    pub fn is_winning(prediction: Prediction, outcome: Outcome) -> bool {
        matches!(
            (outcome, prediction),
            (Outcome::Accepted, Prediction::Yes) | (Outcome::Rejected, Prediction::No)
        )
    }
    pub fn calculate_payout(bet: &Bet, outcome: Outcome) -> Credits {
        //! A winning bet returns its stake at the odds it was placed at,
        //! truncated to whole credits. Losing bets pay nothing.
        if !Self::is_winning(bet.prediction, outcome) {
            return Decimal::ZERO;
        }
        // place_bet only accepts bets whose payout fits
        Self::winning_payout(bet.amount, bet.odds_at_bet).unwrap_or(Decimal::MAX)
    }
    /// `floor(amount * 100 / odds)`, or `None` when it is not representable.
    fn winning_payout(amount: Credits, odds: Odds) -> Option<Credits> {
        let payout = match amount.checked_mul(Decimal::ONE_HUNDRED) {
            Some(stake) => stake.checked_div(odds)?,
            // dividing first loses precision, so only when the stake overflows
            None => Decimal::ONE_HUNDRED.checked_div(odds)?.checked_mul(amount)?,
        };
        Some(payout.floor())
    }
}
