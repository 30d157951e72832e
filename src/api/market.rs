use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Credits = Decimal;
pub type Odds = Decimal;
pub type MarketId = String;
pub type BetId = String;
pub type UserId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: MarketId,
    pub applicant_profile_id: String,
    pub school_name: String,
    pub decision_type: DecisionType,
    pub decision_date: DateTime<Utc>,
    pub current_odds_yes: Odds,
    pub current_odds_no: Odds,
    pub total_volume: Credits,
    pub unique_participants: u32,
    pub status: MarketStatus,
    pub actual_result: Option<Outcome>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub market_id: MarketId,
    pub user_id: UserId,
    pub prediction: Prediction,
    pub amount: Credits,
    /// Odds of the chosen side before this bet moved the market.
    pub odds_at_bet: Odds,
    pub payout: Credits,
    pub created_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: UserId,
    pub total_bets: u32,
    pub correct_predictions: u32,
    pub accuracy_rate: Decimal,
    pub total_credits_won: Credits,
    pub total_credits_lost: Credits,
    pub rank: Option<u32>,
}
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
    Resolved,
}
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Yes,
    No,
}
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Accepted,
    Rejected,
}
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum DecisionType {
    #[serde(rename = "EA")]
    Ea,
    #[serde(rename = "ED")]
    Ed,
    #[serde(rename = "ED2")]
    Ed2,
    #[serde(rename = "REA")]
    Rea,
    #[serde(rename = "RD")]
    Rd,
}
