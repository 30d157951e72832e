use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::*;

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct BetResponse {
    pub bet: Bet,
    pub market: Market,
}
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct ResolveResponse {
    pub market: Market,
    pub bets: Vec<Bet>,
}
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
}
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
