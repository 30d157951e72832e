use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMarketRequest {
    pub applicant_profile_id: String,
    pub school_name: String,
    pub decision_type: DecisionType,
    pub decision_date: DateTime<Utc>,
    /// Probability of admission in percent. Defaults to 50.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_odds: Option<Odds>,
}
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub user_id: UserId,
    pub prediction: Prediction,
    pub amount: Credits,
}
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ResolveMarketRequest {
    pub result: Outcome,
}
