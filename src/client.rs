use anyhow::{anyhow, bail, Result};
use reqwest::{Response, StatusCode, Url};
use serde::Serialize;

use crate::api::*;

#[derive(Debug)]
pub struct Client {
    url: String,
    client: reqwest::Client,
}
impl Client {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::new();
        Self { url, client }
    }
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("{} cannot be used as a base url", self.url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
    async fn get(&self, segments: &[&str]) -> Result<Response> {
        let response = self.client.get(self.endpoint(segments)?).send().await?;
        bail_if_err(response, StatusCode::OK).await
    }
    async fn post(
        &self,
        segments: &[&str],
        request: &impl Serialize,
        expected_code: StatusCode,
    ) -> Result<Response> {
        let response = self
            .client
            .post(self.endpoint(segments)?)
            .json(request)
            .send()
            .await?;
        bail_if_err(response, expected_code).await
    }
    async fn put(&self, segments: &[&str], request: Option<&impl Serialize>) -> Result<Response> {
        let mut builder = self.client.put(self.endpoint(segments)?);
        if let Some(request) = request {
            builder = builder.json(request);
        }
        bail_if_err(builder.send().await?, StatusCode::OK).await
    }
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.get(&["health"]).await?;
        Ok(response.json::<HealthResponse>().await?)
    }
    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        let response = self.get(&["markets"]).await?;
        Ok(response.json::<Vec<Market>>().await?)
    }
    pub async fn get_market(&self, market: &str) -> Result<Market> {
        let response = self.get(&["markets", market]).await?;
        Ok(response.json::<Market>().await?)
    }
    pub async fn new_market(&self, request: NewMarketRequest) -> Result<Market> {
        let response = self
            .post(&["markets"], &request, StatusCode::CREATED)
            .await?;
        Ok(response.json::<Market>().await?)
    }
    pub async fn place_bet(&self, market: &str, request: PlaceBetRequest) -> Result<BetResponse> {
        let response = self
            .post(&["markets", market, "bet"], &request, StatusCode::CREATED)
            .await?;
        Ok(response.json::<BetResponse>().await?)
    }
    pub async fn close_market(&self, market: &str) -> Result<Market> {
        let response = self
            .put(&["markets", market, "close"], None::<&()>)
            .await?;
        Ok(response.json::<Market>().await?)
    }
    pub async fn resolve_market(
        &self,
        market: &str,
        request: ResolveMarketRequest,
    ) -> Result<ResolveResponse> {
        let response = self
            .put(&["markets", market, "resolve"], Some(&request))
            .await?;
        Ok(response.json::<ResolveResponse>().await?)
    }
    pub async fn get_market_activity(&self, market: &str) -> Result<Vec<Bet>> {
        let response = self.get(&["markets", market, "activity"]).await?;
        Ok(response.json::<Vec<Bet>>().await?)
    }
    pub async fn get_trending_markets(&self) -> Result<Vec<Market>> {
        let response = self.get(&["markets", "trending"]).await?;
        Ok(response.json::<Vec<Market>>().await?)
    }
    pub async fn get_leaderboard(&self) -> Result<Vec<UserStats>> {
        let response = self.get(&["markets", "leaderboard"]).await?;
        Ok(response.json::<Vec<UserStats>>().await?)
    }
    pub async fn get_user_bets(&self, user: &str) -> Result<Vec<Bet>> {
        let response = self.get(&["markets", "user", user, "bets"]).await?;
        Ok(response.json::<Vec<Bet>>().await?)
    }
    pub async fn get_user_stats(&self, user: &str) -> Result<UserStats> {
        let response = self.get(&["markets", "user", user, "stats"]).await?;
        Ok(response.json::<UserStats>().await?)
    }
}

async fn bail_if_err(response: Response, expected_code: StatusCode) -> Result<Response> {
    if response.status() != expected_code {
        bail!("{}: {}", response.status(), response.text().await?)
    } else {
        Ok(response)
    }
}
