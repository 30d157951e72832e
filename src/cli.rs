#![allow(unused)]
use std::io::Read;

use anyhow::{Context, Result};
use api::*;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::extract::{extract_first_json, extract_score, normalize_reply, parse_probability};

mod api;
mod client;
mod extract;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, default_value = "http://127.0.0.1:3001")]
    url: String,
}
#[derive(Subcommand)]
enum Commands {
    Health,
    GetMarkets,
    GetMarket {
        #[arg(short, long)]
        market: MarketId,
    },
    NewMarket {
        #[arg(short, long)]
        applicant: String,
        #[arg(short, long)]
        school: String,
        /// One of EA, ED, ED2, REA, RD
        #[arg(short = 't', long)]
        decision_type: DecisionType,
        /// RFC 3339, e.g. 2025-12-15T17:00:00Z
        #[arg(short, long)]
        decision_date: DateTime<Utc>,
        #[arg(short, long, conflicts_with = "estimate")]
        initial_odds: Option<Decimal>,
        /// Free-text probability estimate, the first number in it is used
        #[arg(short, long)]
        estimate: Option<String>,
    },
    PlaceBet {
        #[arg(short, long)]
        market: MarketId,
        #[arg(short, long)]
        user: UserId,
        /// yes or no
        #[arg(short, long)]
        prediction: Prediction,
        #[arg(short, long)]
        amount: Decimal,
    },
    CloseMarket {
        #[arg(short, long)]
        market: MarketId,
    },
    ResolveMarket {
        #[arg(short, long)]
        market: MarketId,
        /// accepted or rejected
        #[arg(short, long)]
        result: Outcome,
    },
    GetActivity {
        #[arg(short, long)]
        market: MarketId,
    },
    GetTrending,
    GetLeaderboard,
    GetUserBets {
        #[arg(short, long)]
        user: UserId,
    },
    GetUserStats {
        #[arg(short, long)]
        user: UserId,
    },
    /// Prints the first JSON value embedded in stdin
    ExtractJson,
    /// Reduces a JSON reply on stdin to its text
    NormalizeReply,
    /// Finds a score like 87/100 or 87% in stdin
    ExtractScore,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Args::parse();
    let client = Client::new(cli.url);

    match cli.command {
        Commands::Health => print(&client.health().await?)?,
        Commands::GetMarkets => print(&client.get_markets().await?)?,
        Commands::GetMarket { market } => print(&client.get_market(&market).await?)?,
        Commands::NewMarket {
            applicant,
            school,
            decision_type,
            decision_date,
            initial_odds,
            estimate,
        } => {
            let initial_odds =
                initial_odds.or_else(|| estimate.map(|text| parse_probability(&text).into()));
            let request = NewMarketRequest {
                applicant_profile_id: applicant,
                school_name: school,
                decision_type,
                decision_date,
                initial_odds,
            };
            let market = client.new_market(request).await?;
            println!("Created new market: {}", market.id);
            print(&market)?;
        }
        Commands::PlaceBet {
            market,
            user,
            prediction,
            amount,
        } => {
            let request = PlaceBetRequest {
                user_id: user,
                prediction,
                amount,
            };
            let response = client.place_bet(&market, request).await?;
            println!(
                "Placed bet {} at {}, odds are now {}/{}",
                response.bet.id,
                response.bet.odds_at_bet,
                response.market.current_odds_yes,
                response.market.current_odds_no
            );
        }
        Commands::CloseMarket { market } => print(&client.close_market(&market).await?)?,
        Commands::ResolveMarket { market, result } => {
            let response = client
                .resolve_market(&market, ResolveMarketRequest { result })
                .await?;
            for bet in response.bets.iter() {
                println!("{} ({} on {}): payout {}", bet.user_id, bet.amount, bet.prediction, bet.payout);
            }
        }
        Commands::GetActivity { market } => print(&client.get_market_activity(&market).await?)?,
        Commands::GetTrending => print(&client.get_trending_markets().await?)?,
        Commands::GetLeaderboard => print(&client.get_leaderboard().await?)?,
        Commands::GetUserBets { user } => print(&client.get_user_bets(&user).await?)?,
        Commands::GetUserStats { user } => print(&client.get_user_stats(&user).await?)?,
        Commands::ExtractJson => match extract_first_json(&read_stdin()?) {
            Some(value) => print(&value)?,
            None => println!("No JSON found"),
        },
        Commands::NormalizeReply => {
            let input = read_stdin()?;
            // plain text replies are normalized as JSON strings
            let reply = serde_json::from_str(&input).unwrap_or(Value::String(input));
            println!("{}", normalize_reply(&reply));
        }
        Commands::ExtractScore => match extract_score(&read_stdin()?) {
            Some(score) => println!("{}", score),
            None => println!("No score found"),
        },
    }
    Ok(())
}

fn print(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("couldn't read stdin")?;
    Ok(input)
}
