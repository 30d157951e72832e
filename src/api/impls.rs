use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use anyhow::bail;

use super::*;

impl Display for MarketStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Resolved => "resolved",
        };
        write!(f, "{}", output)
    }
}
impl FromStr for MarketStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "resolved" => Ok(Self::Resolved),
            e => bail!("Couldn't deserialize to MarketStatus: {}", e),
        }
    }
}
impl Display for Prediction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::Yes => "yes",
            Self::No => "no",
        };
        write!(f, "{}", output)
    }
}
impl FromStr for Prediction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            e => bail!("Couldn't deserialize to Prediction: {}", e),
        }
    }
}
impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", output)
    }
}
impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            e => bail!("Couldn't deserialize to Outcome: {}", e),
        }
    }
}
impl Display for DecisionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Self::Ea => "EA",
            Self::Ed => "ED",
            Self::Ed2 => "ED2",
            Self::Rea => "REA",
            Self::Rd => "RD",
        };
        write!(f, "{}", output)
    }
}
impl FromStr for DecisionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "EA" => Ok(Self::Ea),
            "ED" => Ok(Self::Ed),
            "ED2" => Ok(Self::Ed2),
            "REA" => Ok(Self::Rea),
            "RD" => Ok(Self::Rd),
            e => bail!("Couldn't deserialize to DecisionType: {}", e),
        }
    }
}
