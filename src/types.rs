use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Official result of a single draw.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    #[serde(default)]
    pub id: i64,
    pub date: String,
    pub prize1: String,
    #[serde(rename = "first3A")]
    pub first3_a: String,
    #[serde(rename = "first3B")]
    pub first3_b: String,
    #[serde(rename = "last3A")]
    pub last3_a: String,
    #[serde(rename = "last3B")]
    pub last3_b: String,
    pub last2: String,
}

/// Wire form is the lowercase name from `as_str`, carried by `tier_or_empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrizeTier {
    Prize1,
    Near1,
    First3,
    Last3,
    Last2,
    Lose,
}

impl PrizeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeTier::Prize1 => "prize1",
            PrizeTier::Near1 => "near1",
            PrizeTier::First3 => "first3",
            PrizeTier::Last3 => "last3",
            PrizeTier::Last2 => "last2",
            PrizeTier::Lose => "lose",
        }
    }

    /// Payout per ticket for the tier.
    pub fn amount(&self) -> i64 {
        match self {
            PrizeTier::Prize1 => 6_000_000,
            PrizeTier::Near1 => 100_000,
            PrizeTier::First3 | PrizeTier::Last3 => 4_000,
            PrizeTier::Last2 => 2_000,
            PrizeTier::Lose => 0,
        }
    }
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrizeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prize1" => Ok(PrizeTier::Prize1),
            "near1" => Ok(PrizeTier::Near1),
            "first3" => Ok(PrizeTier::First3),
            "last3" => Ok(PrizeTier::Last3),
            "last2" => Ok(PrizeTier::Last2),
            "lose" => Ok(PrizeTier::Lose),
            other => Err(format!("unknown prize tier: {}", other)),
        }
    }
}

/// Result of checking one ticket number against one draw. `tier` is `None`
/// when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrizeOutcome {
    #[serde(with = "tier_or_empty")]
    pub tier: Option<PrizeTier>,
    pub amount: i64,
}

impl PrizeOutcome {
    pub const NONE: PrizeOutcome = PrizeOutcome {
        tier: None,
        amount: 0,
    };

    pub fn won(tier: PrizeTier) -> Self {
        Self {
            tier: Some(tier),
            amount: tier.amount(),
        }
    }
}

/// A purchased ticket in someone's collection.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub ticket_number: String,
    pub quantity: i64,
    pub amount_paid: i64,
    pub purchase_date: DateTime<Utc>,
    #[serde(default)]
    pub draw_date_ref: String,
    #[serde(default, with = "tier_or_empty")]
    pub prize_tier: Option<PrizeTier>,
    #[serde(default)]
    pub prize_amount: i64,
    pub owner_email: String,
}

impl Ticket {
    pub fn clear_prize(&mut self) {
        self.prize_tier = None;
        self.prize_amount = 0;
    }
}

/// Caller-supplied fields for creating or replacing a ticket.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TicketInput {
    #[serde(default)]
    pub ticket_number: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub amount_paid: i64,
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub draw_date_ref: String,
}

/// Stores an absent tier as the empty string on the wire.
pub mod tier_or_empty {
    use super::PrizeTier;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tier: &Option<PrizeTier>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(tier.map(|t| t.as_str()).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PrizeTier>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}
