use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Status of a relay order, transitions only pending -> processing -> done | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Done => "done",
            OrderStatus::Failed => "failed",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "done" => Ok(OrderStatus::Done),
            "failed" => Ok(OrderStatus::Failed),
            _ => Err(format!("unknown order status: {s}")),
        }
    }
}

/// Last on-chain step recorded for an order, used to resume interrupted orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStep {
    None,
    PermitSent,
    PermitConfirmed,
    TransferSent,
    TransferConfirmed,
}

impl OrderStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStep::None => "none",
            OrderStep::PermitSent => "permit_sent",
            OrderStep::PermitConfirmed => "permit_confirmed",
            OrderStep::TransferSent => "transfer_sent",
            OrderStep::TransferConfirmed => "transfer_confirmed",
        }
    }
}

impl Display for OrderStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(OrderStep::None),
            "permit_sent" => Ok(OrderStep::PermitSent),
            "permit_confirmed" => Ok(OrderStep::PermitConfirmed),
            "transfer_sent" => Ok(OrderStep::TransferSent),
            "transfer_confirmed" => Ok(OrderStep::TransferConfirmed),
            _ => Err(format!("unknown order step: {s}")),
        }
    }
}

#[derive(Serialize, sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDbObj {
    pub id: i64,
    pub order_id: String,
    #[serde(skip_serializing)]
    pub payload: String,
    pub status: String,
    pub error_message: Option<String>,
    pub last_step: String,
    pub permit_tx_hash: Option<String>,
    pub transfer_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDbObj {
    pub fn status(&self) -> Result<OrderStatus, String> {
        OrderStatus::from_str(&self.status)
    }

    pub fn step(&self) -> Result<OrderStep, String> {
        OrderStep::from_str(&self.last_step)
    }
}
