// Marketplace data model: users, RFQs, quotes, chat messages, escrow.
//
// Field names match the backend's JSON exactly (snake_case), so every type
// here round-trips through serde without renames.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

impl User {
    pub fn is_buyer(&self) -> bool {
        self.role == Role::Buyer
    }
}

/// Body of a successful `/auth/login` or `/auth/register` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// RFQs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfqStatus {
    Open,
    Closed,
    Awarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }

    /// Parse a user-typed urgency. Accepts any casing; blank means normal.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => Some(Urgency::Normal),
            "high" => Some(Urgency::High),
            "critical" => Some(Urgency::Critical),
            _ => None,
        }
    }
}

/// A buyer's request for quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfq {
    pub id: i64,
    pub buyer_id: i64,
    pub product: String,
    pub quantity: u64,
    pub specs: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RfqStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
}

impl Rfq {
    /// RFQs without an explicit status are treated as open.
    pub fn is_open(&self) -> bool {
        matches!(self.status, None | Some(RfqStatus::Open))
    }
}

/// Partial RFQ sent to `POST /rfq`. The backend fills in id, buyer and
/// timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRfq {
    pub product: String,
    pub quantity: u64,
    pub specs: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub rfq_id: i64,
    pub seller_id: i64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_gold_supplier: Option<bool>,
}

impl Quote {
    pub fn is_gold_supplier(&self) -> bool {
        self.is_gold_supplier.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuote {
    pub rfq_id: i64,
    pub price: f64,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub rfq_id: i64,
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub rfq_id: i64,
    pub message: String,
}

/// Order a chat thread by `created_at`.
///
/// Messages whose timestamp cannot be parsed keep their arrival order and
/// sort after every timestamped message. The sort is stable.
pub fn sort_thread(messages: &mut [Message]) {
    messages.sort_by_key(|m| match m.created_at.as_deref().and_then(parse_timestamp) {
        Some(ts) => (0u8, Some(ts)),
        None => (1u8, None),
    });
}

/// Parse a backend timestamp. Accepts RFC 3339 and the bare
/// `YYYY-MM-DD HH:MM:SS` form SQL databases tend to emit (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Escrow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    #[default]
    Pending,
    Funded,
    Released,
    Disputed,
}

impl EscrowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EscrowStatus::Pending => "pending",
            EscrowStatus::Funded => "funded",
            EscrowStatus::Released => "released",
            EscrowStatus::Disputed => "disputed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: i64,
    pub rfq_id: i64,
    pub amount: f64,
    pub status: EscrowStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEscrow {
    pub rfq_id: i64,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EscrowStatus>,
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
