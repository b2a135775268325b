use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What an invoice charges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseKind {
    Ticket,
    Transfer,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub timestamp: NaiveDateTime,
    pub is_transfer: bool,
    pub transfer_start_location: Option<String>,
    /// Event date for tickets, shuttle departure for transfers.
    pub time: NaiveDateTime,
    pub quantity: i64,
}

/// A verified payment about to be committed. Written exactly once.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub event_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub is_transfer: bool,
    pub transfer_start_location: Option<String>,
    pub time: NaiveDateTime,
    pub quantity: i64,
}

/// A payment joined with its event title, for the purchase history view.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRecord {
    pub title: String,
    pub amount: i64,
    pub timestamp: NaiveDateTime,
    pub is_transfer: bool,
    pub transfer_start_location: Option<String>,
    pub time: NaiveDateTime,
    pub quantity: i64,
}
