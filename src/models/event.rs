use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::payment::PurchaseKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub image_path: Option<String>,
    pub start_location: Option<String>,
    pub end_location: String,
    pub transfer_price: Option<i64>,
    pub transfer_time: Option<NaiveDateTime>,
    pub date: NaiveDateTime,
    pub active: bool,
}

/// Optional shuttle leg of an event. The three fields travel together: an
/// event either has a complete leg or none at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub start_location: String,
    pub departure: NaiveDateTime,
    pub price: i64,
}

/// A fully collected draft, ready for insertion.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub image_path: Option<String>,
    pub end_location: String,
    pub date: NaiveDateTime,
    pub transfer: Option<TransferLeg>,
}

impl Event {
    /// The shuttle leg, present only when every transfer column is set.
    pub fn transfer_leg(&self) -> Option<TransferLeg> {
        match (&self.start_location, self.transfer_time, self.transfer_price) {
            (Some(start_location), Some(departure), Some(price)) => Some(TransferLeg {
                start_location: start_location.clone(),
                departure,
                price,
            }),
            _ => None,
        }
    }

    /// Unit price of a purchase kind; None when the event sells no transfer.
    pub fn unit_price(&self, kind: PurchaseKind) -> Option<i64> {
        match kind {
            PurchaseKind::Ticket => Some(self.price),
            PurchaseKind::Transfer => self.transfer_price,
        }
    }

    /// The timestamp a purchase of the given kind refers to: the event date
    /// for tickets, the shuttle departure for transfers.
    pub fn reference_time(&self, kind: PurchaseKind) -> Option<NaiveDateTime> {
        match kind {
            PurchaseKind::Ticket => Some(self.date),
            PurchaseKind::Transfer => self.transfer_time,
        }
    }
}
