use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{Event, PaymentRecord, PurchaseKind};
use crate::transport::{InlineButton, InlineKeyboard};
use crate::utils::format::{format_euro, format_spoken};

/// Payments whose reference time is at least this far gone count as past.
const HISTORY_GRACE_DAYS: i64 = 2;

const SEPARATOR: &str = "\n--------------------\n";

#[derive(Debug, Error, PartialEq)]
pub enum CallbackError {
    #[error("unknown action: {0}")]
    Action(String),

    #[error("malformed data: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustDirection {
    Increase,
    Decrease,
}

/// Everything an inline button can ask for, as carried in its callback
/// data. Quantity buttons carry the prices so the affordance can be
/// re-rendered without a database round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    Adjust {
        direction: AdjustDirection,
        event_id: i64,
        has_transfer: bool,
        ticket_price: i64,
        transfer_price: i64,
    },
    Purchase {
        kind: PurchaseKind,
        event_id: i64,
    },
    Remove {
        event_id: i64,
    },
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Adjust {
                direction,
                event_id,
                has_transfer,
                ticket_price,
                transfer_price,
            } => {
                let action = match direction {
                    AdjustDirection::Increase => "increase",
                    AdjustDirection::Decrease => "decrease",
                };
                format!(
                    "{action}_{event_id}_{}_{ticket_price}_{transfer_price}",
                    u8::from(*has_transfer)
                )
            }
            CallbackAction::Purchase { kind, event_id } => {
                let action = match kind {
                    PurchaseKind::Ticket => "pay",
                    PurchaseKind::Transfer => "transfer",
                };
                format!("{action}_{event_id}")
            }
            CallbackAction::Remove { event_id } => format!("rm_{event_id}"),
        }
    }

    pub fn decode(data: &str) -> Result<Self, CallbackError> {
        let mut parts = data.split('_');
        let action = parts
            .next()
            .ok_or_else(|| CallbackError::Malformed(data.to_string()))?;

        let decoded = match action {
            "increase" | "decrease" => {
                let direction = if action == "increase" {
                    AdjustDirection::Increase
                } else {
                    AdjustDirection::Decrease
                };
                let event_id = next_i64(&mut parts, data)?;
                let has_transfer = match next_i64(&mut parts, data)? {
                    0 => false,
                    1 => true,
                    _ => return Err(CallbackError::Malformed(data.to_string())),
                };
                CallbackAction::Adjust {
                    direction,
                    event_id,
                    has_transfer,
                    ticket_price: next_i64(&mut parts, data)?,
                    transfer_price: next_i64(&mut parts, data)?,
                }
            }
            "pay" => CallbackAction::Purchase {
                kind: PurchaseKind::Ticket,
                event_id: next_i64(&mut parts, data)?,
            },
            "transfer" => CallbackAction::Purchase {
                kind: PurchaseKind::Transfer,
                event_id: next_i64(&mut parts, data)?,
            },
            "rm" => CallbackAction::Remove {
                event_id: next_i64(&mut parts, data)?,
            },
            other => return Err(CallbackError::Action(other.to_string())),
        };
        if parts.next().is_some() {
            return Err(CallbackError::Malformed(data.to_string()));
        }
        Ok(decoded)
    }
}

fn next_i64<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    data: &str,
) -> Result<i64, CallbackError> {
    parts
        .next()
        .and_then(|token| token.parse::<i64>().ok())
        .ok_or_else(|| CallbackError::Malformed(data.to_string()))
}

/// Purchase/quantity affordance built from callback-carried prices, so a
/// quantity press can re-render it without touching the store.
pub fn quantity_keyboard(
    event_id: i64,
    has_transfer: bool,
    ticket_price: i64,
    transfer_price: i64,
    quantity: i64,
) -> InlineKeyboard {
    let ticket_noun = if quantity == 1 { "biglietto" } else { "biglietti" };
    let mut keyboard = vec![vec![InlineButton::new(
        format!(
            "🎟️ Paga {quantity} {ticket_noun} ({})",
            format_euro(quantity * ticket_price)
        ),
        CallbackAction::Purchase {
            kind: PurchaseKind::Ticket,
            event_id,
        }
        .encode(),
    )]];

    if has_transfer {
        keyboard.push(vec![InlineButton::new(
            format!(
                "🚌 Paga {quantity} transfer ({})",
                format_euro(quantity * transfer_price)
            ),
            CallbackAction::Purchase {
                kind: PurchaseKind::Transfer,
                event_id,
            }
            .encode(),
        )]);
    }

    let adjust = |direction| {
        CallbackAction::Adjust {
            direction,
            event_id,
            has_transfer,
            ticket_price,
            transfer_price,
        }
        .encode()
    };
    keyboard.push(vec![
        InlineButton::new("-", adjust(AdjustDirection::Decrease)),
        InlineButton::new("+", adjust(AdjustDirection::Increase)),
    ]);
    keyboard
}

pub fn purchase_keyboard(event: &Event, quantity: i64) -> InlineKeyboard {
    let leg = event.transfer_leg();
    quantity_keyboard(
        event.id,
        leg.is_some(),
        event.price,
        leg.map(|l| l.price).unwrap_or(0),
        quantity,
    )
}

/// Card text for one catalog entry; the shuttle block only shows when the
/// event has a complete leg.
pub fn event_caption(event: &Event) -> String {
    let mut caption = format!(
        "{}, ore {}\n\n📍{}\n\n*{}*\n\n{}",
        event.date.format("%d/%m/%Y"),
        event.date.format("%H:%M"),
        event.end_location,
        event.title,
        event.description
    );
    if let Some(leg) = event.transfer_leg() {
        caption.push_str(&format!(
            "\n\n🚌 Disponibile navetta su prenotazione\n*Quando*: {}\n*Dove*: {}",
            format_spoken(leg.departure),
            leg.start_location
        ));
    }
    caption
}

pub fn removal_caption(event: &Event) -> String {
    format!("{}\n\n{}", event.title, event.description)
}

pub fn removal_keyboard(event_id: i64) -> InlineKeyboard {
    vec![vec![InlineButton::new(
        "Rimuovi",
        CallbackAction::Remove { event_id }.encode(),
    )]]
}

/// Purchase history, split into upcoming and past sections around
/// `now - 2 days`, newest first within each.
pub fn history_text(payments: &[PaymentRecord], now: NaiveDateTime) -> String {
    if payments.is_empty() {
        return "Non hai ancora preso biglietti.".to_string();
    }
    let cutoff = now - chrono::Duration::days(HISTORY_GRACE_DAYS);
    let (upcoming, past): (Vec<_>, Vec<_>) =
        payments.iter().partition(|payment| payment.time >= cutoff);

    let mut text = String::new();
    if !upcoming.is_empty() {
        text.push_str("*📬 I tuoi pagamenti per eventi futuri:*\n");
        text.push_str(SEPARATOR);
        for payment in upcoming.iter().rev() {
            text.push_str(&history_entry(payment));
            text.push_str(SEPARATOR);
        }
    }
    if !past.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str("*📭 I tuoi pagamenti per eventi passati:*\n");
        text.push_str(SEPARATOR);
        for payment in past.iter().rev() {
            text.push_str(&history_entry(payment));
            text.push_str(SEPARATOR);
        }
    }
    text
}

fn history_entry(payment: &PaymentRecord) -> String {
    let (glyph, noun, time_label) = if payment.is_transfer {
        ("🚌", "transfers", "Partenza")
    } else {
        ("🎟️", "tickets", "Evento")
    };
    format!(
        "\n🎉 *{}*\n\n{glyph} *{}x* {noun}\n📍 *Data {time_label}*:\n      {}\n💳 *Pagato*: {}\n📆 *Data Pagamento*:\n      {}\n",
        payment.title,
        payment.quantity,
        format_spoken(payment.time),
        format_euro(payment.amount),
        payment.timestamp.format("%Y-%m-%d %H:%M:%S"),
    )
}
