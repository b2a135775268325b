use std::sync::Arc;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::info;

use crate::models::{Event, NewPayment, PurchaseKind};
use crate::session::TicketSelections;
use crate::store::EventStore;
use crate::transport::{
    ChatTransport, InvoiceRequest, PaymentConfirmation, PreCheckoutRequest,
};
use crate::utils::error::BotError;
use crate::utils::format::{format_date, format_euro, parse_date};

const TICKET_PREFIX: &str = "payment_for_event";
const TRANSFER_PREFIX: &str = "payment_for_transfer";

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("unknown prefix: {0}")]
    Prefix(String),

    #[error("missing tokens")]
    Tokens,

    #[error("invalid event id: {0}")]
    EventId(String),

    #[error("invalid reference time: {0}")]
    Time(String),

    #[error("quantity out of range: {0}")]
    Quantity(String),
}

/// Opaque state carried from invoice issuance to payment confirmation:
/// `payment_for_event_<id>_<DD/MM/YYYY HH:MM>_<quantity>` (or the
/// `payment_for_transfer` prefix). Decoding reads the last four
/// underscore-delimited tokens, so underscores inside the fixed prefix are
/// harmless; anything else malformed is rejected outright.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPayload {
    pub kind: PurchaseKind,
    pub event_id: i64,
    pub reference_time: NaiveDateTime,
    pub quantity: i64,
}

impl PaymentPayload {
    pub fn encode(&self) -> String {
        let prefix = match self.kind {
            PurchaseKind::Ticket => TICKET_PREFIX,
            PurchaseKind::Transfer => TRANSFER_PREFIX,
        };
        format!(
            "{prefix}_{}_{}_{}",
            self.event_id,
            format_date(self.reference_time),
            self.quantity
        )
    }

    pub fn decode(raw: &str) -> Result<Self, PayloadError> {
        let mut tail = raw.rsplitn(4, '_');
        let quantity = tail.next().ok_or(PayloadError::Tokens)?;
        let time = tail.next().ok_or(PayloadError::Tokens)?;
        let event_id = tail.next().ok_or(PayloadError::Tokens)?;
        let prefix = tail.next().ok_or(PayloadError::Tokens)?;

        let kind = match prefix {
            TICKET_PREFIX => PurchaseKind::Ticket,
            TRANSFER_PREFIX => PurchaseKind::Transfer,
            other => return Err(PayloadError::Prefix(other.to_string())),
        };
        let event_id = event_id
            .parse::<i64>()
            .map_err(|_| PayloadError::EventId(event_id.to_string()))?;
        let reference_time =
            parse_date(time).map_err(|_| PayloadError::Time(time.to_string()))?;
        let quantity = quantity
            .parse::<i64>()
            .ok()
            .filter(|q| (TicketSelections::MIN..=TicketSelections::MAX).contains(q))
            .ok_or_else(|| PayloadError::Quantity(quantity.to_string()))?;

        Ok(Self {
            kind,
            event_id,
            reference_time,
            quantity,
        })
    }
}

/// Purchase pipeline: issue an invoice for the current selection, wave the
/// pre-checkout through, commit the confirmed payment. Each stage is a
/// single attempt driven by a single inbound transport event.
pub struct Checkout {
    store: EventStore,
    selections: Arc<TicketSelections>,
    transport: Arc<dyn ChatTransport>,
    currency: String,
}

impl Checkout {
    pub fn new(
        store: EventStore,
        selections: Arc<TicketSelections>,
        transport: Arc<dyn ChatTransport>,
        currency: String,
    ) -> Self {
        Self {
            store,
            selections,
            transport,
            currency,
        }
    }

    /// Selected → InvoiceIssued. A missing or inactive event, or a transfer
    /// purchase against an event without a shuttle, aborts with NotFound
    /// and no side effects; the dispatcher turns that into a user notice.
    pub async fn issue_invoice(
        &self,
        user_id: i64,
        chat_id: i64,
        event_id: i64,
        kind: PurchaseKind,
    ) -> Result<(), BotError> {
        let Some(event) = self.store.active_event(event_id).await? else {
            return Err(BotError::NotFound(format!("event {event_id}")));
        };
        let (Some(unit_price), Some(reference_time)) =
            (event.unit_price(kind), event.reference_time(kind))
        else {
            return Err(BotError::NotFound(format!("transfer leg of event {event_id}")));
        };

        let quantity = self.selections.get(user_id, event_id);
        let amount = quantity * unit_price;
        let payload = PaymentPayload {
            kind,
            event_id,
            reference_time,
            quantity,
        }
        .encode();

        self.transport
            .send_invoice(InvoiceRequest {
                chat_id,
                title: event.title.clone(),
                description: invoice_caption(&event, kind, quantity),
                payload,
                currency: self.currency.clone(),
                amount,
                photo_path: event.image_path.clone(),
            })
            .await?;
        Ok(())
    }

    /// InvoiceIssued → PreCheckoutVerified. Capacity is unlimited, so there
    /// is nothing to re-check: always approve.
    pub async fn approve_pre_checkout(
        &self,
        request: &PreCheckoutRequest,
    ) -> Result<(), BotError> {
        self.transport.answer_pre_checkout(&request.id, true).await?;
        Ok(())
    }

    /// PreCheckoutVerified → Committed. The sole writer of payment rows.
    pub async fn commit_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<(), BotError> {
        let payload = PaymentPayload::decode(&confirmation.payload)?;
        let is_transfer = payload.kind == PurchaseKind::Transfer;
        let transfer_start_location = if is_transfer {
            self.store.transfer_origin(payload.event_id).await?
        } else {
            None
        };

        let payment_id = self
            .store
            .insert_payment(&NewPayment {
                event_id: payload.event_id,
                user_id: confirmation.user_id,
                amount: confirmation.total_amount,
                is_transfer,
                transfer_start_location,
                time: payload.reference_time,
                quantity: payload.quantity,
            })
            .await?;
        info!(
            payment_id,
            event_id = payload.event_id,
            user_id = confirmation.user_id,
            "payment committed"
        );

        let text = match payload.kind {
            PurchaseKind::Ticket => format!(
                "Event payment of {} was successful!",
                format_euro(confirmation.total_amount)
            ),
            PurchaseKind::Transfer => format!(
                "Transfer payment of {} was successful!",
                format_euro(confirmation.total_amount)
            ),
        };
        self.transport
            .send_text(confirmation.chat_id, &text, None)
            .await?;
        Ok(())
    }
}

fn invoice_caption(event: &Event, kind: PurchaseKind, quantity: i64) -> String {
    match kind {
        PurchaseKind::Ticket => {
            let noun = if quantity > 1 { "biglietti" } else { "biglietto" };
            format!("{quantity}x 🎟️ {noun}\n{}\n", event.title)
        }
        PurchaseKind::Transfer => {
            let departure = event
                .transfer_time
                .map(format_date)
                .unwrap_or_default();
            format!("{quantity}x 🚌 transfer\n{} at {departure}\n", event.title)
        }
    }
}
