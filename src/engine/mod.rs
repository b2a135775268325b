use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use crate::catalog::{self, AdjustDirection, CallbackAction};
use crate::checkout::Checkout;
use crate::config::Config;
use crate::guard::RateLimiter;
use crate::menus;
use crate::session::{SessionStore, TicketSelections, UserSession};
use crate::store::EventStore;
use crate::transport::{
    CallbackPress, ChatTransport, IncomingMessage, Update,
};
use crate::utils::error::BotError;
use crate::wizard::{Conversation, Reply, StepContext, StepOutcome, WizardInput};

const MSG_RATE_LIMITED: &str = "Rate limit exceeded. Please try again later.";
const MSG_WELCOME: &str = "Benvenuto! Scegli un'opzione:";
const MSG_NO_EVENTS: &str = "Nessun evento con biglietti disponibili al momento!";
const MSG_EVENT_NOT_FOUND: &str = "Event not found";
const MSG_EVENT_REMOVED: &str = "Event removed";

/// Top-level dispatcher. Every inbound update lands here; user-initiated
/// ones pass the rate guard and then run under the user's session lock, so
/// one user's transitions are strictly sequential while different users
/// proceed in parallel.
pub struct Engine {
    store: EventStore,
    guard: RateLimiter,
    sessions: SessionStore,
    selections: Arc<TicketSelections>,
    checkout: Checkout,
    transport: Arc<dyn ChatTransport>,
    media_dir: PathBuf,
}

impl Engine {
    pub fn new(store: EventStore, transport: Arc<dyn ChatTransport>, config: &Config) -> Self {
        let selections = Arc::new(TicketSelections::new());
        let checkout = Checkout::new(
            store.clone(),
            selections.clone(),
            transport.clone(),
            config.currency.clone(),
        );
        Self {
            store,
            guard: RateLimiter::new(
                config.rate_limit_max,
                Duration::from_secs(config.rate_limit_window_secs),
            ),
            sessions: SessionStore::new(),
            selections,
            checkout,
            transport,
            media_dir: config.media_dir.clone(),
        }
    }

    pub async fn handle_update(&self, update: Update) -> Result<(), BotError> {
        match update {
            Update::Message(message) => self.handle_message(message).await,
            Update::Callback(press) => self.handle_callback(press).await,
            // Payment callbacks are transport-initiated: not rate gated.
            Update::PreCheckout(request) => self.checkout.approve_pre_checkout(&request).await,
            Update::PaymentConfirmed(confirmation) => {
                self.checkout.commit_payment(&confirmation).await
            }
        }
    }

    async fn handle_message(&self, message: IncomingMessage) -> Result<(), BotError> {
        if !self.admit(message.user_id, message.chat_id).await? {
            return Ok(());
        }
        let session = self.sessions.session(message.user_id);
        let mut session = session.lock().await;

        // A fresh wizard entry supersedes whatever draft was in flight.
        if let Some(text) = message.text.as_deref() {
            match text {
                menus::MENU_ADD_EVENT => {
                    let (conversation, reply) = Conversation::manual();
                    session.conversation = Some(conversation);
                    return self.reply(message.chat_id, reply).await;
                }
                menus::MENU_ADD_FROM_POST => {
                    let (conversation, reply) = Conversation::from_post();
                    session.conversation = Some(conversation);
                    return self.reply(message.chat_id, reply).await;
                }
                _ => {}
            }
        }

        if session.conversation.is_some() {
            return self.step_wizard(&mut session, &message).await;
        }

        match message.text.as_deref() {
            Some(menus::MENU_EVENTS) => self.show_catalog(message.user_id, message.chat_id).await,
            Some(menus::MENU_MY_TICKETS) => {
                self.show_history(message.user_id, message.chat_id).await
            }
            Some(menus::MENU_REMOVE_EVENT) => self.show_removal_list(message.chat_id).await,
            _ => {
                self.transport
                    .send_text(message.chat_id, MSG_WELCOME, Some(menus::main_keyboard()))
                    .await
                    .map_err(Into::into)
            }
        }
    }

    async fn handle_callback(&self, press: CallbackPress) -> Result<(), BotError> {
        if !self.admit(press.user_id, press.chat_id).await? {
            return Ok(());
        }
        let session = self.sessions.session(press.user_id);
        let _transition = session.lock().await;

        match CallbackAction::decode(&press.data)? {
            CallbackAction::Adjust {
                direction,
                event_id,
                has_transfer,
                ticket_price,
                transfer_price,
            } => {
                let before = self.selections.get(press.user_id, event_id);
                let delta = match direction {
                    AdjustDirection::Increase => 1,
                    AdjustDirection::Decrease => -1,
                };
                let after = self.selections.adjust(press.user_id, event_id, delta);
                // At a bound the press is a no-op and the affordance is
                // already correct.
                if after != before {
                    let keyboard = catalog::quantity_keyboard(
                        event_id,
                        has_transfer,
                        ticket_price,
                        transfer_price,
                        after,
                    );
                    self.transport
                        .edit_buttons(press.chat_id, press.message_id, keyboard)
                        .await?;
                }
                Ok(())
            }
            CallbackAction::Purchase { kind, event_id } => {
                match self
                    .checkout
                    .issue_invoice(press.user_id, press.chat_id, event_id, kind)
                    .await
                {
                    Err(err @ BotError::NotFound(_)) => {
                        err.log();
                        self.transport
                            .send_text(press.chat_id, MSG_EVENT_NOT_FOUND, None)
                            .await
                            .map_err(Into::into)
                    }
                    other => other,
                }
            }
            CallbackAction::Remove { event_id } => {
                self.store.deactivate_event(event_id).await?;
                info!(event_id, "event removed");
                self.transport
                    .send_text(press.chat_id, MSG_EVENT_REMOVED, None)
                    .await
                    .map_err(Into::into)
            }
        }
    }

    /// Rate-guard gate shared by every user-initiated entry point. A
    /// rejection notifies the user and stops the action here.
    async fn admit(&self, user_id: i64, chat_id: i64) -> Result<bool, BotError> {
        if self.guard.admit(user_id) {
            return Ok(true);
        }
        warn!(user_id, "rate limit exceeded");
        self.transport
            .send_text(chat_id, MSG_RATE_LIMITED, None)
            .await?;
        Ok(false)
    }

    async fn step_wizard(
        &self,
        session: &mut UserSession,
        message: &IncomingMessage,
    ) -> Result<(), BotError> {
        let input = if let Some(photo) = &message.photo {
            WizardInput::Photo(photo)
        } else if let Some(text) = &message.text {
            WizardInput::Text(text)
        } else {
            return Ok(());
        };
        let ctx = StepContext {
            now: Local::now().naive_local(),
            media_dir: &self.media_dir,
        };
        let Some(conversation) = session.conversation.as_mut() else {
            return Ok(());
        };

        match conversation.step(input, &ctx) {
            StepOutcome::Continue(reply) => self.reply(message.chat_id, reply).await,
            StepOutcome::FetchPhoto {
                file_id,
                dest,
                reply,
            } => {
                self.transport.download_photo(&file_id, &dest).await?;
                self.reply(message.chat_id, reply).await
            }
            StepOutcome::Commit(event) => {
                let event_id = self.store.insert_event(&event).await?;
                session.conversation = None;
                info!(event_id, "event created");
                self.transport
                    .send_text(
                        message.chat_id,
                        &format!("Event added successfully with ID: {event_id}"),
                        Some(menus::main_keyboard()),
                    )
                    .await
                    .map_err(Into::into)
            }
            StepOutcome::Cancelled(reply) => {
                session.conversation = None;
                self.reply(message.chat_id, reply).await
            }
        }
    }

    async fn show_catalog(&self, user_id: i64, chat_id: i64) -> Result<(), BotError> {
        let events = self.store.active_events().await?;
        if events.is_empty() {
            return self
                .transport
                .send_text(chat_id, MSG_NO_EVENTS, Some(menus::main_keyboard()))
                .await
                .map_err(Into::into);
        }
        for event in &events {
            let quantity = self.selections.get(user_id, event.id);
            let keyboard = catalog::purchase_keyboard(event, quantity);
            let caption = catalog::event_caption(event);
            match &event.image_path {
                Some(path) => {
                    self.transport
                        .send_photo(chat_id, path, &caption, Some(keyboard))
                        .await?
                }
                None => {
                    self.transport
                        .send_text_with_buttons(chat_id, &caption, keyboard)
                        .await?
                }
            }
        }
        Ok(())
    }

    async fn show_history(&self, user_id: i64, chat_id: i64) -> Result<(), BotError> {
        let payments = self.store.payments_for_user(user_id).await?;
        let text = catalog::history_text(&payments, Local::now().naive_local());
        self.transport
            .send_text(chat_id, &text, None)
            .await
            .map_err(Into::into)
    }

    async fn show_removal_list(&self, chat_id: i64) -> Result<(), BotError> {
        let events = self.store.active_events().await?;
        if events.is_empty() {
            return self
                .transport
                .send_text(chat_id, MSG_NO_EVENTS, Some(menus::main_keyboard()))
                .await
                .map_err(Into::into);
        }
        for event in &events {
            let caption = catalog::removal_caption(event);
            let keyboard = catalog::removal_keyboard(event.id);
            match &event.image_path {
                Some(path) => {
                    self.transport
                        .send_photo(chat_id, path, &caption, Some(keyboard))
                        .await?
                }
                None => {
                    self.transport
                        .send_text_with_buttons(chat_id, &caption, keyboard)
                        .await?
                }
            }
        }
        Ok(())
    }

    async fn reply(&self, chat_id: i64, reply: Reply) -> Result<(), BotError> {
        self.transport
            .send_text(chat_id, &reply.text, Some(reply.keyboard))
            .await
            .map_err(Into::into)
    }
}
