pub mod http;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway rejected the call: {0}")]
    Rejected(String),

    #[error("asset write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One inbound transport event, as the gateway webhook delivers it.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Update {
    Message(IncomingMessage),
    Callback(CallbackPress),
    PreCheckout(PreCheckoutRequest),
    PaymentConfirmed(PaymentConfirmation),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub user_id: i64,
    pub chat_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<PhotoAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoAttachment {
    pub file_id: String,
    /// Original name at the transport, extension included.
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPress {
    pub user_id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreCheckoutRequest {
    pub id: String,
    pub user_id: i64,
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub user_id: i64,
    pub chat_id: i64,
    pub payload: String,
    /// Total charged, minor units, as confirmed by the provider.
    pub total_amount: i64,
}

/// Rows of button labels rendered under the input field.
pub type ReplyKeyboard = Vec<Vec<String>>;

/// Rows of inline buttons attached to one message.
pub type InlineKeyboard = Vec<Vec<InlineButton>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub label: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRequest {
    pub chat_id: i64,
    pub title: String,
    pub description: String,
    /// Opaque state echoed back in the payment confirmation.
    pub payload: String,
    pub currency: String,
    /// Total price, minor units.
    pub amount: i64,
    pub photo_path: Option<String>,
}

/// Outbound half of the messaging transport. The engine only ever talks to
/// this trait; the gateway client implements it in production and a
/// recording mock stands in under test.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<ReplyKeyboard>,
    ) -> Result<(), TransportError>;

    async fn send_text_with_buttons(
        &self,
        chat_id: i64,
        text: &str,
        buttons: InlineKeyboard,
    ) -> Result<(), TransportError>;

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_path: &str,
        caption: &str,
        buttons: Option<InlineKeyboard>,
    ) -> Result<(), TransportError>;

    async fn edit_buttons(
        &self,
        chat_id: i64,
        message_id: i64,
        buttons: InlineKeyboard,
    ) -> Result<(), TransportError>;

    async fn send_invoice(&self, invoice: InvoiceRequest) -> Result<(), TransportError>;

    async fn answer_pre_checkout(
        &self,
        request_id: &str,
        approve: bool,
    ) -> Result<(), TransportError>;

    async fn download_photo(&self, file_id: &str, dest: &Path) -> Result<(), TransportError>;
}


#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Everything the engine pushed out, in order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Sent {
        Text {
            chat_id: i64,
            text: String,
            keyboard: Option<ReplyKeyboard>,
        },
        TextWithButtons {
            chat_id: i64,
            text: String,
            buttons: InlineKeyboard,
        },
        Photo {
            chat_id: i64,
            photo_path: String,
            caption: String,
            buttons: Option<InlineKeyboard>,
        },
        EditButtons {
            chat_id: i64,
            message_id: i64,
            buttons: InlineKeyboard,
        },
        Invoice(InvoiceRequest),
        PreCheckoutAnswer {
            request_id: String,
            approve: bool,
        },
        Download {
            file_id: String,
            dest: String,
        },
    }

    #[derive(Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<Sent>>,
    }

    impl RecordingTransport {
        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn texts(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|item| match item {
                    Sent::Text { text, .. } => Some(text),
                    _ => None,
                })
                .collect()
        }

        pub fn invoices(&self) -> Vec<InvoiceRequest> {
            self.sent()
                .into_iter()
                .filter_map(|item| match item {
                    Sent::Invoice(invoice) => Some(invoice),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, item: Sent) {
            self.sent.lock().unwrap().push(item);
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_text(
            &self,
            chat_id: i64,
            text: &str,
            keyboard: Option<ReplyKeyboard>,
        ) -> Result<(), TransportError> {
            self.record(Sent::Text {
                chat_id,
                text: text.to_string(),
                keyboard,
            });
            Ok(())
        }

        async fn send_text_with_buttons(
            &self,
            chat_id: i64,
            text: &str,
            buttons: InlineKeyboard,
        ) -> Result<(), TransportError> {
            self.record(Sent::TextWithButtons {
                chat_id,
                text: text.to_string(),
                buttons,
            });
            Ok(())
        }

        async fn send_photo(
            &self,
            chat_id: i64,
            photo_path: &str,
            caption: &str,
            buttons: Option<InlineKeyboard>,
        ) -> Result<(), TransportError> {
            self.record(Sent::Photo {
                chat_id,
                photo_path: photo_path.to_string(),
                caption: caption.to_string(),
                buttons,
            });
            Ok(())
        }

        async fn edit_buttons(
            &self,
            chat_id: i64,
            message_id: i64,
            buttons: InlineKeyboard,
        ) -> Result<(), TransportError> {
            self.record(Sent::EditButtons {
                chat_id,
                message_id,
                buttons,
            });
            Ok(())
        }

        async fn send_invoice(&self, invoice: InvoiceRequest) -> Result<(), TransportError> {
            self.record(Sent::Invoice(invoice));
            Ok(())
        }

        async fn answer_pre_checkout(
            &self,
            request_id: &str,
            approve: bool,
        ) -> Result<(), TransportError> {
            self.record(Sent::PreCheckoutAnswer {
                request_id: request_id.to_string(),
                approve,
            });
            Ok(())
        }

        async fn download_photo(&self, file_id: &str, dest: &Path) -> Result<(), TransportError> {
            self.record(Sent::Download {
                file_id: file_id.to_string(),
                dest: dest.to_string_lossy().into_owned(),
            });
            Ok(())
        }
    }
}
