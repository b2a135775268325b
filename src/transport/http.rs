use std::path::Path;

use async_trait::async_trait;
use serde_json::json;

use super::{
    ChatTransport, InlineKeyboard, InvoiceRequest, ReplyKeyboard, TransportError,
};

/// Gateway client: every outbound operation becomes a JSON POST against the
/// transport bridge, which owns delivery, button rendering and file upload.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), TransportError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<ReplyKeyboard>,
    ) -> Result<(), TransportError> {
        self.post(
            "messages/text",
            json!({ "chat_id": chat_id, "text": text, "keyboard": keyboard }),
        )
        .await
    }

    async fn send_text_with_buttons(
        &self,
        chat_id: i64,
        text: &str,
        buttons: InlineKeyboard,
    ) -> Result<(), TransportError> {
        self.post(
            "messages/text",
            json!({ "chat_id": chat_id, "text": text, "buttons": buttons }),
        )
        .await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_path: &str,
        caption: &str,
        buttons: Option<InlineKeyboard>,
    ) -> Result<(), TransportError> {
        self.post(
            "messages/photo",
            json!({
                "chat_id": chat_id,
                "photo_path": photo_path,
                "caption": caption,
                "buttons": buttons,
            }),
        )
        .await
    }

    async fn edit_buttons(
        &self,
        chat_id: i64,
        message_id: i64,
        buttons: InlineKeyboard,
    ) -> Result<(), TransportError> {
        self.post(
            "messages/buttons",
            json!({ "chat_id": chat_id, "message_id": message_id, "buttons": buttons }),
        )
        .await
    }

    async fn send_invoice(&self, invoice: InvoiceRequest) -> Result<(), TransportError> {
        self.post("invoices", json!(invoice)).await
    }

    async fn answer_pre_checkout(
        &self,
        request_id: &str,
        approve: bool,
    ) -> Result<(), TransportError> {
        self.post(
            "pre_checkout/answer",
            json!({ "request_id": request_id, "approve": approve }),
        )
        .await
    }

    async fn download_photo(&self, file_id: &str, dest: &Path) -> Result<(), TransportError> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.base_url, file_id))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "files/{} returned {}",
                file_id,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}
