//! Chat endpoints.

use crate::{
    client::{ApiClient, ApiRequest},
    error::ApiError,
    models::{
        ConversationDetail, ConversationPage, ConversationSummary, CreateConversationRequest,
        DeleteResponse, SendMessageRequest, SendMessageResponse,
    },
};

/// Title used when a conversation is created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

#[derive(Debug, Clone)]
pub struct ChatApi {
    client: ApiClient,
}

impl ChatApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Send a user message. `conversation_id: None` starts a new conversation.
    pub async fn send_message(
        &self,
        message: &str,
        search_by_part_number: bool,
        conversation_id: Option<i64>,
    ) -> Result<SendMessageResponse, ApiError> {
        let body = SendMessageRequest {
            message: message.to_string(),
            search_by_part_number,
            conversation_id,
        };
        self.client
            .request(ApiRequest::post("/chat/message").json(&body)?)
            .await
    }

    pub async fn list_conversations(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<ConversationPage, ApiError> {
        let request = ApiRequest::get("/chat/conversations")
            .query("skip", skip)
            .query("limit", limit);
        self.client.request(request).await
    }

    pub async fn create_conversation(
        &self,
        title: Option<&str>,
    ) -> Result<ConversationSummary, ApiError> {
        let body = CreateConversationRequest {
            title: title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or(DEFAULT_CONVERSATION_TITLE)
                .to_string(),
        };
        self.client
            .request(ApiRequest::post("/chat/conversations").json(&body)?)
            .await
    }

    pub async fn get_conversation(&self, conversation_id: i64) -> Result<ConversationDetail, ApiError> {
        self.client
            .request(ApiRequest::get(format!("/chat/conversations/{conversation_id}")))
            .await
    }

    pub async fn delete_conversation(&self, conversation_id: i64) -> Result<DeleteResponse, ApiError> {
        let response: Option<DeleteResponse> = self
            .client
            .request(ApiRequest::delete(format!("/chat/conversations/{conversation_id}")))
            .await?;
        Ok(response.unwrap_or_default())
    }
}
