//! # Conversation store
//!
//! [`ChatStore`] owns the chat panel's state: the messages of the open
//! conversation, the history list, the current conversation id and the
//! *suggested products* shown next to the chat.
//!
//! Suggested products are a derived view. Every operation that touches them
//! recomputes the list from scratch and replaces it wholesale; the list is
//! never merged or patched, so an older turn's recommendations cannot linger
//! once a newer turn (or another conversation) is on screen.
//!
//! Operations take `&mut self`: two sends on the same store cannot overlap,
//! so message pairs are appended in send order.
//!
//! Failures are logged, reported through the store's [`Notifier`] and then
//! returned to the caller. No state the user already produced is discarded.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    api::ApiService,
    error::ApiError,
    models::{ChatMessage, ConversationDetail, ConversationPage, ConversationSummary, Product},
    notify::{Notification, Notifier},
};

/// Product ids of the newest message that recommends any products.
///
/// Messages with a missing or empty `productIds` list are skipped.
pub fn latest_product_ids(messages: &[ChatMessage]) -> Option<Vec<i64>> {
    messages
        .iter()
        .rev()
        .find_map(|message| message.product_ids().filter(|ids| !ids.is_empty()))
        .map(<[i64]>::to_vec)
}

pub struct ChatStore {
    api: ApiService,
    notifier: Arc<dyn Notifier>,
    messages: Vec<ChatMessage>,
    history: Vec<ConversationSummary>,
    current_conversation_id: Option<i64>,
    suggested_products: Vec<Product>,
    is_loading: bool,
}

impl ChatStore {
    pub fn new(api: ApiService, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            messages: Vec::new(),
            history: Vec::new(),
            current_conversation_id: None,
            suggested_products: Vec::new(),
            is_loading: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn history(&self) -> &[ConversationSummary] {
        &self.history
    }

    pub fn current_conversation_id(&self) -> Option<i64> {
        self.current_conversation_id
    }

    pub fn suggested_products(&self) -> &[Product] {
        &self.suggested_products
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Send `content` to the assistant within the current conversation, or
    /// start a new one when none is current.
    ///
    /// Returns the assistant's reply.
    pub async fn send_message(
        &mut self,
        content: &str,
        search_by_part_number: bool,
    ) -> Result<ChatMessage, ApiError> {
        self.is_loading = true;
        let result = self.send_inner(content, search_by_part_number).await;
        self.is_loading = false;
        result.inspect_err(|err| self.report("Chat Error", "Failed to send message", err))
    }

    async fn send_inner(
        &mut self,
        content: &str,
        search_by_part_number: bool,
    ) -> Result<ChatMessage, ApiError> {
        let was_new = self.current_conversation_id.is_none();
        let response = self
            .api
            .chat
            .send_message(content, search_by_part_number, self.current_conversation_id)
            .await?;
        debug!(
            conversation_id = response.conversation_id,
            product_ids = ?response.assistant_message.product_ids(),
            "Got assistant reply"
        );

        if was_new {
            self.current_conversation_id = Some(response.conversation_id);
            if let Some(summary) = response.conversation.clone() {
                self.history.insert(0, summary);
            }
        }

        let reply = response.assistant_message.clone();
        self.messages.push(response.user_message);
        self.messages.push(response.assistant_message);

        // An empty id list still replaces the previous turn's suggestions.
        let ids = reply.product_ids().map(<[i64]>::to_vec);
        match (ids, response.suggested_products) {
            (Some(ids), inline) => {
                let fetched = self.api.products.get_by_ids(&ids).await;
                self.suggested_products = match inline {
                    Some(inline) if fetched.is_empty() => {
                        debug!("Falling back to inline suggested products");
                        inline
                    }
                    _ => fetched,
                };
            }
            (None, Some(inline)) => self.suggested_products = inline,
            (None, None) => {}
        }

        Ok(reply)
    }

    /// Replace the history list with one page of conversation summaries.
    pub async fn load_history(&mut self, skip: u32, limit: u32) -> Result<ConversationPage, ApiError> {
        match self.api.chat.list_conversations(skip, limit).await {
            Ok(page) => {
                self.history = page.conversations.clone();
                Ok(page)
            }
            Err(err) => {
                self.report("History Error", "Failed to load chat history", &err);
                Err(err)
            }
        }
    }

    /// Open conversation `conversation_id` and derive its suggested products.
    pub async fn load_conversation(
        &mut self,
        conversation_id: i64,
    ) -> Result<ConversationDetail, ApiError> {
        self.is_loading = true;
        self.suggested_products = Vec::new();
        let result = self.load_inner(conversation_id).await;
        self.is_loading = false;
        result.inspect_err(|err| self.report("Conversation Error", "Failed to load conversation", err))
    }

    async fn load_inner(&mut self, conversation_id: i64) -> Result<ConversationDetail, ApiError> {
        let detail = self.api.chat.get_conversation(conversation_id).await?;
        self.messages = detail.messages.clone();
        self.current_conversation_id = Some(conversation_id);

        let Some(ids) = latest_product_ids(&self.messages) else {
            debug!(conversation_id, "No product ids in conversation");
            self.suggested_products = Vec::new();
            return Ok(detail);
        };

        let products = self.api.products.get_by_ids(&ids).await;
        if products.len() < ids.len() {
            warn!(
                conversation_id,
                requested = ids.len(),
                fetched = products.len(),
                "Some suggested products could not be loaded"
            );
            self.notifier.notify(Notification::error(
                "Product Fetch Error",
                "Failed to load product details",
            ));
        }
        self.suggested_products = products;
        Ok(detail)
    }

    pub async fn delete_conversation(&mut self, conversation_id: i64) -> Result<(), ApiError> {
        if let Err(err) = self.api.chat.delete_conversation(conversation_id).await {
            self.report("Delete Error", "Failed to delete conversation", &err);
            return Err(err);
        }

        self.history.retain(|summary| summary.id != conversation_id);
        if self.current_conversation_id == Some(conversation_id) {
            self.reset();
        }
        info!(conversation_id, "Conversation deleted");
        self.notifier
            .notify(Notification::success("Success", "Conversation deleted"));
        Ok(())
    }

    /// Create an empty conversation on the server and make it current.
    pub async fn create_conversation(
        &mut self,
        title: Option<&str>,
    ) -> Result<ConversationSummary, ApiError> {
        match self.api.chat.create_conversation(title).await {
            Ok(summary) => {
                self.history.insert(0, summary.clone());
                self.current_conversation_id = Some(summary.id);
                self.messages.clear();
                self.suggested_products = Vec::new();
                Ok(summary)
            }
            Err(err) => {
                self.report("Create Error", "Failed to create conversation", &err);
                Err(err)
            }
        }
    }

    /// Forget the open conversation locally. The next send starts a new one.
    pub fn start_new_conversation(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.messages.clear();
        self.current_conversation_id = None;
        self.suggested_products = Vec::new();
    }

    fn report(&self, title: &str, fallback: &str, err: &ApiError) {
        error!("{}: {}", title, err);
        self.notifier
            .notify(Notification::error(title, err.user_message(fallback)));
    }
}
