//! # Wire models
//!
//! Typed records exchanged with the backend REST API.
//!
//! Every struct here maps one JSON shape of the `/api` surface. Field names
//! are camelCase on the wire (`#[serde(rename_all = "camelCase")]`) and
//! timestamps are RFC 3339 strings decoded into [`chrono::DateTime<Utc>`].
//!
//! The records fall into three groups:
//!
//! - Catalog: [`Product`], [`ProductDraft`], [`ProductPatch`], [`SearchParams`],
//!   [`ProductPage`], [`FilterOptions`].
//! - Chat: [`ChatMessage`], [`MessageMetadata`], [`ConversationSummary`],
//!   [`ConversationDetail`], [`SendMessageRequest`], [`SendMessageResponse`],
//!   [`ConversationPage`].
//! - Account: [`AuthTokens`], [`AuthResponse`], [`Profile`], [`ProfileUpdate`],
//!   [`AvatarResponse`].
//!
//! ```
//! use parts_scout::models::{Availability, ChatMessage};
//!
//! let message: ChatMessage = serde_json::from_str(r#"{
//!     "id": 7,
//!     "conversationId": 3,
//!     "role": "assistant",
//!     "content": "Try these brake pads.",
//!     "timestamp": "2024-05-01T10:00:00Z",
//!     "metadata": { "searchType": "semantic", "productIds": [11, 12] }
//! }"#).unwrap();
//!
//! assert_eq!(message.product_ids(), Some(&[11, 12][..]));
//! assert_eq!(serde_json::to_string(&Availability::OutOfStock).unwrap(), "\"out-of-stock\"");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

/// Stock availability of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    InStock,
    Limited,
    OutOfStock,
    /// Any value this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Availability::InStock => "in-stock",
            Availability::Limited => "limited",
            Availability::OutOfStock => "out-of-stock",
            Availability::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A spare part in the catalog.
///
/// `id`, `created_at` and `updated_at` are assigned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub part_number: String,
    pub brand: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    #[serde(default)]
    pub estimated_shipping: String,
    #[serde(default)]
    pub stock: i64,
    pub availability: Availability,
    #[serde(default)]
    pub compatible_models: BTreeSet<String>,
    #[serde(default)]
    pub validated_by_manufacturer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchasing_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for `POST /products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub part_number: String,
    pub brand: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    #[serde(default)]
    pub estimated_shipping: String,
    #[serde(default)]
    pub stock: i64,
    pub availability: Availability,
    #[serde(default)]
    pub compatible_models: BTreeSet<String>,
    #[serde(default)]
    pub validated_by_manufacturer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_country: Option<String>,
}

/// Partial update for `PUT /products/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_shipping: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_models: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_by_manufacturer: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<String>>,
}

/// Body of `POST /products/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_by_part_number: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

/// Response of `GET /products` and `POST /products/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: PagePagination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
}

/// Response of `GET /products/filters/all`: the values the search filters accept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub availability: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default)]
    pub search_type: Option<String>,
    /// Products the assistant recommended in this message.
    #[serde(default)]
    pub product_ids: Option<Vec<i64>>,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    /// Product ids referenced by this message, if it carries any.
    pub fn product_ids(&self) -> Option<&[i64]> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.product_ids.as_deref())
    }
}

/// History-list entry for a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub title: String,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
}

/// Response of `GET /chat/conversations/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub summary: ConversationSummary,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

/// Response of `GET /chat/conversations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPage {
    pub conversations: Vec<ConversationSummary>,
    #[serde(default)]
    pub pagination: OffsetPagination,
}

/// Body of `POST /chat/message`. `conversation_id` is sent as `null` to start
/// a new conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    pub search_by_part_number: bool,
    pub conversation_id: Option<i64>,
}

/// Response of `POST /chat/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub conversation_id: i64,
    #[serde(default)]
    pub conversation: Option<ConversationSummary>,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    #[serde(default)]
    pub suggested_products: Option<Vec<Product>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: String,
}

/// An issued access/refresh token pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Response of login and registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: AuthTokens,
    #[serde(default)]
    pub user: Option<Profile>,
}

/// The signed-in user's account details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Body of `PUT /profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_decodes_with_optional_fields_missing() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "name": "Brake Pad Set",
            "partNumber": "BP-2024-FR",
            "brand": "Brembo",
            "price": 89.99,
            "availability": "limited",
            "compatibleModels": ["Golf VII", "A3", "Golf VII"],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(product.availability, Availability::Limited);
        assert_eq!(product.compatible_models.len(), 2);
        assert!(product.images.is_empty());
        assert!(!product.validated_by_manufacturer);
    }

    #[test]
    fn test_unknown_availability_is_tolerated() {
        let value: Availability = serde_json::from_value(json!("backorder")).unwrap();
        assert_eq!(value, Availability::Unknown);
    }

    #[test]
    fn test_send_request_serializes_null_conversation() {
        let body = serde_json::to_value(SendMessageRequest {
            message: "front brake pads for a 2015 Golf".into(),
            search_by_part_number: false,
            conversation_id: None,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "message": "front brake pads for a 2015 Golf",
                "searchByPartNumber": false,
                "conversationId": null
            })
        );
    }

    #[test]
    fn test_conversation_detail_flattens_summary() {
        let detail: ConversationDetail = serde_json::from_value(json!({
            "id": 4,
            "userId": 9,
            "title": "Golf brakes",
            "lastMessageAt": "2024-01-01T00:00:00Z",
            "createdAt": "2024-01-01T00:00:00Z",
            "messages": []
        }))
        .unwrap();
        assert_eq!(detail.summary.id, 4);
        assert_eq!(detail.summary.user_id, Some(9));
        assert!(detail.messages.is_empty());
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = ProductPatch {
            price: Some(10.5),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "price": 10.5 }));
        assert!(ProductPatch::default().is_empty());
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_auth_tokens_debug_is_redacted() {
        let tokens = AuthTokens {
            access_token: "secret-a".into(),
            refresh_token: "secret-r".into(),
        };
        let printed = format!("{tokens:?}");
        assert!(!printed.contains("secret"));
    }
}
