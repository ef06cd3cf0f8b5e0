//! Shared fixtures for unit tests.

use serde_json::{Value, json};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    client::observer::SessionObserver,
    notify::{Notification, Notifier},
};

pub fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Counts `session_expired` signals.
#[derive(Debug, Default)]
pub struct CountingSessionObserver {
    expired: AtomicUsize,
}

impl CountingSessionObserver {
    pub fn count(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }
}

impl SessionObserver for CountingSessionObserver {
    fn session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

pub fn product_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "partNumber": format!("PN-{id:04}"),
        "brand": "Brembo",
        "description": "OEM quality replacement",
        "images": [],
        "price": 49.99,
        "shippingCost": 5.0,
        "estimatedShipping": "2-3 days",
        "stock": 12,
        "availability": "in-stock",
        "compatibleModels": ["Golf VII"],
        "validatedByManufacturer": false,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

pub fn conversation_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "userId": 1,
        "title": title,
        "lastMessageAt": "2024-01-01T10:00:00Z",
        "createdAt": "2024-01-01T09:00:00Z"
    })
}

pub fn message_json(
    id: i64,
    conversation_id: i64,
    role: &str,
    content: &str,
    product_ids: Option<Vec<i64>>,
) -> Value {
    let mut message = json!({
        "id": id,
        "conversationId": conversation_id,
        "role": role,
        "content": content,
        "timestamp": "2024-01-01T10:00:00Z"
    });
    if let Some(ids) = product_ids {
        message["metadata"] = json!({ "searchType": "semantic", "productIds": ids });
    }
    message
}
