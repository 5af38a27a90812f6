use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Booking, Conversation, Notification, WalletBalance};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String },

    /// A new message was posted in a conversation
    MessageCreate {
        id: Uuid,
        conversation_id: Uuid,
        sender_id: Uuid,
        sender_name: String,
        receiver_id: Uuid,
        content: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A conversation's inbox entry changed (last message, unread count).
    /// Targeted at each participant.
    ConversationUpdate { conversation: Conversation },

    /// A notification was created for this user
    NotificationCreate { notification: Notification },

    /// A booking this user participates in changed status
    BookingUpdate { booking: Booking },

    /// A guide's wallet changed (earning credited, withdrawal state moved)
    WalletUpdate { balance: WalletBalance },
}

impl GatewayEvent {
    /// Returns the conversation_id if this event is scoped to a conversation.
    /// Events that return `None` are targeted per-user and never broadcast.
    pub fn conversation_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageCreate { conversation_id, .. } => Some(*conversation_id),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to message events for specific conversations. The server
    /// only forwards conversation-scoped events for subscribed conversations;
    /// targeted events (inbox updates, notifications) arrive regardless.
    Subscribe { conversation_ids: Vec<Uuid> },
}
