//! Events that drive an exchange

use crate::responder::ResponderError;
use crate::store::MessageId;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        /// Id the store allocated for the new user message
        message_id: MessageId,
        text: String,
    },
    Cancel,

    // Responder events
    ResponseReady {
        reply_to: MessageId,
        text: String,
    },
    ResponseFailed {
        reply_to: MessageId,
        error: ResponderError,
    },
}
