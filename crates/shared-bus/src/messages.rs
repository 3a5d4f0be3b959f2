//! # Bus Messages
//!
//! Messages a session sends to the router, plus the two messages the router
//! sends back out (`Invocation` to a callee, `Event` to a subscriber).

use serde::{Deserialize, Serialize};
use shared_types::{Dict, List, RegistrationId, RequestId, SessionId};
use std::fmt;

/// Id of a topic subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote procedure call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Call {
    pub request: RequestId,
    pub procedure: String,
    /// Per-call option bag. Owned by this call only.
    pub options: Dict,
    pub arguments: List,
    pub arguments_kw: Dict,
}

/// Topic subscription request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subscribe {
    pub request: RequestId,
    pub topic: String,
    pub options: Dict,
}

/// Event broadcast. Its option bag may carry delivery constraints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Publish {
    pub request: RequestId,
    pub topic: String,
    pub options: Dict,
    pub arguments: List,
    pub arguments_kw: Dict,
}

/// Procedure registration by a callee.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Register {
    pub request: RequestId,
    pub procedure: String,
    pub options: Dict,
}

/// Cancellation of an in-flight call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cancel {
    pub request: RequestId,
    pub options: Dict,
}

/// Removal of a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Unsubscribe {
    pub request: RequestId,
    pub subscription: SubscriptionId,
}

/// Classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Call(Call),
    Subscribe(Subscribe),
    Publish(Publish),
    Register(Register),
    Cancel(Cancel),
    Unsubscribe(Unsubscribe),
    /// Anything the gate does not know how to classify.
    Other { name: String },
}

/// Discriminant of a [`BusMessage`], used for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Call,
    Subscribe,
    Publish,
    Register,
    Cancel,
    Unsubscribe,
    Other,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Call => "call",
            MessageKind::Subscribe => "subscribe",
            MessageKind::Publish => "publish",
            MessageKind::Register => "register",
            MessageKind::Cancel => "cancel",
            MessageKind::Unsubscribe => "unsubscribe",
            MessageKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl BusMessage {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            BusMessage::Call(_) => MessageKind::Call,
            BusMessage::Subscribe(_) => MessageKind::Subscribe,
            BusMessage::Publish(_) => MessageKind::Publish,
            BusMessage::Register(_) => MessageKind::Register,
            BusMessage::Cancel(_) => MessageKind::Cancel,
            BusMessage::Unsubscribe(_) => MessageKind::Unsubscribe,
            BusMessage::Other { .. } => MessageKind::Other,
        }
    }

    /// Request id, if the message carries one.
    #[must_use]
    pub fn request(&self) -> Option<RequestId> {
        match self {
            BusMessage::Call(m) => Some(m.request),
            BusMessage::Subscribe(m) => Some(m.request),
            BusMessage::Publish(m) => Some(m.request),
            BusMessage::Register(m) => Some(m.request),
            BusMessage::Cancel(m) => Some(m.request),
            BusMessage::Unsubscribe(m) => Some(m.request),
            BusMessage::Other { .. } => None,
        }
    }

    /// Procedure or topic the message addresses, if any.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match self {
            BusMessage::Call(m) => Some(&m.procedure),
            BusMessage::Register(m) => Some(&m.procedure),
            BusMessage::Subscribe(m) => Some(&m.topic),
            BusMessage::Publish(m) => Some(&m.topic),
            _ => None,
        }
    }
}

/// Call forwarded by the router to the registered callee.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub request: RequestId,
    pub registration: RegistrationId,
    pub caller: SessionId,
    /// The call's option bag, including identity written by the gate.
    pub details: Dict,
    pub arguments: List,
    pub arguments_kw: Dict,
}

/// Publication delivered to one subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub subscription: SubscriptionId,
    pub publication: RequestId,
    pub topic: String,
    pub arguments: List,
    pub arguments_kw: Dict,
}
