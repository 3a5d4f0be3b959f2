//! # Router
//!
//! In-process dispatcher for calls, registrations, subscriptions and
//! publications. The router itself makes no trust decisions: every inbound
//! message goes through the [`Authorizer`] first, and every publication is
//! checked per subscriber by a [`PublishFilter`] at delivery time.
//!
//! ```text
//!  session ──message──→ Authorizer ──allow──→ Router ──invoke──→ callee
//!                           │                   │
//!                         deny               publish
//!                           ↓                   ↓
//!                    InvokeResult     PublishFilter (per subscriber)
//! ```
//!
//! Authorization and handler execution race against the session's
//! disconnect signal, so a vanished session never leaves a task waiting on
//! the permission store.

use crate::envelope::{codes, InvokeResult};
use crate::messages::{
    BusMessage, Call, Cancel, Event, Invocation, Publish, Register, Subscribe, SubscriptionId,
    Unsubscribe,
};
use crate::session::{Session, SessionHandle, SessionRole};
use crate::subscriber::{Subscriber, SubscriberTable, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use shared_types::{Dict, IdGenerator, RegistrationId, RequestId, SessionId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

/// Decides whether an inbound message may proceed.
///
/// Implementations may mutate the message (e.g. consume arguments or write
/// into the call's option bag). A denial is returned as the envelope the
/// sender receives.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, session: &Session, message: &mut BusMessage)
        -> Result<(), InvokeResult>;
}

/// Per-subscriber delivery decision for one publication.
#[async_trait]
pub trait PublishFilter: Send + Sync {
    async fn allowed(&self, session: &Session) -> bool;
}

/// Builds the [`PublishFilter`] for a publication.
pub trait PublishFilterFactory: Send + Sync {
    fn publish_filter(&self, publish: &Publish) -> Arc<dyn PublishFilter>;
}

/// Callee-side procedure implementation.
#[async_trait]
pub trait InvocationHandler: Send + Sync {
    async fn invoke(&self, invocation: Invocation) -> InvokeResult;
}

/// Adapter turning an async closure into an [`InvocationHandler`].
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure as an [`InvocationHandler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = InvokeResult> + Send,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> InvocationHandler for HandlerFn<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = InvokeResult> + Send,
{
    async fn invoke(&self, invocation: Invocation) -> InvokeResult {
        (self.f)(invocation).await
    }
}

/// Authorizer that lets everything through. Useful for tests and trusted
/// internal realms.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _: &Session, _: &mut BusMessage) -> Result<(), InvokeResult> {
        Ok(())
    }
}

#[async_trait]
impl PublishFilter for AllowAll {
    async fn allowed(&self, _: &Session) -> bool {
        true
    }
}

impl PublishFilterFactory for AllowAll {
    fn publish_filter(&self, _: &Publish) -> Arc<dyn PublishFilter> {
        Arc::new(AllowAll)
    }
}

struct Registration {
    id: RegistrationId,
    session: SessionId,
    handler: Arc<dyn InvocationHandler>,
}

/// The in-process router.
pub struct Router {
    authorizer: Arc<dyn Authorizer>,
    filters: Arc<dyn PublishFilterFactory>,
    ids: IdGenerator,
    registrations: DashMap<String, Registration>,
    subscriptions: SubscriberTable,
    in_flight: DashMap<(SessionId, RequestId), Arc<Notify>>,
    capacity: usize,
}

impl Router {
    /// Create a router with the default per-subscriber buffer.
    pub fn new(authorizer: Arc<dyn Authorizer>, filters: Arc<dyn PublishFilterFactory>) -> Self {
        Self::with_capacity(authorizer, filters, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a router buffering up to `capacity` events per subscriber.
    pub fn with_capacity(
        authorizer: Arc<dyn Authorizer>,
        filters: Arc<dyn PublishFilterFactory>,
        capacity: usize,
    ) -> Self {
        Self {
            authorizer,
            filters,
            ids: IdGenerator::new(),
            registrations: DashMap::new(),
            subscriptions: Arc::new(DashMap::new()),
            in_flight: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Attach a new session. Role and details come from authentication.
    pub fn open_session(&self, role: SessionRole, details: Dict) -> (Session, SessionHandle) {
        let id = SessionId(self.ids.next());
        debug!(session_id = %id, role = %role, "Session opened");
        Session::open(id, role, details)
    }

    /// Remove everything a session registered or subscribed. Returns the
    /// procedures it had registered.
    pub fn leave(&self, session: &Session) -> Vec<String> {
        let id = session.id();
        let mut procedures = Vec::new();
        self.registrations.retain(|procedure, r| {
            let owned = r.session == id;
            if owned {
                procedures.push(procedure.clone());
            }
            !owned
        });
        for mut entry in self.subscriptions.iter_mut() {
            entry.value_mut().retain(|s| s.session.id() != id);
        }
        self.subscriptions.retain(|_, subs| !subs.is_empty());
        self.in_flight.retain(|(session_id, _), _| *session_id != id);
        debug!(session_id = %id, procedures = procedures.len(), "Session left");
        procedures
    }

    async fn authorize(
        &self,
        session: &Session,
        message: &mut BusMessage,
    ) -> Result<(), InvokeResult> {
        let kind = message.kind();
        let outcome = tokio::select! {
            biased;
            _ = session.closed() => Err(InvokeResult::error(codes::CANCELED)),
            res = self.authorizer.authorize(session, message) => res,
        };

        if let Err(denied) = &outcome {
            debug!(
                session_id = %session.id(),
                kind = %kind,
                error = ?denied.error,
                "Message denied"
            );
        }
        outcome
    }

    /// Register `handler` for a procedure.
    pub async fn register(
        &self,
        session: &Session,
        register: Register,
        handler: Arc<dyn InvocationHandler>,
    ) -> Result<RegistrationId, InvokeResult> {
        let mut message = BusMessage::Register(register);
        self.authorize(session, &mut message).await?;
        let BusMessage::Register(register) = message else {
            return Err(InvokeResult::error(codes::INTERNAL));
        };

        match self.registrations.entry(register.procedure.clone()) {
            Entry::Occupied(_) => Err(InvokeResult::error_with_args(
                codes::PROCEDURE_ALREADY_EXISTS,
                vec![register.procedure.into()],
            )),
            Entry::Vacant(slot) => {
                let id = RegistrationId(self.ids.next());
                slot.insert(Registration {
                    id,
                    session: session.id(),
                    handler,
                });
                debug!(procedure = %register.procedure, registration_id = %id, "Procedure registered");
                Ok(id)
            }
        }
    }

    /// Route a call to its callee and wait for the result.
    pub async fn call(&self, session: &Session, call: Call) -> InvokeResult {
        let request = call.request;
        let mut message = BusMessage::Call(call);
        if let Err(denied) = self.authorize(session, &mut message).await {
            return denied;
        }
        let BusMessage::Call(call) = message else {
            return InvokeResult::error(codes::INTERNAL);
        };

        let target = self
            .registrations
            .get(&call.procedure)
            .map(|r| (r.id, Arc::clone(&r.handler)));
        let Some((registration, handler)) = target else {
            return InvokeResult::error_with_args(
                codes::NO_SUCH_PROCEDURE,
                vec![call.procedure.into()],
            );
        };

        let invocation = Invocation {
            request,
            registration,
            caller: session.id(),
            details: call.options,
            arguments: call.arguments,
            arguments_kw: call.arguments_kw,
        };

        let key = (session.id(), request);
        let cancel = Arc::new(Notify::new());
        self.in_flight.insert(key, Arc::clone(&cancel));

        let result = tokio::select! {
            res = handler.invoke(invocation) => res,
            _ = cancel.notified() => InvokeResult::error(codes::CANCELED),
            _ = session.closed() => InvokeResult::error(codes::CANCELED),
        };

        self.in_flight.remove(&key);
        result
    }

    /// Cancel one of the session's in-flight calls.
    ///
    /// Returns whether a matching call was found.
    pub async fn cancel(&self, session: &Session, cancel: Cancel) -> Result<bool, InvokeResult> {
        let mut message = BusMessage::Cancel(cancel);
        self.authorize(session, &mut message).await?;
        let BusMessage::Cancel(cancel) = message else {
            return Err(InvokeResult::error(codes::INTERNAL));
        };

        match self.in_flight.get(&(session.id(), cancel.request)) {
            Some(notify) => {
                notify.notify_one();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Subscribe a session to a topic.
    pub async fn subscribe(
        &self,
        session: &Session,
        subscribe: Subscribe,
    ) -> Result<Subscription, InvokeResult> {
        let mut message = BusMessage::Subscribe(subscribe);
        self.authorize(session, &mut message).await?;
        let BusMessage::Subscribe(subscribe) = message else {
            return Err(InvokeResult::error(codes::INTERNAL));
        };

        let id = SubscriptionId(self.ids.next());
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.subscriptions
            .entry(subscribe.topic.clone())
            .or_default()
            .push(Subscriber {
                id,
                session: session.clone(),
                sender,
            });

        debug!(topic = %subscribe.topic, subscription = %id, session_id = %session.id(), "New subscription created");
        Ok(Subscription::new(
            id,
            subscribe.topic,
            receiver,
            Arc::clone(&self.subscriptions),
        ))
    }

    /// Remove one of the session's subscriptions.
    pub async fn unsubscribe(
        &self,
        session: &Session,
        unsubscribe: Unsubscribe,
    ) -> Result<(), InvokeResult> {
        let mut message = BusMessage::Unsubscribe(unsubscribe);
        self.authorize(session, &mut message).await?;
        let BusMessage::Unsubscribe(unsubscribe) = message else {
            return Err(InvokeResult::error(codes::INTERNAL));
        };

        let mut found = false;
        for mut entry in self.subscriptions.iter_mut() {
            let before = entry.value().len();
            entry
                .value_mut()
                .retain(|s| !(s.id == unsubscribe.subscription && s.session.id() == session.id()));
            found |= entry.value().len() != before;
        }
        self.subscriptions.retain(|_, subs| !subs.is_empty());

        if found {
            Ok(())
        } else {
            Err(InvokeResult::error(codes::NO_SUCH_SUBSCRIPTION))
        }
    }

    /// Publish an event.
    ///
    /// Delivery is decided independently for every subscriber of the topic
    /// (except the publisher itself). Returns the number of subscribers the
    /// event was delivered to.
    pub async fn publish(&self, session: &Session, publish: Publish) -> Result<usize, InvokeResult> {
        let mut message = BusMessage::Publish(publish);
        self.authorize(session, &mut message).await?;
        let BusMessage::Publish(publish) = message else {
            return Err(InvokeResult::error(codes::INTERNAL));
        };

        let candidates: Vec<Subscriber> = self
            .subscriptions
            .get(&publish.topic)
            .map(|subs| {
                subs.iter()
                    .filter(|s| s.session.id() != session.id() && !s.session.is_closed())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if candidates.is_empty() {
            debug!(topic = %publish.topic, "Event dropped (no receivers)");
            return Ok(0);
        }

        let filter = self.filters.publish_filter(&publish);
        let decisions = join_all(candidates.iter().map(|s| filter.allowed(&s.session))).await;

        let mut delivered = 0;
        for (subscriber, allowed) in candidates.into_iter().zip(decisions) {
            if !allowed {
                debug!(
                    topic = %publish.topic,
                    session_id = %subscriber.session.id(),
                    "Event withheld from subscriber"
                );
                continue;
            }

            let event = Event {
                subscription: subscriber.id,
                publication: publish.request,
                topic: publish.topic.clone(),
                arguments: publish.arguments.clone(),
                arguments_kw: publish.arguments_kw.clone(),
            };
            match subscriber.sender.try_send(event) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    topic = %publish.topic,
                    session_id = %subscriber.session.id(),
                    error = %e,
                    "Event dropped (subscriber buffer)"
                ),
            }
        }

        debug!(topic = %publish.topic, receivers = delivered, "Event published");
        Ok(delivered)
    }

    /// Number of live subscriptions on a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions.get(topic).map_or(0, |subs| subs.len())
    }

    /// Whether a procedure currently has a callee.
    #[must_use]
    pub fn is_registered(&self, procedure: &str) -> bool {
        self.registrations.contains_key(procedure)
    }
}
