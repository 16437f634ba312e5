//! Service endpoint: the subscribe/decode/dispatch/reply loop.
//!
//! Each backend service exposes its operations over the bus with the same
//! contract a direct HTTP call would use, so the gateway does not care
//! where the service actually runs. [`EndpointRouter`] maps exact
//! `(verb, path)` pairs to handlers and is validated at construction;
//! [`ServiceEndpoint`] binds the router to a request topic and answers
//! every inbound message exactly once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use courier_core::{CoreError, ReplyEnvelope, RequestEnvelope, Verb};

use crate::client::{BusClient, BusError, Delivery, Subscription};

/// Pre-serialized generic failure, for the one corner where building a
/// reply can itself fail. Keeping it constant means the reply slot is
/// never left empty.
const GENERIC_FAILURE: &[u8] = br#"{"status":500,"data":{"error":"Internal server error"}}"#;

/// A request handler.
///
/// Handlers express business outcomes (400 on a duplicate, 404 on a
/// missing record) in the returned envelope; `Err` is reserved for
/// unexpected failure and becomes a generic 500 at the endpoint boundary.
/// Handlers run concurrently and must tolerate arbitrary interleaving.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, envelope: RequestEnvelope) -> BoxFuture<'static, Result<ReplyEnvelope, CoreError>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ReplyEnvelope, CoreError>> + Send + 'static,
{
    fn call(&self, envelope: RequestEnvelope) -> BoxFuture<'static, Result<ReplyEnvelope, CoreError>> {
        Box::pin(self(envelope))
    }
}

/// Exact-match `(verb, path)` routing table.
///
/// Registration happens once at startup; a duplicate registration is a
/// programming error and panics immediately rather than shadowing a route
/// at request time.
#[derive(Default)]
pub struct EndpointRouter {
    routes: HashMap<(Verb, String), Arc<dyn Handler>>,
}

impl EndpointRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an exact `(verb, path)` pair.
    ///
    /// # Panics
    ///
    /// Panics if the pair is already registered.
    pub fn route(mut self, verb: Verb, path: &str, handler: impl Handler) -> Self {
        let replaced = self
            .routes
            .insert((verb, path.to_string()), Arc::new(handler));
        assert!(
            replaced.is_none(),
            "duplicate handler registered for {verb} {path}"
        );
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch one envelope to its handler.
    ///
    /// Unknown pairs get a 404 reply; a failing handler gets a generic 500
    /// with the true cause logged locally, never sent to the caller.
    pub async fn dispatch(&self, envelope: RequestEnvelope) -> ReplyEnvelope {
        let key = (envelope.method, envelope.path.clone());
        let Some(handler) = self.routes.get(&key) else {
            tracing::debug!(verb = %envelope.method, path = %envelope.path, "no handler registered");
            return ReplyEnvelope::not_found();
        };

        match handler.call(envelope).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(verb = %key.0, path = %key.1, error = %e, "handler failed");
                ReplyEnvelope::internal_error()
            }
        }
    }
}

/// A service endpoint bound to its request topic.
///
/// `bind` subscribes immediately — the subscription exists before `run` is
/// spawned, so no request published after `bind` returns can be missed.
/// The subscription lives for the life of the process; there is exactly
/// one per topic per service instance.
pub struct ServiceEndpoint {
    subscription: Subscription,
    router: Arc<EndpointRouter>,
}

impl ServiceEndpoint {
    pub async fn bind(
        bus: &dyn BusClient,
        topic: &str,
        router: EndpointRouter,
    ) -> Result<Self, BusError> {
        let subscription = bus.subscribe(topic).await?;
        tracing::info!(topic, routes = router.len(), "service endpoint listening");
        Ok(Self {
            subscription,
            router: Arc::new(router),
        })
    }

    /// Consume the subscription until the bus closes.
    ///
    /// Every delivery is handled on its own task, so a slow handler never
    /// blocks receipt of the next message and requests on the same topic
    /// interleave freely.
    pub async fn run(mut self) {
        while let Some(delivery) = self.subscription.next().await {
            tokio::spawn(answer(Arc::clone(&self.router), delivery));
        }
        tracing::info!(topic = %self.subscription.topic(), "bus closed, service endpoint stopping");
    }
}

/// Produce exactly one reply for one delivery.
///
/// Decode failure, handler error, and handler panic all collapse to the
/// generic 500 — the failure is logged here and nothing internal crosses
/// the bus.
async fn answer(router: Arc<EndpointRouter>, delivery: Delivery) {
    let Delivery { payload, replier } = delivery;

    // The dispatch runs on its own task so a panicking handler is caught
    // at the join, and the reply slot is still honored.
    let dispatch = tokio::spawn(async move {
        match serde_json::from_slice::<RequestEnvelope>(&payload) {
            Ok(envelope) => router.dispatch(envelope).await,
            Err(e) => {
                tracing::error!(error = %e, "failed to decode request envelope");
                ReplyEnvelope::internal_error()
            }
        }
    });

    let reply = match dispatch.await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "request handler panicked");
            ReplyEnvelope::internal_error()
        }
    };

    let Some(replier) = replier else {
        tracing::warn!("request delivery carried no reply handle; dropping reply");
        return;
    };

    let bytes = serde_json::to_vec(&reply).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to encode reply envelope");
        GENERIC_FAILURE.to_vec()
    });
    replier.reply(bytes).await;
}
