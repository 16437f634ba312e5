//! Wiring of the auth handlers onto the bus.

use std::sync::Arc;

use courier_bus::{BusClient, BusError, EndpointRouter, ServiceEndpoint};
use courier_core::{topics, RequestEnvelope, Verb};

use crate::handlers::AuthService;

/// The auth service's routing table.
///
/// Registered once at startup; a duplicate registration panics there, not
/// at request time.
pub fn router(service: Arc<AuthService>) -> EndpointRouter {
    let register = {
        let service = Arc::clone(&service);
        move |req: RequestEnvelope| {
            let service = Arc::clone(&service);
            async move { service.register(req.body).await }
        }
    };
    let login = {
        let service = Arc::clone(&service);
        move |req: RequestEnvelope| {
            let service = Arc::clone(&service);
            async move { service.login(req.body).await }
        }
    };
    let profile = {
        let service = Arc::clone(&service);
        move |req: RequestEnvelope| {
            let service = Arc::clone(&service);
            async move { service.profile(req).await }
        }
    };

    EndpointRouter::new()
        .route(Verb::Post, "/register", register)
        .route(Verb::Post, "/login", login)
        .route(Verb::Get, "/me", profile)
}

/// Bind the auth service to its request topic.
///
/// The returned endpoint is ready to `run`; the subscription already
/// exists, so requests published from this point on are not missed.
pub async fn endpoint(
    bus: &dyn BusClient,
    service: Arc<AuthService>,
) -> Result<ServiceEndpoint, BusError> {
    ServiceEndpoint::bind(bus, topics::AUTH_REQUEST, router(service)).await
}
