//! Request boundary: one outcome record per request lifecycle.
//!
//! [`RequestLogLayer`] wraps the downstream handler as `tower` middleware.
//! Each request moves through a fixed sequence: capture entry data, await
//! the downstream service (the sole suspension point), classify the
//! outcome, emit exactly one router record, and hand the result back
//! unchanged. The boundary observes failures, it never swallows them: a
//! downstream error is logged and returned as-is to the caller.
//!
//! A request flow cancelled before the downstream handler settles emits
//! nothing: the emission sits strictly after the await, so dropping the
//! future skips it.
//!
//! | Outcome | Severity | Category |
//! |---------|----------|----------|
//! | status < 400   | info  | `ResponseSuccess` |
//! | 400..=499      | warn  | `ResponseWarning` |
//! | status >= 500  | error | `ResponseError`   |
//! | downstream err | error | `UnhandledError`  |

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::{Request, Response};
use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use tower::{Layer, Service};

use crate::config::severity::Severity;
use crate::config::Config;
use crate::router::Router;

/// Classification of a settled response by status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Status below 400.
    Success,
    /// Status 400 to 499.
    ClientError,
    /// Status 500 and above.
    ServerError,
}

impl RequestOutcome {
    /// Classifies an HTTP status code.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            0..=399 => RequestOutcome::Success,
            400..=499 => RequestOutcome::ClientError,
            _ => RequestOutcome::ServerError,
        }
    }

    /// Severity of the boundary record for this outcome.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            RequestOutcome::Success => Severity::Info,
            RequestOutcome::ClientError => Severity::Warn,
            RequestOutcome::ServerError => Severity::Error,
        }
    }

    /// Category of the boundary record for this outcome.
    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            RequestOutcome::Success => "ResponseSuccess",
            RequestOutcome::ClientError => "ResponseWarning",
            RequestOutcome::ServerError => "ResponseError",
        }
    }
}

/// Layer installing the request boundary around a service.
#[derive(Clone)]
pub struct RequestLogLayer {
    router: Arc<Router>,
    client_header: Arc<str>,
}

impl RequestLogLayer {
    #[must_use]
    pub fn new(router: Arc<Router>, config: &Config) -> Self {
        RequestLogLayer {
            router,
            client_header: Arc::from(config.client_header.as_str()),
        }
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog {
            inner,
            router: Arc::clone(&self.router),
            client_header: Arc::clone(&self.client_header),
        }
    }
}

/// The middleware service produced by [`RequestLogLayer`].
#[derive(Clone)]
pub struct RequestLog<S> {
    inner: S,
    router: Arc<Router>,
    client_header: Arc<str>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLog<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: fmt::Display + fmt::Debug,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // Take the ready inner service, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let router = Arc::clone(&self.router);

        let method = request.method().to_string();
        let url = request.uri().to_string();
        let client = request
            .headers()
            .get(self.client_header.as_ref())
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let start = Instant::now();

        Box::pin(async move {
            match inner.call(request).await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let outcome = RequestOutcome::from_status(status);
                    let mut payload = Map::new();
                    payload.insert(
                        "message".to_string(),
                        json!(format!("{method} {url} - {status}")),
                    );
                    payload.insert("method".to_string(), json!(method));
                    payload.insert("url".to_string(), json!(url));
                    payload.insert("status".to_string(), json!(status));
                    payload.insert("duration_ms".to_string(), elapsed_ms(start));
                    payload.insert("client".to_string(), json!(client));
                    router.log(outcome.severity(), outcome.category(), payload);
                    Ok(response)
                }
                Err(error) => {
                    let mut payload = Map::new();
                    payload.insert("error".to_string(), json!(error.to_string()));
                    payload.insert("stack".to_string(), json!(format!("{error:?}")));
                    payload.insert("url".to_string(), json!(url));
                    payload.insert("method".to_string(), json!(method));
                    payload.insert("duration_ms".to_string(), elapsed_ms(start));
                    payload.insert("client".to_string(), json!(client));
                    router.log(Severity::Error, "UnhandledError", payload);
                    Err(error)
                }
            }
        })
    }
}

fn elapsed_ms(start: Instant) -> Value {
    json!(start.elapsed().as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification_boundaries() {
        assert_eq!(RequestOutcome::from_status(200), RequestOutcome::Success);
        assert_eq!(RequestOutcome::from_status(302), RequestOutcome::Success);
        assert_eq!(RequestOutcome::from_status(399), RequestOutcome::Success);
        assert_eq!(RequestOutcome::from_status(400), RequestOutcome::ClientError);
        assert_eq!(RequestOutcome::from_status(404), RequestOutcome::ClientError);
        assert_eq!(RequestOutcome::from_status(499), RequestOutcome::ClientError);
        assert_eq!(RequestOutcome::from_status(500), RequestOutcome::ServerError);
        assert_eq!(RequestOutcome::from_status(503), RequestOutcome::ServerError);
    }

    #[test]
    fn test_outcome_severity_and_category() {
        assert_eq!(RequestOutcome::Success.severity(), Severity::Info);
        assert_eq!(RequestOutcome::Success.category(), "ResponseSuccess");
        assert_eq!(RequestOutcome::ClientError.severity(), Severity::Warn);
        assert_eq!(RequestOutcome::ClientError.category(), "ResponseWarning");
        assert_eq!(RequestOutcome::ServerError.severity(), Severity::Error);
        assert_eq!(RequestOutcome::ServerError.category(), "ResponseError");
    }
}
