//! Panic recovery for request handlers.
//!
//! A panicking handler becomes a 500 `ProblemDetails` response. In the
//! development environment the panic message is included in the body.

use std::any::Any;

use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{config::Environment, rest::ProblemDetails};

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}

fn developer_panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(&*payload);
    tracing::error!(panic = %message, "request handler panicked");
    ProblemDetails::internal_error(message).into_response()
}

fn production_panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(&*payload), "request handler panicked");
    ProblemDetails::internal_error("An unexpected error occurred").into_response()
}

/// Catch handler panics, exposing details only in development.
#[must_use]
pub fn catch_panic_layer(environment: Environment) -> CatchPanicLayer<PanicHandler> {
    let handler: PanicHandler = if environment.is_development() {
        developer_panic_response
    } else {
        production_panic_response
    };
    CatchPanicLayer::custom(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_str_and_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(&*payload), "kaboom");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
