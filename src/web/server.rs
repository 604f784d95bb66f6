//! Axum server exposing the login relay and a health probe.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{FromRequest, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::relay::{LoginRelay, OTP_DIGITS};
use crate::models::account::CLAL_LENGTH;
use crate::{AppError, Result};

/// Path the game's login page posts to.
pub const LOGIN_PATH: &str = "/chuninewbot/login";

type Rejection = (StatusCode, &'static str);

fn bad_request(reason: &'static str) -> Rejection {
    (StatusCode::BAD_REQUEST, reason)
}

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Check a passcode/cookie pair, stripping an optional `clal=` prefix.
///
/// # Errors
///
/// Returns a `400` rejection naming the offending field.
pub fn validate_login(otp: &str, clal: &str) -> std::result::Result<String, Rejection> {
    let clal = clal.strip_prefix("clal=").unwrap_or(clal);
    if clal.chars().count() != CLAL_LENGTH {
        return Err(bad_request("Invalid cookie provided"));
    }
    if otp.len() != OTP_DIGITS || !otp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_request("Invalid passcode provided"));
    }
    Ok(clal.to_owned())
}

/// Media type of the request without parameters such as `charset`.
fn media_type(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
}

/// Pull `otp` and `clal` out of a JSON or urlencoded body.
async fn extract_params(request: Request) -> std::result::Result<(String, String), Rejection> {
    match media_type(&request).as_deref() {
        Some("application/json") => {
            let Json(body) = Json::<serde_json::Value>::from_request(request, &())
                .await
                .map_err(|_| bad_request("Invalid JSON body"))?;
            let (Some(otp), Some(clal)) = (body.get("otp"), body.get("clal")) else {
                return Err(bad_request("Missing parameters"));
            };
            match (otp.as_str(), clal.as_str()) {
                (Some(otp), Some(clal)) => Ok((otp.to_owned(), clal.to_owned())),
                _ => Err(bad_request("Invalid parameters")),
            }
        }
        Some("application/x-www-form-urlencoded") => {
            let Form(mut body) = Form::<HashMap<String, String>>::from_request(request, &())
                .await
                .map_err(|_| bad_request("Invalid form body"))?;
            match (body.remove("otp"), body.remove("clal")) {
                (Some(otp), Some(clal)) => Ok((otp, clal)),
                _ => Err(bad_request("Missing parameters")),
            }
        }
        _ => Err(bad_request("Invalid Content-Type")),
    }
}

/// Minimal HTML escaping for text interpolated into the success page.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn success_page(clal: &str) -> String {
    format!(
        "<h1>Success!</h1>\n\
         <p>Check your direct messages to see if the account has been successfully linked.</p>\n\
         <div>\n    <p>Your session cookie:</p>\n    <code>clal={}</code>\n</div>\n",
        escape_html(clal)
    )
}

/// Handler for `POST /chuninewbot/login`.
async fn login(State(relay): State<LoginRelay>, request: Request) -> Response {
    let (otp, clal) = match extract_params(request).await {
        Ok(params) => params,
        Err(rejection) => return rejection.into_response(),
    };
    let clal = match validate_login(&otp, &clal) {
        Ok(clal) => clal,
        Err(rejection) => return rejection.into_response(),
    };

    let page = success_page(&clal);
    if !relay.publish(&otp, clal).await {
        warn!("login callback for a passcode nobody is waiting on");
    }
    Html(page).into_response()
}

/// Build the relay router.
#[must_use]
pub fn router(relay: LoginRelay) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(LOGIN_PATH, post(login))
        .with_state(relay)
}

/// Serve the relay on `127.0.0.1:port` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the listener cannot bind.
pub async fn serve(relay: LoginRelay, port: u16, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Io(format!("failed to bind login relay on {bind}: {err}")))?;
    serve_on(listener, relay, ct).await
}

/// Serve the relay on an already-bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    relay: LoginRelay,
    ct: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "login relay listening");
    axum::serve(listener, router(relay))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("login relay failed: {err}")))?;
    info!("login relay stopped");
    Ok(())
}
