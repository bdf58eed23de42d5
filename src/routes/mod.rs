//! HTTP routes for the habit tracker
//!
//! `dispatch` buffers the request body (bounded by `MAX_BODY_BYTES`) and hands
//! a `Request<Bytes>` to the handler owning the path prefix. Every handler
//! module exposes `handle_*_request`, returning `None` for paths it does not
//! serve.

pub mod admin;
pub mod auth_routes;
pub mod calendar;
pub mod completions;
pub mod daily_logs;
pub mod habits;
pub mod health;
pub mod helpers;
pub mod ikigai;
pub mod journal;
pub mod users;

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};

use crate::server::AppState;

pub use helpers::{error_response, json_response, ErrorResponse, FullBody};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Route one request. Generic over the body so tests can drive it with `Full<Bytes>`.
pub async fn dispatch<B>(req: Request<B>, state: &AppState) -> Response<FullBody>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<BoxError>,
{
    if req.method() == Method::OPTIONS {
        return helpers::cors_preflight();
    }

    let (parts, body) = req.into_parts();
    let bytes = match Limited::new(body, state.args.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => {
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
                Some("BODY_TOO_LARGE"),
            );
        }
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read body: {}", e),
                Some("INVALID_INPUT"),
            );
        }
    };
    let req = Request::from_parts(parts, bytes);

    let path = req.uri().path().to_string();
    let handled = match helpers::path_segments(&path).first().copied() {
        Some("health") | None => health::handle_health_request(&req, state),
        Some("auth") => auth_routes::handle_auth_request(&req, state).await,
        Some("user") => users::handle_user_request(&req, state).await,
        Some("habits") => habits::handle_habits_request(&req, state).await,
        Some("daily-logs") => daily_logs::handle_daily_logs_request(&req, state).await,
        Some("daily-completions") => {
            completions::handle_completions_request(&req, state).await
        }
        Some("calendar") => calendar::handle_calendar_request(&req, state).await,
        Some("ikigai") => ikigai::handle_ikigai_request(&req, state).await,
        Some("journal") => journal::handle_journal_request(&req, state).await,
        Some("admin") => admin::handle_admin_request(&req, state).await,
        Some(_) => None,
    };

    handled.unwrap_or_else(|| helpers::not_found_response(&path))
}
