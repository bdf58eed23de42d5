//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes::{self, FullBody};
use crate::services::{
    CalendarService, DailyLogService, HabitService, IkigaiService, JournalService,
    TemplateService, UserService,
};
use crate::store::Stores;
use crate::tracking::{CompletionService, StreakReconciler};
use crate::types::{Result, TrackerError};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub stores: Stores,
    pub users: UserService,
    pub habits: HabitService,
    pub templates: TemplateService,
    pub daily_logs: DailyLogService,
    pub completions: Arc<CompletionService>,
    pub calendar: CalendarService,
    pub ikigai: IkigaiService,
    pub journal: JournalService,
}

impl AppState {
    /// Wire every service over the given stores
    pub fn new(args: Args, stores: Stores) -> Result<Self> {
        let jwt = if args.dev_mode && args.jwt_secret.is_none() {
            JwtValidator::new_dev()
        } else {
            let secret = args
                .jwt_secret
                .clone()
                .ok_or_else(|| TrackerError::Config("JWT secret not configured".into()))?;
            JwtValidator::new(secret, args.jwt_expiry_seconds)?
        };

        let streaks = Arc::new(StreakReconciler::new(stores.users.clone()));
        let completions = Arc::new(CompletionService::new(
            stores.habits.clone(),
            stores.completions.clone(),
            streaks,
        ));

        Ok(Self {
            users: UserService::new(stores.users.clone(), jwt),
            habits: HabitService::new(
                stores.habits.clone(),
                stores.daily_logs.clone(),
                stores.users.clone(),
                completions.clone(),
            ),
            templates: TemplateService::new(stores.templates.clone()),
            daily_logs: DailyLogService::new(stores.daily_logs.clone(), stores.habits.clone()),
            calendar: CalendarService::new(completions.clone()),
            ikigai: IkigaiService::new(stores.users.clone()),
            journal: JournalService::new(stores.journals.clone()),
            completions,
            stores,
            args,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Ikigai Habits listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - do not expose this instance publicly");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Log and route one incoming HTTP request
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, hyper::Error> {
    let request_id = uuid::Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    info!(%request_id, peer = %addr, "{} {}", method, path);

    let response = routes::dispatch(req, &state).await;

    debug!(
        %request_id,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{} {} done",
        method,
        path
    );

    Ok(response)
}
