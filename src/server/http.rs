//! HTTP server implementation
//!
//! hyper http1 accept loop; each connection is served on its own task and
//! every request goes through [`routes::dispatch`].

use chrono::{DateTime, Utc};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::CivicStore;
use crate::routes;
use crate::types::CivicError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn CivicStore>,
    pub jwt: JwtValidator,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build state over a store; dev mode without `JWT_SECRET` uses a fixed dev secret
    pub fn new(args: Args, store: Arc<dyn CivicStore>) -> Result<Self, CivicError> {
        let jwt = match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            (None, true) => {
                warn!("JWT_SECRET not set, using the insecure development secret");
                JwtValidator::new_dev(args.jwt_expiry_seconds)
            }
            (None, false) => {
                return Err(CivicError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };

        Ok(Self {
            args,
            store,
            jwt,
            started_at: Utc::now(),
        })
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), CivicError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "civicconnect listening on {} as node {} ({} store)",
        state.args.listen,
        state.args.node_id,
        state.store.backend()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move {
                            Ok::<_, Infallible>(routes::dispatch(&state, addr, req).await)
                        }
                    });

                    if let Err(err) = http1::Builder::new()
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
