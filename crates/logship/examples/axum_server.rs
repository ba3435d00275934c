//! Example: a small axum server wired through the logging pipeline.
//!
//! Run with `cargo run --example axum_server`, then hit the routes:
//!
//! ```text
//! curl http://127.0.0.1:3000/hello          # ResponseSuccess, info
//! curl http://127.0.0.1:3000/nope           # ResponseWarning, warn
//! curl http://127.0.0.1:3000/unavailable    # ResponseError, error
//! ```
//!
//! With `LOGSHIP_ENV=staging` and `LOGSHIP_ELASTIC_URL` pointing at a
//! store, records are additionally batched to `{url}/_bulk`. Ctrl-C
//! drains the remote buffer before the process exits.

use std::env;

use axum::http::StatusCode;
use axum::routing::get;
use logship::{Config, Pipeline, RequestLogLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The library's own diagnostics go through tracing, separate from the
    // records it routes.
    let self_log_level = env::var("LOGSHIP_SELF_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = format!("hyper=off,reqwest=off,{self_log_level}");
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter)?)
        .with_target(true)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env();
    let pipeline = Pipeline::start(&config);

    let app = axum::Router::new()
        .route("/hello", get(|| async { "hello" }))
        .route(
            "/unavailable",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "try later") }),
        )
        .layer(RequestLogLayer::new(pipeline.router(), &config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    println!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // Drain the remote buffer before exiting.
    pipeline.shutdown().await;
    Ok(())
}
