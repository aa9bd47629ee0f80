use std::{future::IntoFuture as _, process::ExitCode};

use application::{log, router, Args, Config, Service};
use service::infra::{postgres, Postgres};
use tokio::net::TcpListener;

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() -> ExitCode {
    log::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the server until it fails.
///
/// Returns the description of the failure.
async fn run() -> Result<(), String> {
    let Args { config } = Args::parse()
        .map_err(|e| format!("failed to parse command line arguments: {e}"))?;

    let Config {
        server,
        service,
        postgres,
        log: log_config,
    } = Config::new(config)
        .map_err(|e| format!("failed to load `Config`: {e}"))?;
    log::set_max_level(log_config.level.into());

    let lock_timeout = postgres.lock_timeout;
    let mut db = Postgres::new(&postgres.into(), lock_timeout)
        .map_err(|e| format!("failed to initialize `Postgres` client: {e}"))?;
    let report = migrations::runner()
        .run_async(&mut db)
        .await
        .map_err(|e| format!("failed to run database migrations: {e}"))?;
    for migration in report.applied_migrations() {
        tracing::info!("applied migration `{migration}`");
    }

    let app = router(Service::new(service.into(), db), &server.cors)
        .map_err(|e| format!("invalid CORS origin: {e}"))?;

    let addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("failed to listen on `{addr}`: {e}"))?;
    tracing::info!("listening on `{addr}`");

    axum::serve(listener, app)
        .into_future()
        .await
        .map_err(|e| format!("server failed: {e}"))
}
