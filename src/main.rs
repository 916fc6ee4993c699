use std::{process, sync::Arc};

use goods_service::{
    application::{
        cache::GoodsCache,
        error::AppError,
        goods::GoodsService,
        repos::{GoodsRepo, GoodsWriteRepo},
    },
    config,
    infra::{
        cache,
        db::{self, PostgresRepositories},
        error::InfraError,
        http::{self, GoodsState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    info!(
        target = "goods::serve",
        app = %settings.app.name,
        version = %settings.app.version,
        "Starting"
    );
    if let Some(clickhouse) = settings.clickhouse.as_ref() {
        info!(
            target = "goods::serve",
            host = %clickhouse.host,
            port = clickhouse.port,
            "ClickHouse configured; no analytics sink is attached"
        );
    }

    let repositories = init_repositories(&settings).await?;

    let backend = cache::connect(&settings.cache)
        .await
        .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
    let goods_cache = GoodsCache::new(backend, settings.cache.ttl);

    let reader: Arc<dyn GoodsRepo> = repositories.clone();
    let writer: Arc<dyn GoodsWriteRepo> = repositories.clone();
    let state = GoodsState {
        goods: Arc::new(GoodsService::new(reader, writer, goods_cache)),
        db: repositories.clone(),
    };

    let result = serve_http(&settings, state).await;

    repositories.close().await;
    info!(target = "goods::serve", "Database pool closed");
    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    repositories.close().await;
    info!(target = "goods::migrate", "Migrations applied");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let options = db::connect_options(&settings.postgresql)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let pool = PostgresRepositories::connect(
        options,
        settings.postgresql.max_connections.get(),
        settings.postgresql.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: GoodsState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener =
        tokio::net::TcpListener::bind((settings.http.host.as_str(), settings.http.port))
            .await
            .map_err(|err| AppError::from(InfraError::from(err)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "goods::serve",
        host = %settings.http.host,
        addr = %local_addr,
        "HTTP listener bound"
    );

    let stop = Arc::new(Notify::new());
    let server = {
        let stop = stop.clone();
        axum::serve(listener, router.into_make_service()).with_graceful_shutdown(async move {
            shutdown_signal().await;
            stop.notify_one();
        })
    };
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => return flatten_server_result(joined),
        _ = stop.notified() => {
            info!(target = "goods::serve", "Shutdown signal received, draining connections");
        }
    }

    match tokio::time::timeout(settings.http.graceful_shutdown, &mut server).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!(
                target = "goods::serve",
                timeout_secs = settings.http.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out, aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(result) => result.map_err(|err| AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "goods::serve", error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(target = "goods::serve", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
