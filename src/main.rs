use std::{future::IntoFuture, process, sync::Arc};

use folio::{
    application::{
        content::ContentServices,
        error::AppError,
        repos::DocumentStore,
        session::{AccessCode, SessionStore},
        storage::KeyValueStorage,
        uploads::ImageUploader,
    },
    cache::ExpiringCache,
    config,
    domain::session::LockoutPolicy,
    infra::{
        db::PostgresDocuments,
        error::InfraError,
        http::{self, AdminState, HttpState, RouterState},
        memory::MemoryDocuments,
        storage::FileStorage,
        telemetry,
        uploads::{CloudinaryUploader, DisabledUploader},
    },
    util::clock::{Clock, SystemClock},
};
use tokio::sync::oneshot;
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
        config::Command::Seed(_) => run_seed(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = init_documents(&settings).await?;
    let storage: Arc<dyn KeyValueStorage> =
        Arc::new(FileStorage::open(&settings.storage.state_file).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let content = build_content(&settings, store, storage.clone(), clock.clone())?;

    let policy = LockoutPolicy {
        max_attempts: settings.auth.max_attempts.get(),
        lockout: to_time_duration(settings.auth.lockout, "auth.lockout_minutes")?,
    };
    let access_code = match settings.auth.access_code.as_ref() {
        Some(code) => AccessCode::new(code.clone()),
        None => {
            warn!(
                target = "folio::bootstrap",
                "no access code configured; admin login is disabled"
            );
            AccessCode::unset()
        }
    };
    let sessions = Arc::new(
        SessionStore::new(storage, clock, policy, access_code)
            .with_session_limit(settings.auth.max_sessions),
    );

    let uploader = init_uploader(&settings)?;

    let router_state = RouterState {
        http: HttpState {
            content: content.clone(),
            sessions,
            page_size: settings.listing.page_size,
        },
        admin: AdminState {
            content,
            uploader,
            upload_limit_bytes: settings.uploads.max_request_bytes.get(),
        },
    };

    serve_http(&settings, router_state).await
}

async fn run_seed(settings: config::Settings) -> Result<(), AppError> {
    let store = init_documents(&settings).await?;
    let storage: Arc<dyn KeyValueStorage> =
        Arc::new(FileStorage::open(&settings.storage.state_file).await?);
    let content = build_content(&settings, store, storage, Arc::new(SystemClock))?;

    let seeded = content
        .about
        .seed()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to seed profile: {err}")))?;

    if seeded {
        info!(target = "folio::bootstrap", "default profile written");
    } else {
        info!(
            target = "folio::bootstrap",
            "profile already present; nothing to seed"
        );
    }
    Ok(())
}

/// Postgres when a database url is configured, otherwise a process-local store.
async fn init_documents(settings: &config::Settings) -> Result<Arc<dyn DocumentStore>, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        warn!(
            target = "folio::bootstrap",
            "database url is not configured; content is kept in memory"
        );
        return Ok(Arc::new(MemoryDocuments::new()));
    };

    let pool = PostgresDocuments::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresDocuments::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(
        target = "folio::bootstrap",
        max_connections = settings.database.max_connections.get(),
        "database ready"
    );
    Ok(Arc::new(PostgresDocuments::new(pool)))
}

fn build_content(
    settings: &config::Settings,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
) -> Result<ContentServices, AppError> {
    let expiry = to_time_duration(settings.cache.expiry, "cache.expiry_hours")?;
    Ok(ContentServices::new(
        store,
        ExpiringCache::new(storage, clock, expiry),
    ))
}

fn init_uploader(settings: &config::Settings) -> Result<Arc<dyn ImageUploader>, AppError> {
    match settings.uploads.media.as_ref() {
        Some(media) => {
            let uploader = CloudinaryUploader::new(media).map_err(|err| {
                AppError::from(InfraError::configuration(format!(
                    "invalid upload endpoint: {err}"
                )))
            })?;
            info!(
                target = "folio::bootstrap",
                endpoint = %uploader.endpoint(),
                "image uploads enabled"
            );
            Ok(Arc::new(uploader))
        }
        None => {
            warn!(
                target = "folio::bootstrap",
                "media service is not configured; image uploads are disabled"
            );
            Ok(Arc::new(DisabledUploader))
        }
    }
}

fn to_time_duration(
    value: std::time::Duration,
    key: &'static str,
) -> Result<time::Duration, AppError> {
    time::Duration::try_from(value).map_err(|err| {
        AppError::from(InfraError::configuration(format!("{key}: {err}")))
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "folio::bootstrap",
        addr = %settings.server.addr,
        "listening"
    );

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async move {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(
                target = "folio::bootstrap",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "folio::bootstrap", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "folio::bootstrap",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "folio::bootstrap", "shutdown requested");
}
