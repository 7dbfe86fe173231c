//! CitizenX HTTP server.
//!
//! Wires the repositories and object store chosen on the command line into the router
//! from [`citizenx_server::create_app`] and serves it until the process is stopped.

use std::sync::Arc;

use citizenx_server::AppState;
use citizenx_server::args::{Args, ObjectBackend, StoreBackend};
use citizenx_store::{
    IncidentReportRepository, MemoryObjectStore, MemoryStore, ObjectStore, PgStore,
    PostRepository, UserRepository,
};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, filter};

type Repositories = (
    Arc<dyn UserRepository>,
    Arc<dyn IncidentReportRepository>,
    Arc<dyn PostRepository>,
);

#[tokio::main]
async fn main() {
    let args = Args::parse();
    enable_logging(&args);
    debug!("{args:?}");

    let (users, reports, posts) = repositories(&args).await;
    let objects = object_store(&args).await;

    let state = AppState {
        users,
        reports,
        posts,
        objects,
        jwt_secret: Arc::from(args.jwt_secret.as_str()),
        max_upload_bytes: args.max_upload_bytes,
    };

    let app = citizenx_server::create_app(state);

    let addr = args.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("binding {addr}: {e}"));
    info!("CitizenX server listening on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server failed: {e}");
        std::process::exit(1);
    }

    info!("Server finished");
}

async fn repositories(args: &Args) -> Repositories {
    match args.store {
        StoreBackend::Memory => {
            warn!("using in-memory store, data is lost on exit");
            shared(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let Some(url) = args.database_url.as_deref() else {
                error!("--database-url (or DATABASE_URL) is required with --store postgres");
                std::process::exit(1);
            };

            let store = PgStore::connect(url, args.max_db_connections)
                .await
                .unwrap_or_else(|e| panic!("connecting to database: {e}"));
            store
                .migrate()
                .await
                .unwrap_or_else(|e| panic!("migrating database: {e}"));

            shared(store)
        }
    }
}

fn shared<S>(store: S) -> Repositories
where
    S: UserRepository + IncidentReportRepository + PostRepository + 'static,
{
    let store = Arc::new(store);
    (store.clone(), store.clone(), store)
}

async fn object_store(args: &Args) -> Arc<dyn ObjectStore> {
    match args.object_store {
        ObjectBackend::Memory => {
            let base_url = args
                .bucket_url
                .clone()
                .unwrap_or_else(|| format!("http://{}/objects", args.socket_addr()));
            warn!("using in-memory object store, uploads are lost on exit");
            Arc::new(MemoryObjectStore::new(base_url))
        }
        ObjectBackend::S3 => s3_store(args).await,
    }
}

#[cfg(feature = "s3")]
async fn s3_store(args: &Args) -> Arc<dyn ObjectStore> {
    let Some(bucket) = args.bucket.clone() else {
        error!("--bucket (or AWS_BUCKET) is required with --object-store s3");
        std::process::exit(1);
    };
    Arc::new(citizenx_store::S3ObjectStore::from_env(bucket, args.bucket_url.clone()).await)
}

#[cfg(not(feature = "s3"))]
async fn s3_store(_args: &Args) -> Arc<dyn ObjectStore> {
    error!("built without the 's3' feature; use --object-store memory");
    std::process::exit(1);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("installing Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, exiting...");
}

fn enable_logging(args: &Args) {
    // AWS, sqlx, Hyper, etc crates are quite verbose, "normal" level for them is WARN
    let library_verbosity = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        3.. => tracing::Level::TRACE,
    };

    let verbosity = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        2.. => tracing::Level::TRACE,
    };

    let (library_verbosity, verbosity) = if args.quiet {
        (tracing::Level::ERROR, tracing::Level::ERROR)
    } else {
        (library_verbosity, verbosity)
    };

    let filters = filter::Targets::new()
        .with_target("aws_config", library_verbosity)
        .with_target("aws_sdk_s3", library_verbosity)
        .with_target("aws_smithy_runtime", library_verbosity)
        .with_target("hyper_util", library_verbosity)
        .with_target("rustls", library_verbosity)
        .with_target("sqlx", library_verbosity)
        .with_target("tower_http", library_verbosity)
        .with_default(verbosity); // for all other targets

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_filter(filters);

    tracing_subscriber::registry().with(fmt_layer).init();
}
