use std::{fs::OpenOptions, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use fintrack_rs::{
    AppState, build_router,
    currency::refresh::{DEFAULT_PROVIDER_URL, DEFAULT_REFRESH_INTERVAL, refresh_rates_periodically},
    graceful_shutdown, initialize_db,
};

/// The REST API server for fintrack_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// URL of the exchange-rate provider to poll.
    #[arg(long, default_value = DEFAULT_PROVIDER_URL)]
    rates_url: String,

    /// Seconds between exchange-rate refreshes.
    #[arg(long, default_value_t = DEFAULT_REFRESH_INTERVAL.as_secs())]
    rates_refresh_secs: u64,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let connection = Connection::open(&args.db_path).expect("Could not open database file.");
    initialize_db(&connection).expect("Could not initialize the database schema.");
    let state = AppState::new(connection);

    tokio::spawn(refresh_rates_periodically(
        state.db_connection.clone(),
        args.rates_url,
        Duration::from_secs(args.rates_refresh_secs),
    ));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state))
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .unwrap();
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they occur, so skip the default 5xx logging.
        .on_failure(());

    router.layer(tracing_layer)
}
