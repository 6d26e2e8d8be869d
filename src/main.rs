use anyhow::Result;
use msql_srv::MysqlIntermediary;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, info_span};

use mysqlite::config::Config;
use mysqlite::protocol::MysqlBackend;
use mysqlite::session::{ConnectionPool, DatabaseLocation, Session};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .init();

    // Display version
    info!("mysqlite v{}", env!("CARGO_PKG_VERSION"));

    let options = config.pool_options();
    match &options.location {
        DatabaseLocation::InMemory => info!("Using in-memory databases (for testing only)"),
        DatabaseLocation::Directory(dir) => info!("Using data directory: {}", dir.display()),
    }
    let pool = Arc::new(ConnectionPool::new(options, info_span!("pool")));

    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;
    info!("TCP server listening on {}:{}", config.bind, config.port);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        std::process::exit(0);
    });

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept TCP connection: {}", e);
                continue;
            }
        };
        info!("New TCP connection from {}", addr);

        let pool = pool.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_tcp_connection(stream, addr, pool).await {
                error!("TCP connection error from {}: {}", addr, e);
            }
        });
    }
}

async fn handle_tcp_connection(stream: TcpStream, addr: SocketAddr, pool: Arc<ConnectionPool>) -> Result<()> {
    stream.set_nodelay(true)?;

    // msql-srv drives the protocol with blocking IO
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;

    let span = info_span!("connection", peer = %addr);
    tokio::task::spawn_blocking(move || {
        let session = Session::new(pool, &span);
        info!(parent: &span, "Session {} started", session.id);
        MysqlIntermediary::run_on_tcp(MysqlBackend::new(session), stream)
    })
    .await??;

    info!("Connection from {} closed", addr);
    Ok(())
}
