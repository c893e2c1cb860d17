use skipstore::config::Config;
use skipstore::persistence::aof::AofLog;
use skipstore::server;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_args(&args);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.logfile)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let aof_path = config.aof_path();
    let (aof, store, replayed) = match AofLog::open(&aof_path, config.databases) {
        Ok(loaded) => loaded,
        Err(e) => {
            // A corrupt or unreadable persistence file is fatal.
            eprintln!("skipstore: cannot load {aof_path}: {e}");
            std::process::exit(1);
        }
    };
    if replayed > 0 {
        info!("replayed {replayed} commands from {aof_path}");
    }

    server::run_server(Arc::new(store), Arc::new(aof), config).await
}
