use crate::command;
use crate::config::Config;
use crate::connection::Context;
use crate::persistence::aof::AofLog;
use crate::protocol::Answer;
use crate::store::SharedStore;
use bytes::BytesMut;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

pub async fn run_server(store: SharedStore, aof: Arc<AofLog>, config: Config) -> io::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("skipstore listening on {addr}");

    // One-second persistence tick: stage the AOF buffer or a due snapshot,
    // then push it to the file.
    let store_clone = store.clone();
    let aof_clone = aof.clone();
    tokio::spawn(async move {
        persistence_loop(store_clone, aof_clone).await;
    });

    // Accept loop with graceful shutdown on SIGINT/SIGTERM.
    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result?;
                debug!("new connection from {peer_addr}");

                let store = store.clone();
                let aof = aof.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, store, aof).await {
                        warn!("connection error from {peer_addr}: {e}");
                    }
                    debug!("connection closed: {peer_addr}");
                });
            }
            _ = shutdown_signal() => {
                info!("shutting down");
                if aof.is_writable(&store) {
                    if let Err(e) = aof.write_out() {
                        warn!("final persistence write failed: {e}");
                    }
                }
                return Ok(());
            }
        }
    }
}

/// One session. Neither side delimits messages: a quiescent receive burst is
/// one Answer, so after the first bytes land the socket is drained until it
/// reports WouldBlock, and only then is the buffer dispatched.
async fn handle_connection(
    mut stream: TcpStream,
    store: SharedStore,
    aof: Arc<AofLog>,
) -> io::Result<()> {
    let mut ctx = Context::new();
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        loop {
            match stream.try_read_buf(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }

        let answer = Answer::from_bytes(&buf);
        buf.clear();

        let reply = command::dispatch(&mut ctx, answer, &store, Some(&aof));
        stream.write_all(&reply.serialize()).await?;

        if ctx.should_close {
            return Ok(());
        }
    }
}

async fn persistence_loop(store: SharedStore, aof: Arc<AofLog>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await; // first tick fires immediately
    loop {
        interval.tick().await;
        if aof.is_writable(&store) {
            if let Err(e) = aof.write_out() {
                tracing::error!("persistence write failed: {e}");
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
