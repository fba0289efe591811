use futures::{SinkExt, StreamExt};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::core::codec::RequestCodec;
use crate::core::packet::{Request, Response, HEADER_SIZE, RESPONSE_HEADER_SIZE};
use crate::error::Result;
use crate::protocol::Router;
use crate::utils::metrics::Metrics;

/// Bind the listener described by `config`
#[instrument(skip(config), fields(address = %config.bind_address()))]
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "Listening");
    Ok(listener)
}

/// Start the relay server and run until CTRL+C
#[instrument(skip(config, router), fields(address = %config.bind_address()))]
pub async fn start_server(config: &ServerConfig, router: Router) -> Result<()> {
    let listener = bind(config).await?;

    // Create internal shutdown channel
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    let metrics = Arc::new(Metrics::new());
    serve(listener, config, router, metrics.clone(), shutdown_rx).await?;
    metrics.log_metrics();
    Ok(())
}

/// Accept connections on `listener` until `shutdown_rx` fires.
///
/// Every connection gets its own task and carries exactly one request. On
/// shutdown the loop stops accepting and waits up to `shutdown_timeout` for
/// in-flight connections to finish.
pub async fn serve(
    listener: TcpListener,
    config: &ServerConfig,
    router: Router,
    metrics: Arc<Metrics>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let max_request_size = config.max_request_size;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");
                drain_connections(&metrics, config.shutdown_timeout).await;
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let open = metrics.connection_established();
                        if open > config.max_connections as u64 {
                            warn!(open, limit = config.max_connections, "Connection count above configured limit");
                        }
                        debug!(peer = %peer, "New connection established");

                        let router = router.clone();
                        let metrics = metrics.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &router, &metrics, max_request_size).await {
                                debug!(peer = %peer, error = %e, "Connection ended with error");
                            }
                            metrics.connection_closed();
                            debug!(peer = %peer, "Connection closed");
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

async fn drain_connections(metrics: &Metrics, shutdown_timeout: Duration) {
    let timeout = tokio::time::sleep(shutdown_timeout);
    tokio::pin!(timeout);

    loop {
        let connections = metrics.connections_active.load(Ordering::Relaxed);
        if connections == 0 {
            info!("All connections closed, shutting down");
            return;
        }
        tokio::select! {
            _ = &mut timeout => {
                warn!(connections, "Shutdown timeout reached, forcing exit");
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                debug!(connections, "Waiting for connections to close");
            }
        }
    }
}

/// Run one decode → dispatch → respond cycle over `stream`.
///
/// A stream that closes before a full request arrives, or whose header cannot be
/// framed, is dropped without writing anything back.
pub async fn handle_connection<T>(
    stream: T,
    router: &Router,
    metrics: &Metrics,
    max_request_size: usize,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, RequestCodec::new(max_request_size));

    let request = match framed.next().await {
        Some(Ok(request)) => request,
        Some(Err(e)) => {
            metrics.decode_error();
            warn!(error = %e, "Could not frame request, closing connection");
            return Err(e);
        }
        None => {
            debug!("Connection closed before a request arrived");
            return Ok(());
        }
    };

    let request_bytes = (HEADER_SIZE + request.payload.len()) as u64;
    let response = router.dispatch(&request);
    let response_bytes = (RESPONSE_HEADER_SIZE + response.payload.len()) as u64;
    let code = response.code;

    framed.send(response).await?;
    metrics.request_handled(request_bytes, code, response_bytes);
    debug!(code, bytes = response_bytes, "Response sent");
    Ok(())
}

/// Send one request to a relay at `addr` and read its reply.
///
/// Returns `Ok(None)` when the server closed the connection without answering.
pub async fn request(addr: &str, request: &Request) -> Result<Option<Response>> {
    let stream = TcpStream::connect(addr).await?;
    exchange(stream, request).await
}

/// Client half of a single exchange over an already-open stream.
pub async fn exchange<T>(mut stream: T, request: &Request) -> Result<Option<Response>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&request.to_bytes()).await?;
    stream.flush().await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;
    if reply.is_empty() {
        return Ok(None);
    }
    Response::from_bytes(&reply).map(Some)
}

