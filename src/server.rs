//! Loopback WebSocket listener for print jobs
//!
//! Each accepted connection gets its own task. Within a connection, frames are
//! handled strictly in order: the next frame is not read until the previous
//! job has finished. Separate connections run their jobs concurrently. No
//! reply is sent to the client; outcomes are visible in the journal only.

use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ServiceError, ServiceResult};
use crate::journal::LogJournal;
use crate::services::JobProcessor;
use crate::utils::UrlUtils;

/// Back-off after a failed `accept` (e.g. file descriptor exhaustion)
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct JobServer {
    listener: TcpListener,
    processor: Arc<JobProcessor>,
}

impl JobServer {
    pub async fn bind(addr: &str, processor: Arc<JobProcessor>) -> ServiceResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            processor,
        })
    }

    pub fn local_addr(&self) -> ServiceResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) {
        let Self {
            listener,
            processor,
        } = self;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Job server received shutdown signal, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let processor = processor.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, processor).await;
                        });
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, processor: Arc<JobProcessor>) {
    let journal: &LogJournal = processor.journal();

    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            journal
                .warning(format!("⚠️ WebSocket handshake with {peer} failed: {e}"))
                .await;
            return;
        }
    };
    journal
        .system(format!("🔌 Connection established ({peer})"))
        .await;

    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let frame: &str = text.as_str();
                journal
                    .info(format!("📨 Received message: {}", describe_frame(frame)))
                    .await;
                processor.execute(frame).await;
            }
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(frame) => {
                    journal
                        .info(format!("📨 Received message: {}", describe_frame(frame)))
                        .await;
                    processor.execute(frame).await;
                }
                Err(_) => {
                    journal
                        .error("⚠️ [MalformedMessage] binary frame is not valid UTF-8")
                        .await;
                }
            },
            // Keep polling: the stream ends once the queued close reply is flushed
            Ok(Message::Close(frame)) => {
                debug!("Close frame from {}: {:?}", peer, frame);
            }
            // Ping/pong are answered by the transport
            Ok(_) => {}
            Err(e) => {
                journal
                    .error(format!("⚠️ Connection error ({peer}): {e}"))
                    .await;
                break;
            }
        }
    }

    journal
        .system(format!("❌ Client disconnected ({peer})"))
        .await;
}

/// Frame text for the journal, with credentials in the URL part masked
fn describe_frame(frame: &str) -> String {
    match frame.split_once(',') {
        Some((job_id, url)) => format!("{job_id},{}", UrlUtils::obfuscate_credentials(url)),
        None => frame.to_string(),
    }
}
