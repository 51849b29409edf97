//! Mock bridge server.

use futures_util::{SinkExt, StreamExt};
use printbridge_core::{BridgeReply, WireJob, WirePayload};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, client_addr) = listener.accept().await?;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();
    tracing::info!("Client connected: {}", addr);

    let mut printed = 0usize;
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket error: {}", e);
                break;
            }
        };

        let reply = match WireJob::from_text(text.as_str()) {
            Ok(job) => {
                printed += 1;
                log_job(printed, &job);
                BridgeReply {
                    status: "printed".to_string(),
                    detail: Some(job.kind),
                }
            }
            Err(e) => {
                tracing::warn!("Invalid job frame: {}", e);
                BridgeReply {
                    status: "error".to_string(),
                    detail: Some(e.to_string()),
                }
            }
        };
        sink.send(Message::Text(serde_json::to_string(&reply)?.into()))
            .await?;
    }

    tracing::info!("Client {} gone after {} job(s)", addr, printed);
    Ok(())
}

fn log_job(n: usize, job: &WireJob) {
    match &job.payload {
        WirePayload::Document { url, file_content } => tracing::info!(
            "#{} [{}] document {} ({} base64 chars)",
            n,
            job.kind,
            url,
            file_content.len()
        ),
        WirePayload::Raw { raw_content } => tracing::info!(
            "#{} [{}] raw {} bytes: {}",
            n,
            job.kind,
            raw_content.len(),
            raw_content.lines().find(|l| l.contains("^FD")).unwrap_or("")
        ),
    }
}
