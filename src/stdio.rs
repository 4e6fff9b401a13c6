//! Newline-delimited JSON-RPC over stdin/stdout
//!
//! One implicit session for the life of the process. Only protocol messages are
//! written to stdout.

use std::{io, sync::Arc};

use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};

use crate::mcp::engine::{Outbound, Peer, ProtocolEngine};
use crate::mcp::message::{classify, MessageKind};
use crate::mcp::rpc::{json_rpc_error, INVALID_REQUEST, PARSE_ERROR};

struct LineWriter {
    tx: mpsc::UnboundedSender<Value>,
}

impl Outbound for LineWriter {
    fn send_outbound(&self, message: Value) {
        if self.tx.send(message).is_err() {
            warn!("stdout writer stopped, dropping outbound message");
        }
    }
}

pub async fn run_stdio(engine: Arc<dyn ProtocolEngine>) -> io::Result<()> {
    serve_lines(engine, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Feeds each input line to `engine` in order and writes its output one message
/// per line. Returns once input ends and all output is flushed.
pub async fn serve_lines<R, W>(engine: Arc<dyn ProtocolEngine>, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(message) = rx.recv().await {
            let mut line = message.to_string();
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<(), io::Error>(())
    });

    let peer = Peer::new(Arc::new(LineWriter { tx }));
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(message) if classify(&message) != MessageKind::Invalid => {
                engine.on_message(message, peer.clone()).await;
            }
            Ok(_) => peer.send(json_rpc_error(None, INVALID_REQUEST, "Invalid Request")),
            Err(_) => peer.send(json_rpc_error(None, PARSE_ERROR, "Parse error")),
        }
    }

    info!("stdin closed, shutting down");
    engine.on_close();
    drop(peer);

    writer_task.await.map_err(io::Error::other)?
}
