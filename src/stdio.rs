// Line-delimited JSON-RPC over stdin/stdout.
// Each line is dispatched on its own task so a slow NTP exchange never holds
// up reading the next message; replies may go out of request order.

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::handlers::{dispatch, parse_error, AppState};

pub async fn serve_stdio(state: AppState) -> Result<()> {
    serve(state, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve until `reader` reaches end of input and every in-flight request has
/// been answered.
pub async fn serve<R, W>(state: AppState, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("failed to read request")?;
        if read == 0 {
            break;
        }
        let line = buf.trim_ascii().to_vec();
        if line.is_empty() {
            continue;
        }

        let state = state.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            // Invalid UTF-8 is just another unparseable line.
            let response = match serde_json::from_slice::<Value>(&line) {
                Ok(request) => dispatch(&state, request).await,
                Err(e) => {
                    debug!(error = %e, "unparseable input line");
                    Some(parse_error())
                }
            };
            if let Some(response) = response {
                match serde_json::to_string(&response) {
                    Ok(out) => {
                        if tx.send(out).await.is_err() {
                            error!("response writer closed before reply was sent");
                        }
                    }
                    Err(e) => error!(error = %e, "failed to serialize response"),
                }
            }
        });
    }

    info!("input closed, draining in-flight requests");
    // The writer stops once the last request task drops its sender.
    drop(tx);
    writer_task
        .await
        .context("response writer task failed")?
        .context("failed to write response")?;
    Ok(())
}
