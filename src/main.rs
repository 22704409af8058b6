use std::error::Error;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use client_ledger::request::{parse_line, write_response};
use client_ledger::{Ledger, LedgerConfig, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = LedgerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ledger = Ledger::with_config(MemoryStore::new(), config);
    let (request_sender, request_receiver) = mpsc::channel(16);
    let (response_sender, mut response_receiver) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut line = 0;
        loop {
            let text = match lines.next_line().await {
                Ok(Some(text)) => text,
                Ok(None) => break,
                Err(e) => {
                    warn!("failed to read stdin: {e}");
                    break;
                }
            };
            line += 1;
            if text.trim().is_empty() {
                continue;
            }
            match parse_line(line, &text) {
                Ok(request) => {
                    if request_sender.send(request).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    let writer = tokio::spawn(async move {
        let stdout = std::io::stdout();
        while let Some(response) = response_receiver.recv().await {
            write_response(stdout.lock(), &response)?;
        }
        Ok::<_, client_ledger::request::RequestError>(())
    });

    ledger
        .run(ReceiverStream::new(request_receiver), response_sender)
        .await;

    writer.await??;
    Ok(())
}
