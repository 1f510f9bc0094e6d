//! Deduplicating sink for report lines.
//!
//! The aggregator is the single consumer of the report channel. Identity is the
//! rendered line: two sources producing the same text print once.

use std::collections::HashSet;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::trace;

pub struct Aggregator<W: AsyncWrite + Unpin> {
    seen: HashSet<String>,
    sink: W,
    emitted: usize,
    duplicates: usize,
}

impl<W: AsyncWrite + Unpin> Aggregator<W> {
    pub fn new(sink: W) -> Self {
        Self {
            seen: HashSet::new(),
            sink,
            emitted: 0,
            duplicates: 0,
        }
    }

    /// Writes `line` unless it has been written before. Returns whether it was written.
    pub async fn accept(&mut self, line: String) -> io::Result<bool> {
        if self.seen.contains(&line) {
            trace!("dropping duplicate: {line}");
            self.duplicates += 1;
            return Ok(false);
        }
        self.sink.write_all(format!("{line}\n").as_bytes()).await?;
        self.sink.flush().await?;
        self.seen.insert(line);
        self.emitted += 1;
        Ok(true)
    }

    /// Consumes lines until every sender is gone or `cancel` fires.
    ///
    /// On cancellation, lines already queued are still written.
    pub async fn run(
        mut self,
        mut lines: UnboundedReceiver<String>,
        cancel: &CancellationToken,
    ) -> io::Result<Self> {
        loop {
            tokio::select! {
                biased;
                line = lines.recv() => match line {
                    Some(line) => {
                        self.accept(line).await?;
                    }
                    None => break,
                },
                _ = cancel.cancelled() => {
                    while let Ok(line) = lines.try_recv() {
                        self.accept(line).await?;
                    }
                    break;
                }
            }
        }
        Ok(self)
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
