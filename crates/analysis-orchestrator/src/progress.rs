use analysis_core::{RecordStatus, StockDataError, Symbol};

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started,
    Completed(RecordStatus),
    Failed(StockDataError),
}

/// One notification from a batch run. `position` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub symbol: Symbol,
    pub position: usize,
    pub total: usize,
    pub event: ProgressEvent,
}

/// Receives batch progress. Called from the task processing the symbol, so
/// implementations must be cheap and thread-safe.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Default observer: one log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn on_progress(&self, update: &ProgressUpdate) {
        match &update.event {
            ProgressEvent::Started => {
                tracing::info!("[{}/{}] Analyzing {}", update.position, update.total, update.symbol)
            }
            ProgressEvent::Completed(status) => tracing::info!(
                "[{}/{}] {} finished ({:?})",
                update.position,
                update.total,
                update.symbol,
                status
            ),
            ProgressEvent::Failed(error) => tracing::warn!(
                "[{}/{}] {} failed: {}",
                update.position,
                update.total,
                update.symbol,
                error
            ),
        }
    }
}
