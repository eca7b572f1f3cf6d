//! Scan window timer

use std::time::Duration;

use blebridge_core::Event;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// At most one armed deadline; arming again replaces it
#[derive(Debug, Default)]
pub(crate) struct ScanTimer {
    handle: Option<JoinHandle<()>>,
}

impl ScanTimer {
    pub(crate) fn arm(&mut self, scan: u64, after: Duration, events: mpsc::UnboundedSender<Event>) {
        self.cancel();
        debug!("Scan {} expires in {:?}", scan, after);
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if events.send(Event::ScanTimedOut { scan }).is_err() {
                debug!("Bridge task gone before scan {} expired", scan);
            }
        }));
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ScanTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
