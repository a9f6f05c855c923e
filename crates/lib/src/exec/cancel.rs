//! Cancellation signal for a pass.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation flag.
///
/// All clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
  tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(false);
    Self { tx: Arc::new(tx) }
  }

  pub fn cancel(&self) {
    self.tx.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.tx.borrow()
  }

  /// Resolve once the token has been cancelled.
  pub async fn cancelled(&self) {
    let mut rx = self.tx.subscribe();
    // The sender lives in `self`, so the channel cannot close while we wait.
    let _ = rx.wait_for(|cancelled| *cancelled).await;
  }
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}
