use tokio::sync::watch;

pub trait LoadingIndicator: Send + Sync {
    fn set_loading(&self, on: bool);
}

/// Page-level loading flag; front ends observe it through `subscribe`.
pub struct LoadingFlag {
    tx: watch::Sender<bool>,
}

impl Default for LoadingFlag {
    fn default() -> Self { Self::new() }
}

impl LoadingFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn is_loading(&self) -> bool { *self.tx.borrow() }

    pub fn subscribe(&self) -> watch::Receiver<bool> { self.tx.subscribe() }
}

impl LoadingIndicator for LoadingFlag {
    fn set_loading(&self, on: bool) { self.tx.send_replace(on); }
}
