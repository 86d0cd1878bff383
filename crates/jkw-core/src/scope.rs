//! Generation-counter cancellation scopes.
//!
//! Each tree owns one [`ScopeSource`]. Every refresh bumps the generation; a
//! [`Scope`] captured before the bump is cancelled from then on. Results are
//! applied only when the scope that requested them is still current, so a slow
//! response from an abandoned refresh can always be recognised and dropped.
//!
//! The generation lives in a `watch` channel so in-flight requests can also
//! `select!` on [`Scope::cancelled`] and stop waiting as soon as they are superseded.

use tokio::sync::watch;

pub struct ScopeSource {
    tx: watch::Sender<u64>,
}

impl ScopeSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Handle for the generation that is live right now.
    pub fn current(&self) -> Scope {
        Scope {
            generation: self.generation(),
            rx: self.tx.subscribe(),
        }
    }

    /// Cancels the live scope and returns its successor. The bump is visible to
    /// every outstanding [`Scope`] before this returns.
    pub fn renew(&self) -> Scope {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
        let scope = self.current();
        tracing::debug!(generation = scope.generation, "cancellation scope renewed");
        scope
    }
}

impl Default for ScopeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct Scope {
    generation: u64,
    rx: watch::Receiver<u64>,
}

impl Scope {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() != self.generation
    }

    /// Resolves once this scope has been superseded, or its source dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() != self.generation {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("generation", &self.generation)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
