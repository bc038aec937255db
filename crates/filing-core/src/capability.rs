//! Pluggable capabilities and task cancellation
//!
//! Translation and OCR quality are outside this crate; it only orchestrates
//! calls to whatever implementation the host supplies.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::document::CompiledDocument;
use crate::error::CapabilityError;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Draft a translation of `text` into `target_language`. A redo passes
    /// the refined instruction.
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        instruction: Option<&str>,
    ) -> Result<String, CapabilityError>;
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise one page (1-based) of a compiled document
    async fn recognize_page(
        &self,
        document: &CompiledDocument,
        page: u32,
    ) -> Result<(), CapabilityError>;
}

/// Caller side of a cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Task side of a cancellation signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled
    pub fn never() -> Self {
        Self::pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; pends forever if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
