//! Diagnostic sink port
//!
//! Implemented by the CLI/GUI collaborators. Called synchronously from any
//! check; must not mutate or reject messages (filtering happens downstream).

use crate::shared::models::ErrorMessage;
use parking_lot::Mutex;
use std::sync::Arc;

pub trait ErrorLogger {
    /// Receive one diagnostic
    fn report_err(&mut self, msg: &ErrorMessage);

    /// Receive a progress/status line
    fn report_out(&mut self, _text: &str) {}
}

impl<L: ErrorLogger + ?Sized> ErrorLogger for &mut L {
    fn report_err(&mut self, msg: &ErrorMessage) {
        (**self).report_err(msg);
    }

    fn report_out(&mut self, text: &str) {
        (**self).report_out(text);
    }
}

/// Sink that keeps every diagnostic in memory
#[derive(Debug, Default, Clone)]
pub struct CollectingLogger {
    pub errors: Vec<ErrorMessage>,
    pub output: Vec<String>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages carrying the given id
    pub fn with_id(&self, id: &str) -> Vec<&ErrorMessage> {
        self.errors.iter().filter(|e| e.id == id).collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.id.as_str()).collect()
    }
}

impl ErrorLogger for CollectingLogger {
    fn report_err(&mut self, msg: &ErrorMessage) {
        self.errors.push(msg.clone());
    }

    fn report_out(&mut self, text: &str) {
        self.output.push(text.to_string());
    }
}

/// Serializes several worker pipelines onto one aggregating sink
pub struct SharedLogger<L: ErrorLogger + Send> {
    inner: Arc<Mutex<L>>,
}

impl<L: ErrorLogger + Send> SharedLogger<L> {
    pub fn new(inner: Arc<Mutex<L>>) -> Self {
        Self { inner }
    }
}

impl<L: ErrorLogger + Send> Clone for SharedLogger<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ErrorLogger + Send> ErrorLogger for SharedLogger<L> {
    fn report_err(&mut self, msg: &ErrorMessage) {
        self.inner.lock().report_err(msg);
    }

    fn report_out(&mut self, text: &str) {
        self.inner.lock().report_out(text);
    }
}
