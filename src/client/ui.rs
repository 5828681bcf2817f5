#![forbid(unsafe_code)]

use std::sync::Mutex;

use log::{error, warn};

use crate::utils::errors::Errors;
use crate::utils::saludo_utils::timestamp_str;

// ***************************************************************************
//                                  Traits
// ***************************************************************************
// The handler only ever talks to its surroundings through these handles,
// which are injected at construction time.

/// Source of the name, read once per invocation.
pub trait InputField: Send + Sync {
    fn value(&self) -> Option<String>;
}

/// Destination of the greeting or the fallback message.
pub trait OutputField: Send + Sync {
    fn set_text(&self, text: &str);
}

/// Blocking user notification, used only for validation failures.
pub trait Alert: Send + Sync {
    fn alert(&self, msg: &str);
}

/// Operator facing channel that receives request failure details.
pub trait Diagnostics: Send + Sync {
    fn record(&self, context: &str, err: &Errors);
}

// ***************************************************************************
//                               TextField
// ***************************************************************************
// ---------------------------------------------------------------------------
// TextField:
// ---------------------------------------------------------------------------
/** An in-memory text field usable as either end of the handler.  The console
 * front end writes each line typed by the user into one of these.
 */
#[derive(Debug, Default)]
pub struct TextField {
    text: Mutex<Option<String>>,
}

impl TextField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, text: &str) {
        *self.text.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.to_string());
    }

    pub fn text(&self) -> Option<String> {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl InputField for TextField {
    fn value(&self) -> Option<String> {
        self.text()
    }
}

impl OutputField for TextField {
    fn set_text(&self, text: &str) {
        self.set(text);
    }
}

// ***************************************************************************
//                             Console Handles
// ***************************************************************************
// ---------------------------------------------------------------------------
// ConsoleOutput:
// ---------------------------------------------------------------------------
/// Prints every write to stdout and keeps the latest one.
#[derive(Debug, Default)]
pub struct ConsoleOutput {
    field: TextField,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputField for ConsoleOutput {
    fn set_text(&self, text: &str) {
        self.field.set(text);
        println!("{}", text);
    }
}

// ---------------------------------------------------------------------------
// ConsoleAlert:
// ---------------------------------------------------------------------------
pub struct ConsoleAlert;

impl Alert for ConsoleAlert {
    fn alert(&self, msg: &str) {
        eprintln!("[!] {}", msg);
    }
}

// ---------------------------------------------------------------------------
// LogDiagnostics:
// ---------------------------------------------------------------------------
/// Default diagnostic channel: one error record in the application log.
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn record(&self, context: &str, err: &Errors) {
        if err.is_transport_or_parse() {
            error!("{} [{}]: {:?}", context, timestamp_str(), err);
        } else {
            warn!("{} [{}]: {}", context, timestamp_str(), err);
        }
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
impl TextField {
    pub fn with_text(text: &str) -> Self {
        Self { text: Mutex::new(Some(text.to_string())) }
    }

    pub fn clear(&self) {
        *self.text.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
impl ConsoleOutput {
    pub fn text(&self) -> Option<String> {
        self.field.text()
    }
}
