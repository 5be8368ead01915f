//! Observability hook for the pipeline
//!
//! The engine never logs on its own. Every stage reports to a caller-supplied
//! [`TraceSink`]; [`LogTrace`] forwards to the `log` facade.

use std::fmt;

/// Pipeline stage that emitted an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Extract,
    Resolve,
    Generate,
    Merge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Extract => "extract",
            Stage::Resolve => "resolve",
            Stage::Generate => "generate",
            Stage::Merge => "merge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Debug,
    /// Something was skipped or fell back, the operation still succeeds
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub stage: Stage,
    pub level: TraceLevel,
    pub macro_name: Option<String>,
    pub message: String,
}

impl TraceEvent {
    pub fn debug(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: TraceLevel::Debug,
            macro_name: None,
            message: message.into(),
        }
    }

    pub fn warn(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: TraceLevel::Warn,
            ..Self::debug(stage, message)
        }
    }

    pub fn for_macro(mut self, name: impl Into<String>) -> Self {
        self.macro_name = Some(name.into());
        self
    }
}

/// Receiver of pipeline trace events
pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);
}

/// Forwards events to the `log` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&mut self, event: TraceEvent) {
        let level = match event.level {
            TraceLevel::Debug => log::Level::Debug,
            TraceLevel::Warn => log::Level::Warn,
        };
        match &event.macro_name {
            Some(name) => log::log!(level, "[{}] '{}': {}", event.stage, name, event.message),
            None => log::log!(level, "[{}] {}", event.stage, event.message),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn record(&mut self, _event: TraceEvent) {}
}

/// Collects events, mostly for tests
impl TraceSink for Vec<TraceEvent> {
    fn record(&mut self, event: TraceEvent) {
        self.push(event);
    }
}
