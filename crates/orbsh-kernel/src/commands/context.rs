//! Execution context for command handlers.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use orbsh_types::Value;

use crate::aliases::{Aliases, SharedAliases};
use crate::registry::SharedRegistry;
use crate::vars::SharedVars;

/// Where command text output goes.
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    /// Discard everything.
    #[default]
    Null,
    Stdout,
    Stderr,
    /// Collect into a shared string (tests, REPL capture).
    Buffer(Arc<Mutex<String>>),
}

impl OutputSink {
    pub fn buffer() -> Self {
        OutputSink::Buffer(Arc::new(Mutex::new(String::new())))
    }

    pub fn write(&self, text: &str) {
        match self {
            OutputSink::Null => {}
            OutputSink::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            OutputSink::Stderr => {
                let _ = std::io::stderr().lock().write_all(text.as_bytes());
            }
            OutputSink::Buffer(buf) => {
                buf.lock().unwrap_or_else(|e| e.into_inner()).push_str(text);
            }
        }
    }

    pub fn writeln(&self, text: &str) {
        self.write(text);
        self.write("\n");
    }

    /// Buffered text so far. Empty for non-buffer sinks.
    pub fn contents(&self) -> String {
        match self {
            OutputSink::Buffer(buf) => buf.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            _ => String::new(),
        }
    }

    /// Drain the buffer.
    pub fn take(&self) -> String {
        match self {
            OutputSink::Buffer(buf) => std::mem::take(&mut *buf.lock().unwrap_or_else(|e| e.into_inner())),
            _ => String::new(),
        }
    }
}

/// Where a stage sits in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelinePosition {
    /// Single command, not in a pipeline.
    #[default]
    Only,
    First,
    Middle,
    Last,
}

impl PipelinePosition {
    pub fn for_stage(index: usize, total: usize) -> Self {
        match (index, total) {
            (_, 0 | 1) => PipelinePosition::Only,
            (0, _) => PipelinePosition::First,
            (i, n) if i + 1 == n => PipelinePosition::Last,
            _ => PipelinePosition::Middle,
        }
    }

    /// True when nothing downstream consumes this stage's value.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePosition::Only | PipelinePosition::Last)
    }
}

/// Execution context passed to command handlers.
///
/// Locks on `vars`, `registry` and `aliases` are free when a handler runs,
/// so handlers may take write guards.
pub struct ExecContext {
    pub vars: SharedVars,
    pub registry: SharedRegistry,
    pub aliases: SharedAliases,
    /// The previous stage's value, if any.
    pub input: Option<Value>,
    pub position: PipelinePosition,
    pub out: OutputSink,
    pub err: OutputSink,
    pub cancel: CancellationToken,
}

impl ExecContext {
    pub fn new(vars: SharedVars, registry: SharedRegistry) -> Self {
        Self {
            vars,
            registry,
            aliases: Aliases::new().shared(),
            input: None,
            position: PipelinePosition::Only,
            out: OutputSink::Null,
            err: OutputSink::Null,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_sinks(mut self, out: OutputSink, err: OutputSink) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    pub fn with_aliases(mut self, aliases: SharedAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn take_input(&mut self) -> Option<Value> {
        self.input.take()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Print a result value when this stage ends the pipeline.
    pub fn emit(&self, value: &Value) {
        if self.position.is_terminal() && !value.is_null() {
            self.out.writeln(&value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_collects_and_drains() {
        let sink = OutputSink::buffer();
        sink.write("a");
        sink.writeln("b");
        assert_eq!(sink.contents(), "ab\n");
        assert_eq!(sink.take(), "ab\n");
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn null_sink_discards() {
        let sink = OutputSink::Null;
        sink.writeln("gone");
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn positions() {
        assert_eq!(PipelinePosition::for_stage(0, 1), PipelinePosition::Only);
        assert_eq!(PipelinePosition::for_stage(0, 3), PipelinePosition::First);
        assert_eq!(PipelinePosition::for_stage(1, 3), PipelinePosition::Middle);
        assert_eq!(PipelinePosition::for_stage(2, 3), PipelinePosition::Last);
        assert!(PipelinePosition::Last.is_terminal());
        assert!(!PipelinePosition::First.is_terminal());
    }
}
