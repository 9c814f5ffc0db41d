use std::fmt;

use super::Map;

/// One frame of a captured stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub class_name: String,
    pub method_name: String,
    pub file_name: String,
    pub line: i32,
}

impl StackFrame {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        file_name: impl Into<String>,
        line: i32,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file_name: file_name.into(),
            line,
        }
    }
}

/// A portable error record.
///
/// With `data` set, the exception carries a data map and is written with
/// the `EX_INFO` tag; otherwise it is a plain `THROWABLE`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Exception {
    pub message: Option<String>,
    pub stack_trace: Vec<StackFrame>,
    pub cause: Option<Box<Exception>>,
    pub suppressed: Vec<Exception>,
    pub data: Option<Map>,
}

impl Exception {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// An exception carrying a data map.
    pub fn with_info(message: impl Into<String>, data: Map) -> Self {
        Self {
            data: Some(data),
            ..Self::new(message)
        }
    }

    pub fn with_cause(mut self, cause: Exception) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.stack_trace.push(frame);
        self
    }

    pub fn with_suppressed(mut self, suppressed: Exception) -> Self {
        self.suppressed.push(suppressed);
        self
    }

    /// Captures the message and source chain of a Rust error.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut ex = Self::new(err.to_string());
        if let Some(source) = err.source() {
            ex.cause = Some(Box::new(Self::from_error(source)));
        }
        ex
    }

    /// Iterates this exception and every cause below it.
    pub fn chain(&self) -> impl Iterator<Item = &Exception> {
        std::iter::successors(Some(self), |ex| ex.cause.as_deref())
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or("exception"))
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}
