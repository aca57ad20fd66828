use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the tooling itself, as opposed to problems found in a script.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("FileNotFoundError: {0}")]
    FileNotFound(String),
    #[error("IOError: {0}")]
    IO(#[from] std::io::Error),
    #[error("ConfigError: {0}")]
    Config(#[from] serde_json::Error),
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),
    #[error("operation was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    MacroDoesNotExist,
    MacroNameMissing,
    MacroNameInvalid,
    MacroAlreadyExists,
    UserDefinedError,
    UnknownPreprocessorDirective,
    IfWithoutEndIf,
    EndIfWithoutIf,
    ElseWithoutIf,
    InvalidVersionNumber,
    LineTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single message produced while preprocessing a script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub script_name: Option<String>,
    /// 1-based line in the input script.
    pub line: usize,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: String, script_name: &str, line: usize) -> Self {
        Self::new(code, Severity::Error, message, script_name, line)
    }

    pub fn warning(code: ErrorCode, message: String, script_name: &str, line: usize) -> Self {
        Self::new(code, Severity::Warning, message, script_name, line)
    }

    fn new(code: ErrorCode, severity: Severity, message: String, script_name: &str, line: usize) -> Self {
        Self {
            code,
            severity,
            message,
            script_name: (!script_name.is_empty()).then(|| script_name.to_string()),
            line,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{:?}]: {}\n  --> ", kind, self.code, self.message)?;
        match &self.script_name {
            Some(name) => write!(f, "{}:{}", PathBuf::from(name).display(), self.line),
            None => write!(f, "<script>:{}", self.line),
        }
    }
}

/// Ordered collection of diagnostics, in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompileResults {
    items: Vec<Diagnostic>,
}

impl CompileResults {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl std::ops::Index<usize> for CompileResults {
    type Output = Diagnostic;

    fn index(&self, index: usize) -> &Diagnostic {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a CompileResults {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
