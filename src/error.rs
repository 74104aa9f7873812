use std::path::PathBuf;

use thiserror::Error;

use crate::source::{Identifier, SourcePosition};

/// The single error type raised by the lexer, the parser and the bytecode generator.
/// The first error aborts the whole compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at {identifier}:{position})")]
pub struct CompileError {
    pub message: String,
    pub identifier: Identifier,
    pub position: SourcePosition,
}

impl CompileError {
    pub fn new(identifier: &Identifier, position: SourcePosition, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            identifier: identifier.clone(),
            position,
        }
    }
}

/// Raised while decoding a compiled artifact or a packed translation table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid artifact magic {0:#010X}")]
    InvalidMagic(u32),
    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
    #[error("7-bit encoded integer at offset {0} is too long")]
    InvalidVarint(usize),
    #[error("unknown opcode {opcode:#04X} at code offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
}

/// Everything the `vnsc` binary can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("IOError: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CompileError: {0}")]
    Compile(#[from] CompileError),
    #[error("FormatError: {0}")]
    Format(#[from] FormatError),
    #[error("ConfigError: {0}")]
    Config(String),
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{failed} of {total} file(s) failed to compile")]
    Failed { failed: usize, total: usize },
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_rendering() {
        let id = Identifier::new("chapter1.vns", 0x1234ABCD);
        let error = CompileError::new(&id, SourcePosition::new(3, 7), "unterminated string literal");
        assert_eq!(
            error.to_string(),
            "unterminated string literal (at chapter1.vns[1234ABCD]:3:7)"
        );
    }

    #[test]
    fn test_cli_error_wraps_compile_error() {
        let id = Identifier::new("a", 0);
        let error: CliError = CompileError::new(&id, SourcePosition::default(), "boom").into();
        assert!(error.to_string().starts_with("CompileError: boom"));
    }
}
