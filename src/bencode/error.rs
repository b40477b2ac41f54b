use std::fmt;
use std::io;
use thiserror::Error;

/// The step of decoding (or writing encoded output) that was running when an
/// error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RootType,
    Key,
    ValueType,
    Value,
    DictEnd,
    ListItem,
    Length,
    StringPayload,
    Integer,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::RootType => "reading root type",
            Stage::Key => "reading dictionary key",
            Stage::ValueType => "reading value type",
            Stage::Value => "reading value",
            Stage::DictEnd => "reading dictionary end",
            Stage::ListItem => "reading list item",
            Stage::Length => "reading string length",
            Stage::StringPayload => "reading string payload",
            Stage::Integer => "reading integer",
            Stage::Output => "writing output",
        };
        f.write_str(s)
    }
}

/// Coarse error classes, one per failure family a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    UnsupportedType,
    TypeMismatch,
}

#[derive(Debug, Error)]
pub enum BencodeError {
    #[error("I/O error while {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    #[error("Unexpected end of input while {0}")]
    UnexpectedEnd(Stage),

    #[error("Not a valid bencode document: root must be a dictionary")]
    NotADocument,

    #[error("Invalid Format while {stage}: {reason}")]
    InvalidFormat { stage: Stage, reason: String },

    #[error("Invalid Integer {literal:?} while {stage}")]
    InvalidInteger { stage: Stage, literal: String },

    #[error("Nesting depth exceeds limit of {0}")]
    DepthExceeded(usize),

    #[error("Duplicate dictionary key {0:?}")]
    DuplicateKey(String),

    #[error("Unsupported value type: {0}")]
    UnsupportedType(&'static str),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Missing key {0:?}")]
    MissingKey(String),
}

impl BencodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BencodeError::Io { .. } | BencodeError::UnexpectedEnd(_) => ErrorKind::Io,
            BencodeError::NotADocument
            | BencodeError::InvalidFormat { .. }
            | BencodeError::InvalidInteger { .. }
            | BencodeError::DepthExceeded(_)
            | BencodeError::DuplicateKey(_) => ErrorKind::Format,
            BencodeError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            BencodeError::TypeMismatch { .. } | BencodeError::MissingKey(_) => {
                ErrorKind::TypeMismatch
            }
        }
    }

    /// The decode stage this error was raised in, if it came from the decoder.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BencodeError::Io { stage, .. }
            | BencodeError::InvalidFormat { stage, .. }
            | BencodeError::InvalidInteger { stage, .. } => Some(*stage),
            BencodeError::UnexpectedEnd(stage) => Some(*stage),
            BencodeError::NotADocument => Some(Stage::RootType),
            _ => None,
        }
    }

    pub(crate) fn io(stage: Stage, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            BencodeError::UnexpectedEnd(stage)
        } else {
            BencodeError::Io { stage, source: err }
        }
    }

    pub(crate) fn format(stage: Stage, reason: impl Into<String>) -> Self {
        BencodeError::InvalidFormat {
            stage,
            reason: reason.into(),
        }
    }
}
