//! Crate-wide error type shared by command building, dialect assembly,
//! and the stream pipeline.

use thiserror::Error;

/// Everything that can go wrong while rendering, parsing, or streaming
/// G-code.
#[derive(Debug, Error)]
pub enum GcodeError {
    #[error("Command not supported: {line:?}")]
    UnknownCommand { line: String },
    #[error("{text:?} is not a {code} command")]
    WrongCommand { code: String, text: String },
    #[error("Parameter {name:?} not valid for {code}")]
    InvalidParam { code: String, name: String },
    #[error("Need at least {min} of \"{valid}\" for {code}")]
    TooFewParams { code: String, min: usize, valid: String },
    #[error("Required parameter {name} missing for {code}")]
    MissingParam { code: String, name: char },
    #[error("{code} requires {required} trailing argument(s)")]
    MissingArgs { code: String, required: usize },
    #[error("{code} does not accept trailing arguments")]
    UnexpectedArgs { code: String },
    #[error("Validation failed for {text:?}, check the arguments of {code}")]
    Malformed { code: String, text: String },
    #[error("Alias {name:?} points at unknown command {code}")]
    DanglingAlias { name: String, code: String },
    #[error("No command {code} to amend")]
    AmendUnknown { code: String },
    #[error("Grammar error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
