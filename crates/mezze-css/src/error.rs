//! CSS build error types.

use thiserror::Error;

/// Errors raised while compiling stylesheets.
#[derive(Debug, Error)]
pub enum CssError {
    #[error("Failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Failed to minify {file}: {message}")]
    Minify { file: String, message: String },

    #[error("Failed to print {file}: {message}")]
    Print { file: String, message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
