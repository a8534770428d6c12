//! Runner errors

use lumen_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no script given, pass a path or set LUMEN_SCRIPT")]
    MissingScript,

    #[error("missing value for {0}")]
    MissingArgument(&'static str),

    #[error("invalid result type: {0}")]
    InvalidResultType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("record error: {0}")]
    Record(#[from] serde_json::Error),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}
