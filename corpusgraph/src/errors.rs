//! Engine-level errors: everything the core crate can raise, plus the failure modes
//! that only make sense once multiple corpora and a query language are in play.

use corpusgraph_core::Component;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GraphAnnisError {
    #[error(transparent)]
    Core(#[from] corpusgraph_core::GraphAnnisCoreError),

    #[error("no corpus named '{0}' is registered")]
    NoSuchCorpus(String),

    #[error("corpus '{0}' is locked by another operation")]
    CorpusLocked(String),

    #[error("could not load corpus '{name}' from disk: {cause}")]
    LoadingFromDisk { name: String, cause: String },

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("query references a component that does not exist: {0}")]
    MissingComponent(Component),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    BincodeSerialization(#[from] bincode::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, GraphAnnisError>;
