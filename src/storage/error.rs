use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum StorageError {
    #[error("illegal media type: {0}")]
    IllegalMediaType(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error(transparent)]
    Backend(#[from] opendal::Error),

    #[error("storage configuration error: {0}")]
    Configuration(String),

    #[error("local storage failure at {}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage provider not found by the given name: {0}")]
    ProviderNotFound(String),

    #[error("unable to read upload stream")]
    UnreadableStream(#[source] std::io::Error),

    #[error("archive failure: {0}")]
    Archive(String),
}

impl StorageError {
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
