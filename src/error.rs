use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] deskmatch_core::Error),

    #[error(transparent)]
    Storage(#[from] deskmatch_storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
