use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown taxonomy version: {0}")]
    UnknownTaxonomyVersion(String),
}
