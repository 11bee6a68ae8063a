use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No element with the requested key is stored in the tree.
    #[error("element with given key does not exist")]
    KeyNotFound,
}
