//! Error types for `rollcall-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("person id must not be empty")]
  EmptyPersonId,

  #[error("embedding must have at least one component")]
  EmptyEmbedding,

  #[error("embedding component {index} is not a finite number")]
  NonFiniteEmbedding { index: usize },

  #[error("embedding has {found} components, gallery expects {expected}")]
  DimensionMismatch { expected: usize, found: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
