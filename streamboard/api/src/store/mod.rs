use crate::database::{HashError, RepositoryError};

mod streamboard;
mod user;
mod validation;

pub use streamboard::{
	CreateStreamboard, NewStreamboard, StreamboardChanges, StreamboardPatch, StreamboardStore, RECENT_VIEWED_LIMIT,
	TITLE_MAX_LENGTH,
};
pub use user::{validate_password, UserFields, UserStore};
pub use validation::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("validation failed: {0:?}")]
	Validation(ValidationErrors),
	/// A request level problem reported as `{"detail": ...}`.
	#[error("{0}")]
	Detail(&'static str),
	#[error("not found")]
	NotFound,
	#[error(transparent)]
	Repository(#[from] RepositoryError),
	#[error(transparent)]
	Hash(#[from] HashError),
}

impl From<ValidationErrors> for StoreError {
	fn from(errors: ValidationErrors) -> Self {
		Self::Validation(errors)
	}
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
