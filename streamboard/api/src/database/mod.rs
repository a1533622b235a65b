use std::sync::Arc;

use chrono::{DateTime, Utc};
use ulid::Ulid;
use utils::database::deadpool_postgres::PoolError;
use utils::database::tokio_postgres::error::SqlState;

mod memory;
mod pg;
mod streamboard;
mod user;

pub use memory::MemoryRepository;
pub use pg::PgRepository;
pub use streamboard::Streamboard;
pub use user::{HashError, User};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
	#[error("{0} already exists")]
	Conflict(&'static str),
	#[error("database error: {0}")]
	Database(#[from] PoolError),
}

impl RepositoryError {
	/// Turns unique violations into [`RepositoryError::Conflict`] naming the
	/// offending field.
	pub(crate) fn from_pool(err: PoolError, field: &'static str) -> Self {
		match &err {
			PoolError::Backend(backend) if backend.code() == Some(&SqlState::UNIQUE_VIOLATION) => Self::Conflict(field),
			_ => Self::Database(err),
		}
	}
}

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
	/// Fails with [`RepositoryError::Conflict`] when the username is taken.
	async fn insert_user(&self, user: &User) -> Result<()>;

	async fn user_by_id(&self, id: Ulid) -> Result<Option<User>>;

	/// `username` must already be lowercased.
	async fn user_by_username(&self, username: &str) -> Result<Option<User>>;

	/// Writes every column of `user`. Fails with [`RepositoryError::Conflict`]
	/// when the new username is taken.
	async fn update_user(&self, user: &User) -> Result<Option<User>>;
}

/// Every lookup is scoped to the owning user, a streamboard owned by someone
/// else behaves exactly like one that does not exist.
#[async_trait::async_trait]
pub trait StreamboardRepository: Send + Sync {
	async fn insert_streamboard(&self, board: &Streamboard) -> Result<()>;

	/// Newest created first.
	async fn streamboards_by_owner(&self, owner: Ulid) -> Result<Vec<Streamboard>>;

	async fn streamboard_by_id(&self, owner: Ulid, id: Ulid) -> Result<Option<Streamboard>>;

	/// Sets `last_view` to `max(last_view, at)` and returns the stored record.
	async fn touch_streamboard(&self, owner: Ulid, id: Ulid, at: DateTime<Utc>) -> Result<Option<Streamboard>>;

	/// Writes every mutable column of `board`.
	async fn update_streamboard(&self, board: &Streamboard) -> Result<Option<Streamboard>>;

	/// The `limit` most recently viewed, see [`Streamboard::recency_cmp`].
	async fn recently_viewed(&self, owner: Ulid, limit: usize) -> Result<Vec<Streamboard>>;

	async fn delete_streamboard(&self, owner: Ulid, id: Ulid) -> Result<bool>;
}

#[derive(Clone)]
pub struct Repositories {
	pub users: Arc<dyn UserRepository>,
	pub streamboards: Arc<dyn StreamboardRepository>,
}

impl Repositories {
	pub fn memory() -> Self {
		let repo = Arc::new(MemoryRepository::default());
		Self {
			users: repo.clone(),
			streamboards: repo,
		}
	}

	pub fn postgres(pool: Arc<utils::database::Pool>) -> Self {
		let repo = Arc::new(PgRepository::new(pool));
		Self {
			users: repo.clone(),
			streamboards: repo,
		}
	}
}
