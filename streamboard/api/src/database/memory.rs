use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use ulid::Ulid;

use super::{RepositoryError, Result, Streamboard, StreamboardRepository, User, UserRepository};

/// Keeps every record in process. Selected with `database.uri = "memory://"`
/// and used by the tests.
#[derive(Default)]
pub struct MemoryRepository {
	users: RwLock<HashMap<Ulid, User>>,
	streamboards: RwLock<HashMap<Ulid, Streamboard>>,
}

#[async_trait::async_trait]
impl UserRepository for MemoryRepository {
	async fn insert_user(&self, user: &User) -> Result<()> {
		let mut users = self.users.write().await;
		if users.values().any(|u| u.username == user.username) {
			return Err(RepositoryError::Conflict("username"));
		}

		users.insert(user.id, user.clone());
		Ok(())
	}

	async fn user_by_id(&self, id: Ulid) -> Result<Option<User>> {
		Ok(self.users.read().await.get(&id).cloned())
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
		Ok(self.users.read().await.values().find(|u| u.username == username).cloned())
	}

	async fn update_user(&self, user: &User) -> Result<Option<User>> {
		let mut users = self.users.write().await;
		if users.values().any(|u| u.id != user.id && u.username == user.username) {
			return Err(RepositoryError::Conflict("username"));
		}

		Ok(users.get_mut(&user.id).map(|stored| {
			*stored = user.clone();
			stored.clone()
		}))
	}
}

#[async_trait::async_trait]
impl StreamboardRepository for MemoryRepository {
	async fn insert_streamboard(&self, board: &Streamboard) -> Result<()> {
		self.streamboards.write().await.insert(board.id, board.clone());
		Ok(())
	}

	async fn streamboards_by_owner(&self, owner: Ulid) -> Result<Vec<Streamboard>> {
		let mut boards: Vec<_> = self
			.streamboards
			.read()
			.await
			.values()
			.filter(|b| b.owner == owner)
			.cloned()
			.collect();

		boards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
		Ok(boards)
	}

	async fn streamboard_by_id(&self, owner: Ulid, id: Ulid) -> Result<Option<Streamboard>> {
		Ok(self.streamboards.read().await.get(&id).filter(|b| b.owner == owner).cloned())
	}

	async fn touch_streamboard(&self, owner: Ulid, id: Ulid, at: DateTime<Utc>) -> Result<Option<Streamboard>> {
		let mut boards = self.streamboards.write().await;
		let Some(board) = boards.get_mut(&id).filter(|b| b.owner == owner) else {
			return Ok(None);
		};

		board.last_view = board.last_view.max(at);
		Ok(Some(board.clone()))
	}

	async fn update_streamboard(&self, board: &Streamboard) -> Result<Option<Streamboard>> {
		let mut boards = self.streamboards.write().await;
		let Some(stored) = boards.get_mut(&board.id).filter(|b| b.owner == board.owner) else {
			return Ok(None);
		};

		stored.title.clone_from(&board.title);
		stored.background_image.clone_from(&board.background_image);
		stored.logo.clone_from(&board.logo);
		stored.layout_json.clone_from(&board.layout_json);
		stored.updated_at = board.updated_at;

		Ok(Some(stored.clone()))
	}

	async fn recently_viewed(&self, owner: Ulid, limit: usize) -> Result<Vec<Streamboard>> {
		let mut boards: Vec<_> = self
			.streamboards
			.read()
			.await
			.values()
			.filter(|b| b.owner == owner)
			.cloned()
			.collect();

		boards.sort_by(Streamboard::recency_cmp);
		boards.truncate(limit);
		Ok(boards)
	}

	async fn delete_streamboard(&self, owner: Ulid, id: Ulid) -> Result<bool> {
		let mut boards = self.streamboards.write().await;
		if boards.get(&id).is_some_and(|b| b.owner == owner) {
			boards.remove(&id);
			return Ok(true);
		}

		Ok(false)
	}
}
