use std::sync::Arc;

use chrono::{DateTime, Utc};
use ulid::Ulid;
use utils::database::{Json, Pool};

use super::{RepositoryError, Result, Streamboard, StreamboardRepository, User, UserRepository};

/// Postgres backed repository, the schema lives in `schema.sql`.
pub struct PgRepository {
	db: Arc<Pool>,
}

impl PgRepository {
	pub fn new(db: Arc<Pool>) -> Self {
		Self { db }
	}
}

const STREAMBOARD_COLUMNS: &str =
	"id, user_id, title, background_image, logo, layout_json, created_at, updated_at, last_view";

#[async_trait::async_trait]
impl UserRepository for PgRepository {
	async fn insert_user(&self, user: &User) -> Result<()> {
		utils::database::query(
			"INSERT INTO users (id, username, email, first_name, last_name, password_hash, profile_picture, is_dark, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
		)
		.bind(user.id)
		.bind(&user.username)
		.bind(&user.email)
		.bind(&user.first_name)
		.bind(&user.last_name)
		.bind(&user.password_hash)
		.bind(&user.profile_picture)
		.bind(user.is_dark)
		.bind(user.created_at)
		.bind(user.updated_at)
		.build()
		.execute(&self.db)
		.await
		.map_err(|err| RepositoryError::from_pool(err, "username"))?;

		Ok(())
	}

	async fn user_by_id(&self, id: Ulid) -> Result<Option<User>> {
		Ok(utils::database::query("SELECT * FROM users WHERE id = $1")
			.bind(id)
			.build_query_as()
			.fetch_optional(&self.db)
			.await?)
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
		Ok(utils::database::query("SELECT * FROM users WHERE username = $1")
			.bind(username)
			.build_query_as()
			.fetch_optional(&self.db)
			.await?)
	}

	async fn update_user(&self, user: &User) -> Result<Option<User>> {
		utils::database::query(
			"UPDATE users SET username = $2, email = $3, first_name = $4, last_name = $5, password_hash = $6, profile_picture = $7, is_dark = $8, updated_at = $9 WHERE id = $1 RETURNING *",
		)
		.bind(user.id)
		.bind(&user.username)
		.bind(&user.email)
		.bind(&user.first_name)
		.bind(&user.last_name)
		.bind(&user.password_hash)
		.bind(&user.profile_picture)
		.bind(user.is_dark)
		.bind(user.updated_at)
		.build_query_as()
		.fetch_optional(&self.db)
		.await
		.map_err(|err| RepositoryError::from_pool(err, "username"))
	}
}

#[async_trait::async_trait]
impl StreamboardRepository for PgRepository {
	async fn insert_streamboard(&self, board: &Streamboard) -> Result<()> {
		utils::database::query(format!(
			"INSERT INTO streamboards ({STREAMBOARD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
		))
		.bind(board.id)
		.bind(board.owner)
		.bind(&board.title)
		.bind(&board.background_image)
		.bind(&board.logo)
		.bind(Json(&board.layout_json))
		.bind(board.created_at)
		.bind(board.updated_at)
		.bind(board.last_view)
		.build()
		.execute(&self.db)
		.await?;

		Ok(())
	}

	async fn streamboards_by_owner(&self, owner: Ulid) -> Result<Vec<Streamboard>> {
		Ok(utils::database::query(format!(
			"SELECT {STREAMBOARD_COLUMNS} FROM streamboards WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
		))
		.bind(owner)
		.build_query_as()
		.fetch_all(&self.db)
		.await?)
	}

	async fn streamboard_by_id(&self, owner: Ulid, id: Ulid) -> Result<Option<Streamboard>> {
		Ok(utils::database::query(format!(
			"SELECT {STREAMBOARD_COLUMNS} FROM streamboards WHERE id = $1 AND user_id = $2"
		))
		.bind(id)
		.bind(owner)
		.build_query_as()
		.fetch_optional(&self.db)
		.await?)
	}

	async fn touch_streamboard(&self, owner: Ulid, id: Ulid, at: DateTime<Utc>) -> Result<Option<Streamboard>> {
		Ok(utils::database::query(format!(
			"UPDATE streamboards SET last_view = GREATEST(last_view, $3) WHERE id = $1 AND user_id = $2 RETURNING {STREAMBOARD_COLUMNS}"
		))
		.bind(id)
		.bind(owner)
		.bind(at)
		.build_query_as()
		.fetch_optional(&self.db)
		.await?)
	}

	async fn update_streamboard(&self, board: &Streamboard) -> Result<Option<Streamboard>> {
		Ok(utils::database::query(format!(
			"UPDATE streamboards SET title = $3, background_image = $4, logo = $5, layout_json = $6, updated_at = $7 WHERE id = $1 AND user_id = $2 RETURNING {STREAMBOARD_COLUMNS}"
		))
		.bind(board.id)
		.bind(board.owner)
		.bind(&board.title)
		.bind(&board.background_image)
		.bind(&board.logo)
		.bind(Json(&board.layout_json))
		.bind(board.updated_at)
		.build_query_as()
		.fetch_optional(&self.db)
		.await?)
	}

	async fn recently_viewed(&self, owner: Ulid, limit: usize) -> Result<Vec<Streamboard>> {
		Ok(utils::database::query(format!(
			"SELECT {STREAMBOARD_COLUMNS} FROM streamboards WHERE user_id = $1 ORDER BY last_view DESC, id DESC LIMIT $2"
		))
		.bind(owner)
		.bind(limit as i64)
		.build_query_as()
		.fetch_all(&self.db)
		.await?)
	}

	async fn delete_streamboard(&self, owner: Ulid, id: Ulid) -> Result<bool> {
		let deleted = utils::database::query("DELETE FROM streamboards WHERE id = $1 AND user_id = $2")
			.bind(id)
			.bind(owner)
			.build()
			.execute(&self.db)
			.await?;

		Ok(deleted > 0)
	}
}
