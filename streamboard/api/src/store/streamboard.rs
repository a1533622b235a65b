use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use ulid::Ulid;

use super::validation::{trimmed, LayoutJson, ValidationErrors, NO_FILE, REQUIRED};
use super::{Result, StoreError};
use crate::database::{Streamboard, StreamboardRepository};

pub const TITLE_MAX_LENGTH: usize = 255;

/// How many streamboards the recently viewed listing returns.
pub const RECENT_VIEWED_LIMIT: usize = 3;

/// Fields accepted when creating a streamboard. `I` is the image type, an
/// upload before it has been written to blob storage and the blob key after.
#[derive(Debug, Clone)]
pub struct CreateStreamboard<I = String> {
	pub title: Option<String>,
	pub layout_json: Option<LayoutJson>,
	pub background_image: Option<I>,
	pub logo: Option<I>,
}

impl<I> Default for CreateStreamboard<I> {
	fn default() -> Self {
		Self {
			title: None,
			layout_json: None,
			background_image: None,
			logo: None,
		}
	}
}

/// A validated [`CreateStreamboard`].
#[derive(Debug, Clone)]
pub struct NewStreamboard<I = String> {
	pub title: String,
	pub layout_json: Value,
	pub background_image: I,
	pub logo: Option<I>,
}

impl<I> CreateStreamboard<I> {
	pub fn validate(self) -> std::result::Result<NewStreamboard<I>, ValidationErrors> {
		let mut errors = ValidationErrors::default();

		let title = trimmed(self.title).unwrap_or_default();
		errors.max_length("title", &title, TITLE_MAX_LENGTH);

		let layout_json = match self.layout_json.map(LayoutJson::into_value) {
			Some(Ok(layout_json)) => Some(layout_json),
			Some(Err(message)) => {
				errors.add("layout_json", message);
				None
			}
			None => {
				errors.add("layout_json", REQUIRED);
				None
			}
		};

		if self.background_image.is_none() {
			errors.add("background_image", NO_FILE);
		}

		match (layout_json, self.background_image) {
			(Some(layout_json), Some(background_image)) if errors.is_empty() => Ok(NewStreamboard {
				title,
				layout_json,
				background_image,
				logo: self.logo,
			}),
			_ => Err(errors),
		}
	}
}

impl<I> NewStreamboard<I> {
	/// Replaces every image with the output of `f`, which is called with the
	/// image and the name of the field it belongs to.
	pub async fn try_map_images<J, E, F, Fut>(self, mut f: F) -> std::result::Result<NewStreamboard<J>, E>
	where
		F: FnMut(I, &'static str) -> Fut,
		Fut: Future<Output = std::result::Result<J, E>>,
	{
		let background_image = f(self.background_image, "background_image").await?;
		let logo = match self.logo {
			Some(logo) => Some(f(logo, "logo").await?),
			None => None,
		};

		Ok(NewStreamboard {
			title: self.title,
			layout_json: self.layout_json,
			background_image,
			logo,
		})
	}
}

/// Fields accepted by a partial update, absent fields are left untouched.
#[derive(Debug, Clone)]
pub struct StreamboardPatch<I = String> {
	pub title: Option<String>,
	pub layout_json: Option<LayoutJson>,
	pub background_image: Option<I>,
	pub logo: Option<I>,
}

impl<I> Default for StreamboardPatch<I> {
	fn default() -> Self {
		Self {
			title: None,
			layout_json: None,
			background_image: None,
			logo: None,
		}
	}
}

/// A validated [`StreamboardPatch`].
#[derive(Debug, Clone)]
pub struct StreamboardChanges<I = String> {
	pub title: Option<String>,
	pub layout_json: Option<Value>,
	pub background_image: Option<I>,
	pub logo: Option<I>,
}

impl<I> StreamboardPatch<I> {
	pub fn validate(self) -> std::result::Result<StreamboardChanges<I>, ValidationErrors> {
		let mut errors = ValidationErrors::default();

		let title = trimmed(self.title);
		if let Some(title) = &title {
			errors.max_length("title", title, TITLE_MAX_LENGTH);
		}

		let layout_json = match self.layout_json.map(LayoutJson::into_value).transpose() {
			Ok(layout_json) => layout_json,
			Err(message) => {
				errors.add("layout_json", message);
				None
			}
		};

		errors.into_result()?;

		Ok(StreamboardChanges {
			title,
			layout_json,
			background_image: self.background_image,
			logo: self.logo,
		})
	}
}

impl<I> StreamboardChanges<I> {
	pub async fn try_map_images<J, E, F, Fut>(self, mut f: F) -> std::result::Result<StreamboardChanges<J>, E>
	where
		F: FnMut(I, &'static str) -> Fut,
		Fut: Future<Output = std::result::Result<J, E>>,
	{
		let background_image = match self.background_image {
			Some(image) => Some(f(image, "background_image").await?),
			None => None,
		};
		let logo = match self.logo {
			Some(logo) => Some(f(logo, "logo").await?),
			None => None,
		};

		Ok(StreamboardChanges {
			title: self.title,
			layout_json: self.layout_json,
			background_image,
			logo,
		})
	}
}

impl StreamboardChanges {
	fn apply_to(self, board: &mut Streamboard) {
		if let Some(title) = self.title {
			board.title = title;
		}

		if let Some(layout_json) = self.layout_json {
			board.layout_json = layout_json;
		}

		if let Some(background_image) = self.background_image {
			board.background_image = background_image;
		}

		if let Some(logo) = self.logo {
			board.logo = Some(logo);
		}
	}
}

/// Owner scoped access to streamboards. A streamboard that belongs to someone
/// else is reported as [`StoreError::NotFound`].
#[derive(Clone)]
pub struct StreamboardStore {
	repo: Arc<dyn StreamboardRepository>,
}

impl StreamboardStore {
	pub fn new(repo: Arc<dyn StreamboardRepository>) -> Self {
		Self { repo }
	}

	pub async fn create(&self, owner: Ulid, input: CreateStreamboard) -> Result<Streamboard> {
		let input = input.validate()?;
		self.insert(owner, input).await
	}

	/// Stores an already validated streamboard.
	pub async fn insert(&self, owner: Ulid, input: NewStreamboard) -> Result<Streamboard> {
		let now = Utc::now();
		let board = Streamboard {
			id: Ulid::new(),
			owner,
			title: input.title,
			background_image: input.background_image,
			logo: input.logo,
			layout_json: input.layout_json,
			created_at: now,
			updated_at: now,
			last_view: now,
		};

		self.repo.insert_streamboard(&board).await?;

		tracing::debug!(id = %board.id, owner = %owner, "created streamboard");

		Ok(board)
	}

	pub async fn list(&self, owner: Ulid) -> Result<Vec<Streamboard>> {
		Ok(self.repo.streamboards_by_owner(owner).await?)
	}

	/// Looks a streamboard up without counting it as a view.
	pub async fn get(&self, owner: Ulid, id: Ulid) -> Result<Streamboard> {
		self.repo.streamboard_by_id(owner, id).await?.ok_or(StoreError::NotFound)
	}

	/// Opens a streamboard, moving its `last_view` forward to now.
	pub async fn retrieve(&self, owner: Ulid, id: Ulid) -> Result<Streamboard> {
		self.repo
			.touch_streamboard(owner, id, Utc::now())
			.await?
			.ok_or(StoreError::NotFound)
	}

	pub async fn partial_update(&self, owner: Ulid, id: Ulid, patch: StreamboardPatch) -> Result<Streamboard> {
		let changes = patch.validate()?;
		self.apply(owner, id, changes).await
	}

	/// Applies already validated changes.
	pub async fn apply(&self, owner: Ulid, id: Ulid, changes: StreamboardChanges) -> Result<Streamboard> {
		let mut board = self.get(owner, id).await?;

		changes.apply_to(&mut board);
		board.updated_at = Utc::now();

		let board = self
			.repo
			.update_streamboard(&board)
			.await?
			.ok_or(StoreError::NotFound)?;

		tracing::debug!(id = %board.id, owner = %owner, "updated streamboard");

		Ok(board)
	}

	pub async fn get_latest(&self, owner: Ulid) -> Result<Option<Streamboard>> {
		Ok(self.repo.recently_viewed(owner, 1).await?.into_iter().next())
	}

	pub async fn list_recent_viewed(&self, owner: Ulid, limit: usize) -> Result<Vec<Streamboard>> {
		Ok(self.repo.recently_viewed(owner, limit).await?)
	}

	pub async fn delete(&self, owner: Ulid, id: Ulid) -> Result<()> {
		if !self.repo.delete_streamboard(owner, id).await? {
			return Err(StoreError::NotFound);
		}

		tracing::debug!(id = %id, owner = %owner, "deleted streamboard");

		Ok(())
	}
}
