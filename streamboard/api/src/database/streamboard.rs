use chrono::{DateTime, Utc};
use serde_json::Value;
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, postgres_from_row::FromRow)]
pub struct Streamboard {
	/// The unique identifier for the streamboard.
	pub id: Ulid,
	/// The user who owns the streamboard, never changes after creation.
	#[from_row(rename = "user_id")]
	pub owner: Ulid,
	/// Display title, may be empty.
	pub title: String,
	/// Blob key of the background image.
	pub background_image: String,
	/// Blob key of the logo.
	pub logo: Option<String>,
	/// Free-form layout document, stored as JSONB.
	pub layout_json: Value,
	pub created_at: DateTime<Utc>,
	/// Refreshed on every write.
	pub updated_at: DateTime<Utc>,
	/// Refreshed only when the streamboard is opened.
	pub last_view: DateTime<Utc>,
}

impl Streamboard {
	/// Orders by most recently viewed, newer ids first on equal timestamps.
	pub fn recency_cmp(&self, other: &Self) -> std::cmp::Ordering {
		other.last_view.cmp(&self.last_view).then_with(|| other.id.cmp(&self.id))
	}
}
