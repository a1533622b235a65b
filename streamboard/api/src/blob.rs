use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use file_format::FileFormat;
use ulid::Ulid;

/// Where uploads of each kind are written, relative to the media root.
pub const BACKGROUND_PATH: &str = "streamboards/backgrounds";
pub const LOGO_PATH: &str = "streamboards/logo";
pub const PROFILE_PICTURE_PATH: &str = "profile_pictures";

/// One of the image formats accepted for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormat(&'static FileFormat);

impl ImageFormat {
	pub const AVIF: Self = Self(&FileFormat::Av1ImageFileFormat);
	pub const BMP: Self = Self(&FileFormat::WindowsBitmap);
	pub const GIF: Self = Self(&FileFormat::GraphicsInterchangeFormat);
	pub const JPEG: Self = Self(&FileFormat::JointPhotographicExpertsGroup);
	pub const PNG: Self = Self(&FileFormat::PortableNetworkGraphics);
	pub const WEBP: Self = Self(&FileFormat::Webp);

	const ALL: [Self; 6] = [Self::PNG, Self::JPEG, Self::GIF, Self::WEBP, Self::AVIF, Self::BMP];

	/// Detects the format from the file contents.
	pub fn sniff(data: &[u8]) -> Option<Self> {
		let format = match FileFormat::from_bytes(data) {
			FileFormat::AnimatedPortableNetworkGraphics => FileFormat::PortableNetworkGraphics,
			FileFormat::Av1ImageFileFormatSequence => FileFormat::Av1ImageFileFormat,
			format => format,
		};

		Self::ALL.into_iter().find(|allowed| *allowed.0 == format)
	}

	pub fn from_extension(ext: &str) -> Option<Self> {
		let ext = ext.to_ascii_lowercase();
		let ext = if ext == "jpeg" { "jpg" } else { ext.as_str() };
		Self::ALL.into_iter().find(|allowed| allowed.extension() == ext)
	}

	pub fn extension(self) -> &'static str {
		self.0.extension()
	}

	pub fn content_type(self) -> &'static str {
		self.0.media_type()
	}
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
	#[error("not a supported image")]
	NotAnImage,
	#[error("invalid blob key: {0}")]
	InvalidKey(String),
	#[error("blob not found")]
	NotFound,
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

/// A stored file read back with the content type derived from its key.
#[derive(Debug, Clone)]
pub struct Blob {
	pub data: Bytes,
	pub content_type: &'static str,
}

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
	/// Stores an image under `path` and returns its key.
	async fn store(&self, path: &str, data: Bytes) -> Result<String, BlobError>;

	async fn read(&self, key: &str) -> Result<Blob, BlobError>;

	/// The public URL the blob is served under.
	fn url(&self, key: &str) -> String;
}

/// Files on local disk below a media root, named `<path>/<ulid>.<ext>`.
pub struct LocalBlobStore {
	root: PathBuf,
	url: String,
}

impl LocalBlobStore {
	pub fn new(root: impl Into<PathBuf>, url: impl Into<String>) -> Self {
		Self {
			root: root.into(),
			url: url.into(),
		}
	}

	/// Keys are relative paths made of normal components only.
	fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
		let path = Path::new(key);

		if key.is_empty() || key.contains('\\') || !path.components().all(|c| matches!(c, Component::Normal(_))) {
			return Err(BlobError::InvalidKey(key.to_owned()));
		}

		Ok(self.root.join(path))
	}
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
	async fn store(&self, path: &str, data: Bytes) -> Result<String, BlobError> {
		let format = ImageFormat::sniff(&data).ok_or(BlobError::NotAnImage)?;

		let key = format!("{}/{}.{}", path.trim_matches('/'), Ulid::new(), format.extension());
		let file = self.resolve(&key)?;

		if let Some(parent) = file.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		tokio::fs::write(&file, &data).await?;

		tracing::debug!(key = %key, size = data.len(), "stored blob");

		Ok(key)
	}

	async fn read(&self, key: &str) -> Result<Blob, BlobError> {
		let file = self.resolve(key)?;

		let content_type = file
			.extension()
			.and_then(|ext| ext.to_str())
			.and_then(ImageFormat::from_extension)
			.map(ImageFormat::content_type)
			.unwrap_or("application/octet-stream");

		let data = match tokio::fs::read(&file).await {
			Ok(data) => data,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(BlobError::NotFound),
			Err(err) => return Err(err.into()),
		};

		Ok(Blob {
			data: Bytes::from(data),
			content_type,
		})
	}

	fn url(&self, key: &str) -> String {
		format!("{}/{}", self.url.trim_end_matches('/'), key)
	}
}
