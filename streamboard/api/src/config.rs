use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApiConfig {
	/// Bind address for the API
	pub bind_address: SocketAddr,

	/// Upper bound for a whole request body in bytes
	pub max_upload_size: usize,

	/// Origins allowed by CORS, `*` allows any
	pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
			max_upload_size: 10 * 1024 * 1024,
			allowed_origins: vec!["*".to_string()],
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct JwtConfig {
	/// JWT secret
	pub secret: String,

	/// JWT issuer
	pub issuer: String,

	/// Lifetime of access tokens in seconds
	pub access_token_ttl: u64,

	/// Lifetime of refresh tokens in seconds
	pub refresh_token_ttl: u64,
}

impl Default for JwtConfig {
	fn default() -> Self {
		Self {
			secret: "streamboard".to_string(),
			issuer: "streamboard".to_string(),
			access_token_ttl: 5 * 60,
			refresh_token_ttl: 24 * 60 * 60,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct MediaConfig {
	/// Directory uploaded files are written to
	pub root: PathBuf,

	/// Public prefix stored files are served under
	pub url: String,
}

impl Default for MediaConfig {
	fn default() -> Self {
		Self {
			root: PathBuf::from("media"),
			url: "/media/".to_string(),
		}
	}
}
