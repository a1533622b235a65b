use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, postgres_from_row::FromRow)]
pub struct User {
	/// The unique identifier for the user.
	pub id: Ulid,
	/// Lowercased, unique.
	pub username: String,
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	/// The hashed password of the user. (argon2)
	pub password_hash: String,
	/// Blob key of the profile picture.
	pub profile_picture: Option<String>,
	/// Whether the user prefers the dark theme.
	pub is_dark: bool,
	/// The time the user was created.
	pub created_at: DateTime<Utc>,
	/// The time the user was last updated.
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to hash password: {0}")]
pub struct HashError(argon2::password_hash::Error);

impl User {
	/// Uses argon2 to verify the password hash against the provided password.
	pub fn verify_password(&self, password: &str) -> bool {
		let hash = match PasswordHash::new(&self.password_hash) {
			Ok(hash) => hash,
			Err(err) => {
				tracing::error!("failed to parse password hash: {}", err);
				return false;
			}
		};

		Argon2::default().verify_password(password.as_bytes(), &hash).is_ok()
	}

	/// Generates a new password hash using argon2.
	pub fn hash_password(password: &str) -> Result<String, HashError> {
		let salt = SaltString::generate(&mut OsRng);

		Argon2::default()
			.hash_password(password.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(HashError)
	}
}
