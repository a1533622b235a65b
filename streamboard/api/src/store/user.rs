use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use ulid::Ulid;

use super::validation::{trimmed, ValidationErrors, NOT_BLANK, REQUIRED};
use super::{Result, StoreError};
use crate::database::{RepositoryError, User, UserRepository};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;

const INVALID_USERNAME: &str =
	"Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";

const PASSWORDS_REQUIRED: &str = "Both current_password and new_password are required.";
const PASSWORD_INCORRECT: &str = "Current password is incorrect.";

/// Account fields accepted by signup and profile updates. `I` is the profile
/// picture, an upload before it has been stored and the blob key after.
#[derive(Debug, Clone)]
pub struct UserFields<I = String> {
	pub username: Option<String>,
	pub password: Option<String>,
	pub email: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub is_dark: Option<bool>,
	pub profile_picture: Option<I>,
}

impl<I> Default for UserFields<I> {
	fn default() -> Self {
		Self {
			username: None,
			password: None,
			email: None,
			first_name: None,
			last_name: None,
			is_dark: None,
			profile_picture: None,
		}
	}
}

impl<I> UserFields<I> {
	/// Signup requires a username and a password.
	pub fn validate_signup(self) -> std::result::Result<Self, ValidationErrors> {
		self.validate(true)
	}

	pub fn validate_update(self) -> std::result::Result<Self, ValidationErrors> {
		self.validate(false)
	}

	/// Text fields come back trimmed and usernames lowercased. Passwords are
	/// kept as typed.
	fn validate(mut self, required: bool) -> std::result::Result<Self, ValidationErrors> {
		let mut errors = ValidationErrors::default();

		self.username = trimmed(self.username);
		self.email = trimmed(self.email);
		self.first_name = trimmed(self.first_name);
		self.last_name = trimmed(self.last_name);

		match &self.username {
			Some(username) => validate_username(&mut errors, username),
			None if required => errors.add("username", REQUIRED),
			None => {}
		}

		match &self.password {
			Some(password) => validate_password(&mut errors, "password", password),
			None if required => errors.add("password", REQUIRED),
			None => {}
		}

		if let Some(email) = &self.email {
			validate_email(&mut errors, email);
		}

		if let Some(first_name) = &self.first_name {
			errors.max_length("first_name", first_name, NAME_MAX_LENGTH);
		}

		if let Some(last_name) = &self.last_name {
			errors.max_length("last_name", last_name, NAME_MAX_LENGTH);
		}

		errors.into_result()?;

		self.username = self.username.map(|username| username.to_lowercase());

		Ok(self)
	}

	pub async fn try_map_image<J, E, F, Fut>(self, f: F) -> std::result::Result<UserFields<J>, E>
	where
		F: FnOnce(I) -> Fut,
		Fut: Future<Output = std::result::Result<J, E>>,
	{
		let profile_picture = match self.profile_picture {
			Some(picture) => Some(f(picture).await?),
			None => None,
		};

		Ok(UserFields {
			username: self.username,
			password: self.password,
			email: self.email,
			first_name: self.first_name,
			last_name: self.last_name,
			is_dark: self.is_dark,
			profile_picture,
		})
	}
}

fn validate_username(errors: &mut ValidationErrors, username: &str) {
	if username.is_empty() {
		errors.add("username", NOT_BLANK);
		return;
	}

	errors.max_length("username", username, USERNAME_MAX_LENGTH);

	if !username
		.chars()
		.all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
	{
		errors.add("username", INVALID_USERNAME);
	}
}

/// Passwords must be 8 to 128 characters and not made of digits only.
pub fn validate_password(errors: &mut ValidationErrors, field: &str, password: &str) {
	if password.is_empty() {
		errors.add(field, NOT_BLANK);
		return;
	}

	let length = password.chars().count();
	if length < PASSWORD_MIN_LENGTH {
		errors.add(
			field,
			format!("This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."),
		);
	}

	errors.max_length(field, password, PASSWORD_MAX_LENGTH);

	if password.chars().all(|c| c.is_ascii_digit()) {
		errors.add(field, PASSWORD_NUMERIC);
	}
}

fn validate_email(errors: &mut ValidationErrors, email: &str) {
	if email.is_empty() {
		return;
	}

	errors.max_length("email", email, EMAIL_MAX_LENGTH);

	if !email_address::EmailAddress::is_valid(email) {
		errors.add("email", INVALID_EMAIL);
	}
}

fn map_conflict(err: RepositoryError) -> StoreError {
	match err {
		RepositoryError::Conflict(field) => StoreError::Validation(ValidationErrors::single(field, USERNAME_TAKEN)),
		err => StoreError::Repository(err),
	}
}

#[derive(Clone)]
pub struct UserStore {
	repo: Arc<dyn UserRepository>,
}

impl UserStore {
	pub fn new(repo: Arc<dyn UserRepository>) -> Self {
		Self { repo }
	}

	pub async fn signup(&self, fields: UserFields) -> Result<User> {
		let fields = fields.validate_signup()?;
		self.insert(fields).await
	}

	/// Creates an account from fields that already passed
	/// [`UserFields::validate_signup`].
	pub async fn insert(&self, fields: UserFields) -> Result<User> {
		let (Some(username), Some(password)) = (fields.username, fields.password) else {
			let mut errors = ValidationErrors::default();
			errors.add("username", REQUIRED);
			errors.add("password", REQUIRED);
			return Err(StoreError::Validation(errors));
		};

		let now = Utc::now();
		let user = User {
			id: Ulid::new(),
			username,
			email: fields.email.unwrap_or_default(),
			first_name: fields.first_name.unwrap_or_default(),
			last_name: fields.last_name.unwrap_or_default(),
			password_hash: User::hash_password(&password)?,
			profile_picture: fields.profile_picture,
			is_dark: fields.is_dark.unwrap_or(false),
			created_at: now,
			updated_at: now,
		};

		self.repo.insert_user(&user).await.map_err(map_conflict)?;

		tracing::debug!(id = %user.id, username = %user.username, "created user");

		Ok(user)
	}

	/// Returns the user if the credentials match.
	pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
		let Some(user) = self.repo.user_by_username(&username.trim().to_lowercase()).await? else {
			return Ok(None);
		};

		Ok(user.verify_password(password).then_some(user))
	}

	pub async fn by_id(&self, id: Ulid) -> Result<Option<User>> {
		Ok(self.repo.user_by_id(id).await?)
	}

	pub async fn update_profile(&self, user: &User, fields: UserFields) -> Result<User> {
		let fields = fields.validate_update()?;
		self.apply(user, fields).await
	}

	/// Applies fields that already passed [`UserFields::validate_update`].
	pub async fn apply(&self, user: &User, fields: UserFields) -> Result<User> {
		let mut user = user.clone();

		if let Some(username) = fields.username {
			user.username = username;
		}

		if let Some(password) = fields.password {
			user.password_hash = User::hash_password(&password)?;
		}

		if let Some(email) = fields.email {
			user.email = email;
		}

		if let Some(first_name) = fields.first_name {
			user.first_name = first_name;
		}

		if let Some(last_name) = fields.last_name {
			user.last_name = last_name;
		}

		if let Some(is_dark) = fields.is_dark {
			user.is_dark = is_dark;
		}

		if let Some(profile_picture) = fields.profile_picture {
			user.profile_picture = Some(profile_picture);
		}

		user.updated_at = Utc::now();

		self.repo
			.update_user(&user)
			.await
			.map_err(map_conflict)?
			.ok_or(StoreError::NotFound)
	}

	pub async fn change_password(
		&self,
		user: &User,
		current_password: Option<&str>,
		new_password: Option<&str>,
	) -> Result<User> {
		let (Some(current_password), Some(new_password)) = (
			current_password.filter(|p| !p.is_empty()),
			new_password.filter(|p| !p.is_empty()),
		) else {
			return Err(StoreError::Detail(PASSWORDS_REQUIRED));
		};

		if !user.verify_password(current_password) {
			return Err(StoreError::Detail(PASSWORD_INCORRECT));
		}

		let mut errors = ValidationErrors::default();
		validate_password(&mut errors, "new_password", new_password);
		errors.into_result()?;

		let mut user = user.clone();
		user.password_hash = User::hash_password(new_password)?;
		user.updated_at = Utc::now();

		let user = self.repo.update_user(&user).await?.ok_or(StoreError::NotFound)?;

		tracing::debug!(id = %user.id, "changed password");

		Ok(user)
	}
}
