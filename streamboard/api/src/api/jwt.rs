use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use serde_json::Value;
use sha2::Sha256;
use ulid::Ulid;

use crate::config::JwtConfig;
use crate::global::ApiGlobal;

const TOKEN_TYPE_CLAIM: &str = "token_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
	Access,
	Refresh,
}

impl TokenKind {
	fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access",
			TokenKind::Refresh => "refresh",
		}
	}

	fn parse(s: &str) -> Option<Self> {
		match s {
			"access" => Some(TokenKind::Access),
			"refresh" => Some(TokenKind::Refresh),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthJwtPayload {
	pub user_id: Ulid,
	pub token_id: Ulid,
	pub kind: TokenKind,
	pub issued_at: DateTime<Utc>,
	pub expiration: Option<DateTime<Utc>>,
}

pub trait JwtState: Sized {
	fn to_claims(&self) -> Claims;

	fn from_claims(claims: &Claims) -> Option<Self>;

	fn serialize<G: ApiGlobal>(&self, global: &Arc<G>) -> Option<String> {
		let config = global.config::<JwtConfig>();

		let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
		let mut claims = self.to_claims();

		claims.registered.issuer = Some(config.issuer.clone());

		if claims.registered.issued_at.is_none() {
			claims.registered.issued_at = Some(Utc::now().timestamp() as u64);
		}

		claims.sign_with_key(&key).ok()
	}

	fn verify<G: ApiGlobal>(global: &Arc<G>, token: &str) -> Option<Self> {
		let config = global.config::<JwtConfig>();

		let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
		let token: Token<Header, Claims, _> = token.verify_with_key(&key).ok()?;

		let claims = token.claims();

		if claims.registered.issuer.as_ref() != Some(&config.issuer) {
			return None;
		}

		let iat = Utc.timestamp_opt(claims.registered.issued_at? as i64, 0).single()?;
		if iat > Utc::now() {
			return None;
		}

		let nbf = claims
			.registered
			.not_before
			.and_then(|x| Utc.timestamp_opt(x as i64, 0).single());
		if let Some(nbf) = nbf {
			if nbf > Utc::now() {
				return None;
			}
		}

		let exp = claims
			.registered
			.expiration
			.and_then(|x| Utc.timestamp_opt(x as i64, 0).single());
		if let Some(exp) = exp {
			if exp < Utc::now() {
				return None;
			}
		}

		Self::from_claims(claims)
	}
}

impl AuthJwtPayload {
	/// A fresh token of `kind` for `user_id`, valid for the lifetime configured
	/// for that kind.
	pub fn new(config: &JwtConfig, user_id: Ulid, kind: TokenKind) -> Self {
		let ttl = match kind {
			TokenKind::Access => config.access_token_ttl,
			TokenKind::Refresh => config.refresh_token_ttl,
		};

		let issued_at = Utc::now();
		// Lifetimes past the largest representable date saturate there.
		let expiration = i64::try_from(ttl)
			.ok()
			.and_then(Duration::try_seconds)
			.and_then(|ttl| issued_at.checked_add_signed(ttl))
			.unwrap_or(DateTime::<Utc>::MAX_UTC);

		Self {
			user_id,
			token_id: Ulid::new(),
			kind,
			issued_at,
			expiration: Some(expiration),
		}
	}
}

impl JwtState for AuthJwtPayload {
	fn to_claims(&self) -> Claims {
		let mut claims = Claims::new(RegisteredClaims {
			issuer: None,
			subject: Some(self.user_id.to_string()),
			audience: None,
			expiration: self.expiration.map(|x| x.timestamp() as u64),
			not_before: None,
			issued_at: Some(self.issued_at.timestamp() as u64),
			json_web_token_id: Some(self.token_id.to_string()),
		});

		claims
			.private
			.insert(TOKEN_TYPE_CLAIM.to_owned(), Value::String(self.kind.as_str().to_owned()));

		claims
	}

	fn from_claims(claims: &Claims) -> Option<Self> {
		Some(Self {
			user_id: claims.registered.subject.as_ref().and_then(|x| Ulid::from_string(x).ok())?,
			token_id: claims
				.registered
				.json_web_token_id
				.as_ref()
				.and_then(|x| Ulid::from_string(x).ok())?,
			kind: claims
				.private
				.get(TOKEN_TYPE_CLAIM)
				.and_then(Value::as_str)
				.and_then(TokenKind::parse)?,
			issued_at: Utc.timestamp_opt(claims.registered.issued_at? as i64, 0).single()?,
			expiration: claims
				.registered
				.expiration
				.and_then(|x| Utc.timestamp_opt(x as i64, 0).single()),
		})
	}
}
