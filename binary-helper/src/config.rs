use std::path::PathBuf;

use clap::Parser;
use serde::de::DeserializeOwned;

use crate::logging;

/// Prefix for environment overrides, `STREAMBOARD__DATABASE__URI` sets
/// `database.uri`.
pub const ENV_PREFIX: &str = "STREAMBOARD";

/// Startup configuration of a service.
pub trait Config: Sized {
	fn parse() -> anyhow::Result<Self>;

	fn logging(&self) -> &LoggingConfig;

	fn name(&self) -> &str;

	/// Runs after parsing and before logging is initialized. An error here
	/// aborts startup.
	fn pre_hook(&mut self) -> anyhow::Result<()> {
		Ok(())
	}

	fn load() -> anyhow::Result<Self> {
		let mut config = Self::parse()?;
		config.pre_hook()?;
		Ok(config)
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// The log level to use, this is a tracing env filter
	pub level: String,

	/// What logging mode we should use
	pub mode: logging::Mode,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			mode: logging::Mode::Default,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
	/// The database URL to use, `memory://` keeps everything in process
	pub uri: String,

	/// Maximum number of pooled connections
	pub pool_size: usize,
}

impl DatabaseConfig {
	pub fn is_memory(&self) -> bool {
		self.uri.starts_with("memory://")
	}
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			uri: "postgres://localhost:5432/streamboard".to_string(),
			pool_size: 16,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, bound(deserialize = "T: DeserializeOwned"))]
pub struct AppConfig<T: ConfigExtention> {
	/// The name of the application
	pub name: String,

	/// The path to the config file
	pub config_file: Option<String>,

	/// The logging configuration
	pub logging: LoggingConfig,

	/// The database configuration
	pub database: DatabaseConfig,

	#[serde(flatten)]
	pub extra: T,
}

pub trait ConfigExtention: DeserializeOwned + Default {
	const APP_NAME: &'static str;

	fn config_default() -> AppConfig<Self> {
		AppConfig {
			name: Self::APP_NAME.to_owned(),
			config_file: Some("config".to_owned()),
			logging: Default::default(),
			database: Default::default(),
			extra: Self::default(),
		}
	}

	fn pre_hook(_config: &mut AppConfig<Self>) -> anyhow::Result<()> {
		Ok(())
	}
}

impl<T: ConfigExtention> Default for AppConfig<T> {
	fn default() -> Self {
		T::config_default()
	}
}

impl<T: ConfigExtention> Config for AppConfig<T> {
	fn logging(&self) -> &LoggingConfig {
		&self.logging
	}

	fn parse() -> anyhow::Result<Self> {
		let cli = if cfg!(test) { Cli::default() } else { Cli::parse() };

		let (mut config, config_file) = parse::<Self>(&cli, Self::default().config_file)?;
		config.config_file = config_file;

		Ok(config)
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn pre_hook(&mut self) -> anyhow::Result<()> {
		T::pre_hook(self)
	}
}

#[derive(Debug, Default, Clone, Parser)]
#[command(version, about)]
pub struct Cli {
	/// Path to a config file (toml, yaml or json)
	#[arg(long, env = "STREAMBOARD_CONFIG_FILE")]
	pub config_file: Option<String>,

	/// Override a single key, for example `--set api.bind_address=0.0.0.0:8000`
	#[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
	pub overrides: Vec<(String, String)>,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
	raw.split_once('=')
		.map(|(key, value)| (key.trim().to_owned(), value.to_owned()))
		.filter(|(key, _)| !key.is_empty())
		.ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

/// Typed values for overrides so numbers and booleans survive the `flatten`
/// on [`AppConfig`].
fn override_value(raw: &str) -> config::Value {
	if let Ok(value) = raw.parse::<i64>() {
		value.into()
	} else if let Ok(value) = raw.parse::<f64>() {
		value.into()
	} else if let Ok(value) = raw.parse::<bool>() {
		value.into()
	} else {
		raw.into()
	}
}

/// Accepts either an exact path or a stem such as `config` that is completed
/// with one of the supported extensions.
fn resolve_config_file(path: &str) -> Option<PathBuf> {
	let exact = PathBuf::from(path);
	if exact.is_file() {
		return Some(exact);
	}

	["toml", "yaml", "yml", "json"]
		.iter()
		.map(|ext| PathBuf::from(format!("{path}.{ext}")))
		.find(|candidate| candidate.is_file())
}

/// Layers the config sources, highest priority first: CLI overrides,
/// environment, config file. Returns the parsed config and the canonical path
/// of the file that was loaded, if any.
pub fn parse<C: DeserializeOwned>(cli: &Cli, default_file: Option<String>) -> anyhow::Result<(C, Option<String>)> {
	let mut builder = config::Config::builder();

	let provided = cli.config_file.is_some();
	let mut config_path = None;

	if let Some(path) = cli.config_file.clone().or(default_file) {
		match resolve_config_file(&path) {
			Some(file) => {
				builder = builder.add_source(config::File::from(file.as_path()));
				config_path = Some(file);
			}
			None if provided => anyhow::bail!("config file not found: {path}"),
			None => tracing::debug!(path, "no config file found, using defaults"),
		}
	}

	builder = builder.add_source(
		config::Environment::with_prefix(ENV_PREFIX)
			.prefix_separator("__")
			.separator("__")
			.try_parsing(true),
	);

	for (key, value) in &cli.overrides {
		builder = builder.set_override(key.as_str(), override_value(value))?;
	}

	let config = builder.build()?.try_deserialize()?;

	let config_path = config_path
		.map(|path| std::fs::canonicalize(&path).unwrap_or(path))
		.map(|path| path.display().to_string());

	Ok((config, config_path))
}
