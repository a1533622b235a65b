use std::io::Write;

use serial_test::serial;

use crate::config::{parse, AppConfig, Cli, Config, ConfigExtention};
use crate::logging::Mode;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
struct ServiceConfig {
	service: ServiceSection,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
struct ServiceSection {
	port: u16,
	motd: String,
}

impl Default for ServiceSection {
	fn default() -> Self {
		Self {
			port: 8080,
			motd: "hello".to_owned(),
		}
	}
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			service: ServiceSection::default(),
		}
	}
}

impl ConfigExtention for ServiceConfig {
	const APP_NAME: &'static str = "test-service";
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
	let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
	file.write_all(contents.as_bytes()).unwrap();
	file
}

#[test]
#[serial]
fn test_parse_defaults_without_file() {
	let cli = Cli::default();
	let (config, path) = parse::<AppConfig<ServiceConfig>>(&cli, Some("/nonexistent/streamboard".into())).unwrap();

	assert!(path.is_none());
	assert_eq!(config.name, "test-service");
	assert_eq!(config.logging.level, "info");
	assert_eq!(config.extra.service.port, 8080);
}

#[test]
#[serial]
fn test_parse_missing_explicit_file_fails() {
	let cli = Cli {
		config_file: Some("/nonexistent/streamboard.toml".into()),
		..Default::default()
	};

	assert!(parse::<AppConfig<ServiceConfig>>(&cli, None).is_err());
}

#[test]
#[serial]
fn test_parse_file() {
	let file = write_config(
		r#"
name = "from-file"

[logging]
level = "debug"
mode = "json"

[database]
uri = "memory://"

[service]
port = 9000
"#,
	);

	let cli = Cli {
		config_file: Some(file.path().display().to_string()),
		..Default::default()
	};
	let (config, path) = parse::<AppConfig<ServiceConfig>>(&cli, None).unwrap();

	assert!(path.is_some());
	assert_eq!(config.name, "from-file");
	assert_eq!(config.logging.mode, Mode::Json);
	assert!(config.database.is_memory());
	assert_eq!(config.extra.service.port, 9000);
	assert_eq!(config.extra.service.motd, "hello");
}

#[test]
#[serial]
fn test_parse_priority() {
	let file = write_config(
		r#"
[service]
port = 9000
motd = "file"
"#,
	);

	std::env::set_var("STREAMBOARD__SERVICE__PORT", "9100");
	std::env::set_var("STREAMBOARD__SERVICE__MOTD", "env");

	let cli = Cli {
		config_file: Some(file.path().display().to_string()),
		overrides: vec![("service.port".into(), "9200".into())],
	};
	let result = parse::<AppConfig<ServiceConfig>>(&cli, None);

	std::env::remove_var("STREAMBOARD__SERVICE__PORT");
	std::env::remove_var("STREAMBOARD__SERVICE__MOTD");

	let (config, _) = result.unwrap();
	assert_eq!(config.extra.service.port, 9200);
	assert_eq!(config.extra.service.motd, "env");
}

#[derive(Debug, Default, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
struct PersistentConfig {}

impl ConfigExtention for PersistentConfig {
	const APP_NAME: &'static str = "persistent-service";

	fn pre_hook(config: &mut AppConfig<Self>) -> anyhow::Result<()> {
		anyhow::ensure!(!config.database.is_memory(), "an in-memory database loses every write on restart");
		config.logging.level = config.logging.level.to_lowercase();
		Ok(())
	}
}

#[test]
#[serial]
fn test_load_runs_pre_hook() {
	std::env::set_var("STREAMBOARD__LOGGING__LEVEL", "DEBUG");
	let loaded = AppConfig::<PersistentConfig>::load();
	std::env::remove_var("STREAMBOARD__LOGGING__LEVEL");

	let config = loaded.unwrap();
	assert_eq!(config.name(), "persistent-service");
	assert_eq!(config.logging().level, "debug");

	std::env::set_var("STREAMBOARD__DATABASE__URI", "memory://");
	let rejected = AppConfig::<PersistentConfig>::load();
	std::env::remove_var("STREAMBOARD__DATABASE__URI");

	assert!(rejected.is_err());
}
