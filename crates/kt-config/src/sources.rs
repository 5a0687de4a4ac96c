// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI.
//!
//! Each source is applied over the result of the previous one, in order of
//! increasing precedence: defaults, file, environment, CLI.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::options::ShadowOptions;

pub const ENV_NAMESPACE: &str = "KT_NAMESPACE";
pub const ENV_IMAGE: &str = "KT_IMAGE";
pub const ENV_WITH_LABELS: &str = "KT_WITH_LABELS";
pub const ENV_WITH_ANNOTATIONS: &str = "KT_WITH_ANNOTATIONS";
pub const ENV_SHARE_SHADOW: &str = "KT_SHARE_SHADOW";
pub const ENV_READY_TIMEOUT_SECS: &str = "KT_READY_TIMEOUT_SECS";
pub const ENV_KEY_DIR: &str = "KT_KEY_DIR";

/// Read a TOML options file.
///
/// Fields missing from the file keep their defaults.
pub fn load_file(path: &Path) -> ConfigResult<ShadowOptions> {
	debug!(path = %path.display(), "loading config file");

	let content = std::fs::read_to_string(path)?;
	let options: ShadowOptions = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
		path: path.to_path_buf(),
		source: e,
	})?;

	trace!(path = %path.display(), "parsed config file");
	Ok(options)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> ConfigResult<T>
where
	T::Err: std::fmt::Display,
{
	value
		.parse()
		.map_err(|e: T::Err| ConfigError::invalid_value(key, e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(ConfigError::invalid_value(
			key,
			format!("expected a boolean, got {other:?}"),
		)),
	}
}

/// Apply `KT_*` overrides using `lookup` to read variables.
///
/// Blank values are ignored.
pub fn apply_env<F>(options: &mut ShadowOptions, lookup: F) -> ConfigResult<()>
where
	F: Fn(&str) -> Option<String>,
{
	let get = |key: &str| {
		lookup(key)
			.map(|v| v.trim().to_string())
			.filter(|v| !v.is_empty())
	};

	if let Some(v) = get(ENV_NAMESPACE) {
		options.namespace = v;
	}
	if let Some(v) = get(ENV_IMAGE) {
		options.image = v;
	}
	if let Some(v) = get(ENV_WITH_LABELS) {
		options.with_labels = v;
	}
	if let Some(v) = get(ENV_WITH_ANNOTATIONS) {
		options.with_annotations = v;
	}
	if let Some(v) = get(ENV_SHARE_SHADOW) {
		options.share_shadow = parse_bool(ENV_SHARE_SHADOW, &v)?;
	}
	if let Some(v) = get(ENV_READY_TIMEOUT_SECS) {
		options.ready_timeout_secs = parse_env(ENV_READY_TIMEOUT_SECS, &v)?;
	}
	if let Some(v) = get(ENV_KEY_DIR) {
		options.key_dir = Some(PathBuf::from(v));
	}

	Ok(())
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub namespace: Option<String>,
	pub image: Option<String>,
	pub share_shadow: Option<bool>,
	pub ready_timeout_secs: Option<u64>,
	pub key_dir: Option<PathBuf>,
}

impl CliOverrides {
	pub fn apply(&self, options: &mut ShadowOptions) {
		if let Some(namespace) = &self.namespace {
			options.namespace = namespace.clone();
		}
		if let Some(image) = &self.image {
			options.image = image.clone();
		}
		if let Some(share) = self.share_shadow {
			options.share_shadow = share;
		}
		if let Some(secs) = self.ready_timeout_secs {
			options.ready_timeout_secs = secs;
		}
		if let Some(dir) = &self.key_dir {
			options.key_dir = Some(dir.clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use tempfile::TempDir;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn env_overrides_fields() {
		let mut opts = ShadowOptions::default();
		apply_env(
			&mut opts,
			env(&[
				(ENV_NAMESPACE, "dev"),
				(ENV_IMAGE, "registry/shadow:1"),
				(ENV_WITH_LABELS, "team=infra"),
				(ENV_SHARE_SHADOW, "true"),
				(ENV_READY_TIMEOUT_SECS, "30"),
				(ENV_KEY_DIR, "/tmp/keys"),
			]),
		)
		.unwrap();

		assert_eq!(opts.namespace, "dev");
		assert_eq!(opts.image, "registry/shadow:1");
		assert_eq!(opts.with_labels, "team=infra");
		assert!(opts.share_shadow);
		assert_eq!(opts.ready_timeout_secs, 30);
		assert_eq!(opts.key_dir, Some(PathBuf::from("/tmp/keys")));
	}

	#[test]
	fn blank_env_values_are_ignored() {
		let mut opts = ShadowOptions::default();
		apply_env(&mut opts, env(&[(ENV_NAMESPACE, "  ")])).unwrap();
		assert_eq!(opts.namespace, "default");
	}

	#[test]
	fn bad_env_values_are_rejected() {
		let mut opts = ShadowOptions::default();
		let err = apply_env(&mut opts, env(&[(ENV_READY_TIMEOUT_SECS, "soon")])).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == ENV_READY_TIMEOUT_SECS));

		let err = apply_env(&mut opts, env(&[(ENV_SHARE_SHADOW, "maybe")])).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == ENV_SHARE_SHADOW));
	}

	#[test]
	fn file_is_loaded() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("config.toml");
		std::fs::write(&path, "namespace = \"staging\"\nready_timeout_secs = 45\n").unwrap();

		let opts = load_file(&path).unwrap();
		assert_eq!(opts.namespace, "staging");
		assert_eq!(opts.ready_timeout_secs, 45);
	}

	#[test]
	fn invalid_toml_names_the_file() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("config.toml");
		std::fs::write(&path, "namespace = [").unwrap();

		let err = load_file(&path).unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { path: ref p, .. } if p == &path));
	}

	#[test]
	fn cli_only_touches_given_fields() {
		let mut opts = ShadowOptions {
			namespace: "dev".to_string(),
			..Default::default()
		};
		CliOverrides {
			share_shadow: Some(true),
			..Default::default()
		}
		.apply(&mut opts);
		assert_eq!(opts.namespace, "dev");
		assert!(opts.share_shadow);
	}
}
