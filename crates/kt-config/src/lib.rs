// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for kt shadow pods.
//!
//! This crate provides:
//! - [`ShadowOptions`] with built-in defaults
//! - TOML configuration file parsing
//! - `KT_*` environment variable overrides
//! - Command-line overrides
//! - Validation

pub mod error;
pub mod kv;
pub mod options;
pub mod paths;
pub mod sources;

use std::path::Path;

use tracing::debug;

pub use error::{ConfigError, ConfigResult};
pub use kv::{format_key_value_pairs, parse_key_value, parse_key_value_pairs};
pub use options::{ShadowOptions, SshOptions};
pub use sources::CliOverrides;

/// Load options from the process environment.
///
/// An explicit `config_path` must exist; the default path is skipped when
/// absent.
pub fn load_options(
	config_path: Option<&Path>,
	cli: &CliOverrides,
) -> ConfigResult<ShadowOptions> {
	let default_path;
	let file = match config_path {
		Some(path) => Some(path),
		None => {
			default_path = paths::default_config_path()?;
			default_path.exists().then_some(default_path.as_path())
		}
	};

	load_options_with(file, |key| std::env::var(key).ok(), cli)
}

/// Layer defaults, `file`, environment (through `env_lookup`) and `cli`, then
/// validate the result.
pub fn load_options_with<F>(
	file: Option<&Path>,
	env_lookup: F,
	cli: &CliOverrides,
) -> ConfigResult<ShadowOptions>
where
	F: Fn(&str) -> Option<String>,
{
	let mut options = match file {
		Some(path) => sources::load_file(path)?,
		None => {
			debug!("no config file, using defaults");
			ShadowOptions::default()
		}
	};

	sources::apply_env(&mut options, env_lookup)?;
	cli.apply(&mut options);
	options.validate()?;

	Ok(options)
}
