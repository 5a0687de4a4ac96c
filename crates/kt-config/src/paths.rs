// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};

/// User config file: `$XDG_CONFIG_HOME/kt/config.toml`, falling back to
/// `~/.config/kt/config.toml`.
pub fn default_config_path() -> ConfigResult<PathBuf> {
	let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
		Some(dir) => PathBuf::from(dir),
		None => dirs::home_dir()
			.ok_or(ConfigError::HomeDirNotFound)?
			.join(".config"),
	};

	let path = config_home.join("kt").join("config.toml");
	tracing::debug!(path = %path.display(), "resolved config path");
	Ok(path)
}
