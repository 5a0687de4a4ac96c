// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolved shadow options.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::kv::parse_key_value_pairs;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_IMAGE: &str = "ghcr.io/kt-dev/kt-shadow:latest";
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SSH_USERNAME: &str = "root";
pub const DEFAULT_SSH_REMOTE_HOST: &str = "127.0.0.1";
pub const DEFAULT_SSH_PORT: u16 = 2222;

/// How the local SSH client reaches a shadow once it is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshOptions {
	pub username: String,
	/// Local end of the port-forward into the shadow
	pub remote_host: String,
	pub port: u16,
}

impl Default for SshOptions {
	fn default() -> Self {
		Self {
			username: DEFAULT_SSH_USERNAME.to_string(),
			remote_host: DEFAULT_SSH_REMOTE_HOST.to_string(),
			port: DEFAULT_SSH_PORT,
		}
	}
}

/// Options consumed by shadow orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowOptions {
	pub namespace: String,
	pub image: String,
	/// Extra labels, `k=v,k2=v2`. Applied over the caller's labels.
	pub with_labels: String,
	/// Extra annotations, `k=v,k2=v2`. Applied over the caller's annotations.
	pub with_annotations: String,
	/// Reuse an existing shadow with the same name instead of creating one.
	pub share_shadow: bool,
	pub ready_timeout_secs: u64,
	/// Where private keys are written. `None` means `~/.kt/pk`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub key_dir: Option<PathBuf>,
	pub ssh: SshOptions,
}

impl Default for ShadowOptions {
	fn default() -> Self {
		Self {
			namespace: DEFAULT_NAMESPACE.to_string(),
			image: DEFAULT_IMAGE.to_string(),
			with_labels: String::new(),
			with_annotations: String::new(),
			share_shadow: false,
			ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
			key_dir: None,
			ssh: SshOptions::default(),
		}
	}
}

impl ShadowOptions {
	pub fn ready_timeout(&self) -> Duration {
		Duration::from_secs(self.ready_timeout_secs)
	}

	/// Parsed `with_labels`.
	pub fn extra_labels(&self) -> ConfigResult<BTreeMap<String, String>> {
		parse_key_value_pairs(&self.with_labels)
			.map_err(|e| ConfigError::invalid_value("with_labels", e.to_string()))
	}

	/// Parsed `with_annotations`.
	pub fn extra_annotations(&self) -> ConfigResult<BTreeMap<String, String>> {
		parse_key_value_pairs(&self.with_annotations)
			.map_err(|e| ConfigError::invalid_value("with_annotations", e.to_string()))
	}

	/// Namespace a shadow is created in. Unlike listing, a shadow cannot
	/// span all namespaces, so an empty namespace is rejected.
	pub fn shadow_namespace(&self) -> ConfigResult<&str> {
		if self.namespace.trim().is_empty() {
			return Err(ConfigError::validation(
				"a namespace is required to create or reuse a shadow",
			));
		}
		Ok(&self.namespace)
	}

	pub fn validate(&self) -> ConfigResult<()> {
		if self.image.trim().is_empty() {
			return Err(ConfigError::invalid_value("image", "image cannot be empty"));
		}
		if self.ready_timeout_secs == 0 {
			return Err(ConfigError::invalid_value(
				"ready_timeout_secs",
				"must be greater than zero",
			));
		}
		if self.ssh.port == 0 {
			return Err(ConfigError::invalid_value("ssh.port", "port cannot be zero"));
		}
		self.extra_labels()?;
		self.extra_annotations()?;
		Ok(())
	}
}
