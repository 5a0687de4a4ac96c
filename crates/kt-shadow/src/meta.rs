// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shadow naming and metadata assembly.

use std::path::PathBuf;

use kt_k8s::Labels;

use crate::error::{ShadowError, ShadowResult};

const MAX_NAME_LEN: usize = 63;

/// Binds the ConfigMap holding a shadow's keys to the local private key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyMeta {
	pub config_map_name: String,
	pub private_key_path: PathBuf,
}

/// Merge `overrides` into `base`; on a shared key the override wins.
pub fn merge_overrides(base: &Labels, overrides: &Labels) -> Labels {
	let mut merged = base.clone();
	merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
	merged
}

/// Check that `name` is a DNS-1123 label.
///
/// Shadow names become pod and ConfigMap names and the stem of the local key
/// file, so they must not contain path separators either.
pub fn validate_shadow_name(name: &str) -> ShadowResult<()> {
	let invalid = |reason: &str| ShadowError::InvalidName {
		name: name.to_string(),
		reason: reason.to_string(),
	};

	if name.is_empty() {
		return Err(invalid("name cannot be empty"));
	}
	if name.len() > MAX_NAME_LEN {
		return Err(invalid("name must be at most 63 characters"));
	}
	if !name
		.bytes()
		.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
	{
		return Err(invalid(
			"name may only contain lowercase letters, digits and '-'",
		));
	}
	if name.starts_with('-') || name.ends_with('-') {
		return Err(invalid("name must start and end with a letter or digit"));
	}

	Ok(())
}
