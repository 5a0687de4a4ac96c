// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `k=v,k2=v2` strings used for extra labels and annotations.

use std::collections::BTreeMap;

use crate::error::{ConfigError, ConfigResult};

/// Parse one `key=value` entry. The value may be empty, the key may not.
pub fn parse_key_value(entry: &str) -> ConfigResult<(String, String)> {
	let entry = entry.trim();
	let (key, value) = entry.split_once('=').ok_or_else(|| {
		ConfigError::invalid_value(entry, "expected key=value")
	})?;

	let key = key.trim();
	if key.is_empty() {
		return Err(ConfigError::invalid_value(entry, "key cannot be empty"));
	}

	Ok((key.to_string(), value.trim().to_string()))
}

/// Parse a comma-separated list of `key=value` entries.
///
/// Blank entries are skipped, so `""` and `"a=1,"` are accepted. Later
/// entries win on duplicate keys.
pub fn parse_key_value_pairs(raw: &str) -> ConfigResult<BTreeMap<String, String>> {
	raw.split(',')
		.filter(|entry| !entry.trim().is_empty())
		.map(parse_key_value)
		.collect()
}

/// Render a map back into the form accepted by [`parse_key_value_pairs`].
pub fn format_key_value_pairs(pairs: &BTreeMap<String, String>) -> String {
	pairs
		.iter()
		.map(|(k, v)| format!("{k}={v}"))
		.collect::<Vec<_>>()
		.join(",")
}
