// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Well-known label/annotation keys and equality-based label selectors.

use crate::types::Labels;

/// Control label marking objects managed by kt.
pub const CONTROL_BY_LABEL: &str = "kt.dev/control-by";
pub const CONTROL_BY_VALUE: &str = "kt";
/// Name-identity label stamped on shadow pods.
pub const NAME_LABEL: &str = "kt.dev/name";
pub const COMPONENT_LABEL: &str = "kt.dev/component";
/// Local user that created or last claimed the shadow.
pub const USER_ANNOTATION: &str = "kt.dev/user";
/// Number of clients currently sharing the shadow.
pub const REF_COUNT_ANNOTATION: &str = "kt.dev/ref-count";
/// ConfigMap data key holding the public key in authorized_keys format.
pub const SSH_AUTH_KEY: &str = "authorized";
/// ConfigMap data key holding the OpenSSH private key.
pub const SSH_AUTH_PRIVATE_KEY: &str = "privateKey";

/// The fixed selector used to inventory kt-managed objects.
pub fn control_labels() -> Labels {
	let mut labels = Labels::new();
	labels.insert(CONTROL_BY_LABEL.to_string(), CONTROL_BY_VALUE.to_string());
	labels
}

/// Render labels as an equality selector: `a=1,b=2`.
pub fn label_selector(labels: &Labels) -> String {
	labels
		.iter()
		.map(|(k, v)| format!("{k}={v}"))
		.collect::<Vec<_>>()
		.join(",")
}

/// Parse an equality selector produced by [`label_selector`].
///
/// Set-based expressions are not supported; terms without `=` are ignored.
pub fn parse_label_selector(selector: &str) -> Labels {
	selector
		.split(',')
		.filter_map(|term| {
			let (k, v) = term.split_once('=')?;
			let k = k.trim();
			if k.is_empty() {
				return None;
			}
			Some((k.to_string(), v.trim().to_string()))
		})
		.collect()
}

/// Whether an object's labels satisfy every term of the selector.
pub fn matches_selector(labels: Option<&Labels>, selector: &Labels) -> bool {
	selector.iter().all(|(k, v)| {
		labels
			.and_then(|l| l.get(k))
			.map(|actual| actual == v)
			.unwrap_or(false)
	})
}

/// Current reference count recorded on a shadow.
///
/// A shadow without the annotation counts its creator, so the base is one.
/// Returns `None` if the annotation is present but not a number.
pub fn reference_count(annotations: Option<&Labels>) -> Option<u32> {
	match annotations.and_then(|a| a.get(REF_COUNT_ANNOTATION)) {
		Some(raw) => raw.trim().parse().ok(),
		None => Some(1),
	}
}

/// Reference count after one more client claims the shadow.
pub fn next_reference_count(annotations: Option<&Labels>) -> Option<u32> {
	reference_count(annotations).map(|count| count.saturating_add(1))
}
