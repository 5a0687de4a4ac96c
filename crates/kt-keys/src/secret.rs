// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Redacting wrapper for OpenSSH private key text.

use std::fmt;

use serde::{Serialize, Serializer};
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// An OpenSSH-encoded private key.
///
/// Debug, Display and Serialize all print [`REDACTED`], and the buffer is
/// zeroed on drop. Call [`PrivateKeyPem::expose`] to read the key text.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct PrivateKeyPem {
	inner: String,
}

impl PrivateKeyPem {
	pub fn new(inner: impl Into<String>) -> Self {
		Self {
			inner: inner.into(),
		}
	}

	/// Explicitly access the key text.
	pub fn expose(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.trim().is_empty()
	}
}

impl fmt::Debug for PrivateKeyPem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("PrivateKeyPem").field(&REDACTED).finish()
	}
}

impl fmt::Display for PrivateKeyPem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl PartialEq for PrivateKeyPem {
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl Eq for PrivateKeyPem {}

impl Serialize for PrivateKeyPem {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}
