// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::secret::PrivateKeyPem;

/// A key pair bound to the local file that holds its private half.
///
/// Either freshly generated for a new shadow or rebuilt from the fields stored
/// in an existing shadow's ConfigMap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
	private_key: PrivateKeyPem,
	authorized_key: String,
	private_key_path: PathBuf,
}

impl KeyMaterial {
	pub fn new(
		private_key: PrivateKeyPem,
		authorized_key: impl Into<String>,
		private_key_path: impl Into<PathBuf>,
	) -> Self {
		Self {
			private_key,
			authorized_key: authorized_key.into(),
			private_key_path: private_key_path.into(),
		}
	}

	pub fn private_key(&self) -> &PrivateKeyPem {
		&self.private_key
	}

	/// Public key in `authorized_keys` format.
	pub fn authorized_key(&self) -> &str {
		&self.authorized_key
	}

	pub fn private_key_path(&self) -> &Path {
		&self.private_key_path
	}
}

/// Everything a local SSH client needs to reach a shadow pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SshCredential {
	pub remote_host: String,
	pub port: u16,
	pub username: String,
	pub private_key_path: PathBuf,
}

impl SshCredential {
	pub fn new(
		remote_host: impl Into<String>,
		port: u16,
		username: impl Into<String>,
		private_key_path: impl Into<PathBuf>,
	) -> Self {
		Self {
			remote_host: remote_host.into(),
			port,
			username: username.into(),
			private_key_path: private_key_path.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn key_material_accessors() {
		let material = KeyMaterial::new(
			PrivateKeyPem::new("private"),
			"ssh-ed25519 AAAA",
			"/tmp/kt/pk/shadow.key",
		);

		assert_eq!(material.private_key().expose(), "private");
		assert_eq!(material.authorized_key(), "ssh-ed25519 AAAA");
		assert_eq!(
			material.private_key_path(),
			Path::new("/tmp/kt/pk/shadow.key")
		);
	}

	#[test]
	fn key_material_debug_hides_private_key() {
		let material = KeyMaterial::new(PrivateKeyPem::new("top-secret-key"), "pub", "/k");
		assert!(!format!("{material:?}").contains("top-secret-key"));
	}

	#[test]
	fn credential_fields() {
		let credential = SshCredential::new("127.0.0.1", 2222, "root", "/home/u/.kt/pk/s.key");
		assert_eq!(credential.remote_host, "127.0.0.1");
		assert_eq!(credential.port, 2222);
		assert_eq!(credential.username, "root");
		assert_eq!(
			credential.private_key_path,
			PathBuf::from("/home/u/.kt/pk/s.key")
		);
	}
}
