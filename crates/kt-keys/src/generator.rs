// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::Path;

use async_trait::async_trait;
use rand::rngs::OsRng;
use ssh_key::{Algorithm, LineEnding, PrivateKey};
use tracing::instrument;

use crate::error::KeyResult;
use crate::key_file;
use crate::material::KeyMaterial;
use crate::secret::PrivateKeyPem;

/// Key capability consumed by the shadow orchestrator.
///
/// Kept behind a trait so callers can swap the algorithm or storage without
/// touching orchestration code.
#[async_trait]
pub trait KeyGenerator: Send + Sync {
	/// Generate a fresh key pair and persist its private half at `path`.
	async fn generate_key_pair(&self, path: &Path) -> KeyResult<KeyMaterial>;

	/// Persist an existing private key at `path`, replacing any previous file.
	async fn write_private_key(&self, path: &Path, key: &PrivateKeyPem) -> KeyResult<()>;
}

/// Generates Ed25519 keys in OpenSSH encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519KeyGenerator;

impl Ed25519KeyGenerator {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl KeyGenerator for Ed25519KeyGenerator {
	#[instrument(skip(self), fields(path = %path.display()))]
	async fn generate_key_pair(&self, path: &Path) -> KeyResult<KeyMaterial> {
		let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)?;
		let private_pem = key.to_openssh(LineEnding::LF)?;
		let authorized_key = key.public_key().to_openssh()?;

		let private_key = PrivateKeyPem::new(private_pem.as_str());
		key_file::write_private_key(path, &private_key).await?;

		tracing::debug!("generated ed25519 key pair");
		Ok(KeyMaterial::new(private_key, authorized_key, path))
	}

	async fn write_private_key(&self, path: &Path, key: &PrivateKeyPem) -> KeyResult<()> {
		key_file::write_private_key(path, key).await
	}
}
