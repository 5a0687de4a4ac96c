// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::instrument;

use crate::error::{KeyError, KeyResult};
use crate::secret::PrivateKeyPem;

const KEY_EXTENSION: &str = "key";

/// Directory holding one private key per shadow: `~/.kt/pk`.
pub fn default_key_dir() -> KeyResult<PathBuf> {
	dirs::home_dir()
		.map(|h| h.join(".kt").join("pk"))
		.ok_or(KeyError::NoHomeDir)
}

/// Deterministic private key location for a shadow name.
pub fn private_key_path(key_dir: impl AsRef<Path>, name: &str) -> PathBuf {
	key_dir
		.as_ref()
		.join(format!("{name}.{KEY_EXTENSION}"))
}

#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn read_private_key(path: impl AsRef<Path>) -> KeyResult<PrivateKeyPem> {
	let content = fs::read_to_string(path.as_ref()).await?;
	Ok(PrivateKeyPem::new(content))
}

/// Write (or overwrite) a private key file, creating parent directories.
///
/// On unix the file is created owner-only, which OpenSSH insists on.
#[instrument(skip(key), fields(path = %path.as_ref().display()))]
pub async fn write_private_key(path: impl AsRef<Path>, key: &PrivateKeyPem) -> KeyResult<()> {
	let path = path.as_ref();

	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).await?;
	}

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		use tokio::fs::OpenOptions;
		use tokio::io::AsyncWriteExt;

		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.await?;
		file.write_all(key.expose().as_bytes()).await?;
		file.flush().await?;

		// mode() only applies on create; tighten files that already existed
		fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
	}

	#[cfg(not(unix))]
	{
		fs::write(path, key.expose()).await?;
	}

	tracing::debug!("wrote private key file");
	Ok(())
}
