// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for key operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors that can occur while generating or persisting key material.
#[derive(Error, Debug)]
pub enum KeyError {
	#[error("failed to access key file: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to generate SSH key pair: {0}")]
	Generate(#[from] ssh_key::Error),

	#[error("failed to get home directory")]
	NoHomeDir,
}
