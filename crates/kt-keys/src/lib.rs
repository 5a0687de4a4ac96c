// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! SSH key material for kt shadow pods.
//!
//! This crate provides:
//! - [`KeyMaterial`]: a private/authorized key pair bound to a local file path
//! - [`KeyGenerator`]: the capability used to mint fresh key pairs and persist
//!   private keys, with an Ed25519 implementation
//! - Deterministic per-shadow private key paths
//! - [`SshCredential`]: what a local client needs to reach a shadow over SSH

mod error;
mod generator;
mod key_file;
mod material;
mod secret;

pub use error::{KeyError, KeyResult};
pub use generator::{Ed25519KeyGenerator, KeyGenerator};
pub use key_file::{default_key_dir, private_key_path, read_private_key, write_private_key};
pub use material::{KeyMaterial, SshCredential};
pub use secret::{PrivateKeyPem, REDACTED};
