// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shadow pod lifecycle for kt.
//!
//! A shadow is a pod running an SSH server that the local client tunnels
//! through. This crate decides whether to reuse a shared shadow or create a
//! new one, and returns what the SSH client needs to connect.
//!
//! # Architecture
//!
//! - [`list_controlled_resources`] inventories kt-managed objects
//! - [`ShadowOrchestrator`] is the single decision point between
//!   [`try_find_existing`] and [`create_shadow`]
//! - Cluster access goes through [`kt_k8s::K8sClient`] and keys through
//!   [`kt_keys::KeyGenerator`], so both can be replaced in tests

pub mod credential;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod meta;
pub mod orchestrator;
pub mod provisioner;

pub use credential::{build_credential, ShadowConnection};
pub use discovery::try_find_existing;
pub use error::{ShadowError, ShadowResult};
pub use inventory::{list_controlled_resources, ControlledResources};
pub use meta::{merge_overrides, validate_shadow_name, SshKeyMeta};
pub use orchestrator::ShadowOrchestrator;
pub use provisioner::create_shadow;
