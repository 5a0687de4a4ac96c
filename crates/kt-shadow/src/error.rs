// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shadow orchestration error types.

use kt_config::ConfigError;
use kt_k8s::K8sError;
use kt_keys::KeyError;

pub type ShadowResult<T> = Result<T, ShadowError>;

/// Errors that can occur while finding or creating a shadow.
#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
	/// Pod exists but its SSH ConfigMap is gone or incomplete
	#[error(
		"Shadow pod {pod} in namespace {namespace} has no usable SSH ConfigMap; \
		 delete the pod manually and retry"
	)]
	Inconsistent { pod: String, namespace: String },

	/// More than one pod carries the shadow's labels
	#[error(
		"Found {count} shadow pods for {name} in namespace {namespace}; \
		 make sure only one exists"
	)]
	Duplicate {
		name: String,
		namespace: String,
		count: usize,
	},

	/// Name cannot be used for a pod or a key file
	#[error("Invalid shadow name {name:?}: {reason}")]
	InvalidName { name: String, reason: String },

	#[error(transparent)]
	K8s(#[from] K8sError),

	#[error(transparent)]
	Keys(#[from] KeyError),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl ShadowError {
	/// Whether retrying the same call may succeed.
	///
	/// A create that lost a race to another client surfaces as
	/// `AlreadyExists`; the retry will find the winner's shadow.
	///
	/// A ConfigMap left behind by an earlier failed create also surfaces as
	/// `AlreadyExists`, and retrying will not clear it. When the error names a
	/// ConfigMap and no pod of that name exists, delete the ConfigMap first.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			ShadowError::K8s(
				K8sError::AlreadyExists { .. } | K8sError::Conflict { .. } | K8sError::Timeout { .. }
			)
		)
	}
}
