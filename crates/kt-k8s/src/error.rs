// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("Pod not found: {name} in namespace {namespace}")]
	PodNotFound { name: String, namespace: String },

	#[error("ConfigMap not found: {name} in namespace {namespace}")]
	ConfigMapNotFound { name: String, namespace: String },

	#[error("{kind} {name} already exists in namespace {namespace}")]
	AlreadyExists {
		kind: &'static str,
		name: String,
		namespace: String,
	},

	#[error("Concurrent update conflict on pod {name} in namespace {namespace}")]
	Conflict { name: String, namespace: String },

	#[error("Timed out after {waited_secs}s waiting for pod {name} in namespace {namespace} to become ready")]
	Timeout {
		name: String,
		namespace: String,
		waited_secs: u64,
	},

	#[error("Pod {name} in namespace {namespace} failed: {reason}")]
	PodFailed {
		name: String,
		namespace: String,
		reason: String,
	},

	#[error("Invalid reference count {value:?} on pod {name} in namespace {namespace}")]
	InvalidReferenceCount {
		name: String,
		namespace: String,
		value: String,
	},
}

impl K8sError {
	/// Whether this error means the requested object does not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			K8sError::PodNotFound { .. } | K8sError::ConfigMapNotFound { .. }
		)
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}
