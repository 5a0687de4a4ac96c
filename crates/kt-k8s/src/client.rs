// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use kt_keys::KeyMaterial;

use crate::error::K8sError;
use crate::types::{ConfigMap, Deployment, Labels, Pod, PodMetaAndSpec, Service};

/// Trait for K8s client operations.
///
/// This is the full set of cluster operations the shadow orchestrator
/// consumes. Keeping it narrow lets tests inject an in-memory fake instead of
/// a real cluster.
///
/// An empty `namespace` on the `list_*` operations means all namespaces
/// visible to the client.
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Get a specific pod by name. Absent pods yield [`K8sError::PodNotFound`].
	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError>;

	/// List pods matching the given equality label selector.
	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError>;

	/// List deployments matching the given equality label selector.
	async fn list_deployments(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Deployment>, K8sError>;

	/// List services matching the given equality label selector.
	async fn list_services(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Service>, K8sError>;

	/// Get a ConfigMap by name. Absent ConfigMaps yield
	/// [`K8sError::ConfigMapNotFound`].
	async fn get_config_map(&self, name: &str, namespace: &str) -> Result<ConfigMap, K8sError>;

	/// Create the ConfigMap carrying a shadow's key pair.
	async fn create_config_map_with_ssh_key(
		&self,
		name: &str,
		namespace: &str,
		labels: &Labels,
		keys: &KeyMaterial,
	) -> Result<ConfigMap, K8sError>;

	/// Create a shadow pod that mounts the authorized key from `ssh_config_map`.
	async fn create_shadow_pod(
		&self,
		spec: &PodMetaAndSpec,
		ssh_config_map: &str,
	) -> Result<Pod, K8sError>;

	/// Block until the pod is ready, failing with [`K8sError::Timeout`] once
	/// `timeout` elapses.
	async fn wait_pod_ready(
		&self,
		name: &str,
		namespace: &str,
		timeout: Duration,
	) -> Result<Pod, K8sError>;

	/// Atomically add one to the shadow's reference count.
	///
	/// Implementations must be safe against concurrent callers on different
	/// machines. Returns the new count.
	async fn increase_reference(&self, name: &str, namespace: &str) -> Result<u32, K8sError>;
}
