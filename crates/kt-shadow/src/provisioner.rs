// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Creating a new shadow.
//!
//! Objects already created are left in place when a later step fails; a
//! ConfigMap without its pod is for the operator to clean up.
//!
//! The key pair is written to `<key_dir>/<name>.key` before anything is
//! created in the cluster. If a shadow of that name already exists the create
//! fails with `AlreadyExists`, and the local key for that shadow has already
//! been replaced. Reuse a live shadow through sharing instead.

use kt_config::ShadowOptions;
use kt_k8s::{K8sClient, PodMetaAndSpec, NAME_LABEL};
use kt_keys::KeyGenerator;
use tracing::{info, instrument};

use crate::credential::{build_credential, ShadowConnection};
use crate::error::ShadowResult;
use crate::meta::SshKeyMeta;

/// Generate keys, create the ConfigMap and pod, and wait for the pod to be
/// ready.
#[instrument(
	skip_all,
	fields(name = %spec.meta.name, namespace = %spec.meta.namespace, image = %spec.image)
)]
pub async fn create_shadow(
	client: &dyn K8sClient,
	keys: &dyn KeyGenerator,
	spec: &PodMetaAndSpec,
	ssh: &SshKeyMeta,
	options: &ShadowOptions,
) -> ShadowResult<ShadowConnection> {
	let (name, namespace) = (&spec.meta.name, &spec.meta.namespace);

	let material = keys.generate_key_pair(&ssh.private_key_path).await?;

	client
		.create_config_map_with_ssh_key(
			&ssh.config_map_name,
			namespace,
			&spec.meta.labels,
			&material,
		)
		.await?;
	info!(config_map = %ssh.config_map_name, "Created SSH ConfigMap");

	let mut pod_spec = spec.clone();
	pod_spec
		.meta
		.labels
		.insert(NAME_LABEL.to_string(), name.clone());
	client
		.create_shadow_pod(&pod_spec, &ssh.config_map_name)
		.await?;
	info!("Created shadow pod");

	let pod = client
		.wait_pod_ready(name, namespace, options.ready_timeout())
		.await?;

	let connection = build_credential(&pod, &material, &options.ssh);
	info!(pod_ip = %connection.pod_ip, "Shadow pod is ready");
	Ok(connection)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ShadowError;
	use kt_k8s::{
		K8sError, Labels, MockCall, MockK8sClient, MockOperation, ResourceMeta, CONTROL_BY_LABEL,
		REF_COUNT_ANNOTATION, SSH_AUTH_KEY, SSH_AUTH_PRIVATE_KEY,
	};
	use kt_keys::Ed25519KeyGenerator;
	use tempfile::TempDir;

	const NS: &str = "dev";

	fn spec(name: &str) -> PodMetaAndSpec {
		let mut labels = Labels::new();
		labels.insert(CONTROL_BY_LABEL.to_string(), "kt".to_string());
		PodMetaAndSpec {
			meta: ResourceMeta {
				name: name.to_string(),
				namespace: NS.to_string(),
				labels,
				annotations: Labels::new(),
			},
			image: "shadow:test".to_string(),
			envs: Labels::new(),
		}
	}

	fn ssh_meta(dir: &TempDir, name: &str) -> SshKeyMeta {
		SshKeyMeta {
			config_map_name: name.to_string(),
			private_key_path: dir.path().join(format!("{name}.key")),
		}
	}

	#[tokio::test]
	async fn creates_config_map_then_pod_then_waits() {
		let dir = TempDir::new().unwrap();
		let client = MockK8sClient::new();
		let ssh = ssh_meta(&dir, "shadow-a");

		let conn = create_shadow(
			&client,
			&Ed25519KeyGenerator::new(),
			&spec("shadow-a"),
			&ssh,
			&ShadowOptions::default(),
		)
		.await
		.unwrap();

		assert_eq!(conn.pod_name, "shadow-a");
		assert_eq!(conn.pod_ip, "10.0.0.1");
		assert_eq!(conn.credential.private_key_path, ssh.private_key_path);
		assert_eq!(
			client.get_calls(),
			vec![
				MockCall::CreateConfigMap {
					name: "shadow-a".into(),
					namespace: NS.into(),
				},
				MockCall::CreateShadowPod {
					name: "shadow-a".into(),
					namespace: NS.into(),
				},
				MockCall::WaitPodReady {
					name: "shadow-a".into(),
					namespace: NS.into(),
				},
			]
		);
	}

	#[tokio::test]
	async fn config_map_holds_the_local_key_and_pod_is_stamped() {
		let dir = TempDir::new().unwrap();
		let client = MockK8sClient::new();
		let ssh = ssh_meta(&dir, "shadow-a");

		create_shadow(
			&client,
			&Ed25519KeyGenerator::new(),
			&spec("shadow-a"),
			&ssh,
			&ShadowOptions::default(),
		)
		.await
		.unwrap();

		let data = client.config_map("shadow-a", NS).unwrap().data.unwrap();
		let on_disk = std::fs::read_to_string(&ssh.private_key_path).unwrap();
		assert_eq!(data.get(SSH_AUTH_PRIVATE_KEY), Some(&on_disk));
		assert!(data.get(SSH_AUTH_KEY).unwrap().starts_with("ssh-ed25519 "));

		let pod = client.pod("shadow-a", NS).unwrap();
		let labels = pod.metadata.labels.unwrap();
		assert_eq!(labels.get(NAME_LABEL).map(String::as_str), Some("shadow-a"));
		assert_eq!(labels.get(CONTROL_BY_LABEL).map(String::as_str), Some("kt"));
		let annotations = pod.metadata.annotations.unwrap();
		assert_eq!(annotations.get(REF_COUNT_ANNOTATION).map(String::as_str), Some("1"));
	}

	#[tokio::test]
	async fn config_map_failure_creates_no_pod() {
		let dir = TempDir::new().unwrap();
		let client =
			MockK8sClient::new().fail_operation(MockOperation::CreateConfigMap, "quota exceeded");

		let err = create_shadow(
			&client,
			&Ed25519KeyGenerator::new(),
			&spec("shadow-a"),
			&ssh_meta(&dir, "shadow-a"),
			&ShadowOptions::default(),
		)
		.await
		.unwrap_err();

		assert!(matches!(err, ShadowError::K8s(K8sError::ApiError { .. })));
		assert_eq!(client.pod_count(), 0);
		assert!(!client
			.get_calls()
			.iter()
			.any(|c| matches!(c, MockCall::CreateShadowPod { .. })));
	}

	#[tokio::test]
	async fn readiness_timeout_leaves_objects_in_place() {
		let dir = TempDir::new().unwrap();
		let client = MockK8sClient::new().never_ready();
		let options = ShadowOptions {
			ready_timeout_secs: 5,
			..Default::default()
		};

		let err = create_shadow(
			&client,
			&Ed25519KeyGenerator::new(),
			&spec("shadow-a"),
			&ssh_meta(&dir, "shadow-a"),
			&options,
		)
		.await
		.unwrap_err();

		assert!(matches!(
			err,
			ShadowError::K8s(K8sError::Timeout { waited_secs: 5, .. })
		));
		assert!(err.is_transient());
		assert_eq!(client.config_map_count(), 1);
		assert_eq!(client.pod_count(), 1);
	}

	#[tokio::test]
	async fn existing_pod_surfaces_create_conflict() {
		let dir = TempDir::new().unwrap();
		let client = MockK8sClient::new();
		client.insert_pod(MockK8sClient::running_pod(
			"shadow-a",
			NS,
			Labels::new(),
			Labels::new(),
			"10.9.9.9",
		));

		let err = create_shadow(
			&client,
			&Ed25519KeyGenerator::new(),
			&spec("shadow-a"),
			&ssh_meta(&dir, "shadow-a"),
			&ShadowOptions::default(),
		)
		.await
		.unwrap_err();

		assert!(matches!(
			err,
			ShadowError::K8s(K8sError::AlreadyExists { kind: "Pod", .. })
		));
		assert!(err.is_transient());
	}
}
