// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Manifests for the shadow pod and the ConfigMap carrying its SSH keys.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
	Capabilities, ConfigMapVolumeSource, Container, EnvVar, KeyToPath, SecurityContext, Volume,
	VolumeMount,
};
use kt_keys::KeyMaterial;

use crate::labels::{REF_COUNT_ANNOTATION, SSH_AUTH_KEY, SSH_AUTH_PRIVATE_KEY};
use crate::types::{ConfigMap, Labels, ObjectMeta, Pod, PodMetaAndSpec, PodSpec};

pub const SHADOW_CONTAINER_NAME: &str = "shadow";
pub const SSH_VOLUME_NAME: &str = "ssh-public-key";
pub const SSH_MOUNT_PATH: &str = "/root/.ssh";
const AUTHORIZED_KEYS_FILE: &str = "authorized_keys";
const AUTHORIZED_KEYS_MODE: i32 = 0o600;
const IMAGE_PULL_POLICY: &str = "IfNotPresent";
const RESTART_POLICY: &str = "Always";
const INITIAL_REF_COUNT: &str = "1";

/// Build the ConfigMap that hands the key pair to the shadow and to later
/// discovering clients.
pub fn build_ssh_config_map(
	name: &str,
	namespace: &str,
	labels: &Labels,
	keys: &KeyMaterial,
) -> ConfigMap {
	let mut data = BTreeMap::new();
	data.insert(SSH_AUTH_KEY.to_string(), keys.authorized_key().to_string());
	data.insert(
		SSH_AUTH_PRIVATE_KEY.to_string(),
		keys.private_key().expose().to_string(),
	);

	ConfigMap {
		metadata: ObjectMeta {
			name: Some(name.to_string()),
			namespace: Some(namespace.to_string()),
			labels: Some(labels.clone()),
			..Default::default()
		},
		data: Some(data),
		..Default::default()
	}
}

/// Build the shadow pod, mounting the authorized key from `ssh_config_map`.
pub fn build_shadow_pod(spec: &PodMetaAndSpec, ssh_config_map: &str) -> Pod {
	let mut annotations = spec.meta.annotations.clone();
	annotations
		.entry(REF_COUNT_ANNOTATION.to_string())
		.or_insert_with(|| INITIAL_REF_COUNT.to_string());

	let env_vars: Vec<EnvVar> = spec
		.envs
		.iter()
		.map(|(k, v)| EnvVar {
			name: k.clone(),
			value: Some(v.clone()),
			value_from: None,
		})
		.collect();

	let container = Container {
		name: SHADOW_CONTAINER_NAME.to_string(),
		image: Some(spec.image.clone()),
		image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
		env: if env_vars.is_empty() {
			None
		} else {
			Some(env_vars)
		},
		// the shadow rewrites routes for tunnelled traffic
		security_context: Some(SecurityContext {
			capabilities: Some(Capabilities {
				add: Some(vec!["NET_ADMIN".to_string()]),
				drop: None,
			}),
			..Default::default()
		}),
		volume_mounts: Some(vec![VolumeMount {
			name: SSH_VOLUME_NAME.to_string(),
			mount_path: SSH_MOUNT_PATH.to_string(),
			read_only: Some(true),
			..Default::default()
		}]),
		..Default::default()
	};

	// Only the public half is projected into the pod
	let ssh_volume = Volume {
		name: SSH_VOLUME_NAME.to_string(),
		config_map: Some(ConfigMapVolumeSource {
			name: ssh_config_map.to_string(),
			items: Some(vec![KeyToPath {
				key: SSH_AUTH_KEY.to_string(),
				path: AUTHORIZED_KEYS_FILE.to_string(),
				mode: Some(AUTHORIZED_KEYS_MODE),
			}]),
			..Default::default()
		}),
		..Default::default()
	};

	Pod {
		metadata: ObjectMeta {
			name: Some(spec.meta.name.clone()),
			namespace: Some(spec.meta.namespace.clone()),
			labels: Some(spec.meta.labels.clone()),
			annotations: Some(annotations),
			..Default::default()
		},
		spec: Some(PodSpec {
			containers: vec![container],
			volumes: Some(vec![ssh_volume]),
			restart_policy: Some(RESTART_POLICY.to_string()),
			..Default::default()
		}),
		status: None,
	}
}
