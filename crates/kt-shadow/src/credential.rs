// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use kt_config::SshOptions;
use kt_k8s::Pod;
use kt_keys::{KeyMaterial, SshCredential};
use serde::Serialize;

/// Everything a caller needs to reach a shadow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowConnection {
	/// Empty if the pod has no IP assigned
	pub pod_ip: String,
	pub pod_name: String,
	pub credential: SshCredential,
}

/// Assemble the connection details for `pod`. No I/O.
pub fn build_credential(pod: &Pod, keys: &KeyMaterial, ssh: &SshOptions) -> ShadowConnection {
	let pod_ip = pod
		.status
		.as_ref()
		.and_then(|s| s.pod_ip.clone())
		.unwrap_or_default();
	let pod_name = pod.metadata.name.clone().unwrap_or_default();

	ShadowConnection {
		pod_ip,
		pod_name,
		credential: SshCredential::new(
			ssh.remote_host.clone(),
			ssh.port,
			ssh.username.clone(),
			keys.private_key_path(),
		),
	}
}
