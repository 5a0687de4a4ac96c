// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Finding a shadow that another client already created.

use kt_k8s::{
	label_selector, ConfigMap, K8sClient, Pod, ResourceMeta, NAME_LABEL, SSH_AUTH_KEY,
	SSH_AUTH_PRIVATE_KEY,
};
use kt_keys::{KeyGenerator, KeyMaterial, PrivateKeyPem};
use tracing::{debug, info, instrument};

use crate::error::{ShadowError, ShadowResult};
use crate::meta::SshKeyMeta;

/// Rebuild key material from the ConfigMap data. `None` if a field is
/// missing or empty.
fn key_material_from_config_map(cm: &ConfigMap, ssh: &SshKeyMeta) -> Option<KeyMaterial> {
	let data = cm.data.as_ref()?;
	let private_key = PrivateKeyPem::new(data.get(SSH_AUTH_PRIVATE_KEY)?.as_str());
	let authorized_key = data.get(SSH_AUTH_KEY)?;
	if private_key.is_empty() || authorized_key.trim().is_empty() {
		return None;
	}
	Some(KeyMaterial::new(
		private_key,
		authorized_key.as_str(),
		ssh.private_key_path.as_path(),
	))
}

/// Look for an existing shadow matching `meta`.
///
/// Returns `Ok(None)` when there is nothing to reuse. On a single match the
/// stored private key is written to the local key path and the shadow's
/// reference count is increased before returning.
#[instrument(skip_all, fields(name = %meta.name, namespace = %meta.namespace))]
pub async fn try_find_existing(
	client: &dyn K8sClient,
	keys: &dyn KeyGenerator,
	meta: &ResourceMeta,
	ssh: &SshKeyMeta,
) -> ShadowResult<Option<(Pod, KeyMaterial)>> {
	match client.get_pod(&meta.name, &meta.namespace).await {
		Ok(_) => {}
		Err(e) if e.is_not_found() => {
			debug!("No existing shadow pod");
			return Ok(None);
		}
		Err(e) => return Err(e.into()),
	}

	let inconsistent = || ShadowError::Inconsistent {
		pod: meta.name.clone(),
		namespace: meta.namespace.clone(),
	};

	let cm = match client
		.get_config_map(&ssh.config_map_name, &meta.namespace)
		.await
	{
		Ok(cm) => cm,
		Err(e) if e.is_not_found() => return Err(inconsistent()),
		Err(e) => return Err(e.into()),
	};
	let material = key_material_from_config_map(&cm, ssh).ok_or_else(inconsistent)?;

	let mut selector = meta.labels.clone();
	selector.insert(NAME_LABEL.to_string(), meta.name.clone());
	let mut pods = client
		.list_pods(&meta.namespace, &label_selector(&selector))
		.await?;

	match pods.len() {
		0 => {
			debug!("Pod exists but does not carry the shadow labels");
			Ok(None)
		}
		1 => {
			let pod = pods.remove(0);
			let pod_name = pod.metadata.name.clone().unwrap_or_else(|| meta.name.clone());

			keys.write_private_key(material.private_key_path(), material.private_key())
				.await?;
			let ref_count = client.increase_reference(&pod_name, &meta.namespace).await?;

			info!(pod_name = %pod_name, ref_count, "Reusing shared shadow pod");
			Ok(Some((pod, material)))
		}
		count => Err(ShadowError::Duplicate {
			name: meta.name.clone(),
			namespace: meta.namespace.clone(),
			count,
		}),
	}
}
