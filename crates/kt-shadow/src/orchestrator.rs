// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kt_config::ShadowOptions;
use kt_k8s::{K8sClient, Labels, PodMetaAndSpec, ResourceMeta, USER_ANNOTATION};
use kt_keys::{default_key_dir, private_key_path, KeyGenerator};
use tracing::{debug, instrument};

use crate::credential::{build_credential, ShadowConnection};
use crate::discovery::try_find_existing;
use crate::error::ShadowResult;
use crate::meta::{merge_overrides, validate_shadow_name, SshKeyMeta};
use crate::provisioner::create_shadow;

/// Decides between reusing a shared shadow and creating a new one.
///
/// Two callers racing to create the same shadow for the first time are not
/// serialized: one of them gets a transient `AlreadyExists`, or discovery
/// reports a duplicate on the next call.
pub struct ShadowOrchestrator {
	client: Arc<dyn K8sClient>,
	keys: Arc<dyn KeyGenerator>,
	local_user: String,
	key_dir: PathBuf,
}

impl ShadowOrchestrator {
	pub fn new(
		client: Arc<dyn K8sClient>,
		keys: Arc<dyn KeyGenerator>,
		local_user: impl Into<String>,
		key_dir: impl Into<PathBuf>,
	) -> Self {
		Self {
			client,
			keys,
			local_user: local_user.into(),
			key_dir: key_dir.into(),
		}
	}

	/// Build from options, using `~/.kt/pk` when no key directory is set.
	pub fn from_options(
		client: Arc<dyn K8sClient>,
		keys: Arc<dyn KeyGenerator>,
		local_user: impl Into<String>,
		options: &ShadowOptions,
	) -> ShadowResult<Self> {
		let key_dir = match &options.key_dir {
			Some(dir) => dir.clone(),
			None => default_key_dir()?,
		};
		Ok(Self::new(client, keys, local_user, key_dir))
	}

	pub fn local_user(&self) -> &str {
		&self.local_user
	}

	pub fn key_dir(&self) -> &Path {
		&self.key_dir
	}

	/// Return a ready shadow called `name`, reusing one when
	/// `options.share_shadow` is set and a valid one exists.
	///
	/// Labels and annotations from `options` are applied over the given ones,
	/// and the shadow is annotated with the local user.
	#[instrument(
		skip(self, options, labels, annotations, envs),
		fields(namespace = %options.namespace, share = options.share_shadow)
	)]
	pub async fn get_or_create_shadow(
		&self,
		name: &str,
		options: &ShadowOptions,
		labels: &Labels,
		annotations: &Labels,
		envs: &Labels,
	) -> ShadowResult<ShadowConnection> {
		validate_shadow_name(name)?;
		let namespace = options.shadow_namespace()?;

		let ssh = SshKeyMeta {
			config_map_name: name.to_string(),
			private_key_path: private_key_path(&self.key_dir, name),
		};

		let labels = merge_overrides(labels, &options.extra_labels()?);
		let mut annotations = merge_overrides(annotations, &options.extra_annotations()?);
		annotations.insert(USER_ANNOTATION.to_string(), self.local_user.clone());

		let meta = ResourceMeta {
			name: name.to_string(),
			namespace: namespace.to_string(),
			labels,
			annotations,
		};

		if options.share_shadow {
			if let Some((pod, material)) =
				try_find_existing(self.client.as_ref(), self.keys.as_ref(), &meta, &ssh).await?
			{
				return Ok(build_credential(&pod, &material, &options.ssh));
			}
			debug!("No shadow to share, creating one");
		}

		let spec = PodMetaAndSpec {
			meta,
			image: options.image.clone(),
			envs: envs.clone(),
		};
		create_shadow(
			self.client.as_ref(),
			self.keys.as_ref(),
			&spec,
			&ssh,
			options,
		)
		.await
	}
}
