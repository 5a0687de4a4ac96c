// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

pub use k8s_openapi::api::apps::v1::Deployment;
pub use k8s_openapi::api::core::v1::{ConfigMap, Pod, PodCondition, PodSpec, PodStatus, Service};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Label or annotation map. Ordered so selectors and manifests are stable.
pub type Labels = BTreeMap<String, String>;

/// Identity of a logical cluster object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMeta {
	pub name: String,
	pub namespace: String,
	pub labels: Labels,
	pub annotations: Labels,
}

/// Everything needed to create a shadow pod.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodMetaAndSpec {
	pub meta: ResourceMeta,
	pub image: String,
	pub envs: Labels,
}
