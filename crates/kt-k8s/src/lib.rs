// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s client abstraction for kt shadow pods.
//!
//! This crate provides:
//! - A trait-based K8s client abstraction ([`K8sClient`]) exposing exactly the
//!   operations the shadow orchestrator needs
//! - Production implementation using the kube crate ([`KubeClient`])
//! - An in-memory fake for tests ([`MockK8sClient`])
//! - Builders for the shadow pod and its SSH ConfigMap
//! - Well-known label and annotation keys

mod builders;
mod client;
mod error;
mod kube_client;
mod labels;
mod mock_client;
mod readiness;
mod types;

pub use builders::{
	build_shadow_pod, build_ssh_config_map, SHADOW_CONTAINER_NAME, SSH_MOUNT_PATH, SSH_VOLUME_NAME,
};
pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
pub use kube_client::KubeClient;
pub use labels::{
	control_labels, label_selector, matches_selector, next_reference_count, parse_label_selector,
	reference_count, COMPONENT_LABEL, CONTROL_BY_LABEL, CONTROL_BY_VALUE, NAME_LABEL,
	REF_COUNT_ANNOTATION, SSH_AUTH_KEY, SSH_AUTH_PRIVATE_KEY, USER_ANNOTATION,
};
pub use mock_client::{MockCall, MockK8sClient, MockOperation};
pub use readiness::{pod_readiness, PodReadiness};
pub use types::{
	ConfigMap, Deployment, Labels, ObjectMeta, Pod, PodCondition, PodMetaAndSpec, PodSpec,
	PodStatus, ResourceMeta, Service,
};
