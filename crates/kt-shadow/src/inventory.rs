// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use kt_k8s::{control_labels, label_selector, Deployment, K8sClient, Pod, Service};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::ShadowResult;

/// Objects carrying the kt control label.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ControlledResources {
	pub pods: Vec<Pod>,
	pub deployments: Vec<Deployment>,
	pub services: Vec<Service>,
}

impl ControlledResources {
	pub fn is_empty(&self) -> bool {
		self.pods.is_empty() && self.deployments.is_empty() && self.services.is_empty()
	}
}

/// List the pods, deployments and services kt manages in `namespace`.
///
/// An empty namespace lists across all namespaces. Fails as a whole if any
/// one of the three listings fails.
#[instrument(skip(client))]
pub async fn list_controlled_resources(
	client: &dyn K8sClient,
	namespace: &str,
) -> ShadowResult<ControlledResources> {
	let selector = label_selector(&control_labels());

	let (pods, deployments, services) = futures::try_join!(
		client.list_pods(namespace, &selector),
		client.list_deployments(namespace, &selector),
		client.list_services(namespace, &selector),
	)?;

	debug!(
		pods = pods.len(),
		deployments = deployments.len(),
		services = services.len(),
		"Listed controlled resources"
	);

	Ok(ControlledResources {
		pods,
		deployments,
		services,
	})
}
