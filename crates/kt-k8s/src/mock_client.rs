// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory [`K8sClient`] for tests.
//!
//! Objects are keyed by `(namespace, name)`. Label selectors are evaluated
//! with the same equality semantics the API server applies.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kt_keys::KeyMaterial;

use crate::builders::{build_shadow_pod, build_ssh_config_map};
use crate::client::K8sClient;
use crate::error::K8sError;
use crate::labels::{
	matches_selector, next_reference_count, parse_label_selector, reference_count,
	REF_COUNT_ANNOTATION,
};
use crate::types::{
	ConfigMap, Deployment, Labels, ObjectMeta, Pod, PodCondition, PodMetaAndSpec, PodStatus,
	Service,
};

type ObjectKey = (String, String);

/// Recorded call to the mock client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
	GetPod { name: String, namespace: String },
	ListPods { namespace: String, selector: String },
	ListDeployments { namespace: String, selector: String },
	ListServices { namespace: String, selector: String },
	GetConfigMap { name: String, namespace: String },
	CreateConfigMap { name: String, namespace: String },
	CreateShadowPod { name: String, namespace: String },
	WaitPodReady { name: String, namespace: String },
	IncreaseReference { name: String, namespace: String },
}

/// Operation that can be made to fail with [`MockK8sClient::fail_operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockOperation {
	GetPod,
	ListPods,
	ListDeployments,
	ListServices,
	GetConfigMap,
	CreateConfigMap,
	CreateShadowPod,
	WaitPodReady,
	IncreaseReference,
}

#[derive(Default)]
struct MockState {
	pods: BTreeMap<ObjectKey, Pod>,
	config_maps: BTreeMap<ObjectKey, ConfigMap>,
	deployments: BTreeMap<ObjectKey, Deployment>,
	services: BTreeMap<ObjectKey, Service>,
	failures: HashMap<MockOperation, String>,
	never_ready: bool,
	next_ip: u32,
	calls: Vec<MockCall>,
}

/// Mock K8s client for testing.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the cluster through another.
#[derive(Clone, Default)]
pub struct MockK8sClient {
	state: Arc<Mutex<MockState>>,
}

fn key(namespace: &str, name: &str) -> ObjectKey {
	(namespace.to_string(), name.to_string())
}

fn list_matching<T: Clone>(
	objects: &BTreeMap<ObjectKey, T>,
	namespace: &str,
	selector: &str,
	labels_of: impl Fn(&T) -> Option<&Labels>,
) -> Vec<T> {
	let selector = parse_label_selector(selector);
	objects
		.iter()
		.filter(|((ns, _), _)| namespace.is_empty() || ns == namespace)
		.filter(|(_, obj)| matches_selector(labels_of(obj), &selector))
		.map(|(_, obj)| obj.clone())
		.collect()
}

fn mark_ready(pod: &mut Pod, ip: String) {
	pod.status = Some(PodStatus {
		phase: Some("Running".to_string()),
		pod_ip: Some(ip),
		conditions: Some(vec![PodCondition {
			type_: "Ready".to_string(),
			status: "True".to_string(),
			..Default::default()
		}]),
		..Default::default()
	});
}

impl MockK8sClient {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make every subsequent call of `op` fail with an API error.
	pub fn fail_operation(self, op: MockOperation, message: impl Into<String>) -> Self {
		self.lock().failures.insert(op, message.into());
		self
	}

	/// Pods never become ready; `wait_pod_ready` reports a timeout.
	pub fn never_ready(self) -> Self {
		self.lock().never_ready = true;
		self
	}

	pub fn insert_pod(&self, pod: Pod) {
		let k = key(
			pod.metadata.namespace.as_deref().unwrap_or_default(),
			pod.metadata.name.as_deref().unwrap_or_default(),
		);
		self.lock().pods.insert(k, pod);
	}

	pub fn insert_config_map(&self, cm: ConfigMap) {
		let k = key(
			cm.metadata.namespace.as_deref().unwrap_or_default(),
			cm.metadata.name.as_deref().unwrap_or_default(),
		);
		self.lock().config_maps.insert(k, cm);
	}

	pub fn insert_deployment(&self, deployment: Deployment) {
		let k = key(
			deployment.metadata.namespace.as_deref().unwrap_or_default(),
			deployment.metadata.name.as_deref().unwrap_or_default(),
		);
		self.lock().deployments.insert(k, deployment);
	}

	pub fn insert_service(&self, service: Service) {
		let k = key(
			service.metadata.namespace.as_deref().unwrap_or_default(),
			service.metadata.name.as_deref().unwrap_or_default(),
		);
		self.lock().services.insert(k, service);
	}

	pub fn remove_config_map(&self, name: &str, namespace: &str) -> Option<ConfigMap> {
		self.lock().config_maps.remove(&key(namespace, name))
	}

	/// A running, ready pod with the given metadata.
	pub fn running_pod(
		name: &str,
		namespace: &str,
		labels: Labels,
		annotations: Labels,
		ip: &str,
	) -> Pod {
		let mut pod = Pod {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				namespace: Some(namespace.to_string()),
				labels: Some(labels),
				annotations: Some(annotations),
				..Default::default()
			},
			..Default::default()
		};
		mark_ready(&mut pod, ip.to_string());
		pod
	}

	pub fn pod(&self, name: &str, namespace: &str) -> Option<Pod> {
		self.lock().pods.get(&key(namespace, name)).cloned()
	}

	pub fn config_map(&self, name: &str, namespace: &str) -> Option<ConfigMap> {
		self.lock().config_maps.get(&key(namespace, name)).cloned()
	}

	pub fn pod_count(&self) -> usize {
		self.lock().pods.len()
	}

	pub fn config_map_count(&self) -> usize {
		self.lock().config_maps.len()
	}

	/// Reference count currently recorded on a pod.
	pub fn reference_count(&self, name: &str, namespace: &str) -> Option<u32> {
		let state = self.lock();
		let pod = state.pods.get(&key(namespace, name))?;
		reference_count(pod.metadata.annotations.as_ref())
	}

	/// Returns the recorded calls.
	pub fn get_calls(&self) -> Vec<MockCall> {
		self.lock().calls.clone()
	}

	/// Clears recorded calls.
	pub fn clear_calls(&self) {
		self.lock().calls.clear();
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Records `call` and returns the injected failure for `op`, if any.
	fn record(&self, op: MockOperation, call: MockCall) -> Result<(), K8sError> {
		let mut state = self.lock();
		state.calls.push(call);
		match state.failures.get(&op) {
			Some(message) => Err(K8sError::ApiError {
				message: message.clone(),
			}),
			None => Ok(()),
		}
	}
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		self.record(
			MockOperation::GetPod,
			MockCall::GetPod {
				name: name.into(),
				namespace: namespace.into(),
			},
		)?;
		self.pod(name, namespace).ok_or_else(|| K8sError::PodNotFound {
			name: name.into(),
			namespace: namespace.into(),
		})
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		self.record(
			MockOperation::ListPods,
			MockCall::ListPods {
				namespace: namespace.into(),
				selector: label_selector.into(),
			},
		)?;
		let state = self.lock();
		Ok(list_matching(&state.pods, namespace, label_selector, |p| {
			p.metadata.labels.as_ref()
		}))
	}

	async fn list_deployments(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Deployment>, K8sError> {
		self.record(
			MockOperation::ListDeployments,
			MockCall::ListDeployments {
				namespace: namespace.into(),
				selector: label_selector.into(),
			},
		)?;
		let state = self.lock();
		Ok(list_matching(
			&state.deployments,
			namespace,
			label_selector,
			|d| d.metadata.labels.as_ref(),
		))
	}

	async fn list_services(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Service>, K8sError> {
		self.record(
			MockOperation::ListServices,
			MockCall::ListServices {
				namespace: namespace.into(),
				selector: label_selector.into(),
			},
		)?;
		let state = self.lock();
		Ok(list_matching(&state.services, namespace, label_selector, |s| {
			s.metadata.labels.as_ref()
		}))
	}

	async fn get_config_map(&self, name: &str, namespace: &str) -> Result<ConfigMap, K8sError> {
		self.record(
			MockOperation::GetConfigMap,
			MockCall::GetConfigMap {
				name: name.into(),
				namespace: namespace.into(),
			},
		)?;
		self.config_map(name, namespace)
			.ok_or_else(|| K8sError::ConfigMapNotFound {
				name: name.into(),
				namespace: namespace.into(),
			})
	}

	async fn create_config_map_with_ssh_key(
		&self,
		name: &str,
		namespace: &str,
		labels: &Labels,
		keys: &KeyMaterial,
	) -> Result<ConfigMap, K8sError> {
		self.record(
			MockOperation::CreateConfigMap,
			MockCall::CreateConfigMap {
				name: name.into(),
				namespace: namespace.into(),
			},
		)?;
		let mut state = self.lock();
		let k = key(namespace, name);
		if state.config_maps.contains_key(&k) {
			return Err(K8sError::AlreadyExists {
				kind: "ConfigMap",
				name: name.into(),
				namespace: namespace.into(),
			});
		}
		let cm = build_ssh_config_map(name, namespace, labels, keys);
		state.config_maps.insert(k, cm.clone());
		Ok(cm)
	}

	async fn create_shadow_pod(
		&self,
		spec: &PodMetaAndSpec,
		ssh_config_map: &str,
	) -> Result<Pod, K8sError> {
		let (name, namespace) = (&spec.meta.name, &spec.meta.namespace);
		self.record(
			MockOperation::CreateShadowPod,
			MockCall::CreateShadowPod {
				name: name.clone(),
				namespace: namespace.clone(),
			},
		)?;
		let mut state = self.lock();
		let k = key(namespace, name);
		if state.pods.contains_key(&k) {
			return Err(K8sError::AlreadyExists {
				kind: "Pod",
				name: name.clone(),
				namespace: namespace.clone(),
			});
		}
		let mut pod = build_shadow_pod(spec, ssh_config_map);
		pod.status = Some(PodStatus {
			phase: Some("Pending".to_string()),
			..Default::default()
		});
		state.pods.insert(k, pod.clone());
		Ok(pod)
	}

	async fn wait_pod_ready(
		&self,
		name: &str,
		namespace: &str,
		timeout: Duration,
	) -> Result<Pod, K8sError> {
		self.record(
			MockOperation::WaitPodReady,
			MockCall::WaitPodReady {
				name: name.into(),
				namespace: namespace.into(),
			},
		)?;
		let mut state = self.lock();
		if state.never_ready {
			return Err(K8sError::Timeout {
				name: name.into(),
				namespace: namespace.into(),
				waited_secs: timeout.as_secs(),
			});
		}
		state.next_ip += 1;
		let ip = format!("10.0.0.{}", state.next_ip);
		let pod = state
			.pods
			.get_mut(&key(namespace, name))
			.ok_or_else(|| K8sError::PodNotFound {
				name: name.into(),
				namespace: namespace.into(),
			})?;
		let already_ready = pod
			.status
			.as_ref()
			.and_then(|s| s.pod_ip.as_deref())
			.is_some_and(|ip| !ip.is_empty());
		if !already_ready {
			mark_ready(pod, ip);
		}
		Ok(pod.clone())
	}

	async fn increase_reference(&self, name: &str, namespace: &str) -> Result<u32, K8sError> {
		self.record(
			MockOperation::IncreaseReference,
			MockCall::IncreaseReference {
				name: name.into(),
				namespace: namespace.into(),
			},
		)?;
		// the lock makes read-modify-write atomic, as resourceVersion does on a cluster
		let mut state = self.lock();
		let pod = state
			.pods
			.get_mut(&key(namespace, name))
			.ok_or_else(|| K8sError::PodNotFound {
				name: name.into(),
				namespace: namespace.into(),
			})?;
		let annotations = pod.metadata.annotations.get_or_insert_with(Default::default);
		let next = next_reference_count(Some(&*annotations)).ok_or_else(|| {
			K8sError::InvalidReferenceCount {
				name: name.into(),
				namespace: namespace.into(),
				value: annotations
					.get(REF_COUNT_ANNOTATION)
					.cloned()
					.unwrap_or_default(),
			}
		})?;
		annotations.insert(REF_COUNT_ANNOTATION.to_string(), next.to_string());
		Ok(next)
	}
}
