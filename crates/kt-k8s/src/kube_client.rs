// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::{Duration, Instant};

use async_trait::async_trait;
use kt_keys::KeyMaterial;
use kube::{
	api::{Api, ListParams, PostParams},
	Client, Resource,
};
use tracing::{debug, info, instrument, warn};

use crate::builders::{build_shadow_pod, build_ssh_config_map};
use crate::client::K8sClient;
use crate::error::K8sError;
use crate::labels::{next_reference_count, REF_COUNT_ANNOTATION};
use crate::readiness::{pod_readiness, PodReadiness};
use crate::types::{ConfigMap, Deployment, Labels, Pod, PodMetaAndSpec, Service};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_CONFLICT_RETRIES: u32 = 5;

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
	poll_interval: Duration,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. KUBECONFIG environment variable
	/// 2. ~/.kube/config
	/// 3. In-cluster service account
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self::from_client(client))
	}

	/// Wrap an already configured kube client.
	pub fn from_client(client: Client) -> Self {
		Self {
			client,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}

	/// Override how often readiness is polled.
	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	fn scoped<K>(&self, namespace: &str) -> Api<K>
	where
		K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
		<K as Resource>::DynamicType: Default,
	{
		if namespace.is_empty() {
			Api::all(self.client.clone())
		} else {
			Api::namespaced(self.client.clone(), namespace)
		}
	}
}

fn list_params(label_selector: &str) -> ListParams {
	if label_selector.is_empty() {
		ListParams::default()
	} else {
		ListParams::default().labels(label_selector)
	}
}

fn is_status(err: &kube::Error, code: u16) -> bool {
	matches!(err, kube::Error::Api(resp) if resp.code == code)
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		match pods.get(name).await {
			Ok(pod) => Ok(pod),
			Err(e) if is_status(&e, 404) => Err(K8sError::PodNotFound {
				name: name.into(),
				namespace: namespace.into(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		let pods: Api<Pod> = self.scoped(namespace);
		let pod_list = pods.list(&list_params(label_selector)).await?;
		Ok(pod_list.items)
	}

	async fn list_deployments(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Deployment>, K8sError> {
		let deployments: Api<Deployment> = self.scoped(namespace);
		let list = deployments.list(&list_params(label_selector)).await?;
		Ok(list.items)
	}

	async fn list_services(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Service>, K8sError> {
		let services: Api<Service> = self.scoped(namespace);
		let list = services.list(&list_params(label_selector)).await?;
		Ok(list.items)
	}

	async fn get_config_map(&self, name: &str, namespace: &str) -> Result<ConfigMap, K8sError> {
		let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
		match config_maps.get(name).await {
			Ok(cm) => Ok(cm),
			Err(e) if is_status(&e, 404) => Err(K8sError::ConfigMapNotFound {
				name: name.into(),
				namespace: namespace.into(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self, labels, keys))]
	async fn create_config_map_with_ssh_key(
		&self,
		name: &str,
		namespace: &str,
		labels: &Labels,
		keys: &KeyMaterial,
	) -> Result<ConfigMap, K8sError> {
		let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
		let cm = build_ssh_config_map(name, namespace, labels, keys);
		match config_maps.create(&PostParams::default(), &cm).await {
			Ok(created) => Ok(created),
			Err(e) if is_status(&e, 409) => Err(K8sError::AlreadyExists {
				kind: "ConfigMap",
				name: name.into(),
				namespace: namespace.into(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self, spec), fields(name = %spec.meta.name, namespace = %spec.meta.namespace))]
	async fn create_shadow_pod(
		&self,
		spec: &PodMetaAndSpec,
		ssh_config_map: &str,
	) -> Result<Pod, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), &spec.meta.namespace);
		let pod = build_shadow_pod(spec, ssh_config_map);
		match pods.create(&PostParams::default(), &pod).await {
			Ok(created) => Ok(created),
			Err(e) if is_status(&e, 409) => Err(K8sError::AlreadyExists {
				kind: "Pod",
				name: spec.meta.name.clone(),
				namespace: spec.meta.namespace.clone(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self))]
	async fn wait_pod_ready(
		&self,
		name: &str,
		namespace: &str,
		timeout: Duration,
	) -> Result<Pod, K8sError> {
		let start = Instant::now();

		loop {
			let pod = self.get_pod(name, namespace).await?;

			match pod_readiness(&pod) {
				PodReadiness::Ready => {
					info!(elapsed_ms = start.elapsed().as_millis() as u64, "Pod is ready");
					return Ok(pod);
				}
				PodReadiness::Failed(reason) => {
					return Err(K8sError::PodFailed {
						name: name.into(),
						namespace: namespace.into(),
						reason,
					});
				}
				PodReadiness::Pending => {}
			}

			if start.elapsed() >= timeout {
				return Err(K8sError::Timeout {
					name: name.into(),
					namespace: namespace.into(),
					waited_secs: timeout.as_secs(),
				});
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	/// Compare-and-swap on the ref-count annotation.
	///
	/// The replace carries the resourceVersion that was read, so a concurrent
	/// writer turns our write into a 409 and we re-read.
	#[instrument(skip(self))]
	async fn increase_reference(&self, name: &str, namespace: &str) -> Result<u32, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

		for attempt in 1..=MAX_CONFLICT_RETRIES {
			let mut pod = self.get_pod(name, namespace).await?;

			let next = next_reference_count(pod.metadata.annotations.as_ref()).ok_or_else(|| {
				K8sError::InvalidReferenceCount {
					name: name.into(),
					namespace: namespace.into(),
					value: pod
						.metadata
						.annotations
						.as_ref()
						.and_then(|a| a.get(REF_COUNT_ANNOTATION))
						.cloned()
						.unwrap_or_default(),
				}
			})?;

			pod
				.metadata
				.annotations
				.get_or_insert_with(Default::default)
				.insert(REF_COUNT_ANNOTATION.to_string(), next.to_string());

			match pods.replace(name, &PostParams::default(), &pod).await {
				Ok(_) => {
					debug!(ref_count = next, "Increased shadow reference count");
					return Ok(next);
				}
				Err(e) if is_status(&e, 409) => {
					warn!(attempt, "Reference count update conflicted, retrying");
				}
				Err(e) if is_status(&e, 404) => {
					return Err(K8sError::PodNotFound {
						name: name.into(),
						namespace: namespace.into(),
					});
				}
				Err(e) => return Err(e.into()),
			}
		}

		Err(K8sError::Conflict {
			name: name.into(),
			namespace: namespace.into(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock_client::MockK8sClient;
	use crate::types::{ObjectMeta, PodStatus};
	use http::{Method, Request, Response, StatusCode};
	use kube::client::Body;
	use std::sync::{Arc, Mutex};
	use tower_test::mock;

	const NS: &str = "dev";
	const NAME: &str = "shadow-a";
	const POD_PATH: &str = "/api/v1/namespaces/dev/pods/shadow-a";

	type Seen = Arc<Mutex<Vec<(Method, String)>>>;

	/// Answer every request with `respond(method, nth call of that method)`.
	fn scripted<F>(respond: F) -> (KubeClient, Seen)
	where
		F: Fn(&Method, usize) -> (StatusCode, serde_json::Value) + Send + 'static,
	{
		let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
		let seen: Seen = Arc::default();
		let log = seen.clone();

		tokio::spawn(async move {
			while let Some((request, send)) = handle.next_request().await {
				let method = request.method().clone();
				let nth = {
					let mut log = log.lock().unwrap();
					let nth = log.iter().filter(|(m, _)| *m == method).count();
					log.push((method.clone(), request.uri().path().to_string()));
					nth
				};
				let (status, body) = respond(&method, nth);
				let response = Response::builder()
					.status(status)
					.body(Body::from(serde_json::to_vec(&body).unwrap()))
					.unwrap();
				send.send_response(response);
			}
		});

		let client = KubeClient::from_client(Client::new(service, "default"))
			.with_poll_interval(Duration::from_millis(10));
		(client, seen)
	}

	fn count(seen: &Seen, method: Method) -> usize {
		seen.lock().unwrap().iter().filter(|(m, _)| *m == method).count()
	}

	fn pod(ref_count: Option<&str>, phase: &str) -> serde_json::Value {
		let pod = Pod {
			metadata: ObjectMeta {
				name: Some(NAME.to_string()),
				namespace: Some(NS.to_string()),
				resource_version: Some("7".to_string()),
				annotations: ref_count
					.map(|v| Labels::from([(REF_COUNT_ANNOTATION.to_string(), v.to_string())])),
				..Default::default()
			},
			status: Some(PodStatus {
				phase: Some(phase.to_string()),
				message: (phase == "Failed").then(|| "container exited with 137".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		serde_json::to_value(pod).unwrap()
	}

	fn status(code: StatusCode, reason: &str) -> (StatusCode, serde_json::Value) {
		let body = serde_json::json!({
			"kind": "Status",
			"apiVersion": "v1",
			"status": "Failure",
			"message": reason,
			"reason": reason,
			"code": code.as_u16(),
		});
		(code, body)
	}

	#[tokio::test]
	async fn reference_gives_up_after_repeated_conflicts() {
		let (client, seen) = scripted(|method, _| match *method {
			Method::GET => (StatusCode::OK, pod(Some("3"), "Running")),
			_ => status(StatusCode::CONFLICT, "Conflict"),
		});

		let err = client.increase_reference(NAME, NS).await.unwrap_err();

		assert!(matches!(
			err,
			K8sError::Conflict { ref name, ref namespace } if name == NAME && namespace == NS
		));
		assert_eq!(count(&seen, Method::PUT), MAX_CONFLICT_RETRIES as usize);
		assert_eq!(count(&seen, Method::GET), MAX_CONFLICT_RETRIES as usize);
		assert!(seen.lock().unwrap().iter().all(|(_, path)| path == POD_PATH));
	}

	#[tokio::test]
	async fn reference_rereads_after_one_conflict() {
		let (client, seen) = scripted(|method, nth| match (method, nth) {
			(&Method::GET, _) => (StatusCode::OK, pod(Some("3"), "Running")),
			(_, 0) => status(StatusCode::CONFLICT, "Conflict"),
			_ => (StatusCode::OK, pod(Some("4"), "Running")),
		});

		let count_after = client.increase_reference(NAME, NS).await.unwrap();

		assert_eq!(count_after, 4);
		assert_eq!(count(&seen, Method::PUT), 2);
		assert_eq!(count(&seen, Method::GET), 2);
	}

	#[tokio::test]
	async fn missing_reference_annotation_counts_as_one() {
		let (client, seen) = scripted(|method, _| match *method {
			Method::GET => (StatusCode::OK, pod(None, "Running")),
			_ => (StatusCode::OK, pod(Some("2"), "Running")),
		});

		assert_eq!(client.increase_reference(NAME, NS).await.unwrap(), 2);
		assert_eq!(count(&seen, Method::PUT), 1);
	}

	#[tokio::test]
	async fn non_numeric_reference_is_not_overwritten() {
		let (client, seen) = scripted(|_, _| (StatusCode::OK, pod(Some("lots"), "Running")));

		let err = client.increase_reference(NAME, NS).await.unwrap_err();

		assert!(matches!(err, K8sError::InvalidReferenceCount { ref value, .. } if value == "lots"));
		assert_eq!(count(&seen, Method::PUT), 0);
	}

	#[tokio::test]
	async fn reference_on_missing_pod_is_not_found() {
		let (client, _) = scripted(|_, _| status(StatusCode::NOT_FOUND, "NotFound"));

		let err = client.increase_reference(NAME, NS).await.unwrap_err();

		assert!(err.is_not_found());
	}

	#[tokio::test]
	async fn failed_phase_ends_the_wait() {
		let (client, seen) = scripted(|_, _| (StatusCode::OK, pod(None, "Failed")));

		let err = client
			.wait_pod_ready(NAME, NS, Duration::from_secs(30))
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			K8sError::PodFailed { ref reason, .. } if reason == "container exited with 137"
		));
		assert_eq!(count(&seen, Method::GET), 1);
	}

	#[tokio::test]
	async fn pending_pod_times_out() {
		let (client, seen) = scripted(|_, _| (StatusCode::OK, pod(None, "Pending")));

		let err = client
			.wait_pod_ready(NAME, NS, Duration::from_millis(50))
			.await
			.unwrap_err();

		assert!(matches!(err, K8sError::Timeout { ref name, .. } if name == NAME));
		assert!(count(&seen, Method::GET) > 1);
	}

	#[tokio::test]
	async fn ready_pod_is_returned() {
		let ready = MockK8sClient::running_pod(NAME, NS, Labels::new(), Labels::new(), "10.1.2.3");
		let body = serde_json::to_value(ready).unwrap();
		let (client, _) = scripted(move |_, _| (StatusCode::OK, body.clone()));

		let pod = client
			.wait_pod_ready(NAME, NS, Duration::from_secs(5))
			.await
			.unwrap();

		assert_eq!(
			pod.status.and_then(|s| s.pod_ip).as_deref(),
			Some("10.1.2.3")
		);
	}
}
