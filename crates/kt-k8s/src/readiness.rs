// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use crate::types::Pod;

/// Where a shadow pod stands on its way to serving SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodReadiness {
	/// Running, Ready condition true and an IP assigned
	Ready,
	/// Still scheduling, pulling or starting
	Pending,
	/// Terminal phase; the pod will never become ready
	Failed(String),
}

/// Map a pod's status to [`PodReadiness`].
pub fn pod_readiness(pod: &Pod) -> PodReadiness {
	let Some(status) = pod.status.as_ref() else {
		return PodReadiness::Pending;
	};

	match status.phase.as_deref().unwrap_or("Unknown") {
		"Failed" | "Succeeded" => {
			let reason = status
				.message
				.clone()
				.or_else(|| status.reason.clone())
				.unwrap_or_else(|| {
					format!(
						"pod terminated in phase {}",
						status.phase.as_deref().unwrap_or("Unknown")
					)
				});
			PodReadiness::Failed(reason)
		}
		"Running" => {
			let ready = status
				.conditions
				.as_ref()
				.map(|conditions| {
					conditions
						.iter()
						.any(|c| c.type_ == "Ready" && c.status == "True")
				})
				.unwrap_or(false);
			let has_ip = status
				.pod_ip
				.as_deref()
				.is_some_and(|ip| !ip.is_empty());

			if ready && has_ip {
				PodReadiness::Ready
			} else {
				PodReadiness::Pending
			}
		}
		_ => PodReadiness::Pending,
	}
}
