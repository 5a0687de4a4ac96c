// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kt_config::{load_options, parse_key_value, CliOverrides};
use kt_k8s::{KubeClient, Labels, COMPONENT_LABEL, CONTROL_BY_LABEL, CONTROL_BY_VALUE};
use kt_keys::Ed25519KeyGenerator;
use kt_shadow::{list_controlled_resources, ShadowOrchestrator};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SHADOW_COMPONENT: &str = "shadow";
const UNKNOWN_USER: &str = "unknown";

/// kt shadow pods - SSH-reachable pods for local-to-cluster tunnelling
#[derive(Parser, Debug)]
#[command(name = "kt-shadow", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Log level
	#[arg(short, long, global = true, default_value = "info")]
	log_level: String,

	/// Output logs as JSON
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List pods, deployments and services managed by kt
	List {
		/// Namespace to list; empty lists all namespaces
		#[arg(long, short)]
		namespace: Option<String>,
		/// Print JSON instead of a table
		#[arg(long)]
		json: bool,
	},
	/// Reuse or create a shadow pod and print how to reach it
	Up {
		/// Shadow name
		name: String,
		#[arg(long, short)]
		namespace: Option<String>,
		/// Shadow container image
		#[arg(long)]
		image: Option<String>,
		/// Reuse an existing shadow with the same name
		#[arg(long)]
		share: bool,
		/// Seconds to wait for the pod to become ready
		#[arg(long, value_name = "SECS")]
		ready_timeout: Option<u64>,
		/// Extra label (repeatable: --label KEY=VALUE)
		#[arg(long, value_name = "KEY=VALUE")]
		label: Vec<String>,
		/// Extra annotation (repeatable: --annotation KEY=VALUE)
		#[arg(long, value_name = "KEY=VALUE")]
		annotation: Vec<String>,
		/// Environment variable (repeatable: -e KEY=VALUE)
		#[arg(long, short = 'e', value_name = "KEY=VALUE")]
		env: Vec<String>,
		/// Print JSON instead of text
		#[arg(long)]
		json: bool,
	},
}

fn init_tracing(level: &str, json: bool) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("kt={level}")));

	// stdout is reserved for command output
	if json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init();
	}
}

fn local_user() -> String {
	std::env::var("USER")
		.or_else(|_| std::env::var("USERNAME"))
		.ok()
		.filter(|u| !u.trim().is_empty())
		.unwrap_or_else(|| UNKNOWN_USER.to_string())
}

fn parse_pairs(flag: &str, entries: &[String]) -> Result<Labels> {
	entries
		.iter()
		.map(|entry| parse_key_value(entry).with_context(|| format!("invalid --{flag} {entry:?}")))
		.collect()
}

fn shadow_base_labels() -> Labels {
	let mut labels = Labels::new();
	labels.insert(CONTROL_BY_LABEL.to_string(), CONTROL_BY_VALUE.to_string());
	labels.insert(COMPONENT_LABEL.to_string(), SHADOW_COMPONENT.to_string());
	labels
}

async fn run_list(config: Option<PathBuf>, namespace: Option<String>, json: bool) -> Result<()> {
	let options = load_options(
		config.as_deref(),
		&CliOverrides {
			namespace,
			..Default::default()
		},
	)
	.context("failed to load configuration")?;

	let client = KubeClient::new()
		.await
		.context("failed to connect to the cluster")?;
	let resources = list_controlled_resources(&client, &options.namespace)
		.await
		.with_context(|| format!("failed to list resources in {:?}", options.namespace))?;

	if json {
		println!("{}", serde_json::to_string_pretty(&resources)?);
		return Ok(());
	}

	let rows = resources
		.pods
		.iter()
		.map(|p| ("pod", &p.metadata))
		.chain(resources.deployments.iter().map(|d| ("deployment", &d.metadata)))
		.chain(resources.services.iter().map(|s| ("service", &s.metadata)));
	for (kind, meta) in rows {
		println!(
			"{:<12} {:<20} {}",
			kind,
			meta.namespace.as_deref().unwrap_or_default(),
			meta.name.as_deref().unwrap_or_default()
		);
	}
	Ok(())
}

async fn run_up(
	config: Option<PathBuf>,
	name: String,
	overrides: CliOverrides,
	label: Vec<String>,
	annotation: Vec<String>,
	env: Vec<String>,
	json: bool,
) -> Result<()> {
	let options =
		load_options(config.as_deref(), &overrides).context("failed to load configuration")?;

	let mut labels = shadow_base_labels();
	labels.extend(parse_pairs("label", &label)?);
	let annotations = parse_pairs("annotation", &annotation)?;
	let envs = parse_pairs("env", &env)?;

	let client = KubeClient::new()
		.await
		.context("failed to connect to the cluster")?;
	let orchestrator = ShadowOrchestrator::from_options(
		Arc::new(client),
		Arc::new(Ed25519KeyGenerator::new()),
		local_user(),
		&options,
	)?;

	let connection = orchestrator
		.get_or_create_shadow(&name, &options, &labels, &annotations, &envs)
		.await
		.with_context(|| format!("failed to get shadow {name} in {}", options.namespace))?;

	info!(pod_name = %connection.pod_name, pod_ip = %connection.pod_ip, "Shadow ready");

	if json {
		println!("{}", serde_json::to_string_pretty(&connection)?);
	} else {
		let cred = &connection.credential;
		println!("pod:  {} ({})", connection.pod_name, connection.pod_ip);
		println!(
			"ssh:  ssh -i {} -p {} {}@{}",
			cred.private_key_path.display(),
			cred.port,
			cred.username,
			cred.remote_host
		);
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(&args.log_level, args.json_logs);

	match args.command {
		Command::List { namespace, json } => run_list(args.config, namespace, json).await,
		Command::Up {
			name,
			namespace,
			image,
			share,
			ready_timeout,
			label,
			annotation,
			env,
			json,
		} => {
			let overrides = CliOverrides {
				namespace,
				image,
				share_shadow: share.then_some(true),
				ready_timeout_secs: ready_timeout,
				key_dir: None,
			};
			run_up(args.config, name, overrides, label, annotation, env, json).await
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_up_with_repeated_flags() {
		let args = Args::parse_from([
			"kt-shadow",
			"up",
			"shadow-t1",
			"--share",
			"--label",
			"team=infra",
			"--label",
			"env=dev",
			"-e",
			"LOG=debug",
			"--ready-timeout",
			"30",
		]);

		match args.command {
			Command::Up {
				name,
				share,
				label,
				env,
				ready_timeout,
				..
			} => {
				assert_eq!(name, "shadow-t1");
				assert!(share);
				assert_eq!(label, vec!["team=infra", "env=dev"]);
				assert_eq!(env, vec!["LOG=debug"]);
				assert_eq!(ready_timeout, Some(30));
			}
			other => panic!("unexpected command {other:?}"),
		}
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn global_flags_after_subcommand() {
		let args = Args::parse_from(["kt-shadow", "list", "--json", "--json-logs", "-n", "dev"]);
		assert!(args.json_logs);
		assert!(matches!(
			args.command,
			Command::List { namespace: Some(ref ns), json: true } if ns == "dev"
		));
	}

	#[test]
	fn base_labels_mark_shadow_component() {
		let labels = shadow_base_labels();
		assert_eq!(labels.get(CONTROL_BY_LABEL).map(String::as_str), Some("kt"));
		assert_eq!(labels.get(COMPONENT_LABEL).map(String::as_str), Some("shadow"));
	}

	#[test]
	fn bad_pair_names_the_flag() {
		let err = parse_pairs("env", &["NOEQUALS".to_string()]).unwrap_err();
		assert!(err.to_string().contains("--env"));
	}
}
