//! Dispatcher entry point.
//!
//! Parses flags, loads the environment file, connects to the workload
//! substrate, spawns the chain poller and serves the control plane until a
//! shutdown signal arrives. The process exits non-zero only when the
//! configuration is unusable, the backend client fails to initialize or the
//! control plane listener cannot bind.

use clap::Parser;
use std::{path::PathBuf, time::Duration};
use tokio::sync::watch;
use tracing::{error, info, warn};

use starknet_agent_dispatcher::{
	bootstrap::{self, create_dispatcher, initialize_backend, spawn_poller},
	models::{ApiCredentials, BackendKind, ChainConfig, DispatcherConfig},
	services::control::{create_control_server, AppState},
	utils::{mask_credential, setup_logging},
};

#[derive(Parser)]
#[command(
	name = "starknet-agent-dispatcher",
	about = "Watches a Starknet contract for emitted events and dispatches one worker per matched event.",
	version
)]
struct Cli {
	/// Block number to start listening from (0 means latest)
	#[arg(long, default_value_t = 0)]
	block: u64,

	/// Contract address to listen for events
	#[arg(long)]
	contract: String,

	/// Event selector to filter for
	#[arg(long)]
	selector: String,

	/// Whether to do case-insensitive comparison for the selector
	#[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
	case_insensitive: bool,

	/// Whether to allow partial matches for the selector
	#[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
	partial_match: bool,

	/// Path to the .env file
	#[arg(long, default_value = ".env")]
	env_file: PathBuf,

	/// Number of blocks to process in each batch
	#[arg(long, default_value_t = 30)]
	batch_size: u64,

	/// Maximum events per RPC response page
	#[arg(long, default_value_t = 100)]
	chunk_size: u32,

	/// Starknet JSON-RPC node URL
	#[arg(
		long,
		default_value = "https://starknet-sepolia.public.blastapi.io/rpc/v0_7"
	)]
	node_url: String,

	/// Network name passed to workers
	#[arg(long, default_value = "sepolia")]
	network_name: String,

	/// Workload substrate hosting the workers
	#[arg(long, value_enum, default_value_t = BackendKind::Kubernetes)]
	backend: BackendKind,

	/// Namespace to launch workers in
	#[arg(long, default_value = "my-agents")]
	namespace: String,

	/// Image for the worker container
	#[arg(long, default_value = "dreams-agents-client:latest")]
	agent_image: String,

	/// ServiceAccount name for worker pods (optional)
	#[arg(long = "chairman-server-sa", default_value = "")]
	chairman_server_sa: String,

	/// Path to kubeconfig file (optional, defaults to in-cluster or ~/.kube/config)
	#[arg(long, default_value = "")]
	kubeconfig: String,

	/// Minimum seconds between worker launches
	#[arg(long, default_value_t = 30)]
	launch_interval: u64,

	/// Control plane bind address
	#[arg(long, default_value = "0.0.0.0:8000")]
	listen_address: String,
}

impl Cli {
	fn into_config(self) -> DispatcherConfig {
		DispatcherConfig {
			chain: ChainConfig {
				node_url: self.node_url,
				network_name: self.network_name,
			},
			contract_address: self.contract,
			selector: self.selector,
			start_block: self.block,
			case_insensitive: self.case_insensitive,
			partial_match: self.partial_match,
			batch_size: self.batch_size,
			chunk_size: self.chunk_size,
			backend: self.backend,
			namespace: self.namespace,
			agent_image: self.agent_image,
			service_account: Some(self.chairman_server_sa)
				.filter(|account| !account.is_empty()),
			kubeconfig: Some(self.kubeconfig)
				.filter(|path| !path.is_empty())
				.map(PathBuf::from),
			launch_interval: Duration::from_secs(self.launch_interval),
			listen_address: self.listen_address,
		}
	}
}

#[tokio::main]
async fn main() -> bootstrap::Result<()> {
	let cli = Cli::parse();

	let env_file = cli.env_file.clone();
	let env_loaded = dotenvy::from_path_override(&env_file);

	let _log_guard = setup_logging().unwrap_or_else(|e| {
		eprintln!("failed to setup logging: {}", e);
		None
	});

	match env_loaded {
		Ok(()) => info!(path = %env_file.display(), "loaded environment file"),
		Err(err) => warn!(
			path = %env_file.display(),
			error = %err,
			"could not load environment file, continuing with process environment"
		),
	}

	let config = cli.into_config();
	config.validate()?;

	let credentials = ApiCredentials::from_env();
	for name in credentials.missing() {
		warn!("{} environment variable not set", name);
	}

	info!(
		contract = %config.contract_address,
		selector = %config.selector,
		case_insensitive = config.case_insensitive,
		partial_match = config.partial_match,
		"watching for emitted events"
	);
	info!(
		backend = ?config.backend,
		namespace = %config.namespace,
		image = %config.agent_image,
		"worker substrate configured"
	);
	info!(
		anthropic = %mask_credential(credentials.anthropic_api_key.as_deref().unwrap_or("")),
		openai = %mask_credential(credentials.openai_api_key.as_deref().unwrap_or("")),
		openrouter = %mask_credential(credentials.openrouter_api_key.as_deref().unwrap_or("")),
		"API keys are furnished to workers via the agent-api-keys secret"
	);

	let backend = initialize_backend(&config).await.map_err(|e| {
		error!(error = %e, "failed to initialize worker backend");
		e
	})?;

	let dispatcher = create_dispatcher(&config, backend.clone());

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let poller = spawn_poller(&config, dispatcher.clone(), shutdown_rx)?;

	let server = create_control_server(
		&config.listen_address,
		AppState {
			backend,
			dispatcher,
			namespace: config.namespace.clone(),
		},
	)?;
	let server_handle = server.handle();

	info!(address = %config.listen_address, "dispatcher started");

	tokio::select! {
		result = server => {
			if let Err(err) = result {
				error!(error = %err, "control plane terminated");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			info!("shutdown signal received, stopping services");
			server_handle.stop(true).await;
		}
	}

	let _ = shutdown_tx.send(true);
	let _ = poller.await;

	info!("shutdown complete");
	Ok(())
}
