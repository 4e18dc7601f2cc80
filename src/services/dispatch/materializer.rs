//! Worker materialization.
//!
//! Translates an event into a backend-appropriate worker spec: a
//! label-system-compliant identity, a bounded worker name and an environment
//! projection that keeps credentials out of the spec.

use std::collections::BTreeMap;

use crate::{
	models::{
		ChainEvent, EnvVar, MatchedEvent, SecretEnvVar, WorkerSpec, API_KEYS_SECRET_NAME,
		API_KEY_SECRET_ENTRIES, CREDENTIAL_ENV_VARS,
	},
	services::backend::{LABEL_APP, LABEL_EVENT_ID, LABEL_SELECTOR},
};

/// Maximum length of a label value.
const MAX_LABEL_LEN: usize = 63;
/// Maximum length of a worker name, leaving room for substrate suffixes.
const MAX_WORKER_NAME_LEN: usize = 50;
/// Substitute for values that sanitize to nothing.
const EMPTY_LABEL_SUBSTITUTE: &str = "invalid-label";

/// `app` label stamped on event-dispatched workers.
pub const APP_LABEL_VALUE: &str = "chairman-agent";
/// `app` label stamped on workers created through `POST /event`.
pub const GENERIC_APP_LABEL_VALUE: &str = "chairman-agent-generic";
/// Event type assigned to dispatched chain events.
pub const EMITTED_EVENT_TYPE: &str = "starknet_event_emitted";

/// Static parameters every materialized worker shares.
#[derive(Debug, Clone)]
pub struct WorkerTemplate {
	/// Namespace or scope workers are created in
	pub namespace: String,
	/// Image reference for worker containers
	pub image: String,
	/// Optional service identity assumed by workers
	pub service_account: Option<String>,
}

/// Projects a string onto the label value grammar, deterministically.
///
/// Lowercases, drops `0x` prefixes, folds every character outside
/// `[a-z0-9\-.]` to `-`, trims `-`/`.` from both ends, bounds the length at
/// 63 and guarantees an alphanumeric first character. Prefix stripping and
/// trimming run to a fixed point so the function is idempotent.
pub fn sanitize_label_value(value: &str) -> String {
	let mut value: String = value
		.to_lowercase()
		.chars()
		.map(|c| {
			if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.' {
				c
			} else {
				'-'
			}
		})
		.collect();

	loop {
		let before = value.clone();
		value = value.trim_matches(|c| c == '-' || c == '.').to_string();
		while let Some(stripped) = value.strip_prefix("0x") {
			value = stripped.to_string();
		}
		if value == before {
			break;
		}
	}

	if value.is_empty() {
		return EMPTY_LABEL_SUBSTITUTE.to_string();
	}

	if !value
		.chars()
		.next()
		.is_some_and(|c| c.is_ascii_alphanumeric())
	{
		value.insert(0, 'l');
	}

	value.truncate(MAX_LABEL_LEN);
	let value = value
		.trim_end_matches(|c| c == '-' || c == '.')
		.to_string();

	if value.is_empty() {
		EMPTY_LABEL_SUBSTITUTE.to_string()
	} else {
		value
	}
}

/// Builds the worker name for a sanitized event id.
///
/// The substrate appends its own disambiguating suffix to instance names, so
/// the name is kept shorter than the label limit.
pub fn worker_name(sanitized_event_id: &str) -> String {
	let mut name = format!("agent-{}", sanitized_event_id);
	name.truncate(MAX_WORKER_NAME_LEN);
	name.trim_end_matches('-').to_string()
}

/// Secret references for the worker API credentials.
///
/// All keys are optional so workers start even when a credential is absent
/// from the secret.
fn credential_secret_env() -> Vec<SecretEnvVar> {
	API_KEY_SECRET_ENTRIES
		.iter()
		.map(|(env_name, secret_key)| SecretEnvVar {
			name: (*env_name).to_string(),
			secret_name: API_KEYS_SECRET_NAME.to_string(),
			secret_key: (*secret_key).to_string(),
			optional: true,
		})
		.collect()
}

/// Appends propagated environment entries, skipping credential names and
/// names already set by the materializer.
fn propagate_environment(env: &mut Vec<EnvVar>, extra: &BTreeMap<String, String>) {
	for (name, value) in extra {
		if CREDENTIAL_ENV_VARS.contains(&name.as_str()) {
			continue;
		}
		if env.iter().any(|existing| existing.name == *name) {
			continue;
		}
		env.push(EnvVar::new(name.clone(), value.clone()));
	}
}

/// Materializes the worker spec for a matched chain event.
pub fn build_emitted_spec(
	template: &WorkerTemplate,
	event: &ChainEvent,
	selector: &str,
	environment: &BTreeMap<String, String>,
) -> WorkerSpec {
	let sanitized_event_id = sanitize_label_value(&event.event_id());
	let sanitized_selector = sanitize_label_value(selector);

	let mut env = vec![
		EnvVar::new("EVENT_ID", sanitized_event_id.clone()),
		EnvVar::new("EVENT_TYPE", EMITTED_EVENT_TYPE),
		EnvVar::new("EVENT_SELECTOR", sanitized_selector.clone()),
		EnvVar::new("EVENT_KEYS_JSON", encode_json_list(&event.keys)),
		EnvVar::new("EVENT_DATA_JSON", encode_json_list(&event.data)),
	];
	propagate_environment(&mut env, environment);

	WorkerSpec {
		name: worker_name(&sanitized_event_id),
		namespace: template.namespace.clone(),
		image: template.image.clone(),
		service_account: template.service_account.clone(),
		labels: BTreeMap::from([
			(LABEL_APP.to_string(), APP_LABEL_VALUE.to_string()),
			(LABEL_EVENT_ID.to_string(), sanitized_event_id),
			(LABEL_SELECTOR.to_string(), sanitized_selector),
		]),
		env,
		secret_env: credential_secret_env(),
	}
}

/// Materializes the worker spec for a generic control-plane event.
pub fn build_generic_spec(template: &WorkerTemplate, event: &MatchedEvent) -> WorkerSpec {
	let sanitized_event_id = sanitize_label_value(&event.event_id);
	let sanitized_event_type = sanitize_label_value(&event.event_type);

	let payload_json = serde_json::to_string(&event.payload).unwrap_or_else(|_| "{}".to_string());

	let mut env = vec![
		EnvVar::new("EVENT_ID", sanitized_event_id.clone()),
		EnvVar::new("EVENT_TYPE", event.event_type.clone()),
		EnvVar::new("EVENT_PAYLOAD_JSON", payload_json),
	];
	let extra: BTreeMap<String, String> = event
		.environment
		.iter()
		.map(|(k, v)| (k.clone(), v.clone()))
		.collect();
	propagate_environment(&mut env, &extra);

	WorkerSpec {
		name: worker_name(&sanitized_event_id),
		namespace: template.namespace.clone(),
		image: template.image.clone(),
		service_account: template.service_account.clone(),
		labels: BTreeMap::from([
			(LABEL_APP.to_string(), GENERIC_APP_LABEL_VALUE.to_string()),
			(LABEL_EVENT_ID.to_string(), sanitized_event_id),
			("event-type".to_string(), sanitized_event_type),
		]),
		env,
		secret_env: credential_secret_env(),
	}
}

fn encode_json_list(values: &[String]) -> String {
	serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}
