use std::collections::BTreeSet;

use serde::Deserialize;
use time::Duration;

use parity_domain::{Deployment, DeploymentRole, RecencyPolicy, SearchKind};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub deployments: Deployments,
	#[serde(default)]
	pub compare: Compare,
	pub executor: Executor,
	#[serde(default)]
	pub source: Source,
	pub storage: Option<Storage>,
}
impl Config {
	/// Enabled kinds resolved against the closed kind set. Unknown names are dropped here;
	/// `validate` rejects them before a config is handed out.
	pub fn enabled_kinds(&self) -> BTreeSet<SearchKind> {
		self.compare.enabled_kinds.iter().filter_map(|name| SearchKind::parse(name).ok()).collect()
	}

	pub fn recency_policy(&self) -> RecencyPolicy {
		RecencyPolicy {
			enabled: self.compare.ignore_recent_activity,
			window: Duration::minutes(i64::from(self.compare.recency_threshold_minutes)),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deployments {
	pub control: DeploymentConfig,
	pub test: DeploymentConfig,
}
impl Deployments {
	pub fn control(&self) -> Deployment {
		self.control.to_deployment(DeploymentRole::Control)
	}

	pub fn test(&self) -> Deployment {
		self.test.to_deployment(DeploymentRole::Test)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
	pub name: String,
	pub base_url: String,
}
impl DeploymentConfig {
	fn to_deployment(&self, role: DeploymentRole) -> Deployment {
		Deployment { role, name: self.name.clone(), base_url: self.base_url.clone() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Compare {
	pub max_parallelism: usize,
	/// Class names, matched case-insensitively.
	pub enabled_kinds: Vec<String>,
	pub auto_retry_mismatches: bool,
	pub ignore_recent_activity: bool,
	pub recency_threshold_minutes: u32,
	pub extension_params: Vec<String>,
}
impl Default for Compare {
	fn default() -> Self {
		Self {
			max_parallelism: 5,
			enabled_kinds: SearchKind::ALL.iter().map(|kind| kind.class_name().to_string()).collect(),
			auto_retry_mismatches: true,
			ignore_recent_activity: true,
			recency_threshold_minutes: 60,
			extension_params: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Executor {
	pub search_path: String,
	pub status_path: String,
	pub timeout_ms: u64,
	#[serde(default = "default_status_attempts")]
	pub status_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Source {
	pub window_hours: u32,
	pub offset_hours: u32,
	pub per_site_limit: u32,
	pub min_searcher_user_id: i64,
}
impl Default for Source {
	fn default() -> Self {
		Self { window_hours: 1, offset_hours: 24, per_site_limit: 20, min_searcher_user_id: 999 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Option<Postgres>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

fn default_status_attempts() -> u32 {
	3
}
