mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Compare, Config, DeploymentConfig, Deployments, Executor, Postgres, Service, Source, Storage,
};

use std::{collections::HashSet, fs, path::Path};

use parity_domain::SearchKind;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation { message: "service.log_level must be non-empty.".to_string() });
	}

	for (label, deployment) in
		[("deployments.control", &cfg.deployments.control), ("deployments.test", &cfg.deployments.test)]
	{
		if deployment.name.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label}.name must be non-empty.") });
		}
		if !(deployment.base_url.starts_with("http://")
			|| deployment.base_url.starts_with("https://"))
		{
			return Err(Error::Validation {
				message: format!("{label}.base_url must start with http:// or https://."),
			});
		}
	}

	if cfg.deployments.control.base_url == cfg.deployments.test.base_url {
		return Err(Error::Validation {
			message: "deployments.control and deployments.test must target different base_url values."
				.to_string(),
		});
	}
	if cfg.compare.max_parallelism == 0 {
		return Err(Error::Validation {
			message: "compare.max_parallelism must be greater than zero.".to_string(),
		});
	}
	if cfg.compare.enabled_kinds.is_empty() {
		return Err(Error::Validation {
			message: "compare.enabled_kinds must be non-empty.".to_string(),
		});
	}

	for name in &cfg.compare.enabled_kinds {
		if SearchKind::parse(name).is_err() {
			return Err(Error::Validation {
				message: format!("compare.enabled_kinds contains unknown search kind {name:?}."),
			});
		}
	}

	if cfg.compare.ignore_recent_activity && cfg.compare.recency_threshold_minutes == 0 {
		return Err(Error::Validation {
			message: "compare.recency_threshold_minutes must be greater than zero when compare.ignore_recent_activity is true."
				.to_string(),
		});
	}
	if cfg.executor.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "executor.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.executor.status_attempts == 0 {
		return Err(Error::Validation {
			message: "executor.status_attempts must be greater than zero.".to_string(),
		});
	}

	for (label, path) in
		[("executor.search_path", &cfg.executor.search_path), ("executor.status_path", &cfg.executor.status_path)]
	{
		if !path.starts_with('/') {
			return Err(Error::Validation { message: format!("{label} must start with '/'.") });
		}
	}

	if cfg.source.window_hours == 0 {
		return Err(Error::Validation {
			message: "source.window_hours must be greater than zero.".to_string(),
		});
	}
	if cfg.source.per_site_limit == 0 {
		return Err(Error::Validation {
			message: "source.per_site_limit must be greater than zero.".to_string(),
		});
	}

	if let Some(postgres) = cfg.storage.as_ref().and_then(|storage| storage.postgres.as_ref())
		&& postgres.pool_max_conns == 0
	{
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	for deployment in [&mut cfg.deployments.control, &mut cfg.deployments.test] {
		deployment.name = deployment.name.trim().to_string();
		deployment.base_url = deployment.base_url.trim().trim_end_matches('/').to_string();
	}

	let mut seen = HashSet::new();

	cfg.compare.enabled_kinds.retain(|name| {
		let trimmed = name.trim();

		!trimmed.is_empty() && seen.insert(trimmed.to_ascii_lowercase())
	});

	for name in &mut cfg.compare.enabled_kinds {
		*name = name.trim().to_string();
	}

	cfg.compare.extension_params.retain(|param| !param.trim().is_empty());

	if let Some(storage) = cfg.storage.as_mut()
		&& storage.postgres.as_ref().map(|postgres| postgres.dsn.trim().is_empty()).unwrap_or(false)
	{
		storage.postgres = None;
	}
}
