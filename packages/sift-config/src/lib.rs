mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Backend, Config, Fetch, Pagination, Service};

use std::{fs, path::Path};

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
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	let api_base = cfg.backend.api_base.trim();

	if api_base.is_empty() {
		return Err(Error::Validation {
			message: "backend.api_base must be non-empty.".to_string(),
		});
	}
	if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
		return Err(Error::Validation {
			message: "backend.api_base must start with http:// or https://.".to_string(),
		});
	}
	if cfg.backend.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "backend.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &cfg.backend.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("backend.default_headers.{key} must be a string."),
			});
		}
	}

	if cfg.pagination.page_size == 0 {
		return Err(Error::Validation {
			message: "pagination.page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.pagination.initial_page == 0 {
		return Err(Error::Validation {
			message: "pagination.initial_page must be greater than zero.".to_string(),
		});
	}
	if cfg.fetch.max_batches_per_fill == 0 {
		return Err(Error::Validation {
			message: "fetch.max_batches_per_fill must be greater than zero.".to_string(),
		});
	}
	if cfg.fetch.retry_base_backoff_ms > cfg.fetch.retry_max_backoff_ms {
		return Err(Error::Validation {
			message: "fetch.retry_base_backoff_ms must not exceed fetch.retry_max_backoff_ms."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.backend.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.backend.api_key = None;
	}

	let trimmed = cfg.backend.api_base.trim().trim_end_matches('/');

	if trimmed.len() != cfg.backend.api_base.len() {
		cfg.backend.api_base = trimmed.to_string();
	}
	if !cfg.backend.path.starts_with('/') {
		cfg.backend.path = format!("/{}", cfg.backend.path);
	}
}
