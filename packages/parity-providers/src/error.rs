pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidRequest(#[from] parity_domain::Error),
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Unable to retrieve a shard id from the {deployment} deployment.")]
	MissingShard { deployment: String },
}
