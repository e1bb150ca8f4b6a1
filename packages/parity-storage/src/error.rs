pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	Domain(#[from] parity_domain::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
