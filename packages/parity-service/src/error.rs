pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("No executor is registered for search kind {kind}.")]
	UnknownKind { kind: String },
	#[error("Execution error: {message}")]
	Execution { message: String },
	#[error("Record is not awaiting a retry: {message}")]
	NotRetryable { message: String },
	#[error("Comparison canceled after {completed} of {total} requests.")]
	Canceled { completed: usize, total: usize },
	#[error("Invalid config: {message}")]
	InvalidConfig { message: String },
	#[error("Request source error: {message}")]
	Source { message: String },
	#[error("Worker task failed: {message}")]
	Join { message: String },
}
impl Error {
	pub fn is_canceled(&self) -> bool {
		matches!(self, Self::Canceled { .. })
	}
}

impl From<parity_providers::Error> for Error {
	fn from(err: parity_providers::Error) -> Self {
		Self::Execution { message: err.to_string() }
	}
}

impl From<parity_storage::Error> for Error {
	fn from(err: parity_storage::Error) -> Self {
		Self::Source { message: err.to_string() }
	}
}

impl From<tokio::task::JoinError> for Error {
	fn from(err: tokio::task::JoinError) -> Self {
		Self::Join { message: err.to_string() }
	}
}
