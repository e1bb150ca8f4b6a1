pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unknown search kind {name:?}.")]
	UnknownKind { name: String },
	#[error("Invalid search criteria: {message}")]
	InvalidCriteria { message: String },
}
