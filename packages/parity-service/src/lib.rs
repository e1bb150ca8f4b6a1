pub mod cancel;
pub mod engine;
pub mod events;
pub mod executor;
pub mod retry;
pub mod source;
pub mod store;

mod error;

pub use cancel::CancelToken;
pub use engine::{Comparator, CompareSettings, RunOutcome};
pub use error::{Error, Result};
pub use events::{ChannelObserver, ComparisonEvent, ComparisonObserver, NoopObserver, ProgressEvent};
pub use executor::{ExecuteOptions, ExecutorRegistry, HttpExecutor, SearchExecutor};
pub use retry::RetrySummary;
pub use source::{RequestSource, SearchLogSource, StaticSource};
pub use store::RecordStore;

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
