pub mod diff;
pub mod kind;
pub mod recency;
pub mod record;
pub mod request;
pub mod results;
pub mod summary;
pub mod time_serde;

mod error;

pub use diff::{IdDiff, SlotBreakdown, breakdown_by_slot};
pub use error::{Error, Result};
pub use kind::SearchKind;
pub use recency::{RecencyOutcome, RecencyPolicy};
pub use record::{ComparisonRecord, CompareInput, RecordKey, RetryObservation, RetryOutcome};
pub use request::{
	AttributeWeight, Deployment, DeploymentRole, GeoCriteria, SearchCriteria, SearchRequest,
};
pub use results::{ResultRow, ResultSet, SlotBucket, SlotBuckets};
pub use summary::{RunSummary, SiteSummary, summarize};

pub type UserId = i64;
