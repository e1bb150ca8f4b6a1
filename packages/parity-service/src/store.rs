use std::sync::Mutex;

use ahash::AHashMap;

use parity_domain::{ComparisonRecord, RecordKey};

/// Comparison records keyed by (site, searcher, kind). At most one record per key.
#[derive(Debug, Default)]
pub struct RecordStore {
	records: Mutex<AHashMap<RecordKey, ComparisonRecord>>,
}
impl RecordStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces the record for its key and returns the replaced one.
	pub fn upsert(&self, record: ComparisonRecord) -> Option<ComparisonRecord> {
		self.lock().insert(record.key, record)
	}

	/// Applies `f` to the stored record under the lock and returns the updated copy.
	pub fn update<F>(&self, key: &RecordKey, f: F) -> Option<ComparisonRecord>
	where
		F: FnOnce(&mut ComparisonRecord),
	{
		let mut records = self.lock();
		let record = records.get_mut(key)?;

		f(record);

		Some(record.clone())
	}

	pub fn get(&self, key: &RecordKey) -> Option<ComparisonRecord> {
		self.lock().get(key).cloned()
	}

	/// All records ordered by key.
	pub fn snapshot(&self) -> Vec<ComparisonRecord> {
		let mut records = self.lock().values().cloned().collect::<Vec<_>>();

		records.sort_by_key(|record| record.key);

		records
	}

	pub fn mismatched(&self) -> Vec<ComparisonRecord> {
		let mut records =
			self.lock().values().filter(|record| !record.matched).cloned().collect::<Vec<_>>();

		records.sort_by_key(|record| record.key);

		records
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	pub fn clear(&self) {
		self.lock().clear();
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, AHashMap<RecordKey, ComparisonRecord>> {
		self.records.lock().unwrap_or_else(|err| err.into_inner())
	}
}
