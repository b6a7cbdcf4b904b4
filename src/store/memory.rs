use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::RuleRepository;
use crate::{Metadata, RuleError, RuleRecord};

#[derive(Debug, Clone)]
struct Entry {
    /// Insertion sequence, used to list rules oldest first.
    seq: u64,
    record: RuleRecord,
}

/// Thread-safe in-memory repository. Ids are random UUIDs.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    rules: DashMap<String, Entry>,
    next_seq: AtomicU64,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleRepository for InMemoryRepository {
    fn insert(&self, rule_string: String, metadata: Metadata) -> Result<RuleRecord, RuleError> {
        let record = RuleRecord {
            id: Uuid::new_v4().to_string(),
            rule_string,
            metadata,
        };
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.rules.insert(
            record.id.clone(),
            Entry {
                seq,
                record: record.clone(),
            },
        );
        info!(rule_id = %record.id, "rule stored");
        Ok(record)
    }

    fn list(&self) -> Result<Vec<RuleRecord>, RuleError> {
        let mut entries: Vec<Entry> = self.rules.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.seq);
        Ok(entries.into_iter().map(|e| e.record).collect())
    }

    fn get(&self, id: &str) -> Result<RuleRecord, RuleError> {
        self.rules
            .get(id)
            .map(|e| e.record.clone())
            .ok_or_else(|| RuleError::NotFound { id: id.to_owned() })
    }

    fn update(
        &self,
        id: &str,
        rule_string: String,
        metadata: Metadata,
    ) -> Result<RuleRecord, RuleError> {
        let Some(mut entry) = self.rules.get_mut(id) else {
            warn!(rule_id = id, "update of unknown rule");
            return Err(RuleError::NotFound { id: id.to_owned() });
        };
        entry.record.rule_string = rule_string;
        entry.record.metadata = metadata;
        info!(rule_id = id, "rule updated");
        Ok(entry.record.clone())
    }

    fn remove(&self, id: &str) -> Result<(), RuleError> {
        if self.rules.remove(id).is_some() {
            info!(rule_id = id, "rule deleted");
            Ok(())
        } else {
            warn!(rule_id = id, "delete of unknown rule");
            Err(RuleError::NotFound { id: id.to_owned() })
        }
    }
}
