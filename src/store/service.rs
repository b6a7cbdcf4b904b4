use tracing::{debug, instrument};

use super::RuleRepository;
use crate::{Metadata, Node, Record, RuleEngine, RuleError, RuleRecord, StoredRule};

/// Rule management on top of a [`RuleRepository`].
///
/// Rule strings are parsed before they are stored, so the repository never
/// holds a string the engine rejects. Reads re-parse the stored string and
/// return the tree alongside the record.
#[derive(Debug)]
pub struct RuleService<R> {
    engine: RuleEngine,
    repository: R,
}

impl<R: RuleRepository> RuleService<R> {
    #[must_use]
    pub fn new(engine: RuleEngine, repository: R) -> Self {
        Self { engine, repository }
    }

    #[must_use]
    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Validate and store a new rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if the rule does not parse and
    /// [`RuleError::MissingMetadata`] if `metadata` lacks a description.
    /// Nothing is stored on error.
    #[instrument(skip(self, metadata))]
    pub fn create(
        &self,
        rule_string: &str,
        metadata: serde_json::Value,
    ) -> Result<StoredRule, RuleError> {
        let ast = self.engine.parse(rule_string)?;
        let metadata = Metadata::from_json(metadata)?;
        let record = self.repository.insert(rule_string.to_owned(), metadata)?;
        Ok(StoredRule { record, ast })
    }

    /// Every stored rule with a freshly parsed tree, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if a stored string no longer parses under
    /// this engine's attribute set.
    pub fn list(&self) -> Result<Vec<StoredRule>, RuleError> {
        self.repository
            .list()?
            .into_iter()
            .map(|record| self.attach_ast(record))
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<StoredRule, RuleError> {
        self.attach_ast(self.repository.get(id)?)
    }

    /// Replace a rule's string and metadata after validating both.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create), plus [`RuleError::NotFound`].
    #[instrument(skip(self, metadata))]
    pub fn update(
        &self,
        id: &str,
        rule_string: &str,
        metadata: serde_json::Value,
    ) -> Result<StoredRule, RuleError> {
        let ast = self.engine.parse(rule_string)?;
        let metadata = Metadata::from_json(metadata)?;
        let record = self
            .repository
            .update(id, rule_string.to_owned(), metadata)?;
        Ok(StoredRule { record, ast })
    }

    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] for an unknown id.
    pub fn delete(&self, id: &str) -> Result<(), RuleError> {
        self.repository.remove(id)
    }

    /// Fetch the given rules and fold their trees together with AND, in the
    /// order the ids are given. Returns `Ok(None)` for an empty slice.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] for the first unknown id.
    #[instrument(skip(self))]
    pub fn combine_ids(&self, ids: &[&str]) -> Result<Option<Node>, RuleError> {
        let asts = ids
            .iter()
            .map(|id| self.get(id).map(|stored| stored.ast))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(crate::combine(asts))
    }

    /// Evaluate a stored rule against `record`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] for an unknown id.
    pub fn evaluate_id(&self, id: &str, record: &Record) -> Result<bool, RuleError> {
        let stored = self.get(id)?;
        let result = self.engine.evaluate(&stored.ast, record);
        debug!(rule_id = id, result, "evaluated stored rule");
        Ok(result)
    }

    fn attach_ast(&self, record: RuleRecord) -> Result<StoredRule, RuleError> {
        let ast = self.engine.parse(&record.rule_string)?;
        Ok(StoredRule { record, ast })
    }
}
