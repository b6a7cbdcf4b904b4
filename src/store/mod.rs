//! Persistence boundary for rule strings.
//!
//! Storage holds only the raw rule string and its metadata, keyed by id.
//! [`RuleService`] sits in front of a [`RuleRepository`], validating input
//! before it is stored and re-parsing stored strings on every read.

mod memory;
mod service;

pub use memory::InMemoryRepository;
pub use service::RuleService;

use crate::{Metadata, RuleError, RuleRecord};

/// Create/read/update/delete over stored rule strings.
///
/// Implementations must be safe to call from several threads at once.
pub trait RuleRepository: Send + Sync {
    /// Store a new rule and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn insert(&self, rule_string: String, metadata: Metadata) -> Result<RuleRecord, RuleError>;

    /// All stored rules, oldest first.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn list(&self) -> Result<Vec<RuleRecord>, RuleError>;

    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] if no rule has this id.
    fn get(&self, id: &str) -> Result<RuleRecord, RuleError>;

    /// Replace the rule string and metadata of an existing rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] if no rule has this id.
    fn update(
        &self,
        id: &str,
        rule_string: String,
        metadata: Metadata,
    ) -> Result<RuleRecord, RuleError>;

    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] if no rule has this id.
    fn remove(&self, id: &str) -> Result<(), RuleError>;
}
