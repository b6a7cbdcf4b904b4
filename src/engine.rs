use std::fmt;
use std::path::Path;

use crate::parse::{parse_with, ParseError};
use crate::{AttributeSet, EngineConfig, Node, Record, RuleError};

/// Builder for a [`RuleEngine`] with a custom attribute set.
///
/// # Example
///
/// ```
/// use ruletree::{Record, RuleEngine};
///
/// let engine = RuleEngine::builder()
///     .attribute("tier")
///     .attribute("region")
///     .build();
///
/// let rule = engine.parse("tier = gold AND region = eu").unwrap();
/// let record = Record::new().set("tier", "gold").set("region", "eu");
/// assert!(engine.evaluate(&rule, &record));
/// ```
#[derive(Debug, Default)]
pub struct RuleEngineBuilder {
    attributes: Vec<String>,
}

impl RuleEngineBuilder {
    /// Start with an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attribute(mut self, name: &str) -> Self {
        self.attributes.push(name.to_owned());
        self
    }

    #[must_use]
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn build(self) -> RuleEngine {
        RuleEngine {
            attributes: AttributeSet::new(self.attributes),
        }
    }
}

/// Parses rule strings against a configured attribute set and evaluates the
/// resulting trees. Immutable and cheap to share across threads.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    attributes: AttributeSet,
}

impl RuleEngine {
    /// An engine recognizing the default attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> RuleEngineBuilder {
        RuleEngineBuilder::new()
    }

    #[must_use]
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            attributes: config.attributes,
        }
    }

    /// Read a JSON configuration file and build an engine from it.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] on I/O or JSON failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        EngineConfig::from_file(path).map(Self::from_config)
    }

    #[must_use]
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Parse one rule string.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the rule is malformed or uses an attribute
    /// outside this engine's set.
    pub fn parse(&self, rule: &str) -> Result<Node, ParseError> {
        parse_with(rule, &self.attributes)
    }

    /// Parse several rule strings, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] encountered.
    pub fn parse_all<'r, I>(&self, rules: I) -> Result<Vec<Node>, ParseError>
    where
        I: IntoIterator<Item = &'r str>,
    {
        rules.into_iter().map(|rule| self.parse(rule)).collect()
    }

    /// Parse several rule strings and fold them into one tree with AND.
    ///
    /// Returns `Ok(None)` when `rules` is empty.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] encountered.
    pub fn combine_rules<'r, I>(&self, rules: I) -> Result<Option<Node>, ParseError>
    where
        I: IntoIterator<Item = &'r str>,
    {
        Ok(crate::combine(self.parse_all(rules)?))
    }

    #[must_use]
    pub fn evaluate(&self, node: &Node, record: &Record) -> bool {
        crate::evaluate(node, record)
    }

    /// Parse `rule` and evaluate it against `record` in one step.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if `rule` does not parse.
    pub fn evaluate_rule(&self, rule: &str, record: &Record) -> Result<bool, ParseError> {
        Ok(crate::evaluate(&self.parse(rule)?, record))
    }

    /// Check that a tree obtained from elsewhere (e.g. deserialized) only
    /// references attributes this engine recognizes.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidAttribute`] for the first unknown attribute.
    pub fn validate(&self, node: &Node) -> Result<(), ParseError> {
        match node
            .comparisons()
            .into_iter()
            .find(|cmp| !self.attributes.contains(&cmp.attribute))
        {
            Some(cmp) => Err(ParseError::InvalidAttribute(cmp.attribute.clone())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleEngine(attributes {})", self.attributes)
    }
}
