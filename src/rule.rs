/// One substitution: a target block expected somewhere in the document and
/// the replacement block to put in its place.
///
/// Target and replacement are independent literal texts; the replacement may
/// add, remove, or reorder lines relative to the target. Rules are immutable
/// once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRule {
    id: String,
    target: String,
    replacement: String,
}

impl PatchRule {
    /// Build a rule. Target and replacement must be non-empty; empty blocks
    /// are rejected earlier by config validation for file-loaded rules.
    pub fn new(
        id: impl Into<String>,
        target: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        let rule = Self {
            id: id.into(),
            target: target.into(),
            replacement: replacement.into(),
        };
        debug_assert!(!rule.target.is_empty(), "rule target must be non-empty");
        debug_assert!(
            !rule.replacement.is_empty(),
            "rule replacement must be non-empty"
        );
        rule
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Ordered collection of rules for one invocation.
///
/// Order is caller-significant: a later rule's target may depend on an
/// earlier rule's replacement having already been applied.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<PatchRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule, preserving insertion order.
    pub fn rule(
        mut self,
        id: impl Into<String>,
        target: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        self.rules.push(PatchRule::new(id, target, replacement));
        self
    }

    pub fn push(&mut self, rule: PatchRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[PatchRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl IntoIterator for RuleSet {
    type Item = PatchRule;
    type IntoIter = std::vec::IntoIter<PatchRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a PatchRule;
    type IntoIter = std::slice::Iter<'a, PatchRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
