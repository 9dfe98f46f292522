//! Document profiles: the field configuration for one kind of document.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::extraction::ValueProcessor;

/// One pattern able to locate a field value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Regular expression evaluated against the corrected text.
    #[serde(with = "regex_serde")]
    pub regex: Regex,

    /// Sample of the text this pattern is written for.
    #[serde(default)]
    pub example: String,

    /// Evaluation rank, lowest first.
    pub priority: u32,

    /// Capture group holding the value.
    #[serde(default = "default_group")]
    pub group: usize,

    /// Processor applied to the captured value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<ValueProcessor>,
}

fn default_group() -> usize {
    1
}

impl PatternConfig {
    pub fn new(regex: Regex, example: impl Into<String>, priority: u32) -> Self {
        Self {
            regex,
            example: example.into(),
            priority,
            group: default_group(),
            processor: None,
        }
    }

    /// Compile `pattern` into a pattern config.
    pub fn parse(
        pattern: &str,
        example: impl Into<String>,
        priority: u32,
    ) -> Result<Self, regex::Error> {
        Ok(Self::new(Regex::new(pattern)?, example, priority))
    }

    /// Set the capture group holding the value.
    pub fn with_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    /// Set the value processor.
    pub fn with_processor(mut self, processor: ValueProcessor) -> Self {
        self.processor = Some(processor);
        self
    }
}

/// Declarative description of one extractable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Canonical field identifier, unique within a profile.
    pub name: String,

    /// Alternate labels rewritten to `name` before extraction.
    #[serde(default)]
    pub synonyms: Vec<String>,

    /// Patterns tried in ascending priority.
    pub patterns: Vec<PatternConfig>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            synonyms: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Add synonyms, skipping case-insensitive duplicates. Accents are
    /// significant: `réf` and `ref` are two synonyms.
    pub fn with_synonyms<S: AsRef<str>>(mut self, synonyms: &[S]) -> Self {
        for synonym in synonyms {
            let synonym = synonym.as_ref().trim();
            if synonym.is_empty() {
                continue;
            }
            let lower = synonym.to_lowercase();
            if !self.synonyms.iter().any(|s| s.to_lowercase() == lower) {
                self.synonyms.push(synonym.to_string());
            }
        }
        self
    }

    /// Add a pattern.
    pub fn with_pattern(mut self, pattern: PatternConfig) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Patterns in evaluation order.
    pub fn ordered_patterns(&self) -> Vec<&PatternConfig> {
        let mut patterns: Vec<&PatternConfig> = self.patterns.iter().collect();
        patterns.sort_by_key(|p| p.priority);
        patterns
    }
}

/// Role a table column plays in a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Description,
    Quantity,
    UnitPrice,
    Discount,
    Total,
}

impl ColumnRole {
    /// Order in which header cells are tested against roles, so that
    /// "Prix total" resolves to a total and not to a unit price.
    pub const MATCH_ORDER: [ColumnRole; 5] = [
        ColumnRole::Discount,
        ColumnRole::Total,
        ColumnRole::UnitPrice,
        ColumnRole::Quantity,
        ColumnRole::Description,
    ];

    /// Whether cells of this column hold numbers.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnRole::Description)
    }
}

/// Header keywords for one column role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub role: ColumnRole,
    pub keywords: Vec<String>,
}

impl ColumnSpec {
    pub fn new<S: AsRef<str>>(role: ColumnRole, keywords: &[S]) -> Self {
        Self {
            role,
            keywords: keywords.iter().map(|k| k.as_ref().to_string()).collect(),
        }
    }
}

/// Line-item table layout for a document kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// Header keywords per column role.
    pub columns: Vec<ColumnSpec>,

    /// Leading words of rows that summarize rather than list items.
    #[serde(default)]
    pub summary_keywords: Vec<String>,

    /// Rows with fewer cells are dropped.
    #[serde(default = "default_min_columns")]
    pub min_columns: usize,

    /// Distinct roles a line must name to be taken as the header.
    #[serde(default = "default_min_header_roles")]
    pub min_header_roles: usize,
}

fn default_min_columns() -> usize {
    3
}

fn default_min_header_roles() -> usize {
    2
}

impl TableSpec {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            summary_keywords: Vec::new(),
            min_columns: default_min_columns(),
            min_header_roles: default_min_header_roles(),
        }
    }

    pub fn with_summary_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Self {
        self.summary_keywords = keywords.iter().map(|k| k.as_ref().to_string()).collect();
        self
    }

    /// Keywords for a role (empty if the role has no column).
    pub fn keywords(&self, role: ColumnRole) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.role == role)
            .flat_map(|c| c.keywords.iter().map(String::as_str))
            .collect()
    }
}

/// Related words used to repair mangled labels by edit distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticGroup {
    pub name: String,

    /// Field the group's words label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    pub words: Vec<String>,
}

impl SemanticGroup {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, field: Option<&str>, words: &[S]) -> Self {
        Self {
            name: name.into(),
            field: field.map(str::to_string),
            words: words.iter().map(|w| w.as_ref().to_string()).collect(),
        }
    }
}

/// Field configuration, weights and table layout for one document kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProfile {
    /// Profile name (`article`, `invoice`, ...).
    pub name: String,

    /// Fields to extract.
    pub fields: Vec<FieldConfig>,

    /// Relative weight of each field in the overall confidence.
    #[serde(default)]
    pub confidence_weights: BTreeMap<String, f64>,

    /// Line-item table layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSpec>,

    /// Word groups for fuzzy label correction.
    #[serde(default)]
    pub semantic_groups: Vec<SemanticGroup>,
}

impl DocumentProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            confidence_weights: BTreeMap::new(),
            table: None,
            semantic_groups: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_weight(mut self, field: impl Into<String>, weight: f64) -> Self {
        self.confidence_weights.insert(field.into(), weight);
        self
    }

    pub fn with_table(mut self, table: TableSpec) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_semantic_group(mut self, group: SemanticGroup) -> Self {
        self.semantic_groups.push(group);
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Configured weight for a field.
    pub fn weight(&self, name: &str) -> Option<f64> {
        self.confidence_weights.get(name).copied()
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(ProfileError::DuplicateField(field.name.clone()));
            }

            let mut priorities = HashSet::new();
            for pattern in &field.patterns {
                if !priorities.insert(pattern.priority) {
                    return Err(ProfileError::DuplicatePriority {
                        field: field.name.clone(),
                        priority: pattern.priority,
                    });
                }
                if pattern.group >= pattern.regex.captures_len() {
                    return Err(ProfileError::MissingCaptureGroup {
                        field: field.name.clone(),
                        pattern: pattern.regex.as_str().to_string(),
                        group: pattern.group,
                    });
                }
            }
        }

        for (field, weight) in &self.confidence_weights {
            if !names.contains(field.as_str()) {
                return Err(ProfileError::UnknownWeight(field.clone()));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ProfileError::InvalidWeight {
                    field: field.clone(),
                    weight: *weight,
                });
            }
        }

        if let Some(table) = &self.table {
            for role in [ColumnRole::Description, ColumnRole::Quantity, ColumnRole::UnitPrice] {
                if table.keywords(role).is_empty() {
                    return Err(ProfileError::InvalidTable(format!(
                        "no header keywords for {:?}",
                        role
                    )));
                }
            }
            if table.min_columns == 0 || table.min_header_roles == 0 {
                return Err(ProfileError::InvalidTable(
                    "min_columns and min_header_roles must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Parse and validate a profile from JSON.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, ProfileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

mod regex_serde {
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(regex: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(regex.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Regex::new(&pattern).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocumentProfile {
        DocumentProfile::new("sample")
            .with_field(
                FieldConfig::new("reference")
                    .with_synonyms(&["réf", "REF", "réf"])
                    .with_pattern(PatternConfig::parse(r"ref\w*\s*:\s*(\w+)", "ref: A1", 2).unwrap())
                    .with_pattern(PatternConfig::parse(r"reference\s*:\s*(\w+)", "reference: A1", 1).unwrap()),
            )
            .with_weight("reference", 2.0)
    }

    #[test]
    fn test_synonyms_deduplicated() {
        let profile = sample();
        assert_eq!(profile.fields[0].synonyms, vec!["réf".to_string(), "REF".to_string()]);

        let field = FieldConfig::new("reference").with_synonyms(&["Réf", " réf ", "RÉF"]);
        assert_eq!(field.synonyms, vec!["Réf".to_string()]);
    }

    #[test]
    fn test_ordered_patterns() {
        let profile = sample();
        let ordered = profile.fields[0].ordered_patterns();
        assert_eq!(ordered[0].priority, 1);
        assert_eq!(ordered[1].priority, 2);
    }

    #[test]
    fn test_validate_duplicate_priority() {
        let profile = DocumentProfile::new("dup").with_field(
            FieldConfig::new("a")
                .with_pattern(PatternConfig::parse(r"(a)", "a", 1).unwrap())
                .with_pattern(PatternConfig::parse(r"(b)", "b", 1).unwrap()),
        );
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::DuplicatePriority { priority: 1, .. })
        ));
    }

    #[test]
    fn test_validate_missing_group() {
        let profile = DocumentProfile::new("group").with_field(
            FieldConfig::new("a").with_pattern(PatternConfig::parse(r"a(b)", "ab", 1).unwrap().with_group(2)),
        );
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::MissingCaptureGroup { group: 2, .. })
        ));
    }

    #[test]
    fn test_validate_weights() {
        let unknown = sample().with_weight("missing", 1.0);
        assert!(matches!(unknown.validate(), Err(ProfileError::UnknownWeight(_))));

        let negative = sample().with_weight("reference", -1.0);
        assert!(matches!(negative.validate(), Err(ProfileError::InvalidWeight { .. })));
    }

    #[test]
    fn test_json_roundtrip_keeps_patterns() {
        let json = sample().to_json_pretty().unwrap();
        let parsed = DocumentProfile::from_json(&json).unwrap();
        let pattern = parsed.fields[0].ordered_patterns()[0];
        assert_eq!(pattern.regex.as_str(), r"reference\s*:\s*(\w+)");
        assert_eq!(pattern.group, 1);
    }

    #[test]
    fn test_from_json_rejects_bad_regex() {
        let json = r#"{"name":"bad","fields":[{"name":"a","patterns":[{"regex":"(","priority":1}]}]}"#;
        assert!(matches!(DocumentProfile::from_json(json), Err(ProfileError::Json(_))));
    }
}
