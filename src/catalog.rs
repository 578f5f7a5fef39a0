// src/catalog.rs
//! Pattern catalog: the weighted, labeled rules the scorer applies.
//!
//! Rules come either from the built-in table below or from a TOML file:
//!
//! ```toml
//! [[rules]]
//! id = "e2e_encryption"
//! category = "positive"
//! pattern = "end-to-end\\s+encrypt"
//! label = "End-to-end encryption"
//! weight = 15
//! ```
//!
//! Every matcher is compiled case-insensitively when the catalog is built.
//! A rule that fails validation aborts construction; nothing is skipped.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Upper bound on the compiled size of a single matcher.
pub const MATCHER_SIZE_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Evidence of privacy-respecting practice.
    Positive,
    /// Evidence of privacy-harming practice.
    Negative,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Positive => f.write_str("positive"),
            Category::Negative => f.write_str("negative"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("rule `{id}` pattern failed to compile: {source}")]
    PatternCompilation {
        id: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule `{id}` has an empty pattern")]
    EmptyPattern { id: String },
    #[error("rule `{id}` is {category} but has weight {weight}")]
    InvalidWeight {
        id: String,
        category: Category,
        weight: i32,
    },
    #[error("invalid scoring settings: {0}")]
    InvalidScoring(String),
    #[error("duplicate rule id `{id}`")]
    DuplicateId { id: String },
    #[error("catalog config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("reading catalog from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Plain, uncompiled rule as written in the table or a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: String,
    pub category: Category,
    pub pattern: String,
    pub label: String,
    pub weight: i32,
}

/// A validated rule with its compiled matcher.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub id: String,
    pub category: Category,
    pub label: String,
    pub weight: i32,
    matcher: Regex,
}

impl PatternRule {
    fn compile(def: RuleDef) -> Result<Self, CatalogError> {
        if def.pattern.trim().is_empty() {
            return Err(CatalogError::EmptyPattern { id: def.id });
        }
        let sign_ok = match def.category {
            Category::Positive => def.weight > 0,
            Category::Negative => def.weight < 0,
        };
        if !sign_ok {
            return Err(CatalogError::InvalidWeight {
                id: def.id,
                category: def.category,
                weight: def.weight,
            });
        }
        let matcher = RegexBuilder::new(&def.pattern)
            .case_insensitive(true)
            .size_limit(MATCHER_SIZE_LIMIT)
            .build()
            .map_err(|source| CatalogError::PatternCompilation {
                id: def.id.clone(),
                source,
            })?;
        Ok(Self {
            id: def.id,
            category: def.category,
            label: def.label,
            weight: def.weight,
            matcher,
        })
    }

    /// Byte offset of the first match, if any.
    pub fn first_match(&self, text: &str) -> Option<usize> {
        self.matcher.find(text).map(|m| m.start())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn to_def(&self) -> RuleDef {
        RuleDef {
            id: self.id.clone(),
            category: self.category,
            pattern: self.pattern().to_string(),
            label: self.label.clone(),
            weight: self.weight,
        }
    }
}

/// Immutable, ordered rule registry split by category.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    positive: Vec<PatternRule>,
    negative: Vec<PatternRule>,
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    rules: Vec<RuleDef>,
}

impl PatternCatalog {
    /// The built-in rule table.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_defs(builtin_rule_defs())
    }

    /// Validate and compile `defs`, keeping their relative order per category.
    pub fn from_defs<I>(defs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = RuleDef>,
    {
        let mut seen = HashSet::new();
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for def in defs {
            if !seen.insert(def.id.clone()) {
                return Err(CatalogError::DuplicateId { id: def.id });
            }
            let rule = PatternRule::compile(def)?;
            match rule.category {
                Category::Positive => positive.push(rule),
                Category::Negative => negative.push(rule),
            }
        }
        debug!(
            positive = positive.len(),
            negative = negative.len(),
            "pattern catalog compiled"
        );
        Ok(Self { positive, negative })
    }

    /// Parse `[[rules]]` entries from TOML. Other tables are ignored.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CatalogError> {
        let file: RulesFile = toml::from_str(toml_str)?;
        Self::from_defs(file.rules)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn positive(&self) -> &[PatternRule] {
        &self.positive
    }

    pub fn negative(&self) -> &[PatternRule] {
        &self.negative
    }

    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<&PatternRule> {
        self.iter().find(|r| r.id == id)
    }

    /// Positive rules first, then negative, each in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternRule> {
        self.positive.iter().chain(self.negative.iter())
    }
}

struct BuiltinRule {
    id: &'static str,
    category: Category,
    pattern: &'static str,
    label: &'static str,
    weight: i32,
}

const fn pos(id: &'static str, pattern: &'static str, label: &'static str, weight: i32) -> BuiltinRule {
    BuiltinRule {
        id,
        category: Category::Positive,
        pattern,
        label,
        weight,
    }
}

const fn neg(id: &'static str, pattern: &'static str, label: &'static str, weight: i32) -> BuiltinRule {
    BuiltinRule {
        id,
        category: Category::Negative,
        pattern,
        label,
        weight,
    }
}

const BUILTIN_RULES: &[BuiltinRule] = &[
    pos("e2e_encryption", r"end-to-end\s+encrypt", "End-to-end encryption", 15),
    pos(
        "does_not_sell",
        r"(?:do|does)\s+not\s+sell\s+(?:your\s+)?(?:personal\s+)?(?:data|information)",
        "Does not sell data",
        20,
    ),
    pos("never_sells", r"never\s+sell", "Never sells", 20),
    pos(
        "cannot_access",
        r"cannot\s+(?:decrypt|access|read|view)",
        "Cannot access your data",
        18,
    ),
    pos("zero_knowledge", r"zero[\s-]?knowledge", "Zero knowledge", 15),
    pos("open_source", r"open[\s-]?source", "Open source", 8),
    pos("privacy_by_design", r"privacy\s+by\s+design", "Privacy by design", 12),
    pos(
        "minimum_data",
        r"minimum\s+(?:data\s+)?(?:required|necessary)",
        "Minimum data",
        10,
    ),
    pos(
        "stored_on_device",
        r"stored\s+(?:only\s+)?on\s+your\s+(?:own\s+)?device",
        "Stored on device",
        12,
    ),
    pos("no_tracking", r"(?:do|does)\s+not\s+(?:track|monitor)", "No tracking", 12),
    pos("does_not_share", r"(?:do|does)\s+not\s+share", "Does not share", 10),
    pos(
        "right_to_erasure",
        r"right\s+to\s+(?:be\s+)?(?:forgotten|erased|deleted)",
        "Right to be forgotten",
        8,
    ),
    neg(
        "sells_data",
        r"sell\s+(?:your\s+)?(?:personal\s+)?(?:data|information)",
        "Sells data",
        -20,
    ),
    neg(
        "third_party_sharing",
        r"share\s+(?:your\s+)?(?:personal\s+)?(?:data|information)\s+with\s+(?:third[\s-]?part|advertis)",
        "Shares with third parties",
        -15,
    ),
    neg("biometric", r"biometric", "Biometric data", -10),
    neg("facial_recognition", r"facial\s+recognition", "Facial recognition", -12),
    neg(
        "tracking",
        r"track(?:ing)?\s+(?:your\s+)?(?:location|activity|behavior)",
        "Tracking",
        -10,
    ),
    neg(
        "indefinite_retention",
        r"retain\s+(?:your\s+)?(?:data|information)\s+(?:indefinitely|forever)",
        "Indefinite retention",
        -15,
    ),
    neg(
        "vague_retention",
        r"(?:as\s+long\s+as\s+)?(?:necessary|needed)",
        "Vague retention",
        -5,
    ),
    neg("ad_partners", r"advertising\s+(?:partners?|networks?)", "Ad partners", -10),
    neg("behavioral_ads", r"behavioral\s+advertising", "Behavioral ads", -12),
    neg(
        "cross_site_tracking",
        r"cross[\s-]?(?:site|device)\s+tracking",
        "Cross-site tracking",
        -12,
    ),
    neg(
        "may_disclose",
        r"(?:may|might|can)\s+(?:disclose|transfer)",
        "May disclose data",
        -8,
    ),
    neg(
        "changes_without_notice",
        r"without\s+(?:prior\s+)?notice",
        "Changes without notice",
        -10,
    ),
];

/// The built-in table as plain definitions, in catalog order.
pub fn builtin_rule_defs() -> Vec<RuleDef> {
    BUILTIN_RULES
        .iter()
        .map(|r| RuleDef {
            id: r.id.to_string(),
            category: r.category,
            pattern: r.pattern.to_string(),
            label: r.label.to_string(),
            weight: r.weight,
        })
        .collect()
}
