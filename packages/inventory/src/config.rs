//! Configuration constants, validation functions and tunable policies.

use regex::Regex;
use std::sync::LazyLock;

use chrono::NaiveDate;

use crate::error::{InventoryError, Result};

/// XML namespace of Inventory documents.
pub const INVENTORY_NAMESPACE: &str = "http://schemas.esd.org.uk/inventory";

/// Literal values of a dataset's `Active` attribute that mean "true".
///
/// Matching is case-sensitive. Anything else, including an absent or
/// empty attribute, means inactive.
pub const ACTIVE_LITERALS: [&str; 2] = ["Yes", "True"];

/// Legacy Open Government Licence URL still used by some publishers.
pub const OGL_LEGACY_URL: &str = "http://www.nationalarchives.gov.uk/doc/open-government-licence";

/// Canonical Open Government Licence URL that the legacy alias maps to.
pub const OGL_CANONICAL_URL: &str =
    "http://www.nationalarchives.gov.uk/doc/open-government-licence/version/2/";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default maximum HTTP response size in bytes (100 MB).
///
/// Large authorities publish inventories with tens of thousands of
/// renditions; this still bounds memory for a single download.
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 100 * 1024 * 1024;

/// Date pattern: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Validate and parse a date in YYYY-MM-DD format.
///
/// # Examples
/// ```
/// use inventory_harvester::config::validate_date;
///
/// assert!(validate_date("2013-12-01").is_ok());
/// assert!(validate_date("invalid").is_err());
/// assert!(validate_date("2013-13-01").is_err()); // Invalid month
/// ```
pub fn validate_date(date_str: &str) -> Result<NaiveDate> {
    if !DATE_PATTERN.is_match(date_str) {
        return Err(InventoryError::InvalidDate(date_str.to_string()));
    }

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| InventoryError::InvalidDate(date_str.to_string()))
}

/// Map a rights URL onto its canonical licence URL when it is a known alias.
///
/// # Examples
/// ```
/// use inventory_harvester::config::{normalize_rights, OGL_CANONICAL_URL};
///
/// assert_eq!(
///     normalize_rights("http://www.nationalarchives.gov.uk/doc/open-government-licence"),
///     OGL_CANONICAL_URL
/// );
/// assert_eq!(normalize_rights("http://example.com/licence"), "http://example.com/licence");
/// ```
pub fn normalize_rights(rights: &str) -> String {
    if rights == OGL_LEGACY_URL {
        OGL_CANONICAL_URL.to_string()
    } else {
        rights.to_string()
    }
}

/// How many `Subject/Service` and `Subject/Function` values a dataset keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectCardinality {
    /// Only the first occurrence, promoted to a one-element list.
    First,
    /// Every occurrence, in document order.
    #[default]
    All,
}

impl SubjectCardinality {
    fn from_env_value(value: &str) -> Result<Self> {
        match value {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(InventoryError::Configuration(format!(
                "INVENTORY_SUBJECTS must be 'first' or 'all', got '{other}'"
            ))),
        }
    }
}

/// When a previously stored modification date counts as outdated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangePolicy {
    /// Changed only when the stored date is strictly earlier.
    #[default]
    StrictlyEarlier,
    /// Changed when the stored date is earlier or the same day.
    EarlierOrEqual,
}

impl ChangePolicy {
    /// Whether `stored` is outdated compared to `current`.
    #[must_use]
    pub fn is_outdated(self, stored: NaiveDate, current: NaiveDate) -> bool {
        match self {
            Self::StrictlyEarlier => stored < current,
            Self::EarlierOrEqual => stored <= current,
        }
    }

    fn from_env_value(value: &str) -> Result<Self> {
        match value {
            "strict" => Ok(Self::StrictlyEarlier),
            "inclusive" => Ok(Self::EarlierOrEqual),
            other => Err(InventoryError::Configuration(format!(
                "INVENTORY_CHANGE_POLICY must be 'strict' or 'inclusive', got '{other}'"
            ))),
        }
    }
}

/// Options for the document parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub subjects: SubjectCardinality,
    /// `active` of a rendition without (or with an empty) `Active` attribute.
    pub resource_active_default: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            subjects: SubjectCardinality::default(),
            resource_active_default: true,
        }
    }
}

/// Options for the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOptions {
    pub change_policy: ChangePolicy,
}

/// Complete configuration for one harvest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InventoryConfig {
    pub parser: ParserOptions,
    pub reconcile: ReconcileOptions,
}

impl InventoryConfig {
    /// Build a configuration from environment variables.
    ///
    /// Reads `INVENTORY_SUBJECTS` (`first`|`all`) and
    /// `INVENTORY_CHANGE_POLICY` (`strict`|`inclusive`). Unset variables
    /// keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("INVENTORY_SUBJECTS") {
            config.parser.subjects = SubjectCardinality::from_env_value(value.trim())?;
        }

        if let Ok(value) = std::env::var("INVENTORY_CHANGE_POLICY") {
            config.reconcile.change_policy = ChangePolicy::from_env_value(value.trim())?;
        }

        Ok(config)
    }

    pub fn with_subjects(mut self, subjects: SubjectCardinality) -> Self {
        self.parser.subjects = subjects;
        self
    }

    pub fn with_resource_active_default(mut self, active: bool) -> Self {
        self.parser.resource_active_default = active;
        self
    }

    pub fn with_change_policy(mut self, policy: ChangePolicy) -> Self {
        self.reconcile.change_policy = policy;
        self
    }
}
