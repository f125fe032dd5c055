//! Importance tiers for diff paths.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ConvertError, Result};

/// How much a difference at a path matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Unimportant,
    Medium,
    Important,
}

/// One path rule.
#[derive(Debug, Clone)]
pub enum PathRule {
    /// The whole path equals the string.
    Literal(String),
    /// The regex matches somewhere in the path.
    Pattern(Regex),
    /// The function returns true for the path.
    Predicate(fn(&str) -> bool),
}

impl PathRule {
    /// Compile a regex rule.
    ///
    /// # Errors
    /// `InvalidPattern` if the regex does not compile.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| ConvertError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == path,
            Self::Pattern(regex) => regex.is_match(path),
            Self::Predicate(f) => f(path),
        }
    }
}

const UNIMPORTANT_PATTERNS: &[&str] = &[
    r"(?i)^meta\.0\.attachments\.0\.attachment\.\d+\.(width|height|size|length|title|mime)",
    r"^meta\.0\.(highlight|imported|source|url)",
    r"^title",
    r"^owner\.0\.group",
    r"^owner\.0\.url",
    r"^owner\.0\.agent\.0\.\$",
    r"^estate\.0\.\$",
];

const MEDIUM_PATTERNS: &[&str] = &[
    r"^meta\.0\.(link|extid)",
    r"^estate\.0\.facilities",
    r"^estate\.0\.location\.0\.(gps|street|flat)",
    r"^estate\.0\.flat\.0\.levels",
    r"^estate\.0\.flat\.0\.storey\.0\.type",
    r"^estate\.0\.house\.0\.(ready_status|repair_year)",
    r"^rent\.0",
    r"^\$\.(ctm|mtm)",
];

#[allow(clippy::expect_used)] // Static regexes that are guaranteed to be valid
static DEFAULT_UNIMPORTANT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    UNIMPORTANT_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
});

#[allow(clippy::expect_used)] // Static regexes that are guaranteed to be valid
static DEFAULT_MEDIUM: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MEDIUM_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
});

/// Ordered unimportant and medium rules; everything else is important.
///
/// Unimportant rules are tried first, and the first match decides.
#[derive(Debug, Clone)]
pub struct ImportanceRules {
    unimportant: Vec<PathRule>,
    medium: Vec<PathRule>,
}

impl Default for ImportanceRules {
    fn default() -> Self {
        Self {
            unimportant: DEFAULT_UNIMPORTANT.iter().cloned().map(PathRule::Pattern).collect(),
            medium: DEFAULT_MEDIUM.iter().cloned().map(PathRule::Pattern).collect(),
        }
    }
}

impl ImportanceRules {
    /// No rules at all: every path is important.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            unimportant: Vec::new(),
            medium: Vec::new(),
        }
    }

    /// Append unimportant rules after the existing ones.
    #[must_use]
    pub fn with_unimportant(mut self, rules: impl IntoIterator<Item = PathRule>) -> Self {
        self.unimportant.extend(rules);
        self
    }

    /// Append medium rules after the existing ones.
    #[must_use]
    pub fn with_medium(mut self, rules: impl IntoIterator<Item = PathRule>) -> Self {
        self.medium.extend(rules);
        self
    }

    /// Tier of a dot-joined diff path.
    ///
    /// # Examples
    /// ```
    /// use rex_converter::compare::{ImportanceRules, Tier};
    ///
    /// let rules = ImportanceRules::default();
    /// assert_eq!(rules.classify("owner.0.url"), Tier::Unimportant);
    /// assert_eq!(rules.classify("meta.0.extid"), Tier::Medium);
    /// assert_eq!(rules.classify("price.0.full"), Tier::Important);
    /// ```
    #[must_use]
    pub fn classify(&self, path: &str) -> Tier {
        if self.unimportant.iter().any(|r| r.matches(path)) {
            Tier::Unimportant
        } else if self.medium.iter().any(|r| r.matches(path)) {
            Tier::Medium
        } else {
            Tier::Important
        }
    }
}

/// Parse an exclude list into unimportant rules.
///
/// One rule per line: a line starting with `/` is a regex (the slash is
/// dropped, as is one trailing slash), anything else a literal path. Blank
/// lines and `#` comments are skipped.
///
/// # Errors
/// `InvalidPattern` for a regex line that does not compile.
///
/// # Examples
/// ```
/// use rex_converter::compare::parse_exclude_list;
///
/// let rules = parse_exclude_list("# ignore these\nprice.0.full\n/^estate\\.0\\.desc/\n").unwrap();
/// assert_eq!(rules.len(), 2);
/// assert!(rules[0].matches("price.0.full"));
/// assert!(rules[1].matches("estate.0.desc.0.text"));
/// ```
pub fn parse_exclude_list(text: &str) -> Result<Vec<PathRule>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.strip_prefix('/') {
            Some(pattern) => PathRule::regex(pattern.strip_suffix('/').unwrap_or(pattern)),
            None => Ok(PathRule::Literal(line.to_string())),
        })
        .collect()
}
