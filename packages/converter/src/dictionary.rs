//! Named lookup tables between REX ids and partner values.
//!
//! Dictionary files have an INI-like syntax:
//!
//! ```text
//! # comment
//! [metro_type]
//! 1        пешком        on foot
//! 2        транспортом
//! "4 5"    'qwe rty'     a long and winding comment
//! ```
//!
//! Every data line is `from to comment`, separated by runs of whitespace.
//! `from` and `to` may be quoted with `"`, `'` or `` ` `` to contain spaces;
//! the comment absorbs the rest of the line and defaults to empty. A later
//! line with the same key replaces an earlier one.
//!
//! An id of `0` means "no mapping": such entries resolve to the configured
//! default, never to an explicit zero.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use crate::error::{ConvertError, Result};
use crate::numbers::parse_int;

/// Result of a forward or reverse lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicEntry {
    /// The mapped value.
    pub id: String,
    /// Comment column of the matching line.
    pub comment: String,
}

impl DicEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            comment: comment.into(),
        }
    }
}

/// Result of a comment lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEntry {
    pub from: String,
    pub to: String,
}

/// One parsed data line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    from: String,
    to: String,
    comment: String,
}

#[derive(Debug, Default)]
struct Dictionary {
    forward: HashMap<String, DicEntry>,
    reverse: HashMap<String, DicEntry>,
    comments: HashMap<String, CommentEntry>,
    iforward: HashMap<String, DicEntry>,
    ireverse: HashMap<String, DicEntry>,
    icomments: HashMap<String, CommentEntry>,
}

impl Dictionary {
    fn insert(&mut self, line: Line) {
        let forward = DicEntry::new(&line.to, &line.comment);
        let reverse = DicEntry::new(&line.from, &line.comment);
        let comment = CommentEntry {
            from: line.from.clone(),
            to: line.to.clone(),
        };
        self.iforward.insert(fold_case(&line.from), forward.clone());
        self.ireverse.insert(fold_case(&line.to), reverse.clone());
        self.icomments.insert(fold_case(&line.comment), comment.clone());
        self.forward.insert(line.from, forward);
        self.reverse.insert(line.to, reverse);
        self.comments.insert(line.comment, comment);
    }
}

/// Key folding for case-insensitive tables.
fn fold_case(key: &str) -> String {
    key.nfc().collect::<String>().to_lowercase()
}

/// Lookup direction and case sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Forward,
    Reverse,
}

/// A set of named dictionaries loaded from one file.
///
/// Immutable after loading.
#[derive(Debug, Default)]
pub struct DictionarySet {
    dictionaries: HashMap<String, Dictionary>,
    default: Option<DicEntry>,
    source: Option<PathBuf>,
}

impl DictionarySet {
    /// Load a dictionary file.
    ///
    /// # Errors
    /// `DictionaryRead` if the file cannot be read, `MalformedDictionary` if a
    /// data line appears before any `[section]` or cannot be split into
    /// `from` and `to`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConvertError::DictionaryRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut set = Self::parse(&text).map_err(|line| ConvertError::MalformedDictionary {
            path: path.to_path_buf(),
            line,
        })?;
        set.source = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            dictionaries = set.dictionaries.len(),
            "Loaded dictionary file"
        );
        Ok(set)
    }

    /// Parse dictionary text.
    ///
    /// On failure returns the 1-based number of the offending line, if any.
    pub fn parse(text: &str) -> std::result::Result<Self, Option<usize>> {
        let mut set = Self::default();
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .filter(|name| !name.is_empty())
            {
                current = Some(name.to_string());
                continue;
            }
            let Some(name) = current.as_ref() else {
                return Err(Some(index + 1));
            };
            let line = parse_line(trimmed).ok_or(Some(index + 1))?;
            set.dictionaries.entry(name.clone()).or_default().insert(line);
        }

        Ok(set)
    }

    /// Set the value returned when a lookup finds nothing.
    #[must_use]
    pub fn with_default(mut self, default: Option<DicEntry>) -> Self {
        self.default = default;
        self
    }

    /// Path the set was loaded from.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether a dictionary with the given name exists.
    #[must_use]
    pub fn contains(&self, dictionary: &str) -> bool {
        self.dictionaries.contains_key(dictionary)
    }

    fn resolve(&self, dictionary: &str, key: &str, table: Table, icase: bool) -> Option<DicEntry> {
        let Some(dic) = self.dictionaries.get(dictionary) else {
            return self.default.clone();
        };
        let found = match (table, icase) {
            (Table::Forward, false) => dic.forward.get(key),
            (Table::Forward, true) => dic.iforward.get(&fold_case(key)),
            (Table::Reverse, false) => dic.reverse.get(key),
            (Table::Reverse, true) => dic.ireverse.get(&fold_case(key)),
        };
        match found {
            Some(entry) if parse_int(&entry.id) != Some(0) => Some(entry.clone()),
            _ => self.default.clone(),
        }
    }

    /// Map a `from` value to its `to` value and comment.
    ///
    /// # Examples
    /// ```
    /// use rex_converter::DictionarySet;
    ///
    /// let dic = DictionarySet::parse("[metro_type]\n1 пешком on foot\n").unwrap();
    /// let entry = dic.lookup("metro_type", "1").unwrap();
    /// assert_eq!(entry.id, "пешком");
    /// assert_eq!(entry.comment, "on foot");
    /// ```
    #[must_use]
    pub fn lookup(&self, dictionary: &str, key: &str) -> Option<DicEntry> {
        self.resolve(dictionary, key, Table::Forward, false)
    }

    /// Case-insensitive [`lookup`](Self::lookup).
    #[must_use]
    pub fn ilookup(&self, dictionary: &str, key: &str) -> Option<DicEntry> {
        self.resolve(dictionary, key, Table::Forward, true)
    }

    /// Map a `to` value back to its `from` value and comment.
    #[must_use]
    pub fn reverse(&self, dictionary: &str, key: &str) -> Option<DicEntry> {
        self.resolve(dictionary, key, Table::Reverse, false)
    }

    /// Case-insensitive [`reverse`](Self::reverse).
    #[must_use]
    pub fn ireverse(&self, dictionary: &str, key: &str) -> Option<DicEntry> {
        self.resolve(dictionary, key, Table::Reverse, true)
    }

    /// Map a comment to the `from` and `to` values of its line.
    ///
    /// Comment lookups are not subject to the zero-id rule.
    #[must_use]
    pub fn comment(&self, dictionary: &str, text: &str) -> Option<CommentEntry> {
        self.comment_in(dictionary, text, false)
    }

    /// Case-insensitive [`comment`](Self::comment).
    #[must_use]
    pub fn icomment(&self, dictionary: &str, text: &str) -> Option<CommentEntry> {
        self.comment_in(dictionary, text, true)
    }

    fn comment_in(&self, dictionary: &str, text: &str, icase: bool) -> Option<CommentEntry> {
        let Some(dic) = self.dictionaries.get(dictionary) else {
            return self.default.as_ref().map(|d| CommentEntry {
                from: d.id.clone(),
                to: d.id.clone(),
            });
        };
        if icase {
            dic.icomments.get(&fold_case(text)).cloned()
        } else {
            dic.comments.get(text).cloned()
        }
    }

    /// Forward lookup returning only the mapped value.
    #[must_use]
    pub fn from_id(&self, dictionary: &str, key: &str) -> Option<String> {
        self.lookup(dictionary, key).map(|e| e.id)
    }

    /// Reverse lookup returning only the original value.
    #[must_use]
    pub fn to_id(&self, dictionary: &str, key: &str) -> Option<String> {
        self.reverse(dictionary, key).map(|e| e.id)
    }

    /// Forward lookup returning only the comment.
    #[must_use]
    pub fn from_comment(&self, dictionary: &str, key: &str) -> Option<String> {
        self.lookup(dictionary, key).map(|e| e.comment)
    }

    /// Reverse lookup returning only the comment.
    #[must_use]
    pub fn to_comment(&self, dictionary: &str, key: &str) -> Option<String> {
        self.reverse(dictionary, key).map(|e| e.comment)
    }
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`')
}

/// Split one trimmed data line into `from`, `to` and `comment`.
///
/// Returns `None` when the line has no separable `from` and `to`.
fn parse_line(line: &str) -> Option<Line> {
    let (from, rest) = take_field(line)?;
    let rest = rest.trim_start();
    let (to, rest) = take_field(rest)?;
    Some(Line {
        from,
        to,
        comment: rest.trim().to_string(),
    })
}

/// Take one possibly quoted field from the start of `input`.
///
/// A quoted field runs to the matching quote; an unquoted one to the next
/// whitespace or the end of input.
fn take_field(input: &str) -> Option<(String, &str)> {
    let mut chars = input.char_indices();
    let (_, first) = chars.next()?;

    if is_quote(first) {
        let body = &input[first.len_utf8()..];
        let end = body.find(first)?;
        let rest = &body[end + first.len_utf8()..];
        return Some((body[..end].to_string(), rest));
    }

    let end = input
        .find(char::is_whitespace)
        .unwrap_or(input.len());
    Some((input[..end].to_string(), &input[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# test dictionary
[dic1]
1       2       comment1
2       abc     comment2
3       "abc def"   comment3
"4 5"   "qwe rty"   comment4
x       y
"x y"   `a very long string`   and a long comment
zero    0       unmapped

[region_geo]
7800000000000   Санкт-Петербург   СПб
4700000000000   'Ленинградская область'
"#;

    fn dic() -> DictionarySet {
        DictionarySet::parse(SAMPLE).unwrap()
    }

    #[test]
    fn test_forward_lookup() {
        let dic = dic();
        assert_eq!(dic.lookup("dic1", "1"), Some(DicEntry::new("2", "comment1")));
        assert_eq!(dic.lookup("dic1", "2"), Some(DicEntry::new("abc", "comment2")));
        assert_eq!(dic.lookup("dic1", "3"), Some(DicEntry::new("abc def", "comment3")));
        assert_eq!(dic.lookup("dic1", "x"), Some(DicEntry::new("y", "")));
    }

    #[test]
    fn test_quoted_fields_with_spaces() {
        let dic = dic();
        assert_eq!(dic.lookup("dic1", "4 5"), Some(DicEntry::new("qwe rty", "comment4")));
        assert_eq!(
            dic.lookup("dic1", "x y"),
            Some(DicEntry::new("a very long string", "and a long comment"))
        );
    }

    #[test]
    fn test_reverse_lookup() {
        let dic = dic();
        assert_eq!(dic.reverse("dic1", "2"), Some(DicEntry::new("1", "comment1")));
        assert_eq!(
            dic.reverse("region_geo", "Ленинградская область"),
            Some(DicEntry::new("4700000000000", ""))
        );
    }

    #[test]
    fn test_comment_lookup() {
        let dic = dic();
        assert_eq!(
            dic.comment("dic1", "comment1"),
            Some(CommentEntry {
                from: "1".to_string(),
                to: "2".to_string()
            })
        );
        assert!(dic.comment("dic1", "missing").is_none());
    }

    #[test]
    fn test_case_insensitive_variants() {
        let dic = dic();
        assert_eq!(dic.lookup("dic1", "X"), None);
        assert_eq!(dic.ilookup("dic1", "X"), Some(DicEntry::new("y", "")));
        assert_eq!(
            dic.ireverse("region_geo", "санкт-петербург"),
            Some(DicEntry::new("7800000000000", "СПб"))
        );
        assert!(dic.icomment("dic1", "COMMENT2").is_some());
    }

    #[test]
    fn test_zero_means_no_value() {
        let dic = dic();
        assert_eq!(dic.lookup("dic1", "zero"), None);
        assert_eq!(dic.reverse("dic1", "0"), Some(DicEntry::new("zero", "unmapped")));

        let with_default = DictionarySet::parse(SAMPLE)
            .unwrap()
            .with_default(Some(DicEntry::new("?", "")));
        assert_eq!(with_default.lookup("dic1", "zero"), Some(DicEntry::new("?", "")));
        assert_eq!(with_default.lookup("dic1", "missing"), Some(DicEntry::new("?", "")));
    }

    #[test]
    fn test_unknown_dictionary_returns_default() {
        let dic = dic();
        assert_eq!(dic.lookup("nope", "1"), None);
        let with_default = dic.with_default(Some(DicEntry::new("d", "")));
        assert_eq!(with_default.reverse("nope", "1"), Some(DicEntry::new("d", "")));
    }

    #[test]
    fn test_id_shortcuts() {
        let dic = dic();
        assert_eq!(dic.from_id("dic1", "2"), Some("abc".to_string()));
        assert_eq!(dic.to_id("dic1", "abc"), Some("2".to_string()));
        assert_eq!(dic.from_comment("dic1", "2"), Some("comment2".to_string()));
        assert_eq!(dic.to_comment("region_geo", "Санкт-Петербург"), Some("СПб".to_string()));
        assert_eq!(dic.from_id("dic1", "missing"), None);
    }

    #[test]
    fn test_last_line_wins() {
        let dic = DictionarySet::parse("[d]\n1 a first\n1 b second\n").unwrap();
        assert_eq!(dic.lookup("d", "1"), Some(DicEntry::new("b", "second")));
        assert_eq!(dic.reverse("d", "a"), Some(DicEntry::new("1", "first")));
    }

    #[test]
    fn test_round_trip_every_entry() {
        let text = "[d]\n10 ten t\n20 twenty w\n\"3 0\" thirty h\n";
        let dic = DictionarySet::parse(text).unwrap();
        for (from, to, comment) in [("10", "ten", "t"), ("20", "twenty", "w"), ("3 0", "thirty", "h")] {
            assert_eq!(dic.lookup("d", from), Some(DicEntry::new(to, comment)));
            assert_eq!(dic.reverse("d", to), Some(DicEntry::new(from, comment)));
        }
    }

    #[test]
    fn test_data_before_section_is_malformed() {
        assert_eq!(DictionarySet::parse("1 2 3\n[d]\n").err(), Some(Some(1)));
    }

    #[test]
    fn test_line_without_to_is_malformed() {
        assert_eq!(DictionarySet::parse("[d]\nlonely\n").err(), Some(Some(2)));
        assert_eq!(DictionarySet::parse("[d]\n\"unterminated 2\n").err(), Some(Some(2)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DictionarySet::load("/nonexistent/dic.txt").unwrap_err();
        assert!(matches!(err, ConvertError::DictionaryRead { .. }));
    }

    #[test]
    fn test_crlf_line_endings() {
        let dic = DictionarySet::parse("[d]\r\n1 a c\r\n2 b\r\n").unwrap();
        assert_eq!(dic.lookup("d", "1"), Some(DicEntry::new("a", "c")));
        assert_eq!(dic.lookup("d", "2"), Some(DicEntry::new("b", "")));
    }
}
