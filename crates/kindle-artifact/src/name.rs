//! Symbolic names for resolvable artifacts
//!
//! Provides [`SymbolicName`], the key every artifact is registered and
//! resolved under.

use heck::ToSnakeCase;
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Namespace separator inside a symbolic name
pub const SEPARATOR: &str = "::";

/// Name of a potential artifact
///
/// Opaque to the runtime beyond equality and hashing. Namespaced names use
/// `::` between segments.
///
/// # Examples
/// - `Post`
/// - `Admin::UserProfile`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolicName(String);

impl SymbolicName {
    /// Parse and validate a name
    ///
    /// # Errors
    /// Returns error if the name is empty or a segment is not an identifier
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Borrow the name as written
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterator over namespace segments
    #[inline]
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Number of namespace segments
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Last segment (the unqualified name)
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Enclosing namespace, if any
    #[must_use]
    pub fn namespace(&self) -> Option<Self> {
        self.0
            .rfind(SEPARATOR)
            .map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Conventional relative source path segments
    ///
    /// `Admin::UserProfile` → `["admin", "user_profile"]`
    #[must_use]
    pub fn to_path_segments(&self) -> Vec<String> {
        self.segments().map(ToSnakeCase::to_snake_case).collect()
    }
}

fn validate(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    for segment in name.split(SEPARATOR) {
        if segment.is_empty() {
            return Err(NameError::EmptySegment(name.to_string()));
        }
        if segment.contains(|c: char| !c.is_alphanumeric() && c != '_') {
            return Err(NameError::InvalidSegment {
                name: name.to_string(),
                segment: segment.to_string(),
            });
        }
    }
    Ok(())
}

impl Display for SymbolicName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SymbolicName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SymbolicName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SymbolicName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SymbolicName> for String {
    fn from(name: SymbolicName) -> Self {
        name.0
    }
}

impl AsRef<str> for SymbolicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SymbolicName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Errors related to symbolic names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// Name is the empty string
    #[error("symbolic name is empty")]
    Empty,

    /// Namespace separator with nothing on one side
    #[error("symbolic name '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Segment with characters outside `[A-Za-z0-9_]`
    #[error("invalid segment '{segment}' in '{name}' (must be alphanumeric or underscore)")]
    InvalidSegment {
        /// Full name as given
        name: String,
        /// Offending segment
        segment: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_accepts_plain_identifier() {
        let name = SymbolicName::new("Post").unwrap();
        assert_eq!(name.as_str(), "Post");
        assert_eq!(name.depth(), 1);
        assert!(name.namespace().is_none());
    }

    #[test]
    fn name_namespaced_segments() {
        let name: SymbolicName = "Admin::UserProfile".parse().unwrap();
        assert_eq!(name.segments().collect::<Vec<_>>(), vec!["Admin", "UserProfile"]);
        assert_eq!(name.base_name(), "UserProfile");
        assert_eq!(name.namespace().unwrap().as_str(), "Admin");
    }

    #[test]
    fn name_rejects_empty() {
        assert_eq!(SymbolicName::new(""), Err(NameError::Empty));
    }

    #[test]
    fn name_rejects_empty_segment() {
        assert!(matches!(
            SymbolicName::new("Admin::::User"),
            Err(NameError::EmptySegment(_))
        ));
        assert!(matches!(
            SymbolicName::new("::User"),
            Err(NameError::EmptySegment(_))
        ));
    }

    #[test]
    fn name_rejects_punctuation() {
        let result = SymbolicName::new("Post-Comment");
        assert!(matches!(result, Err(NameError::InvalidSegment { .. })));
    }

    #[test]
    fn name_path_segments_are_snake_case() {
        let name = SymbolicName::new("Admin::UserProfile").unwrap();
        assert_eq!(name.to_path_segments(), vec!["admin", "user_profile"]);
    }

    #[test]
    fn name_serde_as_string() {
        let name = SymbolicName::new("Blog::Post").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Blog::Post\"");

        let back: SymbolicName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);

        let bad: Result<SymbolicName, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
