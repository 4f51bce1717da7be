//! Convention-based lookup
//!
//! Maps `Admin::UserProfile` to `<root>/admin/user_profile.<ext>` under each
//! load root, first match wins. A bare directory matching a name defines a
//! [`Namespace`] artifact, so `Admin` resolves as soon as `admin/` exists.

use crate::resolver::ResolveContext;
use crate::strategy::LookupStrategy;
use anyhow::Context as _;
use heck::ToUpperCamelCase;
use kindle_artifact::{Artifact, SymbolicName, SEPARATOR};
use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};

/// A source file located for a name, handed to the loader
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Name being resolved
    pub name: SymbolicName,

    /// File the definition was read from
    pub path: PathBuf,

    /// File contents
    pub source: String,
}

/// Artifact produced for a name that maps to a directory only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Name of the namespace
    pub name: SymbolicName,

    /// Directory backing it
    pub dir: PathBuf,
}

type Loader = dyn Fn(&SourceUnit, &mut ResolveContext<'_>) -> anyhow::Result<Artifact> + Send + Sync;

/// Lookup strategy deriving file paths from names
pub struct ConventionLookup {
    roots: Vec<PathBuf>,
    extension: String,
    loader: Box<Loader>,
}

impl ConventionLookup {
    /// Create lookup over `roots` for files ending in `extension`
    ///
    /// `loader` turns a located source unit into an artifact.
    pub fn new<F>(roots: impl IntoIterator<Item = PathBuf>, extension: impl Into<String>, loader: F) -> Self
    where
        F: Fn(&SourceUnit, &mut ResolveContext<'_>) -> anyhow::Result<Artifact> + Send + Sync + 'static,
    {
        Self {
            roots: roots.into_iter().collect(),
            extension: extension.into().trim_start_matches('.').to_string(),
            loader: Box::new(loader),
        }
    }

    /// Load roots, in search order
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Source file extension (without dot)
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Relative path a name maps to, without extension
    #[must_use]
    pub fn relative_stem(name: &SymbolicName) -> PathBuf {
        name.to_path_segments().iter().collect()
    }

    /// Glob patterns matching every source file under the roots
    #[must_use]
    pub fn watch_patterns(&self) -> Vec<String> {
        self.roots
            .iter()
            .map(|root| {
                root.join("**")
                    .join(format!("*.{}", self.extension))
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    fn locate_file(&self, name: &SymbolicName) -> Option<PathBuf> {
        let stem = Self::relative_stem(name);
        self.roots
            .iter()
            .map(|root| root.join(&stem).with_extension(&self.extension))
            .find(|path| path.is_file())
    }

    fn locate_dir(&self, name: &SymbolicName) -> Option<PathBuf> {
        let stem = Self::relative_stem(name);
        self.roots
            .iter()
            .map(|root| root.join(&stem))
            .find(|path| path.is_dir())
    }

    fn name_for(&self, root: &Path, file: &Path) -> Option<SymbolicName> {
        let relative = file.strip_prefix(root).ok()?.with_extension("");
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_upper_camel_case())
            .collect();
        SymbolicName::new(segments.join(SEPARATOR)).ok()
    }
}

impl Debug for ConventionLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionLookup")
            .field("roots", &self.roots)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl LookupStrategy for ConventionLookup {
    fn lookup(
        &self,
        name: &SymbolicName,
        cx: &mut ResolveContext<'_>,
    ) -> anyhow::Result<Option<Artifact>> {
        if let Some(path) = self.locate_file(name) {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            tracing::debug!(%name, path = %path.display(), "loading source unit");
            let unit = SourceUnit {
                name: name.clone(),
                path,
                source,
            };
            return (self.loader)(&unit, cx).map(Some);
        }

        Ok(self.locate_dir(name).map(|dir| {
            Artifact::new(Namespace {
                name: name.clone(),
                dir,
            })
        }))
    }

    fn known_names(&self) -> anyhow::Result<Vec<SymbolicName>> {
        let mut names = Vec::new();
        for root in &self.roots {
            let pattern = root.join("**").join(format!("*.{}", self.extension));
            let pattern = pattern.to_string_lossy();
            for path in glob::glob(&pattern).with_context(|| format!("bad load root pattern {pattern}"))? {
                let path = path?;
                if let Some(name) = self.name_for(root, &path) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use kindle_registry::ArtifactRegistry;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn text_lookup(root: &Path) -> ConventionLookup {
        ConventionLookup::new([root.to_path_buf()], "txt", |unit, _| {
            Ok(Artifact::new(unit.source.trim().to_string()))
        })
    }

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn relative_stem_is_snake_case() {
        let name = SymbolicName::new("Admin::UserProfile").unwrap();
        assert_eq!(
            ConventionLookup::relative_stem(&name),
            PathBuf::from("admin").join("user_profile")
        );
    }

    #[test]
    fn lookup_reads_conventional_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "post.txt", "omg\n");

        let resolver = Resolver::new(
            Arc::new(ArtifactRegistry::new()),
            Arc::new(text_lookup(dir.path())),
        );
        let post = resolver.resolve("Post").unwrap();
        assert_eq!(post.downcast_ref::<String>().unwrap(), "omg");
    }

    #[test]
    fn lookup_missing_file_is_unresolved() {
        let dir = TempDir::new().unwrap();
        let resolver = Resolver::new(
            Arc::new(ArtifactRegistry::new()),
            Arc::new(text_lookup(dir.path())),
        );
        assert!(resolver.resolve("Ghost").unwrap_err().is_unresolved());
    }

    #[test]
    fn lookup_directory_defines_namespace() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "admin/user.txt", "root");

        let resolver = Resolver::new(
            Arc::new(ArtifactRegistry::new()),
            Arc::new(text_lookup(dir.path())),
        );
        let admin = resolver.resolve("Admin").unwrap();
        let ns = admin.downcast_ref::<Namespace>().unwrap();
        assert_eq!(ns.name.as_str(), "Admin");

        let user = resolver.resolve("Admin::User").unwrap();
        assert_eq!(user.downcast_ref::<String>().unwrap(), "root");
    }

    #[test]
    fn lookup_first_root_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "post.txt", "first");
        write(second.path(), "post.txt", "second");

        let lookup = ConventionLookup::new(
            [first.path().to_path_buf(), second.path().to_path_buf()],
            ".txt",
            |unit, _| Ok(Artifact::new(unit.source.clone())),
        );
        assert_eq!(lookup.extension(), "txt");

        let resolver = Resolver::new(Arc::new(ArtifactRegistry::new()), Arc::new(lookup));
        let post = resolver.resolve("Post").unwrap();
        assert_eq!(post.downcast_ref::<String>().unwrap(), "first");
    }

    #[test]
    fn known_names_enumerates_sources() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "post.txt", "");
        write(dir.path(), "admin/user_profile.txt", "");
        write(dir.path(), "notes.md", "");

        let mut names: Vec<_> = text_lookup(dir.path())
            .known_names()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Admin::UserProfile".to_string(), "Post".to_string()]);
    }

    #[test]
    fn loader_failure_surfaces_as_lookup_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.txt", "???");

        let lookup = ConventionLookup::new([dir.path().to_path_buf()], "txt", |unit, _| {
            anyhow::bail!("cannot parse {}", unit.path.display())
        });
        let resolver = Resolver::new(Arc::new(ArtifactRegistry::new()), Arc::new(lookup));
        let err = resolver.resolve("Broken").unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }
}
