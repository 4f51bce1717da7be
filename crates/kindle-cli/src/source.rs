//! Source files loaded by the `kindle` binary
//!
//! A source file is opaque except for `requires` directives: a line of the
//! form `# requires: Admin::User` makes loading the file resolve that name
//! first.

use kindle_artifact::{Artifact, SymbolicName};
use kindle_resolve::{ConventionLookup, ResolveContext, SourceUnit};
use kindle_watch::ContentDigest;
use std::path::{Path, PathBuf};

const REQUIRES: &str = "# requires:";

/// Artifact built from one source file
#[derive(Debug, Clone)]
pub(crate) struct LoadedSource {
    pub(crate) path: PathBuf,
    pub(crate) bytes: usize,
    pub(crate) digest: ContentDigest,
    pub(crate) requires: Vec<SymbolicName>,
}

/// Names listed in `requires` directives
pub(crate) fn requires(source: &str) -> anyhow::Result<Vec<SymbolicName>> {
    source
        .lines()
        .filter_map(|line| line.trim().strip_prefix(REQUIRES))
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| SymbolicName::new(name).map_err(anyhow::Error::from))
        .collect()
}

fn load(unit: &SourceUnit, cx: &mut ResolveContext<'_>) -> anyhow::Result<Artifact> {
    let requires = requires(&unit.source)?;
    for name in &requires {
        cx.resolve(name.as_str())?;
    }
    Ok(Artifact::new(LoadedSource {
        path: unit.path.clone(),
        bytes: unit.source.len(),
        digest: ContentDigest::compute(unit.source.as_bytes()),
        requires,
    }))
}

/// Convention lookup over `load_paths` under `root`
pub(crate) fn lookup(root: &Path, load_paths: &[String], extension: &str) -> ConventionLookup {
    ConventionLookup::new(load_paths.iter().map(|dir| root.join(dir)), extension, load)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_parses_lists() {
        let source = "# requires: Author, Admin::User\nclass Post\n# requires: Tag\n";
        let names: Vec<String> = requires(source)
            .unwrap()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["Author", "Admin::User", "Tag"]);
    }

    #[test]
    fn requires_rejects_bad_names() {
        assert!(requires("# requires: Admin::").is_err());
        assert!(requires("class Post").unwrap().is_empty());
    }
}
