use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Error produced while resolving or loading a source file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The logical name did not resolve to a readable file.
    #[error("file '{0}' not found")]
    NotFound(String),
    /// The file exists but could not be read or decoded.
    #[error("file '{name}' could not be read: {reason}")]
    Read { name: String, reason: String },
}

/// Resolves logical source names to file contents.
///
/// The reader loads every file eagerly and completely before scanning
/// it, so implementations return the full decoded text in one call.
/// Character encoding is the provider's concern; the bundled providers
/// read UTF-8.
pub trait SourceProvider {
    /// Resolve `name` and return the file's full text.
    fn load(&self, name: &str) -> Result<String, SourceError>;
}

/// Loads sources from the filesystem beneath a root directory.
///
/// Logical names use `/` separators; a leading `/` is interpreted
/// relative to the root, mirroring container-style resource paths.
#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
}

impl FsProvider {
    /// Create a provider rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

impl SourceProvider for FsProvider {
    fn load(&self, name: &str) -> Result<String, SourceError> {
        let path = self.resolve(name);
        fs::read_to_string(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                SourceError::NotFound(name.to_string())
            } else {
                SourceError::Read {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

/// In-memory name-to-text map, for tests and embedded sources.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: HashMap<String, String>,
}

impl MemoryProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content under `name`.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(name.into(), text.into());
        self
    }

    /// Add a file in place.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.files.insert(name.into(), text.into());
    }
}

impl SourceProvider for MemoryProvider {
    fn load(&self, name: &str) -> Result<String, SourceError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }
}

/// Directory component of a logical name: everything up to and
/// including the final `/`, or the empty string when there is none.
#[must_use]
pub fn base_dir_of(name: &str) -> &str {
    name.rfind('/').map_or("", |i| &name[..=i])
}

/// Join a relative include target onto a base directory.
///
/// Targets with a leading `/` are container-absolute and pass through
/// unchanged.
#[must_use]
pub fn resolve_include(base_dir: &str, target: &str) -> String {
    if target.starts_with('/') {
        target.to_string()
    } else {
        format!("{base_dir}{target}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_dir_keeps_trailing_slash() {
        assert_eq!(base_dir_of("/WEB-INF/pages/a.jsp"), "/WEB-INF/pages/");
        assert_eq!(base_dir_of("a.jsp"), "");
        assert_eq!(base_dir_of("/a.jsp"), "/");
    }

    #[test]
    fn resolve_relative_and_absolute_includes() {
        assert_eq!(resolve_include("/pages/", "b.jspf"), "/pages/b.jspf");
        assert_eq!(resolve_include("/pages/", "/common/b.jspf"), "/common/b.jspf");
        assert_eq!(resolve_include("", "b.jspf"), "b.jspf");
    }

    #[test]
    fn memory_provider_load_and_miss() {
        let provider = MemoryProvider::new().with_file("/a.jsp", "hello");
        assert_eq!(provider.load("/a.jsp").expect("load"), "hello");
        assert_eq!(
            provider.load("/b.jsp").unwrap_err(),
            SourceError::NotFound("/b.jsp".to_string())
        );
    }

    #[test]
    fn fs_provider_reads_beneath_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("page.jsp"), "<%= 1 %>").expect("write");

        let provider = FsProvider::new(dir.path());
        assert_eq!(provider.load("/page.jsp").expect("load"), "<%= 1 %>");
        assert_eq!(provider.load("page.jsp").expect("load"), "<%= 1 %>");
    }

    #[test]
    fn fs_provider_maps_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = FsProvider::new(dir.path());
        assert_eq!(
            provider.load("/missing.jsp").unwrap_err(),
            SourceError::NotFound("/missing.jsp".to_string())
        );
    }
}
