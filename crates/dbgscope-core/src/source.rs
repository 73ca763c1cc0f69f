#![forbid(unsafe_code)]

//! Source-file and source-line identifiers.

use serde::{Deserialize, Serialize};

use crate::load_state::DataLoadState;

/// A source file on a given host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceFileSpec {
    pub host_name: String,
    pub file_path: String,
}

impl SourceFileSpec {
    #[must_use]
    pub fn new(host_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            file_path: file_path.into(),
        }
    }
}

/// A specific line of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLineSpec {
    pub host_name: String,
    pub file_path: String,
    pub lineno: u32,
}

impl SourceLineSpec {
    #[must_use]
    pub fn new(host_name: impl Into<String>, file_path: impl Into<String>, lineno: u32) -> Self {
        Self {
            host_name: host_name.into(),
            file_path: file_path.into(),
            lineno,
        }
    }

    #[must_use]
    pub fn file_spec(&self) -> SourceFileSpec {
        SourceFileSpec::new(self.host_name.clone(), self.file_path.clone())
    }

    #[must_use]
    pub fn is_in_file(&self, file: &SourceFileSpec) -> bool {
        self.host_name == file.host_name && self.file_path == file.file_path
    }
}

/// Content and load state of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceFileContent {
    pub load_state: DataLoadState,
    /// `None` until the file has been loaded.
    pub lines: Option<Vec<String>>,
}

/// Last path component of a file path, for compact display.
///
/// Handles both `/` and `\` separators.
#[must_use]
pub fn concise_file_path(file_path: &str) -> &str {
    file_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concise_path_strips_directories() {
        assert_eq!(concise_file_path("/tmp/project/main.py"), "main.py");
        assert_eq!(concise_file_path(r"C:\work\model.py"), "model.py");
        assert_eq!(concise_file_path("plain.py"), "plain.py");
    }

    #[test]
    fn line_belongs_to_file() {
        let line = SourceLineSpec::new("h", "/a.py", 4);
        assert!(line.is_in_file(&SourceFileSpec::new("h", "/a.py")));
        assert!(!line.is_in_file(&SourceFileSpec::new("h", "/b.py")));
        assert_eq!(line.file_spec(), SourceFileSpec::new("h", "/a.py"));
    }
}
