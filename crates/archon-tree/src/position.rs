use std::{fmt, path::Path};

///
/// Position
///
/// Source location of a tree value. Line and column are 1-based; zero
/// means unknown.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Position {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Rewrite `file` relative to `root` when it lies under it.
    #[must_use]
    pub fn relative_to(&self, root: &Path) -> Self {
        let file = Path::new(&self.file)
            .strip_prefix(root)
            .map_or_else(|_| self.file.clone(), |p| p.to_string_lossy().into_owned());

        Self {
            file,
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
