use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, contents: String) -> Self {
        Self { id, path, contents }
    }

    /// Converts a character offset into a 1-based `(line, column)` pair.
    ///
    /// Offsets past the end of the file resolve to the position just after
    /// the last character.
    pub fn location(&self, index: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for ch in self.contents.chars().take(index) {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    pub fn line(&self, number: usize) -> Option<&str> {
        self.contents.lines().nth(number.checked_sub(1)?)
    }
}
