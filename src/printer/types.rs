//! Printer configuration

/// Options for the canonical printer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintConfig {
    /// Spaces per nesting level; 0 indents with one tab per level
    pub indent: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl PrintConfig {
    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }

    /// Leading whitespace for the given nesting depth.
    pub fn indentation(&self, level: usize) -> String {
        if self.indent == 0 {
            "\t".repeat(level)
        } else {
            " ".repeat(self.indent * level)
        }
    }
}
