//=========================================================================
// Startup Script
//=========================================================================
//
// Plain text boot script: one instruction per line, `//` comments and
// blank lines ignored, order-dependent. The initializer feeds lines into
// the script bus one at a time once every subsystem is ready; a line the
// runtime cannot act on is logged and skipped, and processing continues.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::io;
use std::path::Path;

//=== StartupScript =======================================================

/// A parsed boot script: the instruction lines, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupScript {
    lines: Vec<String>,
}

impl StartupScript {
    /// Reads and parses a script file.
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Parses script text: keeps non-blank, non-comment lines verbatim.
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//"))
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    /// Instruction lines in execution order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of instruction lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the script contains no instructions.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let script = StartupScript::parse(
            "// boot sequence\n\
             SetActiveState:MainMenu\n\
             \n\
             // debug toggles\n\
             ReloadUI\n",
        );
        assert_eq!(script.len(), 2);
        assert_eq!(script.lines()[0], "SetActiveState:MainMenu");
        assert_eq!(script.lines()[1], "ReloadUI");
    }

    #[test]
    fn preserves_line_order() {
        let script = StartupScript::parse("a\nb\nc\n");
        assert_eq!(script.lines(), ["a", "b", "c"]);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let script = StartupScript::parse("   Engine.Exit   \n\t// indented comment\n");
        assert_eq!(script.lines(), ["Engine.Exit"]);
    }

    #[test]
    fn empty_input_yields_empty_script() {
        assert!(StartupScript::parse("").is_empty());
        assert!(StartupScript::parse("// only comments\n\n").is_empty());
    }
}
