//=========================================================================
// Instructions
//=========================================================================
//
// Tagged form of text-bus instructions.
//
// Grammar (one instruction per string):
//   SetActiveState:<name>     activate a registered game state
//   SetActiveState:NULL       clear the active state
//   <target>.Pause            freeze a subsystem's per-frame work
//   <target>.Resume           resume a subsystem's per-frame work
//   <target>.Shutdown         shut a manager/subsystem down
//   Engine.Exit               request process exit
//   anything else             Raw, matched free-text by listeners
//
//=========================================================================

//=== Instruction =========================================================

/// One parsed text-bus instruction.
///
/// Parsing happens once, at post time; dispatch works on the tagged form.
/// Unrecognized text is preserved verbatim in [`Instruction::Raw`] so
/// user-authored script lines still reach pattern-matching listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Activate the named game state; `None` clears the active state.
    SetActiveState(Option<String>),

    /// Freeze per-frame work of the named subsystem.
    PauseSubsystem(String),

    /// Resume per-frame work of the named subsystem.
    ResumeSubsystem(String),

    /// Shut the named manager/subsystem down.
    ShutdownManager(String),

    /// Request process exit.
    Exit,

    /// Unrecognized text, kept verbatim for free-text listeners.
    Raw(String),
}

impl Instruction {
    /// Parses one instruction from its text form.
    ///
    /// Never fails: anything outside the grammar becomes [`Raw`], and a
    /// listener (or nobody) deals with it. The bus logs unhandled
    /// commands at debug level.
    ///
    /// [`Raw`]: Instruction::Raw
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Some(arg) = text.strip_prefix("SetActiveState:") {
            return if arg == "NULL" {
                Self::SetActiveState(None)
            } else {
                Self::SetActiveState(Some(arg.to_string()))
            };
        }

        if text == "Engine.Exit" {
            return Self::Exit;
        }

        if let Some(target) = text.strip_suffix(".Pause") {
            if !target.is_empty() {
                return Self::PauseSubsystem(target.to_string());
            }
        }
        if let Some(target) = text.strip_suffix(".Resume") {
            if !target.is_empty() {
                return Self::ResumeSubsystem(target.to_string());
            }
        }
        if let Some(target) = text.strip_suffix(".Shutdown") {
            if !target.is_empty() {
                return Self::ShutdownManager(target.to_string());
            }
        }

        Self::Raw(text.to_string())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_active_state() {
        assert_eq!(
            Instruction::parse("SetActiveState:MainMenu"),
            Instruction::SetActiveState(Some("MainMenu".to_string()))
        );
    }

    #[test]
    fn parses_set_active_state_null() {
        assert_eq!(
            Instruction::parse("SetActiveState:NULL"),
            Instruction::SetActiveState(None)
        );
    }

    #[test]
    fn parses_dotted_control_forms() {
        assert_eq!(
            Instruction::parse("StateMan.Shutdown"),
            Instruction::ShutdownManager("StateMan".to_string())
        );
        assert_eq!(
            Instruction::parse("physics.Pause"),
            Instruction::PauseSubsystem("physics".to_string())
        );
        assert_eq!(
            Instruction::parse("physics.Resume"),
            Instruction::ResumeSubsystem("physics".to_string())
        );
    }

    #[test]
    fn parses_engine_exit() {
        assert_eq!(Instruction::parse("Engine.Exit"), Instruction::Exit);
    }

    #[test]
    fn unknown_text_becomes_raw() {
        assert_eq!(
            Instruction::parse("ReloadUI"),
            Instruction::Raw("ReloadUI".to_string())
        );
        assert_eq!(
            Instruction::parse(".Shutdown"),
            Instruction::Raw(".Shutdown".to_string())
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            Instruction::parse("  Engine.Exit  "),
            Instruction::Exit
        );
    }
}
