//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use meridian_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine facade
pub use crate::engine::{Engine, EngineBuilder, SubsystemScriptControl};

// Command system
pub use crate::core::command::{from_fn, Command, CommandError, CommandSender};

// Subsystems
pub use crate::core::subsystem::{Subsystem, SubsystemError, SubsystemState, TickControl};

// Lifecycle
pub use crate::core::lifecycle::{EngineError, EngineSignals};

// Script bus
pub use crate::core::script_bus::{
    Instruction, ScriptBus, ScriptCommand, ScriptListener, ScriptSender, StartupScript,
};

// World state
pub use crate::core::state::{GameState, StateManager};

// Registries
pub use crate::core::registry::{DomainRegistry, EntityKey};
