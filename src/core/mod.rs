//=========================================================================
// Engine Core
//=========================================================================
//
// Inter-thread coordination for the engine's subsystems.
//
// Responsibilities:
// - Typed command queues, drained once per tick by each subsystem thread
// - Subsystem processors: one dedicated thread per domain, fixed cadence
// - Lifecycle orchestration: ordered bootstrap and teardown
// - Script bus: string-keyed channel for low-frequency cross-cutting
//   instructions
// - Generational registries for domain objects referenced by commands
//
// Notes:
// Each subsystem owns its domain state exclusively; producers express
// mutations as commands. No subsystem thread ever blocks on another
// subsystem's queue.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod command;
pub mod lifecycle;
pub mod registry;
pub mod script_bus;
pub mod state;
pub mod subsystem;

//=== Public API ==========================================================

pub use command::{Command, CommandError, CommandQueue, CommandSender};
pub use lifecycle::{EngineError, EngineSignals, ExitListener};
pub use registry::{DomainRegistry, EntityKey};
pub use script_bus::{
    Instruction, ScriptBus, ScriptCommand, ScriptListener, ScriptSender, StartupScript,
};
pub use state::{GameState, StateManager};
pub use subsystem::{
    ProcessorControl, Subsystem, SubsystemError, SubsystemHandle, SubsystemProcessor,
    SubsystemState, TickControl,
};
