//=========================================================================
// Script Bus
//=========================================================================
//
// String-keyed instruction channel for loosely-typed, low-frequency,
// cross-cutting commands (menu navigation, debug toggles, save/load).
//
// Architecture:
//   any thread ── ScriptSender::post(text) ── parse once ──> queue
//                                                              │
//   world thread ── take_pending() ── dispatch to listeners ───┘
//
// Strings are parsed into a tagged `Instruction` at post time; only
// `Instruction::Raw` reaches free-text pattern listeners. The typed
// command path stays the right tool for anything performance- or
// correctness-sensitive.
//
//=========================================================================

//=== Module Declarations =================================================

mod bus;
mod instruction;
mod script;

//=== Public API ==========================================================

pub use bus::{ScriptBus, ScriptCommand, ScriptListener, ScriptSender};
pub use instruction::Instruction;
pub use script::StartupScript;
