//=========================================================================
// Meridian Engine — Library Root
//
// This crate defines the public API surface of the Meridian engine core.
//
// Responsibilities:
// - Expose the engine facade (`Engine`, `EngineBuilder`)
// - Expose the coordination core (`core`): command queues, subsystem
//   processors, lifecycle orchestration, script bus, registries
//
// Typical usage:
// ```no_run
// use meridian_engine::{EngineBuilder, core::script_bus::ScriptBus};
// use meridian_engine::core::state::StateManager;
//
// fn main() {
//     let mut engine = EngineBuilder::new().build();
//     engine.register_state_manager(StateManager::new(ScriptBus::new()));
//     engine.run().expect("engine run failed");
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the coordination machinery: typed command queues, the
// subsystem processor state machine, lifecycle orchestration, the script
// bus, and generational object registries. It is public so subsystems
// (rendering, physics, audio, game logic) can be built on top of it.
//
pub mod core;

//--- Internal Modules ----------------------------------------------------
//
// `engine` defines the builder/facade that owns every processor and
// drives bootstrap and teardown.
//
mod engine;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the facade as the main entry point so applications can
// simply `use meridian_engine::{Engine, EngineBuilder};`.
//
pub use engine::{Engine, EngineBuilder, SubsystemScriptControl};

pub mod prelude;
