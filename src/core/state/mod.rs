//=========================================================================
// World State System
//=========================================================================
//
// The world/state subsystem: a registry of named game states with one
// active slot, driven by the script bus.
//
// Architecture:
//   StateManager (implements Subsystem, owns the ScriptBus)
//     ├─ states: HashMap<String, Box<dyn GameState>>
//     └─ active: Option<String>
//
// Flow:
//   frame() → take pending script commands → handle/dispatch
//           → update active state
//
//=========================================================================

//=== Module Declarations =================================================

mod state_manager;

//=== Public API ==========================================================

pub use state_manager::StateManager;

//=== Internal Dependencies ===============================================

use crate::core::script_bus::ScriptSender;

//=== GameState Trait =====================================================

/// Behavior of one game state (menu, gameplay, pause overlay).
///
/// States are registered in the [`StateManager`] by name and activated via
/// `SetActiveState:<name>` instructions. Each state keeps its own data
/// between activations.
///
/// # Minimal Implementation
///
/// Only `update()` is required. Lifecycle hooks default to no-ops:
///
/// ```
/// use meridian_engine::core::script_bus::ScriptSender;
/// use meridian_engine::core::state::GameState;
///
/// struct MainMenu;
///
/// impl GameState for MainMenu {
///     fn update(&mut self, _script: &ScriptSender) {
///         // advance menu logic; post instructions to navigate
///     }
/// }
/// ```
pub trait GameState: Send {
    /// Called when this state becomes active.
    fn on_enter(&mut self) {}

    /// Called when this state stops being active.
    fn on_exit(&mut self) {}

    /// Called every tick while active. The sender lets a state post
    /// instructions (e.g. menu navigation) back onto the bus.
    fn update(&mut self, script: &ScriptSender);
}
