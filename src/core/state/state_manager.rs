//=========================================================================
// State Manager
//=========================================================================
//
// Registry of named game states plus the active-state slot.
//
// The manager owns the script bus: each frame it takes the pending
// commands, handles the ones aimed at it (SetActiveState, its own
// Shutdown), offers every command to the registered listeners, and then
// updates the active state. A shutdown aimed at the manager is honored
// by returning TickControl::Shutdown to its processor.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::script_bus::{Instruction, ScriptBus, ScriptCommand, ScriptSender};
use crate::core::subsystem::{Subsystem, SubsystemError, TickControl};
use super::GameState;

//=== StateManager ========================================================

/// The world/state subsystem.
///
/// States are registered once and referenced by name; at most one state is
/// active at a time. Script commands are processed at the start of every
/// frame, before the active state updates, so an activation posted this
/// frame takes effect on the same tick it is drained.
pub struct StateManager {
    manager_name: &'static str,
    bus: ScriptBus,
    script: ScriptSender,
    states: HashMap<String, Box<dyn GameState>>,
    active: Option<String>,
    scratch: Vec<ScriptCommand>,
    frames: u64,
}

impl StateManager {
    //--- Construction -----------------------------------------------------

    /// Creates a manager answering to the conventional name `StateMan`.
    pub fn new(bus: ScriptBus) -> Self {
        Self::with_name("StateMan", bus)
    }

    /// Creates a manager answering to a custom shutdown target name.
    pub fn with_name(manager_name: &'static str, bus: ScriptBus) -> Self {
        let script = bus.sender();
        Self {
            manager_name,
            bus,
            script,
            states: HashMap::new(),
            active: None,
            scratch: Vec::new(),
            frames: 0,
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers a state under a name.
    ///
    /// States must be registered before being activated.
    pub fn register_state<T>(&mut self, name: impl Into<String>, state: T)
    where
        T: GameState + 'static,
    {
        let name = name.into();
        if self.states.insert(name.clone(), Box::new(state)).is_some() {
            warn!("state `{}` was already registered and has been replaced", name);
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Name of the currently active state, if any.
    pub fn active_state(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Frames advanced so far. Frozen while the processor is paused.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// A cloneable posting handle for the owned bus.
    pub fn script_sender(&self) -> ScriptSender {
        self.script.clone()
    }

    /// Registers a bus listener. See [`ScriptBus::register_listener`].
    pub fn register_listener(&mut self, listener: Box<dyn crate::core::script_bus::ScriptListener>) {
        self.bus.register_listener(listener);
    }

    //--- Activation -------------------------------------------------------

    fn set_active(&mut self, target: Option<String>) {
        if self.active == target {
            debug!("state {:?} is already active, skipping", target);
            return;
        }

        if let Some(name) = &target {
            if !self.states.contains_key(name) {
                warn!("attempted to activate unregistered state `{}`", name);
                return;
            }
        }

        if let Some(old) = self.active.take() {
            debug!("exiting state `{}`", old);
            if let Some(state) = self.states.get_mut(&old) {
                state.on_exit();
            }
        }

        if let Some(name) = &target {
            debug!("entering state `{}`", name);
            if let Some(state) = self.states.get_mut(name) {
                state.on_enter();
            }
        }
        self.active = target;
    }

    //--- Command Processing -----------------------------------------------

    /// Handles one command if it is aimed at this manager.
    ///
    /// Returns (handled, shutdown-requested).
    fn handle_own(&mut self, command: &ScriptCommand) -> (bool, bool) {
        match &command.instruction {
            Instruction::SetActiveState(target) => {
                self.set_active(target.clone());
                (true, false)
            }
            Instruction::ShutdownManager(target) if target == self.manager_name => {
                info!("`{}` shutting down by instruction", self.manager_name);
                (true, true)
            }
            _ => (false, false),
        }
    }

    fn process_pending(&mut self) -> bool {
        let mut batch = std::mem::take(&mut self.scratch);
        self.bus.take_pending(&mut batch);

        let mut shutdown = false;
        for command in &batch {
            let (own, wants_shutdown) = self.handle_own(command);
            shutdown |= wants_shutdown;

            // Every listener sees every command, handled or not.
            let by_listener = self.bus.dispatch(command);
            if !own && !by_listener {
                debug!("unhandled script command: {:?}", command.instruction);
            }
        }

        batch.clear();
        self.scratch = batch;
        shutdown
    }
}

//=== Subsystem Implementation ============================================

impl Subsystem for StateManager {
    fn name(&self) -> &'static str {
        "world"
    }

    fn frame(&mut self) -> Result<TickControl, SubsystemError> {
        let shutdown = self.process_pending();

        if let Some(name) = self.active.clone() {
            if let Some(state) = self.states.get_mut(&name) {
                state.update(&self.script);
            }
        }
        self.frames += 1;

        if shutdown {
            Ok(TickControl::Shutdown)
        } else {
            Ok(TickControl::Continue)
        }
    }

    fn teardown(&mut self) {
        // Fire on_exit for whatever is still active.
        self.set_active(None);
        self.states.clear();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    //--- Test Fixtures ----------------------------------------------------

    struct TrackedState {
        enters: Arc<AtomicU64>,
        exits: Arc<AtomicU64>,
        updates: Arc<AtomicU64>,
        post_on_update: Option<&'static str>,
    }

    impl TrackedState {
        fn new() -> (Self, Arc<AtomicU64>, Arc<AtomicU64>, Arc<AtomicU64>) {
            let enters = Arc::new(AtomicU64::new(0));
            let exits = Arc::new(AtomicU64::new(0));
            let updates = Arc::new(AtomicU64::new(0));
            (
                Self {
                    enters: Arc::clone(&enters),
                    exits: Arc::clone(&exits),
                    updates: Arc::clone(&updates),
                    post_on_update: None,
                },
                enters,
                exits,
                updates,
            )
        }
    }

    impl GameState for TrackedState {
        fn on_enter(&mut self) {
            self.enters.fetch_add(1, Ordering::SeqCst);
        }

        fn on_exit(&mut self) {
            self.exits.fetch_add(1, Ordering::SeqCst);
        }

        fn update(&mut self, script: &ScriptSender) {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if let Some(text) = self.post_on_update.take() {
                script.post(text);
            }
        }
    }

    fn tick(manager: &mut StateManager) -> TickControl {
        manager.frame().unwrap()
    }

    //--- Activation Tests -------------------------------------------------

    #[test]
    fn activation_fires_lifecycle_hooks() {
        let mut manager = StateManager::new(ScriptBus::new());
        let (state, enters, exits, updates) = TrackedState::new();
        manager.register_state("MainMenu", state);

        let sender = manager.script_sender();
        sender.post("SetActiveState:MainMenu");

        assert_eq!(tick(&mut manager), TickControl::Continue);
        assert_eq!(manager.active_state(), Some("MainMenu"));
        assert_eq!(enters.load(Ordering::SeqCst), 1);
        // Activation happens before the update on the same tick.
        assert_eq!(updates.load(Ordering::SeqCst), 1);

        sender.post("SetActiveState:NULL");
        tick(&mut manager);
        assert_eq!(manager.active_state(), None);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn activating_unknown_state_is_a_logged_noop() {
        let mut manager = StateManager::new(ScriptBus::new());
        let sender = manager.script_sender();

        sender.post("SetActiveState:NoSuchState");
        tick(&mut manager);
        assert_eq!(manager.active_state(), None);
    }

    #[test]
    fn repeated_activation_is_idempotent() {
        let mut manager = StateManager::new(ScriptBus::new());
        let (state, enters, _exits, _updates) = TrackedState::new();
        manager.register_state("Game", state);

        let sender = manager.script_sender();
        sender.post("SetActiveState:Game");
        sender.post("SetActiveState:Game");
        tick(&mut manager);

        assert_eq!(enters.load(Ordering::SeqCst), 1);
    }

    //--- Shutdown Tests ---------------------------------------------------

    #[test]
    fn set_null_then_shutdown_scenario() {
        let mut manager = StateManager::new(ScriptBus::new());
        let (state, _enters, exits, _updates) = TrackedState::new();
        manager.register_state("Game", state);

        let sender = manager.script_sender();
        sender.post("SetActiveState:Game");
        tick(&mut manager);

        // Tick 1: clear the active state.
        sender.post("SetActiveState:NULL");
        assert_eq!(tick(&mut manager), TickControl::Continue);
        assert_eq!(manager.active_state(), None);
        assert_eq!(exits.load(Ordering::SeqCst), 1);

        // Tick 2: the manager honors its own shutdown.
        sender.post("StateMan.Shutdown");
        assert_eq!(tick(&mut manager), TickControl::Shutdown);
    }

    #[test]
    fn shutdown_for_other_manager_is_ignored() {
        let mut manager = StateManager::new(ScriptBus::new());
        let sender = manager.script_sender();

        sender.post("AudioMan.Shutdown");
        assert_eq!(tick(&mut manager), TickControl::Continue);
    }

    //--- Update Loop Tests ------------------------------------------------

    #[test]
    fn frame_counter_advances_each_tick() {
        let mut manager = StateManager::new(ScriptBus::new());
        tick(&mut manager);
        tick(&mut manager);
        tick(&mut manager);
        assert_eq!(manager.frames(), 3);
    }

    #[test]
    fn state_posted_instruction_lands_next_frame() {
        let mut manager = StateManager::new(ScriptBus::new());
        let (mut menu, _e, _x, _u) = TrackedState::new();
        menu.post_on_update = Some("SetActiveState:Game");
        manager.register_state("Menu", menu);
        let (game, game_enters, _gx, _gu) = TrackedState::new();
        manager.register_state("Game", game);

        manager.script_sender().post("SetActiveState:Menu");
        tick(&mut manager); // Menu activates, posts the transition
        assert_eq!(manager.active_state(), Some("Menu"));

        tick(&mut manager); // transition drained this frame
        assert_eq!(manager.active_state(), Some("Game"));
        assert_eq!(game_enters.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_instruction_terminates_the_processor() {
        use crate::core::subsystem::{ProcessorControl, SubsystemProcessor, SubsystemState};
        use std::time::{Duration, Instant};

        let manager = StateManager::new(ScriptBus::new());
        let script = manager.script_sender();
        let mut handle = SubsystemProcessor::spawn(manager, Duration::from_millis(2));
        handle.wait_ready(Duration::from_secs(5)).unwrap();

        script.post("SetActiveState:NULL");
        script.post("StateMan.Shutdown");

        let start = Instant::now();
        while handle.state() != SubsystemState::Terminated
            && start.elapsed() < Duration::from_secs(5)
        {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(handle.state(), SubsystemState::Terminated);
        handle.join().unwrap();
    }

    #[test]
    fn teardown_exits_the_active_state() {
        let mut manager = StateManager::new(ScriptBus::new());
        let (state, _enters, exits, _updates) = TrackedState::new();
        manager.register_state("Game", state);

        manager.script_sender().post("SetActiveState:Game");
        tick(&mut manager);

        manager.teardown();
        assert_eq!(exits.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_state(), None);
    }
}
