//=========================================================================
// Meridian Engine
//
// Main entry point and coordinator for the engine.
//
// Architecture:
// ```text
//     EngineBuilder ──build()──> Engine ──register()──> CommandSenders
//         │                        │
//         ├─ with_tick_rate()      └─ run()
//         └─ with_ready_timeout()      ├─ initializer thread (ordered start)
//                                      ├─ blocks on exit request
//                                      └─ deallocator thread (ordered stop)
// ```
//
// The engine is the single explicit owner of every subsystem processor,
// the script bus wiring, and the lifecycle signals. There are no global
// singletons: anything that needs to submit work holds a sender handed
// out at registration time.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{info, warn};

//=== Internal Dependencies ===============================================

use crate::core::command::{CommandQueue, CommandSender};
use crate::core::lifecycle::{
    spawn_deallocator, spawn_initializer, EngineError, EngineSignals, ExitListener,
    PendingSubsystem,
};
use crate::core::script_bus::{Instruction, ScriptCommand, ScriptListener, ScriptSender, StartupScript};
use crate::core::state::StateManager;
use crate::core::subsystem::{Subsystem, SubsystemProcessor};

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **Tick rate**: 60.0 (subsystem ticks per second)
/// - **Ready timeout**: 5 s per subsystem during bootstrap
/// - **Startup script**: none
///
/// # Examples
///
/// ```no_run
/// use meridian_engine::EngineBuilder;
///
/// let engine = EngineBuilder::new()
///     .with_tick_rate(120.0)
///     .with_startup_script_file("boot.txt")
///     .build();
/// ```
pub struct EngineBuilder {
    tick_rate: f64,
    ready_timeout: Duration,
    script: Option<ScriptSource>,
}

enum ScriptSource {
    File(PathBuf),
    Parsed(StartupScript),
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tick_rate: 60.0,
            ready_timeout: Duration::from_secs(5),
            script: None,
        }
    }

    /// Sets the tick rate shared by subsystems registered without an
    /// explicit cadence.
    ///
    /// # Panics
    ///
    /// Panics if `tick_rate <= 0.0`.
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        assert!(tick_rate > 0.0, "tick rate must be positive, got {}", tick_rate);
        self.tick_rate = tick_rate;
        self
    }

    /// Sets how long the initializer waits for each subsystem to become
    /// ready before aborting startup.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "ready timeout must be non-zero");
        self.ready_timeout = timeout;
        self
    }

    /// Sets the startup script file, read when [`Engine::run`] starts.
    ///
    /// One instruction per line; `//` lines and blanks are ignored.
    pub fn with_startup_script_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.script = Some(ScriptSource::File(path.into()));
        self
    }

    /// Sets an already parsed startup script.
    pub fn with_startup_script(mut self, script: StartupScript) -> Self {
        self.script = Some(ScriptSource::Parsed(script));
        self
    }

    /// Builds the engine instance.
    pub fn build(self) -> Engine {
        info!(
            "building engine (tick rate: {}, ready timeout: {:?})",
            self.tick_rate, self.ready_timeout
        );
        let (signals, exit_rx) = EngineSignals::new();

        Engine {
            tick: Duration::from_secs_f64(1.0 / self.tick_rate),
            ready_timeout: self.ready_timeout,
            script: self.script,
            script_sender: None,
            pending: Vec::new(),
            signals,
            exit_rx,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Meridian engine runtime.
///
/// Owns every registered subsystem processor and drives the lifecycle:
///
/// ```text
/// Engine (caller thread)
///   ├─► Initializer thread — spawns processors in registration order,
///   │                        waits for each ready signal, feeds the
///   │                        startup script into the script bus
///   ├─► blocks until an exit is requested
///   └─► Deallocator thread — shuts processors down in reverse order
///                            through their own queues, joins each one
/// ```
///
/// Registration order is the dependency order: register the window/device
/// subsystem first and the world/state subsystem last, since the latter
/// issues commands to all the others.
pub struct Engine {
    tick: Duration,
    ready_timeout: Duration,
    script: Option<ScriptSource>,
    script_sender: Option<ScriptSender>,
    pending: Vec<PendingSubsystem>,
    signals: Arc<EngineSignals>,
    exit_rx: Receiver<()>,
}

impl Engine {
    //--- Registration -----------------------------------------------------

    /// Registers a subsystem at the engine's shared tick rate.
    ///
    /// The processor thread starts during [`run`](Engine::run); the
    /// returned sender works immediately, and anything submitted before
    /// startup is drained on the subsystem's first tick.
    pub fn register<S: Subsystem>(&mut self, subsystem: S) -> CommandSender<S> {
        self.register_with_tick(subsystem, self.tick)
    }

    /// Registers a subsystem with its own tick cadence.
    pub fn register_with_tick<S: Subsystem>(
        &mut self,
        subsystem: S,
        tick: Duration,
    ) -> CommandSender<S> {
        let name = subsystem.name();
        let queue = Arc::new(CommandQueue::new(name));
        let sender = CommandSender::new(Arc::clone(&queue));

        info!("registered subsystem `{}`", name);
        self.pending.push(PendingSubsystem {
            name,
            spawn: Box::new(move || {
                Box::new(SubsystemProcessor::spawn_with_queue(subsystem, queue, tick))
            }),
        });
        sender
    }

    /// Registers the world/state subsystem and wires its script bus.
    ///
    /// Installs the [`ExitListener`] so `Engine.Exit` ends the run, and
    /// remembers a posting handle for the startup script. Call this last:
    /// the world subsystem depends on every other one.
    pub fn register_state_manager(
        &mut self,
        mut manager: StateManager,
    ) -> (CommandSender<StateManager>, ScriptSender) {
        manager.register_listener(Box::new(ExitListener::new(Arc::clone(&self.signals))));
        let script = manager.script_sender();
        self.script_sender = Some(script.clone());
        let sender = self.register(manager);
        (sender, script)
    }

    //--- Signals ----------------------------------------------------------

    /// The engine's lifecycle signals (ready / accepting input / live).
    pub fn signals(&self) -> Arc<EngineSignals> {
        Arc::clone(&self.signals)
    }

    //--- Execution --------------------------------------------------------

    /// Starts the engine and blocks until the run ends.
    ///
    /// # Lifecycle
    ///
    /// 1. Loads the startup script, if configured
    /// 2. Initializer thread starts processors in registration order
    /// 3. Blocks until an exit is requested ([`EngineSignals::request_exit`]
    ///    or an `Engine.Exit` script instruction)
    /// 4. Deallocator thread shuts processors down in reverse order and
    ///    joins them; the live flag clears last
    ///
    /// A subsystem initialization failure aborts the run: processors that
    /// already started are torn down and the error is returned, so the
    /// process can exit non-zero instead of running partially.
    pub fn run(self) -> Result<(), EngineError> {
        info!("starting engine run ({} subsystems)", self.pending.len());

        //--- 1. Load the startup script ----------------------------------
        let script = match self.script {
            Some(ScriptSource::File(path)) => Some(
                StartupScript::load(&path).map_err(|source| EngineError::Script { path, source })?,
            ),
            Some(ScriptSource::Parsed(script)) => Some(script),
            None => None,
        };
        let script = match (script, &self.script_sender) {
            (Some(script), Some(sender)) => Some((script, sender.clone())),
            (Some(script), None) => {
                if !script.is_empty() {
                    warn!("startup script configured but no state manager registered; skipping");
                }
                None
            }
            (None, _) => None,
        };

        //--- 2. Ordered bootstrap ----------------------------------------
        let initializer = spawn_initializer(
            self.pending,
            Arc::clone(&self.signals),
            script,
            self.ready_timeout,
        );
        let outcome = initializer
            .join()
            .map_err(|_| EngineError::ThreadPanicked("initializer"))?;

        //--- 3. Wait for an exit request ---------------------------------
        let startup_result = outcome.result;
        if startup_result.is_ok() {
            info!("engine running, waiting for exit request");
            let _ = self.exit_rx.recv();
            info!("exit requested");
        }

        //--- 4. Ordered teardown -----------------------------------------
        let deallocator = spawn_deallocator(outcome.started, Arc::clone(&self.signals));
        let teardown_result = deallocator
            .join()
            .map_err(|_| EngineError::ThreadPanicked("deallocator"))?;

        info!("engine run complete");
        startup_result.and(teardown_result)
    }
}

//=== SubsystemScriptControl ==============================================

/// Script-bus listener forwarding pause/resume instructions to one
/// subsystem's command queue.
///
/// Lets script lines like `physics.Pause` reach the typed command path.
/// Register one per subsystem that should be scriptable.
pub struct SubsystemScriptControl<S> {
    target: &'static str,
    sender: CommandSender<S>,
}

impl<S> SubsystemScriptControl<S> {
    /// Wraps a sender; the listener answers to the sender's target name.
    pub fn new(sender: CommandSender<S>) -> Self {
        Self {
            target: sender.target(),
            sender,
        }
    }
}

impl<S: 'static> ScriptListener for SubsystemScriptControl<S> {
    fn name(&self) -> &'static str {
        self.target
    }

    fn handle(&mut self, command: &ScriptCommand) -> bool {
        match &command.instruction {
            Instruction::PauseSubsystem(target) if target == self.target => {
                self.sender.pause();
                true
            }
            Instruction::ResumeSubsystem(target) if target == self.target => {
                self.sender.resume();
                true
            }
            _ => false,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
