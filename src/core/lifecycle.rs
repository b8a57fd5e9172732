//=========================================================================
// Lifecycle Orchestration
//=========================================================================
//
// Bootstrap and teardown sequencing for the subsystem processors.
//
// Two short-lived threads:
//   Initializer — spawns processors in dependency order, blocks on each
//                 one's ready channel, then feeds the startup script into
//                 the script bus one line at a time.
//   Deallocator — stops input acceptance, shuts processors down in
//                 reverse order through their own queues, joins each
//                 thread, then clears the live flag.
//
// Termination is observed with real joins (plus the bounded-timeout
// ready channel), not by polling a shared boolean.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};
use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::script_bus::{Instruction, ScriptCommand, ScriptListener, ScriptSender, StartupScript};
use crate::core::subsystem::{ProcessorControl, SubsystemError};

//=== EngineError =========================================================

/// Fatal engine-level failures.
///
/// Command execution failures never reach this level; they degrade to
/// logged no-ops inside the drain loops. What remains fatal is failing to
/// bring a subsystem up, losing a subsystem thread to a panic, or failing
/// to read the startup script.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A subsystem's one-time setup failed; the run aborts.
    #[error("subsystem `{name}` failed to initialize")]
    SubsystemInit {
        /// Subsystem name.
        name: &'static str,
        /// The underlying failure.
        #[source]
        source: SubsystemError,
    },

    /// A subsystem did not report readiness in time.
    #[error("subsystem `{name}` did not become ready within {timeout:?}")]
    ReadyTimeout {
        /// Subsystem name.
        name: &'static str,
        /// How long the initializer waited.
        timeout: Duration,
    },

    /// A subsystem thread panicked.
    #[error("subsystem thread `{0}` panicked")]
    ThreadPanicked(&'static str),

    /// The startup script could not be read.
    #[error("startup script `{path}` could not be read")]
    Script {
        /// Script file path.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

//=== EngineSignals =======================================================

/// The engine's externally visible lifecycle flags.
///
/// Coarse atomics read without locking — the only cross-thread state
/// outside the queues:
/// - `accepting_input`: set once initialization completes, cleared first
///   thing during teardown; input/network producers check it before
///   submitting work.
/// - `all_ready`: set when every subsystem has entered its tick loop;
///   gates the first presented frame.
/// - `live`: cleared when teardown finishes; the process's outer wait
///   path observes this to exit.
pub struct EngineSignals {
    accepting_input: AtomicBool,
    all_ready: AtomicBool,
    live: AtomicBool,
    exit_tx: Sender<()>,
}

impl EngineSignals {
    pub(crate) fn new() -> (Arc<Self>, Receiver<()>) {
        let (exit_tx, exit_rx) = bounded(1);
        let signals = Arc::new(Self {
            accepting_input: AtomicBool::new(false),
            all_ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            exit_tx,
        });
        (signals, exit_rx)
    }

    /// Whether producers may submit input-driven work.
    pub fn is_accepting_input(&self) -> bool {
        self.accepting_input.load(Ordering::Acquire)
    }

    /// Whether every subsystem has entered its tick loop.
    pub fn all_subsystems_ready(&self) -> bool {
        self.all_ready.load(Ordering::Acquire)
    }

    /// Whether the engine run is still in progress.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Requests a cooperative engine exit. Idempotent.
    pub fn request_exit(&self) {
        // A full channel means an exit is already pending.
        let _ = self.exit_tx.try_send(());
    }

    pub(crate) fn mark_ready(&self) {
        self.all_ready.store(true, Ordering::Release);
        self.accepting_input.store(true, Ordering::Release);
    }

    pub(crate) fn stop_accepting_input(&self) {
        self.accepting_input.store(false, Ordering::Release);
    }

    pub(crate) fn clear_live(&self) {
        self.live.store(false, Ordering::Release);
    }
}

//=== ExitListener ========================================================

/// Script-bus listener that turns `Engine.Exit` into an exit request.
pub struct ExitListener {
    signals: Arc<EngineSignals>,
}

impl ExitListener {
    /// Creates a listener bound to the engine's signals.
    pub fn new(signals: Arc<EngineSignals>) -> Self {
        Self { signals }
    }
}

impl ScriptListener for ExitListener {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn handle(&mut self, command: &ScriptCommand) -> bool {
        if command.instruction == Instruction::Exit {
            info!("exit requested via script bus");
            self.signals.request_exit();
            true
        } else {
            false
        }
    }
}

//=== PendingSubsystem ====================================================

/// A registered-but-not-yet-spawned processor.
///
/// Registration order is the dependency order; the initializer consumes
/// these in sequence.
pub(crate) struct PendingSubsystem {
    pub name: &'static str,
    pub spawn: Box<dyn FnOnce() -> Box<dyn ProcessorControl> + Send>,
}

//=== Initializer =========================================================

/// Outcome of the bootstrap pass: processors that were started (in start
/// order, whether or not startup completed) plus the first fatal error.
pub(crate) struct StartupOutcome {
    pub started: Vec<Box<dyn ProcessorControl>>,
    pub result: Result<(), EngineError>,
}

/// Spawns the short-lived initializer thread.
pub(crate) fn spawn_initializer(
    pending: Vec<PendingSubsystem>,
    signals: Arc<EngineSignals>,
    script: Option<(StartupScript, ScriptSender)>,
    ready_timeout: Duration,
) -> thread::JoinHandle<StartupOutcome> {
    thread::Builder::new()
        .name("initializer".to_string())
        .spawn(move || {
            let mut started: Vec<Box<dyn ProcessorControl>> = Vec::with_capacity(pending.len());

            for entry in pending {
                info!("starting subsystem `{}`", entry.name);
                let handle = (entry.spawn)();

                if let Err(e) = handle.wait_ready(ready_timeout) {
                    error!("startup aborted: {}", e);
                    started.push(handle);
                    return StartupOutcome {
                        started,
                        result: Err(e),
                    };
                }
                info!("subsystem `{}` ready", entry.name);
                started.push(handle);
            }

            signals.mark_ready();
            info!("all subsystems ready, accepting input");

            if let Some((script, sender)) = script {
                info!("running startup script ({} lines)", script.len());
                for line in script.lines() {
                    debug!("script: {}", line);
                    sender.post(line);
                }
            }

            StartupOutcome {
                started,
                result: Ok(()),
            }
        })
        .expect("failed to spawn initializer thread")
}

//=== Deallocator =========================================================

/// Spawns the short-lived deallocator thread.
///
/// Shuts processors down in reverse start order: each receives the
/// shutdown command through its own queue (so work submitted ahead of it
/// still executes) and is then joined. The live flag clears last.
pub(crate) fn spawn_deallocator(
    mut handles: Vec<Box<dyn ProcessorControl>>,
    signals: Arc<EngineSignals>,
) -> thread::JoinHandle<Result<(), EngineError>> {
    thread::Builder::new()
        .name("deallocator".to_string())
        .spawn(move || {
            signals.stop_accepting_input();
            info!("teardown: input stopped, shutting down {} subsystems", handles.len());

            let mut first_error: Option<EngineError> = None;
            for handle in handles.iter_mut().rev() {
                info!("shutting down `{}`", handle.name());
                handle.begin_shutdown();
                match handle.join() {
                    Ok(()) => info!("`{}` terminated", handle.name()),
                    Err(e) => {
                        error!("{}", e);
                        first_error.get_or_insert(e);
                    }
                }
            }

            signals.clear_live();
            info!("teardown complete");

            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
        .expect("failed to spawn deallocator thread")
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::subsystem::{
        Subsystem, SubsystemProcessor, SubsystemState, TickControl,
    };

    const TICK: Duration = Duration::from_millis(2);
    const READY: Duration = Duration::from_secs(5);

    struct Sys {
        name: &'static str,
        fail_init: bool,
        init_order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        teardown_order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl Subsystem for Sys {
        fn name(&self) -> &'static str {
            self.name
        }

        fn initialize(&mut self) -> Result<(), SubsystemError> {
            self.init_order.lock().unwrap().push(self.name);
            if self.fail_init {
                return Err(SubsystemError::Init("boom".into()));
            }
            Ok(())
        }

        fn frame(&mut self) -> Result<TickControl, SubsystemError> {
            Ok(TickControl::Continue)
        }

        fn teardown(&mut self) {
            self.teardown_order.lock().unwrap().push(self.name);
        }
    }

    fn pending(
        name: &'static str,
        fail_init: bool,
        init_order: &Arc<std::sync::Mutex<Vec<&'static str>>>,
        teardown_order: &Arc<std::sync::Mutex<Vec<&'static str>>>,
    ) -> PendingSubsystem {
        let sys = Sys {
            name,
            fail_init,
            init_order: Arc::clone(init_order),
            teardown_order: Arc::clone(teardown_order),
        };
        PendingSubsystem {
            name,
            spawn: Box::new(move || Box::new(SubsystemProcessor::spawn(sys, TICK))),
        }
    }

    #[test]
    fn startup_and_teardown_follow_dependency_order() {
        let init_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let teardown_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (signals, _exit_rx) = EngineSignals::new();

        let pendings = vec![
            pending("render", false, &init_order, &teardown_order),
            pending("physics", false, &init_order, &teardown_order),
            pending("world", false, &init_order, &teardown_order),
        ];

        let outcome = spawn_initializer(pendings, Arc::clone(&signals), None, READY)
            .join()
            .unwrap();
        outcome.result.unwrap();
        assert!(signals.all_subsystems_ready());
        assert!(signals.is_accepting_input());
        assert_eq!(*init_order.lock().unwrap(), vec!["render", "physics", "world"]);

        spawn_deallocator(outcome.started, Arc::clone(&signals))
            .join()
            .unwrap()
            .unwrap();
        assert!(!signals.is_accepting_input());
        assert!(!signals.is_live());
        // Reverse start order.
        assert_eq!(
            *teardown_order.lock().unwrap(),
            vec!["world", "physics", "render"]
        );
    }

    #[test]
    fn init_failure_aborts_startup_before_later_subsystems() {
        let init_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let teardown_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (signals, _exit_rx) = EngineSignals::new();

        let pendings = vec![
            pending("render", false, &init_order, &teardown_order),
            pending("physics", true, &init_order, &teardown_order),
            pending("world", false, &init_order, &teardown_order),
        ];

        let outcome = spawn_initializer(pendings, Arc::clone(&signals), None, READY)
            .join()
            .unwrap();
        assert!(matches!(
            outcome.result,
            Err(EngineError::SubsystemInit { name: "physics", .. })
        ));
        assert!(!signals.all_subsystems_ready());
        // `world` never started.
        assert_eq!(*init_order.lock().unwrap(), vec!["render", "physics"]);

        // The started processors still tear down cleanly.
        let result = spawn_deallocator(outcome.started, Arc::clone(&signals))
            .join()
            .unwrap();
        result.unwrap();
        assert!(!signals.is_live());
    }

    #[test]
    fn startup_script_is_posted_after_readiness() {
        let init_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let teardown_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (signals, _exit_rx) = EngineSignals::new();
        let bus = crate::core::script_bus::ScriptBus::new();
        let sender = bus.sender();

        let script = StartupScript::parse("// boot\nSetActiveState:Menu\nReloadUI\n");
        let pendings = vec![pending("world", false, &init_order, &teardown_order)];

        let outcome = spawn_initializer(
            pendings,
            Arc::clone(&signals),
            Some((script, sender.clone())),
            READY,
        )
        .join()
        .unwrap();
        outcome.result.unwrap();
        assert_eq!(sender.pending(), 2);

        spawn_deallocator(outcome.started, signals)
            .join()
            .unwrap()
            .unwrap();
    }

    #[test]
    fn exit_listener_fires_only_on_exit_instruction() {
        let (signals, exit_rx) = EngineSignals::new();
        let mut listener = ExitListener::new(Arc::clone(&signals));

        let other = ScriptCommand {
            instruction: Instruction::parse("ReloadUI"),
            origin: None,
        };
        assert!(!listener.handle(&other));
        assert!(exit_rx.try_recv().is_err());

        let exit = ScriptCommand {
            instruction: Instruction::Exit,
            origin: None,
        };
        assert!(listener.handle(&exit));
        assert!(exit_rx.try_recv().is_ok());
    }

    #[test]
    fn request_exit_is_idempotent() {
        let (signals, exit_rx) = EngineSignals::new();
        signals.request_exit();
        signals.request_exit();
        signals.request_exit();
        assert!(exit_rx.try_recv().is_ok());
        assert!(exit_rx.try_recv().is_err());
    }

    #[test]
    fn processors_reach_terminated_after_teardown() {
        let init_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let teardown_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (signals, _exit_rx) = EngineSignals::new();

        let pendings = vec![pending("audio", false, &init_order, &teardown_order)];
        let outcome = spawn_initializer(pendings, Arc::clone(&signals), None, READY)
            .join()
            .unwrap();
        outcome.result.unwrap();

        let mut handles = outcome.started;
        assert_eq!(handles[0].state(), SubsystemState::Running);
        handles[0].begin_shutdown();
        handles[0].join().unwrap();
        assert_eq!(handles[0].state(), SubsystemState::Terminated);

        spawn_deallocator(handles, signals).join().unwrap().unwrap();
    }
}
