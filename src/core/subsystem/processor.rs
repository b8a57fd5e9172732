//=========================================================================
// Subsystem Processor
//=========================================================================
//
// Owns one subsystem value and one dedicated thread.
//
// Each tick:
//  1. Drain the command queue (buffer swap) and execute every entry
//  2. If not paused, run the subsystem's per-frame work
//  3. Sleep on the queue condvar for the remainder of the tick
//
// The thread reports readiness over a bounded(1) channel once one-time
// setup completes; the orchestrator blocks on that channel instead of
// polling a flag. Termination is observed with a real join.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::command::{CommandQueue, CommandSender, Envelope};
use crate::core::lifecycle::EngineError;
use super::{StateCell, Subsystem, SubsystemState, TickControl};

//=== SubsystemProcessor ==================================================

/// Spawns and drives a [`Subsystem`] on its own thread.
pub struct SubsystemProcessor;

impl SubsystemProcessor {
    /// Spawns the processor thread for `subsystem`, ticking at `tick`.
    ///
    /// The subsystem value moves onto the new thread and is never touched
    /// by any other thread again. Use the returned handle's sender to
    /// submit commands.
    pub fn spawn<S: Subsystem>(subsystem: S, tick: Duration) -> SubsystemHandle<S> {
        let queue = Arc::new(CommandQueue::new(subsystem.name()));
        Self::spawn_with_queue(subsystem, queue, tick)
    }

    /// Spawns the processor thread against a queue created earlier.
    ///
    /// Used by the engine facade, which hands out senders at registration
    /// time: entries enqueued before the spawn are drained on the first
    /// tick.
    pub(crate) fn spawn_with_queue<S: Subsystem>(
        subsystem: S,
        queue: Arc<CommandQueue<S>>,
        tick: Duration,
    ) -> SubsystemHandle<S> {
        let name = subsystem.name();
        let state = Arc::new(StateCell::new(SubsystemState::Created));
        let (ready_tx, ready_rx) = bounded(1);

        let thread = {
            let queue = Arc::clone(&queue);
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || {
                    let outcome = run_loop(subsystem, &queue, &state, tick, |result| {
                        let _ = ready_tx.send(result);
                    });
                    state.set(SubsystemState::Terminated);
                    match outcome {
                        LoopExit::Clean => info!("[{}] terminated", name),
                        LoopExit::InitFailed => error!("[{}] terminated after failed init", name),
                        LoopExit::FrameFatal => error!("[{}] terminated after fatal frame", name),
                    }
                })
                .expect("failed to spawn subsystem thread")
        };

        SubsystemHandle {
            name,
            sender: CommandSender::new(queue),
            state,
            ready_rx,
            thread: Some(thread),
        }
    }
}

//=== Tick Loop ===========================================================

enum LoopExit {
    Clean,
    InitFailed,
    FrameFatal,
}

fn run_loop<S: Subsystem>(
    mut subsystem: S,
    queue: &CommandQueue<S>,
    state: &StateCell,
    tick: Duration,
    report_ready: impl FnOnce(Result<(), super::SubsystemError>),
) -> LoopExit {
    let name = subsystem.name();

    //--- One-time setup ---------------------------------------------------
    state.set(SubsystemState::Initializing);
    info!("[{}] initializing", name);

    if let Err(e) = subsystem.initialize() {
        error!("[{}] initialization failed: {}", name, e);
        // Straight to shutdown: tear down whatever partial setup exists.
        state.set(SubsystemState::Draining);
        subsystem.teardown();
        report_ready(Err(e));
        return LoopExit::InitFailed;
    }

    state.set(SubsystemState::Running);
    info!("[{}] entering tick loop ({:?}/tick)", name, tick);
    report_ready(Ok(()));

    //--- Tick loop --------------------------------------------------------
    let mut batch: Vec<Envelope<S>> = Vec::new();
    let mut paused = false;
    let mut exit = LoopExit::Clean;

    'tick: loop {
        let frame_start = Instant::now();

        // 1. Drain and execute. A shutdown entry finishes the rest of the
        //    batch first, so work submitted ahead of it is not lost.
        queue.drain_all(&mut batch);
        let mut shutdown_requested = false;
        for entry in batch.drain(..) {
            match entry {
                Envelope::Work(cmd) => {
                    if let Err(e) = cmd.execute(&mut subsystem) {
                        warn!("[{}] command failed: {}", name, e);
                    }
                }
                Envelope::Pause => {
                    if !paused {
                        debug!("[{}] paused", name);
                        paused = true;
                        state.set(SubsystemState::Paused);
                    }
                }
                Envelope::Resume => {
                    if paused {
                        debug!("[{}] resumed", name);
                        paused = false;
                        state.set(SubsystemState::Running);
                    }
                }
                Envelope::Shutdown => shutdown_requested = true,
            }
        }
        if shutdown_requested {
            break 'tick;
        }

        // 2. Per-frame work, frozen while paused.
        if !paused {
            match subsystem.frame() {
                Ok(TickControl::Continue) => {}
                Ok(TickControl::Shutdown) => {
                    info!("[{}] requested its own shutdown", name);
                    break 'tick;
                }
                Err(e) => {
                    error!("[{}] {}", name, e);
                    exit = LoopExit::FrameFatal;
                    break 'tick;
                }
            }
        }

        // 3. Idle for the rest of the tick; an enqueue wakes us early.
        let elapsed = frame_start.elapsed();
        if elapsed < tick {
            queue.wait_for_work(tick - elapsed);
        }
    }

    //--- Draining-for-shutdown --------------------------------------------
    // Remaining commands still execute; per-frame work does not.
    state.set(SubsystemState::Draining);
    info!("[{}] draining for shutdown", name);

    queue.drain_all(&mut batch);
    for entry in batch.drain(..) {
        if let Envelope::Work(cmd) = entry {
            if let Err(e) = cmd.execute(&mut subsystem) {
                warn!("[{}] command failed during drain: {}", name, e);
            }
        }
    }

    subsystem.teardown();
    exit
}

//=== SubsystemHandle =====================================================

/// Owner-side handle for a spawned processor.
///
/// Holds the join handle, the producer sender, and the shared state cell.
/// The orchestrator drives handles through the type-erased
/// [`ProcessorControl`] trait; application code mostly just clones the
/// sender.
pub struct SubsystemHandle<S: Subsystem> {
    name: &'static str,
    sender: CommandSender<S>,
    state: Arc<StateCell>,
    ready_rx: Receiver<Result<(), super::SubsystemError>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl<S: Subsystem> SubsystemHandle<S> {
    /// A cloneable sender targeting this processor's queue.
    pub fn sender(&self) -> CommandSender<S> {
        self.sender.clone()
    }

    /// Current state machine position.
    pub fn state(&self) -> SubsystemState {
        self.state.get()
    }

    /// Subsystem name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

//=== ProcessorControl ====================================================

/// Type-erased control surface used by the lifecycle orchestrator.
///
/// Erasing `S` lets the orchestrator hold processors for heterogeneous
/// subsystems in one ordered list.
pub trait ProcessorControl: Send {
    /// Subsystem name.
    fn name(&self) -> &'static str;

    /// Current state machine position.
    fn state(&self) -> SubsystemState;

    /// Blocks until the processor reports readiness or fails to.
    ///
    /// Consumes the one-shot ready signal; meant to be called exactly once,
    /// by the initializer, right after the spawn.
    fn wait_ready(&self, timeout: Duration) -> Result<(), EngineError>;

    /// Sends the shutdown command through the processor's own queue.
    fn begin_shutdown(&self);

    /// Pauses per-frame work (draining continues).
    fn pause(&self);

    /// Resumes per-frame work.
    fn resume(&self);

    /// Joins the processor thread.
    fn join(&mut self) -> Result<(), EngineError>;
}

impl<S: Subsystem> ProcessorControl for SubsystemHandle<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn state(&self) -> SubsystemState {
        self.state.get()
    }

    fn wait_ready(&self, timeout: Duration) -> Result<(), EngineError> {
        match self.ready_rx.recv_timeout(timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EngineError::SubsystemInit {
                name: self.name,
                source: e,
            }),
            Err(RecvTimeoutError::Timeout) => Err(EngineError::ReadyTimeout {
                name: self.name,
                timeout,
            }),
            // Channel gone without a message: the thread died before
            // reporting, i.e. it panicked during setup.
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::ThreadPanicked(self.name)),
        }
    }

    fn begin_shutdown(&self) {
        self.sender.shutdown();
    }

    fn pause(&self) {
        self.sender.pause();
    }

    fn resume(&self) {
        self.sender.resume();
    }

    fn join(&mut self) -> Result<(), EngineError> {
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| EngineError::ThreadPanicked(self.name)),
            None => Ok(()),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
