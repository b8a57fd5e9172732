//=========================================================================
// Subsystem System
//=========================================================================
//
// A subsystem owns one domain's state (rendering, physics, audio, world
// state) and runs on its own dedicated thread, ticking once per frame.
//
// Lifecycle:
//   Created → Initializing → Running ⇄ Paused → Draining → Terminated
//
// Running and Paused both drain the command queue each tick; only Running
// additionally calls `frame`. Draining executes remaining commands, runs
// `teardown`, and terminates the thread.
//
//=========================================================================

//=== Module Declarations =================================================

mod processor;

//=== Public API ==========================================================

pub use processor::{ProcessorControl, SubsystemHandle, SubsystemProcessor};

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

//=== SubsystemError ======================================================

/// Fatal subsystem conditions.
///
/// Initialization failure is fatal to the whole engine run; a frame
/// failure is fatal to that subsystem only, which drains and terminates
/// rather than looping forever. There is no automatic restart.
#[derive(Debug, Error)]
pub enum SubsystemError {
    /// One-time setup failed (device/context acquisition, resource loads).
    #[error("initialization failed: {0}")]
    Init(String),

    /// Unrecoverable per-frame condition (e.g. device lost).
    #[error("unrecoverable frame error: {0}")]
    Fatal(String),
}

//=== TickControl =========================================================

/// Control flow signal returned by [`Subsystem::frame`].
///
/// Lets a subsystem request its own shutdown from inside the tick loop,
/// e.g. the world/state manager honoring a shutdown instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Keep ticking.
    Continue,

    /// Finish queued work, tear down, and terminate.
    Shutdown,
}

//=== SubsystemState ======================================================

/// Processor state machine, observable from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubsystemState {
    /// Constructed, thread not yet spawned.
    Created = 0,

    /// One-time setup in progress on the subsystem thread.
    Initializing = 1,

    /// Draining and performing per-frame work each tick.
    Running = 2,

    /// Draining each tick, per-frame work frozen.
    Paused = 3,

    /// Executing remaining queued work before termination.
    Draining = 4,

    /// Terminal; the thread has exited or is about to.
    Terminated = 5,
}

impl SubsystemState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Initializing,
            2 => Self::Running,
            3 => Self::Paused,
            4 => Self::Draining,
            _ => Self::Terminated,
        }
    }
}

/// Lock-free cell holding the current [`SubsystemState`].
///
/// Written only by the owning subsystem thread (and once by the spawner);
/// read by the orchestrator and by producers. One of the few pieces of
/// state shared across threads without a lock.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: SubsystemState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> SubsystemState {
        SubsystemState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SubsystemState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

//=== Subsystem Trait =====================================================

/// Behavior of one engine domain, driven by a [`SubsystemProcessor`].
///
/// The processor owns the implementing value exclusively; no other thread
/// ever touches it. Producers express mutations as [`Command`]s submitted
/// through the processor's [`CommandSender`].
///
/// # Minimal Implementation
///
/// Only `name` and `frame` are required:
///
/// ```
/// use meridian_engine::core::subsystem::{Subsystem, SubsystemError, TickControl};
///
/// struct AudioMixer { frames: u64 }
///
/// impl Subsystem for AudioMixer {
///     fn name(&self) -> &'static str {
///         "audio"
///     }
///
///     fn frame(&mut self) -> Result<TickControl, SubsystemError> {
///         self.frames += 1;
///         Ok(TickControl::Continue)
///     }
/// }
/// ```
///
/// [`Command`]: crate::core::command::Command
/// [`CommandSender`]: crate::core::command::CommandSender
pub trait Subsystem: Send + 'static {
    /// Stable name used in logs and by the orchestrator.
    fn name(&self) -> &'static str;

    /// One-time setup, run on the subsystem thread before any command
    /// referencing this subsystem executes.
    ///
    /// Default implementation does nothing. An `Err` is fatal to the
    /// engine run.
    fn initialize(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Per-frame work: render a frame, step physics, mix audio, advance
    /// the active game state. Not called while paused.
    fn frame(&mut self) -> Result<TickControl, SubsystemError>;

    /// Releases subsystem-owned resources during shutdown draining.
    ///
    /// Default implementation does nothing.
    fn teardown(&mut self) {}
}

//=========================================================================
// Unit Tests
//=========================================================================
