//=========================================================================
// Command System
//=========================================================================
//
// Heap-owned units of deferred work, queued across threads.
//
// Architecture:
//   Producer (any thread) ──Box<dyn Command<S>>──> CommandQueue<S>
//                                                      │
//   Owning subsystem thread <──drain_all()── executes exactly once
//
// Ownership: a command is constructed by the producer, moved into the
// queue on enqueue, and consumed by `execute` on the draining thread.
// `execute` takes `Box<Self>`, so a command cannot run twice.
//
//=========================================================================

//=== Module Declarations =================================================

mod queue;

//=== Public API ==========================================================

pub use queue::{CommandQueue, CommandSender};
pub(crate) use queue::Envelope;

//=== External Dependencies ===============================================

use thiserror::Error;

//=== CommandError ========================================================

/// Failure modes of command execution.
///
/// A failed command degrades to a logged warning and a no-op at the drain
/// site; it never unwinds into the subsystem's tick loop. A half-processed
/// queue would stall the owning subsystem for the rest of the process.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The target handle no longer resolves to a live object.
    ///
    /// Raised when a command outlives the domain object it referenced,
    /// e.g. an entity deleted before the command was drained.
    #[error("stale handle: target object no longer exists")]
    StaleHandle,

    /// The payload does not make sense for the target subsystem.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

//=== Command Trait =======================================================

/// A self-contained unit of work aimed at one subsystem.
///
/// Commands are constructed on any thread and executed only by the target
/// subsystem's own thread, which is the sole owner of `S`. `execute`
/// consumes the box: a command runs exactly once and is destroyed
/// immediately afterward.
///
/// `execute` must not block on another subsystem's queue. Subsystems never
/// wait on each other synchronously; cross-subsystem effects are expressed
/// by enqueueing further commands.
///
/// # Examples
///
/// ```
/// use meridian_engine::core::command::{Command, CommandError};
///
/// struct Mixer { volume: f32 }
///
/// struct SetVolume(f32);
///
/// impl Command<Mixer> for SetVolume {
///     fn execute(self: Box<Self>, target: &mut Mixer) -> Result<(), CommandError> {
///         if !(0.0..=1.0).contains(&self.0) {
///             return Err(CommandError::InvalidPayload(format!("volume {}", self.0)));
///         }
///         target.volume = self.0;
///         Ok(())
///     }
/// }
/// ```
pub trait Command<S>: Send + 'static {
    /// Runs the command against the owning subsystem's state.
    fn execute(self: Box<Self>, target: &mut S) -> Result<(), CommandError>;
}

//=== Closure Adapter =====================================================

/// Wraps a closure as a [`Command`].
///
/// Convenient for one-off mutations and for tests; named command types are
/// preferred for anything with a payload worth inspecting in logs.
pub struct FnCommand<S, F> {
    f: F,
    _target: std::marker::PhantomData<fn(&mut S)>,
}

impl<S, F> Command<S> for FnCommand<S, F>
where
    S: 'static,
    F: FnOnce(&mut S) -> Result<(), CommandError> + Send + 'static,
{
    fn execute(self: Box<Self>, target: &mut S) -> Result<(), CommandError> {
        (self.f)(target)
    }
}

/// Builds a command from a closure.
///
/// # Examples
///
/// ```
/// use meridian_engine::core::command::from_fn;
///
/// struct Counter { value: u64 }
///
/// let cmd = from_fn(|c: &mut Counter| {
///     c.value += 1;
///     Ok(())
/// });
/// # let _ = cmd;
/// ```
pub fn from_fn<S, F>(f: F) -> FnCommand<S, F>
where
    S: 'static,
    F: FnOnce(&mut S) -> Result<(), CommandError> + Send + 'static,
{
    FnCommand {
        f,
        _target: std::marker::PhantomData,
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
