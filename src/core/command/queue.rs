//=========================================================================
// Command Queue
//=========================================================================
//
// Thread-safe, unbounded FIFO of pending commands for one subsystem.
//
// Flow:
//   CommandSender::submit() → lock, push, notify (O(1))
//                                  │
//   owning thread → drain_all() → swap live buffer with an empty one
//                                  │
//                            execute batch outside the lock
//
// The drain is a double-buffer swap under a short critical section, so
// the lock hold time is O(1) regardless of queue depth. Entries enqueued
// while the batch executes land in the fresh buffer and are picked up on
// the next tick.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

//=== Internal Dependencies ===============================================

use super::Command;

//=== Envelope ============================================================

/// A queue entry: either domain work or a processor control instruction.
///
/// Control flows through the same FIFO as work, so a pause or shutdown is
/// ordered with the commands submitted around it by the same producer.
pub(crate) enum Envelope<S> {
    /// A domain command, executed against the subsystem's state.
    Work(Box<dyn Command<S>>),

    /// Freeze per-frame updates; draining continues while paused.
    Pause,

    /// Resume per-frame updates.
    Resume,

    /// Finish queued work, tear down, and terminate the thread.
    Shutdown,
}

//=== CommandQueue ========================================================

/// Per-subsystem FIFO of pending [`Command`]s.
///
/// Created once with its subsystem processor and shared behind an [`Arc`]:
/// producers hold a [`CommandSender`], the owning thread keeps the queue
/// itself and is the only caller of the drain.
pub struct CommandQueue<S> {
    buffer: Mutex<Vec<Envelope<S>>>,
    wake: Condvar,
    owner: &'static str,
}

impl<S> CommandQueue<S> {
    /// Creates an empty queue owned by the named subsystem.
    pub fn new(owner: &'static str) -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            wake: Condvar::new(),
            owner,
        }
    }

    /// Name of the subsystem that drains this queue.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Number of entries currently pending.
    pub fn len(&self) -> usize {
        self.lock_buffer().len()
    }

    /// Returns true if no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.lock_buffer().is_empty()
    }

    //--- Producer Side ----------------------------------------------------

    pub(crate) fn push(&self, entry: Envelope<S>) {
        self.lock_buffer().push(entry);
        // Wake the owning thread if it idles on an empty queue.
        self.wake.notify_one();
    }

    //--- Consumer Side ----------------------------------------------------

    /// Removes every entry present at call time, in arrival order.
    ///
    /// Swaps the live buffer with the caller's (empty) scratch buffer under
    /// the lock. The scratch vector is recycled tick over tick, so its
    /// capacity is reused and the critical section stays O(1).
    ///
    /// Only the owning subsystem thread may call this.
    pub(crate) fn drain_all(&self, into: &mut Vec<Envelope<S>>) {
        debug_assert!(into.is_empty(), "drain buffer must be empty");
        std::mem::swap(&mut *self.lock_buffer(), into);
    }

    /// Blocks until an entry arrives or the timeout elapses.
    ///
    /// Returns true if the queue is non-empty on return. Used by the
    /// owning thread to idle between ticks instead of busy-polling.
    pub(crate) fn wait_for_work(&self, timeout: Duration) -> bool {
        let guard = self.lock_buffer();
        if !guard.is_empty() {
            return true;
        }
        let (guard, _result) = self
            .wake
            .wait_timeout(guard, timeout)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !guard.is_empty()
    }

    //--- Internal Helpers -------------------------------------------------

    // A poisoned lock means a producer panicked mid-push. The buffer is
    // still structurally valid (push is a single Vec operation), so take
    // the data rather than propagating the panic into the drain loop.
    fn lock_buffer(&self) -> MutexGuard<'_, Vec<Envelope<S>>> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//=== CommandSender =======================================================

/// Cloneable producer handle for one subsystem's queue.
///
/// Exposes submission only; draining is not reachable through a sender,
/// which keeps execution on the owning subsystem thread by construction.
///
/// Submission never blocks beyond the O(1) push critical section,
/// independent of queue depth.
pub struct CommandSender<S> {
    queue: Arc<CommandQueue<S>>,
}

impl<S> CommandSender<S> {
    pub(crate) fn new(queue: Arc<CommandQueue<S>>) -> Self {
        Self { queue }
    }

    /// Name of the subsystem this sender targets.
    pub fn target(&self) -> &'static str {
        self.queue.owner()
    }

    /// Transfers ownership of a command to the target subsystem's queue.
    ///
    /// The command becomes visible to the next drain; commands submitted
    /// by one thread execute in submission order.
    pub fn submit<C: Command<S>>(&self, command: C) {
        self.queue.push(Envelope::Work(Box::new(command)));
    }

    /// Submits an already boxed command.
    pub fn submit_boxed(&self, command: Box<dyn Command<S>>) {
        self.queue.push(Envelope::Work(command));
    }

    /// Requests that the target subsystem stop per-frame updates.
    ///
    /// Draining continues while paused, so state-mutating commands are
    /// never starved behind a pause.
    pub fn pause(&self) {
        self.queue.push(Envelope::Pause);
    }

    /// Requests that the target subsystem resume per-frame updates.
    pub fn resume(&self) {
        self.queue.push(Envelope::Resume);
    }

    /// Requests cooperative shutdown of the target subsystem.
    ///
    /// The processor finishes queued work, runs teardown, and terminates.
    pub fn shutdown(&self) {
        self.queue.push(Envelope::Shutdown);
    }

    /// Number of entries currently pending on the target queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<S> Clone for CommandSender<S> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
