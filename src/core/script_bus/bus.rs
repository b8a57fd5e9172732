//=========================================================================
// Script Bus Queue & Dispatch
//=========================================================================
//
// Cross-thread post queue plus the listener registry.
//
// Posting is allowed from any thread and never blocks beyond a short
// push critical section. Processing happens once per tick on the thread
// that owns the bus (the world/state subsystem), using the same
// buffer-swap drain as the command queues.
//
// Dispatch is at-least-once per listener per command: every registered
// listener sees every command, so listeners must handle repeats
// idempotently.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::registry::EntityKey;
use super::Instruction;

//=== ScriptCommand =======================================================

/// One posted instruction, with its optional originating entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCommand {
    /// The parsed instruction.
    pub instruction: Instruction,

    /// Entity that posted the command (e.g. a UI widget), if any.
    pub origin: Option<EntityKey>,
}

//=== Shared Queue ========================================================

struct ScriptQueue {
    pending: Mutex<Vec<ScriptCommand>>,
}

impl ScriptQueue {
    fn lock_pending(&self) -> MutexGuard<'_, Vec<ScriptCommand>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//=== ScriptSender ========================================================

/// Cloneable posting handle for the script bus.
///
/// Parses the text once and appends the tagged command; callable from any
/// thread.
pub struct ScriptSender {
    queue: Arc<ScriptQueue>,
}

impl ScriptSender {
    /// Posts an instruction with no originating entity.
    pub fn post(&self, text: &str) {
        self.post_from(text, None);
    }

    /// Posts an instruction on behalf of an entity.
    pub fn post_from(&self, text: &str, origin: Option<EntityKey>) {
        let command = ScriptCommand {
            instruction: Instruction::parse(text),
            origin,
        };
        self.queue.lock_pending().push(command);
    }

    /// Number of commands waiting for the next processing pass.
    pub fn pending(&self) -> usize {
        self.queue.lock_pending().len()
    }
}

impl Clone for ScriptSender {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

//=== ScriptListener ======================================================

/// A component that reacts to script commands.
///
/// Listeners are registered before the engine starts and invoked on the
/// bus-owning thread during each processing pass. Return `true` when the
/// command was acted on; unhandled commands are logged at debug level.
pub trait ScriptListener: Send {
    /// Listener name, used in logs.
    fn name(&self) -> &'static str;

    /// Reacts to one command. Must be idempotent: a duplicated post
    /// produces a repeated call.
    fn handle(&mut self, command: &ScriptCommand) -> bool;
}

//=== ScriptBus ===========================================================

/// The bus itself: shared post queue plus listener registry.
///
/// Owned by the world/state subsystem and processed once per tick on that
/// subsystem's thread. Producers only ever hold a [`ScriptSender`].
pub struct ScriptBus {
    queue: Arc<ScriptQueue>,
    listeners: Vec<Box<dyn ScriptListener>>,
}

impl ScriptBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(ScriptQueue {
                pending: Mutex::new(Vec::new()),
            }),
            listeners: Vec::new(),
        }
    }

    /// A cloneable posting handle.
    pub fn sender(&self) -> ScriptSender {
        ScriptSender {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Registers a listener. Registration order is invocation order.
    pub fn register_listener(&mut self, listener: Box<dyn ScriptListener>) {
        debug!("script bus: registered listener `{}`", listener.name());
        self.listeners.push(listener);
    }

    /// Removes every pending command into the caller's scratch buffer.
    ///
    /// Buffer-swap under the lock; commands posted during processing are
    /// retained for the next pass.
    pub fn take_pending(&self, into: &mut Vec<ScriptCommand>) {
        debug_assert!(into.is_empty(), "scratch buffer must be empty");
        std::mem::swap(&mut *self.queue.lock_pending(), into);
    }

    /// Offers one command to every registered listener.
    ///
    /// Every listener sees the command regardless of whether an earlier
    /// one handled it. Returns true if at least one listener acted.
    pub fn dispatch(&mut self, command: &ScriptCommand) -> bool {
        let mut handled = false;
        for listener in &mut self.listeners {
            handled |= listener.handle(command);
        }
        handled
    }
}

impl Default for ScriptBus {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<Instruction>,
        accept_raw: bool,
    }

    impl ScriptListener for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&mut self, command: &ScriptCommand) -> bool {
            self.seen.push(command.instruction.clone());
            match &command.instruction {
                Instruction::Raw(_) => self.accept_raw,
                _ => true,
            }
        }
    }

    #[test]
    fn post_parses_once_and_preserves_order() {
        let bus = ScriptBus::new();
        let sender = bus.sender();

        sender.post("SetActiveState:NULL");
        sender.post("StateMan.Shutdown");
        assert_eq!(sender.pending(), 2);

        let mut batch = Vec::new();
        bus.take_pending(&mut batch);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].instruction, Instruction::SetActiveState(None));
        assert_eq!(
            batch[1].instruction,
            Instruction::ShutdownManager("StateMan".to_string())
        );
        assert_eq!(sender.pending(), 0);
    }

    #[test]
    fn every_listener_sees_every_command() {
        let mut bus = ScriptBus::new();
        bus.register_listener(Box::new(Recorder {
            seen: Vec::new(),
            accept_raw: true,
        }));
        bus.register_listener(Box::new(Recorder {
            seen: Vec::new(),
            accept_raw: false,
        }));

        let command = ScriptCommand {
            instruction: Instruction::parse("ReloadUI"),
            origin: None,
        };
        // First listener handles it; the second is still invoked.
        assert!(bus.dispatch(&command));
    }

    #[test]
    fn dispatch_reports_unhandled_raw() {
        let mut bus = ScriptBus::new();
        bus.register_listener(Box::new(Recorder {
            seen: Vec::new(),
            accept_raw: false,
        }));

        let command = ScriptCommand {
            instruction: Instruction::parse("NoSuchThing"),
            origin: None,
        };
        assert!(!bus.dispatch(&command));
    }

    #[test]
    fn posts_from_other_threads_all_arrive() {
        let bus = ScriptBus::new();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let sender = bus.sender();
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    sender.post("ReloadUI");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut batch = Vec::new();
        bus.take_pending(&mut batch);
        assert_eq!(batch.len(), 100);
    }

    #[test]
    fn take_pending_retains_later_posts() {
        let bus = ScriptBus::new();
        let sender = bus.sender();

        sender.post("Engine.Exit");
        let mut batch = Vec::new();
        bus.take_pending(&mut batch);
        assert_eq!(batch.len(), 1);

        sender.post("ReloadUI");
        assert_eq!(sender.pending(), 1);
    }
}
