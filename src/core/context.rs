// ============================================================================
// spark-async - Reactive Context
// Thread-local state for tracking the current reaction
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::{AnyReaction, AnySource};

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local reactive context holding the global state of the signal host.
///
/// Everything in this crate is single-threaded: signals, effects and async
/// fields all live on the thread that owns the tokio `LocalSet`.
pub struct ReactiveContext {
    /// Currently executing reaction (an effect)
    pub active_reaction: RefCell<Option<Weak<dyn AnyReaction>>>,

    /// Whether reads should skip dependency registration
    pub untracking: Cell<bool>,

    /// Global write version, bumped on every signal write
    pub write_version: Cell<u32>,

    /// Global read version, bumped on every reaction run
    pub read_version: Cell<u32>,

    /// Dependencies collected during the current reaction run
    pub new_deps: RefCell<Vec<Rc<dyn AnySource>>>,

    /// Current batch depth (for nested batches)
    pub batch_depth: Cell<u32>,

    /// Reactions waiting to run after the current flush or batch
    pub pending_reactions: RefCell<Vec<Weak<dyn AnyReaction>>>,

    /// Whether pending reactions are being flushed right now
    pub is_flushing: Cell<bool>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            active_reaction: RefCell::new(None),
            untracking: Cell::new(false),
            write_version: Cell::new(1),
            read_version: Cell::new(0),
            new_deps: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending_reactions: RefCell::new(Vec::new()),
            is_flushing: Cell::new(false),
        }
    }

    // =========================================================================
    // REACTION TRACKING
    // =========================================================================

    /// Set the active reaction, returning the previous one
    pub fn set_active_reaction(
        &self,
        reaction: Option<Weak<dyn AnyReaction>>,
    ) -> Option<Weak<dyn AnyReaction>> {
        self.active_reaction.replace(reaction)
    }

    pub fn get_active_reaction(&self) -> Option<Weak<dyn AnyReaction>> {
        self.active_reaction.borrow().clone()
    }

    pub fn has_active_reaction(&self) -> bool {
        self.active_reaction.borrow().is_some()
    }

    /// Set untracking mode, returning the previous value
    pub fn set_untracking(&self, value: bool) -> bool {
        self.untracking.replace(value)
    }

    pub fn is_untracking(&self) -> bool {
        self.untracking.get()
    }

    // =========================================================================
    // VERSION COUNTERS
    // =========================================================================

    pub fn increment_write_version(&self) -> u32 {
        let v = self.write_version.get() + 1;
        self.write_version.set(v);
        v
    }

    pub fn increment_read_version(&self) -> u32 {
        let v = self.read_version.get() + 1;
        self.read_version.set(v);
        v
    }

    pub fn get_read_version(&self) -> u32 {
        self.read_version.get()
    }

    // =========================================================================
    // DEPENDENCY COLLECTION
    // =========================================================================

    /// Swap out the collected deps, returning the old list
    pub fn swap_new_deps(&self, deps: Vec<Rc<dyn AnySource>>) -> Vec<Rc<dyn AnySource>> {
        self.new_deps.replace(deps)
    }

    pub fn add_new_dep(&self, source: Rc<dyn AnySource>) {
        self.new_deps.borrow_mut().push(source);
    }

    // =========================================================================
    // BATCHING / FLUSHING
    // =========================================================================

    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub fn add_pending_reaction(&self, reaction: Weak<dyn AnyReaction>) {
        self.pending_reactions.borrow_mut().push(reaction);
    }

    pub fn take_pending_reactions(&self) -> Vec<Weak<dyn AnyReaction>> {
        self.pending_reactions.replace(Vec::new())
    }

    /// Set flushing mode, returning the previous value
    pub fn set_flushing(&self, value: bool) -> bool {
        self.is_flushing.replace(value)
    }

    pub fn is_flushing(&self) -> bool {
        self.is_flushing.get()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Check if reads are currently being tracked (inside a reaction, not untracking)
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction() && !ctx.is_untracking())
}

/// Check if currently in a batch
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}
