// ============================================================================
// spark-async - Dependency Tracking
// Tracking reads and propagating writes through the signal host
// ============================================================================
//
// Borrow scoping is the main constraint: RefCell borrows are always released
// before mutating ("collect-then-mutate").
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};

/// Upper bound on flush rounds before declaring a self-triggering effect loop.
const MAX_FLUSH_ITERATIONS: u32 = 1000;

// =============================================================================
// TRACK READ
// =============================================================================

/// Register `source` as a dependency of the active reaction, if any.
///
/// Called by `Signal::get()` and `Signal::with()`.
pub fn track_read(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        if ctx.is_untracking() {
            return;
        }

        let Some(reaction) = ctx.get_active_reaction().and_then(|w| w.upgrade()) else {
            return;
        };

        if (reaction.flags() & REACTION_IS_UPDATING) != 0 {
            // Deduplicate: one entry per source per run
            let read_version = ctx.get_read_version();
            if source.read_version() < read_version {
                source.set_read_version(read_version);
                ctx.add_new_dep(source);
            }
        } else {
            reaction.add_dep(source.clone());
            source.add_reaction(Rc::downgrade(&reaction));
        }
    });
}

// =============================================================================
// NOTIFY WRITE
// =============================================================================

/// Tell the graph that `source` changed: mark its reactions dirty and run
/// them (immediately, or at the end of the current batch/flush).
pub fn notify_write(source: Rc<dyn AnySource>) {
    mark_reactions(source);

    let should_flush = with_context(|ctx| !ctx.is_batching() && !ctx.is_flushing());
    if should_flush {
        flush_pending_reactions();
    }
}

/// Mark every live reaction of `source` dirty and queue the effects among them.
pub fn mark_reactions(source: Rc<dyn AnySource>) {
    source.cleanup_dead_reactions();

    // BORROW SAFETY: collect first, release the reactions borrow, then mutate
    let reactions: Vec<Rc<dyn AnyReaction>> = {
        let mut collected = Vec::new();
        source.for_each_reaction(&mut |reaction| {
            collected.push(reaction);
            true
        });
        collected
    };

    for reaction in reactions {
        let flags = reaction.flags();
        if (flags & (DIRTY | DESTROYED)) != 0 {
            continue;
        }

        set_signal_status(&*reaction, DIRTY);

        if (flags & EFFECT) != 0 {
            with_context(|ctx| ctx.add_pending_reaction(Rc::downgrade(&reaction)));
        }
    }
}

/// Run every queued reaction until the queue is empty.
///
/// # Panics
///
/// Panics when effects keep re-triggering each other for more than
/// `MAX_FLUSH_ITERATIONS` rounds.
pub fn flush_pending_reactions() {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));

    let mut iterations = 0;
    loop {
        iterations += 1;
        if iterations > MAX_FLUSH_ITERATIONS {
            with_context(|ctx| ctx.set_flushing(was_flushing));
            panic!(
                "Maximum update depth exceeded. This can happen when an effect \
                 continuously triggers itself."
            );
        }

        let pending = with_context(|ctx| ctx.take_pending_reactions());
        if pending.is_empty() {
            break;
        }

        for reaction in pending.iter().filter_map(|w| w.upgrade()) {
            if reaction.is_destroyed() || !is_dirty(&*reaction) {
                continue;
            }
            reaction.update();
        }
    }

    with_context(|ctx| ctx.set_flushing(was_flushing));
}

// =============================================================================
// STATUS HELPERS
// =============================================================================

/// Replace the status bits (CLEAN, DIRTY) of a reaction.
pub fn set_signal_status(target: &dyn AnyReaction, status: u32) {
    target.set_flags((target.flags() & STATUS_MASK) | status);
}

/// Whether a reaction needs to run.
pub fn is_dirty(reaction: &dyn AnyReaction) -> bool {
    (reaction.flags() & DIRTY) != 0
}

// =============================================================================
// REMOVE REACTIONS
// =============================================================================

/// Unlink `reaction` from its dependencies at index `start` and beyond.
pub fn remove_reactions(reaction: Rc<dyn AnyReaction>, start: usize) {
    let deps_to_remove: Vec<Rc<dyn AnySource>> = {
        let mut collected = Vec::new();
        let mut idx = 0;
        reaction.for_each_dep(&mut |dep| {
            if idx >= start {
                collected.push(dep.clone());
            }
            idx += 1;
            true
        });
        collected
    };

    for dep in deps_to_remove {
        dep.remove_reaction(&reaction);
    }

    reaction.remove_deps_from(start);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceInner;
    use std::any::Any;
    use std::cell::{Cell, RefCell};

    struct MockReaction {
        flags: Cell<u32>,
        deps: RefCell<Vec<Rc<dyn AnySource>>>,
        runs: Cell<u32>,
    }

    impl MockReaction {
        fn new(kind: u32) -> Rc<Self> {
            Rc::new(Self {
                flags: Cell::new(kind | CLEAN),
                deps: RefCell::new(Vec::new()),
                runs: Cell::new(0),
            })
        }
    }

    impl AnyReaction for MockReaction {
        fn flags(&self) -> u32 {
            self.flags.get()
        }
        fn set_flags(&self, flags: u32) {
            self.flags.set(flags);
        }
        fn dep_count(&self) -> usize {
            self.deps.borrow().len()
        }
        fn add_dep(&self, source: Rc<dyn AnySource>) {
            self.deps.borrow_mut().push(source);
        }
        fn remove_deps_from(&self, start: usize) {
            self.deps.borrow_mut().truncate(start);
        }
        fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool) {
            for dep in self.deps.borrow().iter() {
                if !f(dep) {
                    break;
                }
            }
        }
        fn update(&self) {
            self.runs.set(self.runs.get() + 1);
            self.mark_clean();
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn link(source: &Rc<SourceInner<i32>>, reaction: &Rc<MockReaction>) {
        let as_reaction: Rc<dyn AnyReaction> = reaction.clone();
        reaction.add_dep(source.clone());
        source.add_reaction(Rc::downgrade(&as_reaction));
    }

    #[test]
    fn read_outside_reaction_is_not_tracked() {
        let source = Rc::new(SourceInner::new(1));
        track_read(source.clone());
        assert_eq!(source.reaction_count(), 0);
    }

    #[test]
    fn notify_write_runs_dirty_effects() {
        let source = Rc::new(SourceInner::new(1));
        let effect = MockReaction::new(EFFECT);
        link(&source, &effect);

        notify_write(source.clone());
        assert_eq!(effect.runs.get(), 1);
        assert!(effect.is_clean());
    }

    #[test]
    fn destroyed_reactions_are_skipped() {
        let source = Rc::new(SourceInner::new(1));
        let effect = MockReaction::new(EFFECT);
        link(&source, &effect);
        effect.set_flags(effect.flags() | DESTROYED);

        notify_write(source.clone());
        assert_eq!(effect.runs.get(), 0);
    }

    #[test]
    fn remove_reactions_unlinks_tail() {
        let a = Rc::new(SourceInner::new(1));
        let b = Rc::new(SourceInner::new(2));
        let effect = MockReaction::new(EFFECT);
        link(&a, &effect);
        link(&b, &effect);

        remove_reactions(effect.clone(), 1);

        assert_eq!(effect.dep_count(), 1);
        assert_eq!(a.reaction_count(), 1);
        assert_eq!(b.reaction_count(), 0);
    }
}
