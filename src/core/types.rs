// ============================================================================
// spark-async - Type Definitions
// Type-erased traits and the source storage behind Signal<T>
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::*;

// =============================================================================
// TYPE-ERASED TRAITS
// =============================================================================
//
// Graph operations (mark dirty, track deps) never need the value type, so
// sources are stored as Rc<dyn AnySource> and reactions as Weak<dyn AnyReaction>.
// =============================================================================

/// Type-erased source interface for graph operations.
pub trait AnySource: Any {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    /// Write version (bumped when the value changes)
    fn write_version(&self) -> u32;

    fn set_write_version(&self, version: u32);

    /// Read version (dependency deduplication within one reaction run)
    fn read_version(&self) -> u32;

    fn set_read_version(&self, version: u32);

    fn reaction_count(&self) -> usize;

    fn add_reaction(&self, reaction: Weak<dyn AnyReaction>);

    /// Drop dead (already freed) reactions from the list
    fn cleanup_dead_reactions(&self);

    /// Visit live reactions; return false from `f` to stop early.
    fn for_each_reaction(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool);

    fn remove_reaction(&self, reaction: &Rc<dyn AnyReaction>);

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }
}

/// Type-erased reaction interface. Implemented by `EffectInner`.
pub trait AnyReaction: Any {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    fn dep_count(&self) -> usize;

    fn add_dep(&self, source: Rc<dyn AnySource>);

    /// Remove dependencies starting from index
    fn remove_deps_from(&self, start: usize);

    fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool);

    /// Run the reaction
    fn update(&self);

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn is_destroyed(&self) -> bool {
        self.flags() & DESTROYED != 0
    }

    fn mark_dirty(&self) {
        self.set_flags((self.flags() & STATUS_MASK) | DIRTY);
    }

    fn mark_clean(&self) {
        self.set_flags((self.flags() & STATUS_MASK) | CLEAN);
    }

    fn as_any(&self) -> &dyn Any;
}

// =============================================================================
// SOURCE INNER (the data behind Signal<T>)
// =============================================================================

/// Equality function used to decide whether a write is a change
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Equality that treats every write as a change
pub fn never_equals<T>(_: &T, _: &T) -> bool {
    false
}

/// Storage for a signal's value plus its reaction list.
pub struct SourceInner<T> {
    flags: Cell<u32>,
    value: RefCell<T>,
    write_version: Cell<u32>,
    read_version: Cell<u32>,
    /// Weak refs: a source never keeps a reaction alive
    reactions: RefCell<Vec<Weak<dyn AnyReaction>>>,
    equals: EqualsFn<T>,
}

impl<T> SourceInner<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            flags: Cell::new(SOURCE | CLEAN),
            value: RefCell::new(value),
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            reactions: RefCell::new(Vec::new()),
            equals,
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value, returning true if it changed
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let current = self.value.borrow();
            !(self.equals)(&current, &value)
        };

        if changed {
            *self.value.borrow_mut() = value;
        }
        changed
    }

    /// Mutate in place. Returns true if anyone is listening.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        {
            let mut current = self.value.borrow_mut();
            f(&mut current);
        }
        !self.reactions.borrow().is_empty()
    }
}

impl<T: 'static> AnySource for SourceInner<T> {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn write_version(&self) -> u32 {
        self.write_version.get()
    }

    fn set_write_version(&self, version: u32) {
        self.write_version.set(version);
    }

    fn read_version(&self) -> u32 {
        self.read_version.get()
    }

    fn set_read_version(&self, version: u32) {
        self.read_version.set(version);
    }

    fn reaction_count(&self) -> usize {
        self.reactions.borrow().len()
    }

    fn add_reaction(&self, reaction: Weak<dyn AnyReaction>) {
        let mut reactions = self.reactions.borrow_mut();
        if !reactions.iter().any(|r| Weak::ptr_eq(r, &reaction)) {
            reactions.push(reaction);
        }
    }

    fn cleanup_dead_reactions(&self) {
        self.reactions.borrow_mut().retain(|w| w.strong_count() > 0);
    }

    fn for_each_reaction(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool) {
        let reactions = self.reactions.borrow();
        for weak in reactions.iter() {
            if let Some(rc) = weak.upgrade() {
                if !f(rc) {
                    break;
                }
            }
        }
    }

    fn remove_reaction(&self, reaction: &Rc<dyn AnyReaction>) {
        let target = Rc::as_ptr(reaction) as *const ();
        self.reactions
            .borrow_mut()
            .retain(|weak| weak.strong_count() > 0 && weak.as_ptr() as *const () != target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_inner_starts_clean() {
        let source = SourceInner::new(42);
        assert_eq!(source.get(), 42);
        assert!(source.flags() & SOURCE != 0);
        assert!(AnySource::is_clean(&source));
    }

    #[test]
    fn set_reports_change_by_equality() {
        let source = SourceInner::new(1);
        assert!(!source.set(1));
        assert!(source.set(2));
        assert_eq!(source.get(), 2);
    }

    #[test]
    fn never_equals_always_changes() {
        let source = SourceInner::new_with_equals(vec![1], never_equals);
        assert!(source.set(vec![1]));
    }

    #[test]
    fn update_reports_listeners() {
        let source = SourceInner::new(vec![1, 2]);
        assert!(!source.update(|v| v.push(3)));
        assert_eq!(source.with(Vec::len), 3);
    }
}
