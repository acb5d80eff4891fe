//! Scratch-buffer recycling for searches and insertions.
//!
//! A [`Pool`] is a plain free list. It has no synchronisation of its own: every
//! pool lives inside an index's lock-guarded state and is only touched while
//! that lock (or the state's scratch mutex) is held.

use std::fmt;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type ResetHook<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Typed free list with a factory and an optional reset hook run on `get`.
pub(crate) struct Pool<T> {
    free: Vec<T>,
    factory: Factory<T>,
    reset: Option<ResetHook<T>>,
}

impl<T> Pool<T> {
    pub(crate) fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            free: Vec::new(),
            factory: Box::new(factory),
            reset: None,
        }
    }

    #[must_use]
    pub(crate) fn with_reset(mut self, reset: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Takes a pooled value, or builds a fresh one when the pool is empty.
    pub(crate) fn get(&mut self) -> T {
        self.free.pop().map_or_else(
            || (self.factory)(),
            |mut value| {
                if let Some(reset) = &self.reset {
                    reset(&mut value);
                }
                value
            },
        )
    }

    /// Returns a value for reuse.
    pub(crate) fn put(&mut self, value: T) {
        self.free.push(value);
    }

    /// Drops every pooled value.
    pub(crate) fn drain(&mut self) {
        self.free.clear();
        self.free.shrink_to_fit();
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.free.len()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.free.len())
            .field("reset", &self.reset.is_some())
            .finish_non_exhaustive()
    }
}

/// Generation-stamped visited set indexed by node position.
///
/// `clear` bumps the generation instead of zeroing the buffer; the buffer is
/// only wiped when the generation counter wraps.
#[derive(Debug, Default)]
pub(crate) struct VisitedSet {
    marks: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    pub(crate) fn clear(&mut self) {
        if self.generation == u16::MAX {
            self.marks.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    pub(crate) fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.marks.len() {
            self.marks.resize(capacity, 0);
        }
    }

    /// Marks `position`, returning `true` when it was not yet visited.
    pub(crate) fn insert(&mut self, position: usize) -> bool {
        if self.generation == 0 {
            self.generation = 1;
        }
        if position >= self.marks.len() {
            self.marks.resize(position + 1, 0);
        }
        let Some(mark) = self.marks.get_mut(position) else {
            return false;
        };
        if *mark == self.generation {
            false
        } else {
            *mark = self.generation;
            true
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, position: usize) -> bool {
        self.generation != 0 && self.marks.get(position) == Some(&self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[rstest]
    fn pool_builds_on_empty_and_reuses_after_put() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut pool = Pool::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
            Vec::<u32>::with_capacity(8)
        });

        let mut first = pool.get();
        first.push(3);
        pool.put(first);
        assert_eq!(pool.idle(), 1);

        let again = pool.get();
        assert_eq!(built.load(Ordering::Relaxed), 1, "second get must reuse");
        assert_eq!(again, vec![3], "without a reset hook contents survive");
    }

    #[rstest]
    fn reset_hook_runs_on_get() {
        let mut pool = Pool::new(Vec::<u32>::new).with_reset(Vec::clear);
        let mut buffer = pool.get();
        buffer.extend([1, 2, 3]);
        pool.put(buffer);
        let buffer = pool.get();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 3, "reset keeps the allocation");
    }

    #[rstest]
    fn drain_discards_idle_values() {
        let mut pool = Pool::new(String::new);
        pool.put(String::from("x"));
        pool.drain();
        assert_eq!(pool.idle(), 0);
    }

    #[rstest]
    fn visited_set_clears_by_generation() {
        let mut visited = VisitedSet::default();
        visited.ensure_capacity(4);
        assert!(visited.insert(2));
        assert!(!visited.insert(2));
        assert!(visited.contains(2));
        visited.clear();
        assert!(!visited.contains(2));
        assert!(visited.insert(2));
    }

    #[rstest]
    fn visited_set_grows_on_demand() {
        let mut visited = VisitedSet::default();
        assert!(visited.insert(10));
        assert!(visited.contains(10));
        assert!(!visited.contains(9));
    }

    #[rstest]
    fn visited_set_wipes_on_generation_wrap() {
        let mut visited = VisitedSet::default();
        visited.ensure_capacity(2);
        visited.insert(0);
        for _ in 0..u16::MAX {
            visited.clear();
        }
        assert!(visited.insert(0), "wrap must not resurrect stale marks");
    }
}
