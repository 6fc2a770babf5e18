//! Debug-only consistency checks for `HashTable`.
//!
//! Two independent checks live here:
//! - `AccessForbiddenScope` detects a table being re-entered from user code
//!   (key hashing/equality) while its buckets may be inconsistent.
//! - `ModificationCounter` stamps positions handed out by a table so that
//!   using one after the table changed fails loudly instead of reading
//!   whatever the bucket now holds.
//!
//! Both compile to zero-sized no-ops in release builds.

#[cfg(debug_assertions)]
use core::cell::Cell;

#[derive(Debug, Default)]
pub struct AccessForbiddenScope {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
}

impl AccessForbiddenScope {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
        }
    }

    /// Called at every table entry point. Panics in debug builds when the
    /// table is being entered from inside a forbidden scope.
    #[inline]
    pub fn check_allowed(&self) {
        #[cfg(debug_assertions)]
        assert!(
            self.depth.get() == 0,
            "hash table accessed while access is forbidden"
        );
    }

    /// Run `f` with table access forbidden.
    #[inline]
    pub fn forbid<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.enter();
        f()
    }

    #[inline]
    fn enter(&self) -> ForbiddenGuard<'_> {
        #[cfg(debug_assertions)]
        {
            self.depth.set(self.depth.get() + 1);
            ForbiddenGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ForbiddenGuard {
                _owner: core::marker::PhantomData,
            }
        }
    }
}

struct ForbiddenGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a AccessForbiddenScope,
    #[cfg(not(debug_assertions))]
    _owner: core::marker::PhantomData<&'a ()>,
}

impl Drop for ForbiddenGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let depth = self.owner.depth.get();
            debug_assert!(depth > 0);
            self.owner.depth.set(depth - 1);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModificationStamp {
    #[cfg(debug_assertions)]
    count: u64,
}

#[derive(Debug, Default)]
pub struct ModificationCounter {
    #[cfg(debug_assertions)]
    count: u64,
}

impl ModificationCounter {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            count: 0,
        }
    }

    #[inline]
    pub fn register(&mut self) {
        #[cfg(debug_assertions)]
        {
            self.count = self.count.wrapping_add(1);
        }
    }

    #[inline]
    pub fn stamp(&self) -> ModificationStamp {
        ModificationStamp {
            #[cfg(debug_assertions)]
            count: self.count,
        }
    }

    /// Panics in debug builds when the table changed since `stamp` was taken.
    #[inline]
    pub fn check(&self, stamp: ModificationStamp) {
        #[cfg(debug_assertions)]
        assert!(
            stamp.count == self.count,
            "hash table position used after the table was modified"
        );
        #[cfg(not(debug_assertions))]
        let _ = stamp;
    }
}
