//! Bucket storage for `HashTable`.

/// One slot of a table's backing array.
///
/// `Deleted` carries no payload: erasing a bucket drops the live value and
/// leaves a tombstone that owns nothing, so a reused tombstone is simply
/// overwritten.
#[derive(Clone, Debug)]
pub enum Bucket<T> {
    Empty,
    Deleted,
    Live(T),
}

impl<T> Default for Bucket<T> {
    fn default() -> Self {
        Bucket::Empty
    }
}

impl<T> Bucket<T> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Bucket::Empty)
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Bucket::Deleted)
    }

    #[inline]
    pub fn is_empty_or_deleted(&self) -> bool {
        !self.is_live()
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, Bucket::Live(_))
    }

    #[inline]
    pub fn as_live(&self) -> Option<&T> {
        match self {
            Bucket::Live(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_live_mut(&mut self) -> Option<&mut T> {
        match self {
            Bucket::Live(value) => Some(value),
            _ => None,
        }
    }

    /// Replace a live bucket with a tombstone and hand back its value.
    #[inline]
    pub(crate) fn delete(&mut self) -> Option<T> {
        match core::mem::replace(self, Bucket::Deleted) {
            Bucket::Live(value) => Some(value),
            other => {
                *self = other;
                None
            }
        }
    }

    /// Move a live value out, leaving the bucket empty. Used when a whole
    /// backing is being drained into a new one.
    #[inline]
    pub(crate) fn take_live(&mut self) -> Option<T> {
        match core::mem::take(self) {
            Bucket::Live(value) => Some(value),
            other => {
                *self = other;
                None
            }
        }
    }
}
