//! One position of the slot array.

/// State of a single slot. Only occupied slots carry a key or a chain link,
/// so a free slot can never hold a stale key.
#[derive(Debug)]
pub(crate) enum Slot<K> {
    Free,
    Occupied { key: K, link: Option<usize> },
    /// Sentinel after the last usable slot; iteration stops here.
    Terminal,
}

impl<K> Slot<K> {
    #[inline]
    pub(crate) fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied { .. })
    }

    #[inline]
    pub(crate) fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }

    #[inline]
    pub(crate) fn key(&self) -> Option<&K> {
        match self {
            Slot::Occupied { key, .. } => Some(key),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn link(&self) -> Option<usize> {
        match self {
            Slot::Occupied { link, .. } => *link,
            _ => None,
        }
    }

    pub(crate) fn into_key(self) -> Option<K> {
        match self {
            Slot::Occupied { key, .. } => Some(key),
            _ => None,
        }
    }
}
