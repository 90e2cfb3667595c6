//! Page Reservation Registry.

use derive_getters::Getters;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Pages claimed by one `reserve` call.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ReservedPages {
    /// Registry epoch at the time of the claim
    epoch: u64,
    /// Pages actually claimed, ascending
    pages: Vec<u32>,
}

impl ReservedPages {
    /// Whether nothing was claimed.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The same claim minus `pages`, which the caller has already released.
    pub fn without(&self, pages: &[u32]) -> ReservedPages {
        ReservedPages {
            epoch: self.epoch,
            pages: self
                .pages
                .iter()
                .copied()
                .filter(|page| !pages.contains(page))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct ReservationState {
    epoch: u64,
    pages: BTreeSet<u32>,
}

/// Set of page numbers currently being generated.
///
/// Reserving is a single check-and-insert under a mutex, so two racing
/// callers can never both claim the same page.
///
/// # Examples
///
/// ```
/// use folio_engine::PageReservations;
///
/// let reservations = PageReservations::new();
/// let first = reservations.reserve(&[1, 2]);
/// let second = reservations.reserve(&[2, 3]);
///
/// assert_eq!(first.pages(), &vec![1, 2]);
/// assert_eq!(second.pages(), &vec![3]);
/// ```
#[derive(Debug, Default)]
pub struct PageReservations {
    state: Mutex<ReservationState>,
}

impl PageReservations {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ReservationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim every requested page that is not already claimed.
    #[tracing::instrument(skip(self))]
    pub fn reserve(&self, pages: &[u32]) -> ReservedPages {
        let mut state = self.lock();
        let mut reserved = Vec::with_capacity(pages.len());
        for &page in pages {
            if state.pages.insert(page) {
                reserved.push(page);
            }
        }
        reserved.sort_unstable();

        if reserved.len() < pages.len() {
            tracing::debug!(reserved = ?reserved, "Dropped pages already in flight");
        }
        ReservedPages {
            epoch: state.epoch,
            pages: reserved,
        }
    }

    /// Release pages unconditionally.
    pub fn release(&self, pages: &[u32]) {
        let mut state = self.lock();
        for page in pages {
            state.pages.remove(page);
        }
    }

    /// Release pages only if the registry has not been cleared since `owned` was claimed.
    ///
    /// Returns whether anything was released.
    pub fn release_owned(&self, owned: &ReservedPages, pages: &[u32]) -> bool {
        let mut state = self.lock();
        if state.epoch != owned.epoch {
            tracing::debug!(
                owned_epoch = owned.epoch,
                epoch = state.epoch,
                "Skipping release from a cleared epoch"
            );
            return false;
        }
        for page in pages.iter().filter(|page| owned.pages.contains(page)) {
            state.pages.remove(page);
        }
        true
    }

    /// Drop every reservation and start a new epoch.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.pages.clear();
        state.epoch += 1;
    }

    /// Whether `page` is currently claimed.
    pub fn contains(&self, page: u32) -> bool {
        self.lock().pages.contains(&page)
    }

    /// Currently claimed pages, ascending.
    pub fn in_flight(&self) -> Vec<u32> {
        self.lock().pages.iter().copied().collect()
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }
}
