use heapless::Vec;

use crate::bus::{BusError, FilterMask};

/// A registered callback and the identifier mask it listens on.
pub struct CallbackEntry<'a, H: ?Sized> {
    handler: &'a H,
    mask: FilterMask,
}

impl<'a, H: ?Sized> Clone for CallbackEntry<'a, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, H: ?Sized> Copy for CallbackEntry<'a, H> {}

impl<'a, H: ?Sized> CallbackEntry<'a, H> {
    pub fn handler(&self) -> &'a H {
        self.handler
    }

    pub fn mask(&self) -> FilterMask {
        self.mask
    }
}

/// Fixed-capacity, append-only callback list for one bus slot.
///
/// Entries are dispatched in registration order. There is no removal; registration
/// happens during configuration, after which the list is only read.
///
/// `C` is the maximum number of callbacks.
pub struct CallbackRegistry<'a, H: ?Sized, const C: usize> {
    entries: Vec<CallbackEntry<'a, H>, C>,
}

impl<'a, H: ?Sized, const C: usize> CallbackRegistry<'a, H, C> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a callback.
    ///
    /// Leaves the registry untouched and returns
    /// [`BusError::CallbackCapacityExceeded`] when full.
    pub fn register(&mut self, handler: &'a H, mask: FilterMask) -> Result<(), BusError> {
        self.entries
            .push(CallbackEntry { handler, mask })
            .map_err(|_| BusError::CallbackCapacityExceeded)
    }

    /// Invokes `f` for each entry whose mask accepts `id`, in registration order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn dispatch(&self, id: u32, mut f: impl FnMut(&'a H)) -> usize {
        let mut invoked = 0;
        for entry in self.entries.iter().filter(|e| e.mask.matches(id)) {
            f(entry.handler);
            invoked += 1;
        }
        invoked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == C
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallbackEntry<'a, H>> {
        self.entries.iter()
    }
}

impl<'a, H: ?Sized, const C: usize> Default for CallbackRegistry<'a, H, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::test_support::CallLog;

    trait Tagged {
        fn tag(&self) -> u8;
    }

    struct Tag(u8);

    impl Tagged for Tag {
        fn tag(&self) -> u8 {
            self.0
        }
    }

    static A: Tag = Tag(1);
    static B: Tag = Tag(2);
    static C: Tag = Tag(3);
    static D: Tag = Tag(4);

    #[test]
    fn dispatch_follows_registration_order() {
        let mut registry: CallbackRegistry<'_, dyn Tagged, 4> = CallbackRegistry::new();
        let tags: [&dyn Tagged; 4] = [&C, &A, &D, &B];
        for tag in tags {
            registry.register(tag, FilterMask::MATCH_ALL).unwrap();
        }

        let log = CallLog::new();
        let invoked = registry.dispatch(0x100, |h| log.push(h.tag()));

        assert_eq!(invoked, 4);
        assert_eq!(log.snapshot().as_slice(), &[3, 1, 4, 2]);
    }

    #[test]
    fn overflow_leaves_registry_unchanged() {
        let mut registry: CallbackRegistry<'_, dyn Tagged, 2> = CallbackRegistry::new();
        registry.register(&A, FilterMask::MATCH_ALL).unwrap();
        registry.register(&B, FilterMask::new(0x0F)).unwrap();
        assert!(registry.is_full());

        assert_eq!(
            registry.register(&C, FilterMask::MATCH_ALL),
            Err(BusError::CallbackCapacityExceeded)
        );

        assert_eq!(registry.len(), 2);
        let tags: heapless::Vec<u8, 2> = registry.iter().map(|e| e.handler().tag()).collect();
        assert_eq!(tags.as_slice(), &[1, 2]);
        assert_eq!(registry.iter().nth(1).unwrap().mask(), FilterMask::new(0x0F));
    }

    #[test]
    fn dispatch_skips_non_matching_masks() {
        let mut registry: CallbackRegistry<'_, dyn Tagged, 4> = CallbackRegistry::new();
        registry.register(&A, FilterMask::new(0x3F)).unwrap();
        registry.register(&B, FilterMask::new(0x8F)).unwrap();
        registry.register(&C, FilterMask::MATCH_ALL).unwrap();

        let log = CallLog::new();
        let invoked = registry.dispatch(0x38, |h| log.push(h.tag()));

        assert_eq!(invoked, 2);
        assert_eq!(log.snapshot().as_slice(), &[1, 3]);
    }

    #[test]
    fn empty_registry_invokes_nothing() {
        let registry: CallbackRegistry<'_, dyn Tagged, 4> = CallbackRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(0x38, |_| panic!("no callbacks registered")), 0);
    }
}
