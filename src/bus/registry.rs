use crate::bus::{BusError, SlotId};

/// Maps physical bus identities onto a fixed set of slots.
///
/// The layout (which identity lives in which slot) is fixed when the registry is
/// created; [`bind`](Self::bind) marks a slot as configured. Lookups never lock, so
/// [`resolve`](Self::resolve) is usable from interrupt and task context alike.
///
/// `N` is the number of slots.
pub struct BusRegistry<I, const N: usize>
where
    bitmaps::BitsImpl<N>: bitmaps::Bits,
{
    layout: [I; N],
    bound: bitmaps::Bitmap<N>,
}

impl<I, const N: usize> core::fmt::Debug for BusRegistry<I, N>
where
    bitmaps::BitsImpl<N>: bitmaps::Bits,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BusRegistry")
            .field("slots", &N)
            .field("bound", &self.bound.len())
            .finish_non_exhaustive()
    }
}

impl<I: Copy + Eq, const N: usize> BusRegistry<I, N>
where
    bitmaps::BitsImpl<N>: bitmaps::Bits,
{
    /// Creates a registry with every slot unbound.
    ///
    /// Fails with [`BusError::InvalidBus`] if the layout names the same identity twice.
    pub fn new(layout: [I; N]) -> Result<Self, BusError> {
        for (i, a) in layout.iter().enumerate() {
            if layout[i + 1..].contains(a) {
                return Err(BusError::InvalidBus);
            }
        }

        Ok(Self {
            layout,
            bound: bitmaps::Bitmap::new(),
        })
    }

    /// Finds the slot reserved for `identity`, whether or not it is configured.
    pub fn position(&self, identity: I) -> Option<SlotId> {
        self.layout
            .iter()
            .position(|id| *id == identity)
            .map(SlotId::new)
    }

    /// Resolves a configured bus.
    pub fn resolve(&self, identity: I) -> Result<SlotId, BusError> {
        match self.position(identity) {
            Some(slot) if self.is_bound(slot) => Ok(slot),
            _ => Err(BusError::InvalidBus),
        }
    }

    /// Identity of a configured slot.
    pub fn identity(&self, slot: SlotId) -> Option<I> {
        self.is_bound(slot).then(|| self.layout[slot.index()])
    }

    pub fn is_bound(&self, slot: SlotId) -> bool {
        self.bound.get(slot.index())
    }

    /// Number of configured slots.
    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    pub(crate) fn bind(&mut self, slot: SlotId) {
        self.bound.set(slot.index(), true);
    }
}
