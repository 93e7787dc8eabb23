//! Two pre-allocated containers swapped by index.

/// A front/back pair of containers.
///
/// [`flip`](Self::flip) exchanges the roles of the two containers without
/// moving or reallocating either, so the old front stays readable as the
/// back until the next flip.
#[derive(Debug, Default)]
pub(crate) struct DoubleBuffer<T> {
    buffers: [T; 2],
    front: usize,
}

impl<T> DoubleBuffer<T> {
    pub(crate) fn front(&self) -> &T {
        &self.buffers[self.front]
    }

    pub(crate) fn front_mut(&mut self) -> &mut T {
        &mut self.buffers[self.front]
    }

    pub(crate) fn back(&self) -> &T {
        &self.buffers[self.front ^ 1]
    }

    pub(crate) fn back_mut(&mut self) -> &mut T {
        &mut self.buffers[self.front ^ 1]
    }

    /// Makes the back container the front one.
    pub(crate) const fn flip(&mut self) {
        self.front ^= 1;
    }

    /// Applies `f` to both containers.
    pub(crate) fn for_each_mut(&mut self, f: impl FnMut(&mut T)) {
        self.buffers.iter_mut().for_each(f);
    }
}
