pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;

/// Set of visited heap-node pairs used to stop structural walks over cyclic
/// lazy data. Keys are raw node addresses; nothing is dereferenced through them.
#[derive(Debug, Default)]
pub struct VisitedPairs {
    seen: FastHashSet<(usize, usize)>,
}

impl VisitedPairs {
    /// Returns `false` when the pair was already being compared.
    #[inline]
    pub fn enter(&mut self, left: usize, right: usize) -> bool {
        if left == 0 || right == 0 {
            return true;
        }
        self.seen.insert((left, right))
    }
}

/// Single-address variant of [`VisitedPairs`], used while rendering.
#[derive(Debug, Default)]
pub struct VisitedNodes {
    seen: FastHashSet<usize>,
}

impl VisitedNodes {
    #[inline]
    pub fn enter(&mut self, node: usize) -> bool {
        node == 0 || self.seen.insert(node)
    }

    #[inline]
    pub fn leave(&mut self, node: usize) {
        self.seen.remove(&node);
    }
}
