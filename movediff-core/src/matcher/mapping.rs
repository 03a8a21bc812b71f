//! Index-level mapping between two forests.

/// One-to-one partial mapping between source and destination forest indices.
#[derive(Clone, Debug, Default)]
pub struct ForestMapping {
    src: Vec<Option<usize>>,
    dst: Vec<Option<usize>>,
    len: usize,
}

impl ForestMapping {
    pub fn new(src_len: usize, dst_len: usize) -> Self {
        Self {
            src: vec![None; src_len],
            dst: vec![None; dst_len],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dst_of(&self, s: usize) -> Option<usize> {
        self.src[s]
    }

    pub fn src_of(&self, d: usize) -> Option<usize> {
        self.dst[d]
    }

    pub fn is_src_mapped(&self, s: usize) -> bool {
        self.src[s].is_some()
    }

    pub fn is_dst_mapped(&self, d: usize) -> bool {
        self.dst[d].is_some()
    }

    /// Record a pair. Returns false and leaves the mapping untouched when
    /// either side is already taken.
    pub fn link(&mut self, s: usize, d: usize) -> bool {
        if self.src[s].is_some() || self.dst[d].is_some() {
            return false;
        }
        self.src[s] = Some(d);
        self.dst[d] = Some(s);
        self.len += 1;
        true
    }

    /// All pairs in source index order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.src
            .iter()
            .enumerate()
            .filter_map(|(s, d)| d.map(|d| (s, d)))
    }
}
