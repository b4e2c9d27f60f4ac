/// Working set of match targets for one pass.
///
/// Built from an immutable snapshot; items never move, so an index handed out
/// by [`Pool::live`] stays valid after other items are taken.
#[derive(Debug, Clone)]
pub struct Pool<'a, T> {
    items: &'a [T],
    live: Vec<bool>,
    remaining: usize,
    shared: bool,
}

impl<'a, T> Pool<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            live: vec![true; items.len()],
            remaining: items.len(),
            shared: false,
        }
    }

    /// A pool whose targets can be matched by any number of candidates.
    /// `take` never retires anything.
    pub fn shared(items: &'a [T]) -> Self {
        Self {
            shared: true,
            ..Self::new(items)
        }
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn get(&self, idx: usize) -> &'a T {
        &self.items[idx]
    }

    pub fn is_live(&self, idx: usize) -> bool {
        self.live.get(idx).copied().unwrap_or(false)
    }

    /// Remove a target from further consideration. Returns `false` if it was
    /// already taken.
    pub fn take(&mut self, idx: usize) -> bool {
        if self.shared {
            return self.is_live(idx);
        }
        match self.live.get_mut(idx) {
            Some(flag) if *flag => {
                *flag = false;
                self.remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Live targets in input order.
    pub fn live(&self) -> impl Iterator<Item = (usize, &'a T)> + '_ {
        let items = self.items;
        self.live
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(move |(i, _)| (i, &items[i]))
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}
