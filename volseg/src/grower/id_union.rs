//! Disjoint-set over sparse ids where the largest member represents its set.

use std::hash::Hash;

use hashbrown::HashMap;

#[derive(Debug, Clone)]
pub(crate) struct IdUnion<K> {
    parent: HashMap<K, K>,
}

impl<K> Default for IdUnion<K> {
    fn default() -> Self {
        Self {
            parent: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + Ord> IdUnion<K> {
    pub fn insert(&mut self, k: K) {
        self.parent.entry(k).or_insert(k);
    }

    pub fn contains(&self, k: K) -> bool {
        self.parent.contains_key(&k)
    }

    /// Root of `k`'s set, compressing the path walked. Unknown ids are their
    /// own root.
    pub fn find(&mut self, k: K) -> K {
        let mut root = k;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }

        let mut cur = k;
        while cur != root {
            let Some(next) = self.parent.insert(cur, root) else {
                break;
            };
            cur = next;
        }
        root
    }

    /// Join two sets; the larger root becomes the representative. Returns true
    /// if they were separate.
    pub fn union(&mut self, a: K, b: K) -> bool {
        self.insert(a);
        self.insert(b);
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent.insert(lo, hi);
        true
    }

    /// Map from every non-representative member to its representative.
    pub fn remap(&mut self) -> HashMap<K, K> {
        let keys: Vec<K> = self.parent.keys().copied().collect();
        let mut out = HashMap::new();
        for k in keys {
            let root = self.find(k);
            if root != k {
                out.insert(k, root);
            }
        }
        out
    }

    /// Members grouped by representative, each group sorted ascending, groups
    /// ordered by representative.
    pub fn groups(&mut self) -> Vec<(K, Vec<K>)> {
        let mut keys: Vec<K> = self.parent.keys().copied().collect();
        keys.sort_unstable();
        let mut by_root: std::collections::BTreeMap<K, Vec<K>> = Default::default();
        for k in keys {
            let root = self.find(k);
            by_root.entry(root).or_default().push(k);
        }
        by_root.into_iter().collect()
    }
}
