//! Undirected graph linking fragments that touch across brick faces.
//!
//! Vertices wrap [`CellId`] handles into a [`CelpList`](crate::CelpList).
//! Each edge counts the voxel pairs seen touching; traversal only follows
//! edges whose count reaches the configured minimum contact.


use hashbrown::HashMap;

use crate::cell::CellId;

#[derive(Debug, Clone)]
struct Vertex {
    cell: CellId,
    /// (neighbor vertex, contact count)
    edges: Vec<(usize, u32)>,
}

#[derive(Debug, Clone)]
pub struct CellGraph {
    vertices: Vec<Vertex>,
    lookup: HashMap<CellId, usize>,
    visited: Vec<bool>,
    edge_count: usize,
    min_contact: u32,
}

impl Default for CellGraph {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CellGraph {
    pub fn new(min_contact: u32) -> Self {
        Self {
            vertices: Vec::new(),
            lookup: HashMap::new(),
            visited: Vec::new(),
            edge_count: 0,
            min_contact: min_contact.max(1),
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.lookup.clear();
        self.visited.clear();
        self.edge_count = 0;
    }

    pub fn set_min_contact(&mut self, min_contact: u32) {
        self.min_contact = min_contact.max(1);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn contains(&self, cell: CellId) -> bool {
        self.lookup.contains_key(&cell)
    }

    /// Cells that have at least one edge, in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = CellId> + '_ {
        self.vertices.iter().map(|v| v.cell)
    }

    fn vertex(&mut self, cell: CellId) -> usize {
        if let Some(&v) = self.lookup.get(&cell) {
            return v;
        }
        let v = self.vertices.len();
        self.vertices.push(Vertex {
            cell,
            edges: Vec::new(),
        });
        self.visited.push(false);
        self.lookup.insert(cell, v);
        v
    }

    /// Record one touching voxel pair between `a` and `b`. Adds the vertices
    /// and the edge on first contact; later calls raise the contact count.
    pub fn link(&mut self, a: CellId, b: CellId) {
        if a == b {
            return;
        }
        let va = self.vertex(a);
        let vb = self.vertex(b);

        if let Some(edge) = self.vertices[va].edges.iter_mut().find(|(n, _)| *n == vb) {
            edge.1 += 1;
            if let Some(back) = self.vertices[vb].edges.iter_mut().find(|(n, _)| *n == va) {
                back.1 += 1;
            }
            return;
        }
        self.vertices[va].edges.push((vb, 1));
        self.vertices[vb].edges.push((va, 1));
        self.edge_count += 1;
    }

    /// Contact count of the edge between two cells.
    pub fn contact(&self, a: CellId, b: CellId) -> Option<u32> {
        let va = *self.lookup.get(&a)?;
        let vb = *self.lookup.get(&b)?;
        self.vertices[va]
            .edges
            .iter()
            .find(|(n, _)| *n == vb)
            .map(|&(_, c)| c)
    }

    pub fn clear_visited(&mut self) {
        self.visited.fill(false);
    }

    /// False for cells that are not in the graph.
    pub fn visited(&self, cell: CellId) -> bool {
        self.lookup.get(&cell).is_some_and(|&v| self.visited[v])
    }

    /// Collect the cells connected to `seed` into `out`, seed first, marking
    /// each visited. At most `branch_cap` cells are collected; vertices past
    /// the cap stay unvisited and can seed their own traversal later.
    ///
    /// Returns true when more than one cell was collected. A seed absent from
    /// the graph or already visited collects nothing and returns false.
    pub fn linked_comps(&mut self, seed: CellId, out: &mut Vec<CellId>, branch_cap: usize) -> bool {
        let Some(&start) = self.lookup.get(&seed) else {
            return false;
        };
        if self.visited[start] {
            return false;
        }

        let cap = branch_cap.max(1);
        let base = out.len();
        let mut stack = vec![start];
        self.visited[start] = true;
        out.push(seed);

        while let Some(v) = stack.pop() {
            for &(n, contact) in &self.vertices[v].edges {
                if out.len() - base >= cap {
                    return cap > 1;
                }
                if contact < self.min_contact || self.visited[n] {
                    continue;
                }
                self.visited[n] = true;
                out.push(self.vertices[n].cell);
                stack.push(n);
            }
        }
        out.len() - base > 1
    }
}
