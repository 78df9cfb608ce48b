use std::collections::HashMap;

/// Bond-count separation of atom pairs up to three bonds apart.
///
/// Used to pick the 1-2, 1-3 or 1-4 scaling factor of a nonbonded pair.
/// Pairs further apart are unscaled. In rings the shortest path wins.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    separation: HashMap<(usize, usize), u8>,
}

impl Topology {
    /// Builds the separation table from a bond list over `atom_count` atoms.
    pub fn from_bonds(atom_count: usize, bonds: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut neighbors = vec![Vec::new(); atom_count];
        for (i, j) in bonds {
            neighbors[i].push(j);
            neighbors[j].push(i);
        }

        let mut separation = HashMap::new();
        for start in 0..atom_count {
            let mut depth: HashMap<usize, u8> = HashMap::from([(start, 0)]);
            let mut frontier = vec![start];
            for d in 1..=3u8 {
                let mut next = Vec::new();
                for &a in &frontier {
                    for &b in &neighbors[a] {
                        if !depth.contains_key(&b) {
                            depth.insert(b, d);
                            next.push(b);
                        }
                    }
                }
                frontier = next;
            }
            for (b, d) in depth {
                if b > start {
                    separation.insert((start, b), d);
                }
            }
        }
        Self { separation }
    }

    /// `Some(1)` for bonded pairs, `Some(2)` for 1-3 and `Some(3)` for 1-4.
    pub fn separation(&self, i: usize, j: usize) -> Option<u8> {
        let key = if i < j { (i, j) } else { (j, i) };
        self.separation.get(&key).copied()
    }

    /// Scaling factor of the pair for a `[1-2, 1-3, 1-4]` table.
    #[inline]
    pub fn factor(&self, i: usize, j: usize, scale: &[f64; 3]) -> f64 {
        match self.separation(i, j) {
            Some(d) => scale[usize::from(d) - 1],
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_separations() {
        let topo = Topology::from_bonds(5, [(0, 1), (1, 2), (2, 3), (3, 4)]);
        assert_eq!(topo.separation(0, 1), Some(1));
        assert_eq!(topo.separation(2, 0), Some(2));
        assert_eq!(topo.separation(0, 3), Some(3));
        assert_eq!(topo.separation(0, 4), None);
        assert_eq!(topo.separation(3, 3), None);
    }

    #[test]
    fn rings_use_shortest_path() {
        let topo = Topology::from_bonds(4, [(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert_eq!(topo.separation(0, 3), Some(1));
        assert_eq!(topo.separation(0, 2), Some(2));
    }

    #[test]
    fn factor_picks_table_entry() {
        let topo = Topology::from_bonds(5, [(0, 1), (1, 2), (2, 3)]);
        let scale = [0.0, 0.25, 0.5];
        assert_eq!(topo.factor(0, 1, &scale), 0.0);
        assert_eq!(topo.factor(0, 2, &scale), 0.25);
        assert_eq!(topo.factor(3, 0, &scale), 0.5);
        assert_eq!(topo.factor(0, 4, &scale), 1.0);
    }
}
