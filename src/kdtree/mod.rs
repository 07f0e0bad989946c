//! Nearest-neighbor tree over up to three integer dimensions
//!
//! Built once per query batch from an owned point list and never updated
//! incrementally. Construction splits at the median of the current axis,
//! so the tree is balanced regardless of input order or duplicate keys.
//!
//! Used for boundary feathering (2-D), palette matching (3-D, RGB) and
//! Voronoi segmentation (2-D).

/// Input point; unused dimensions should be 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdPoint {
    pub pos: [i32; 3],
    /// Payload (color, palette index, seed id)
    pub value: u32,
}

impl KdPoint {
    pub fn new2(x: i32, y: i32, value: u32) -> Self {
        Self {
            pos: [x, y, 0],
            value,
        }
    }

    pub fn new3(x: i32, y: i32, z: i32, value: u32) -> Self {
        Self {
            pos: [x, y, z],
            value,
        }
    }
}

/// Result of a nearest query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nearest {
    pub point: KdPoint,
    /// Squared Euclidean distance to the query
    pub dist2: i64,
}

#[derive(Debug, Clone)]
struct Node {
    point: KdPoint,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<Node>,
    root: Option<usize>,
    dims: usize,
}

impl KdTree {
    /// Build over `points`, splitting on the first `dims` coordinates (1..=3)
    pub fn build(mut points: Vec<KdPoint>, dims: usize) -> Self {
        let dims = dims.clamp(1, 3);
        let mut tree = Self {
            nodes: Vec::with_capacity(points.len()),
            root: None,
            dims,
        };
        tree.root = tree.build_node(&mut points, 0);
        tree
    }

    fn build_node(&mut self, points: &mut [KdPoint], depth: usize) -> Option<usize> {
        if points.is_empty() {
            return None;
        }

        let axis = depth % self.dims;
        let mid = points.len() / 2;
        points.select_nth_unstable_by_key(mid, |p| p.pos[axis]);

        let index = self.nodes.len();
        self.nodes.push(Node {
            point: points[mid],
            axis,
            left: None,
            right: None,
        });

        let (lower, rest) = points.split_at_mut(mid);
        let left = self.build_node(lower, depth + 1);
        let right = self.build_node(&mut rest[1..], depth + 1);

        let node = &mut self.nodes[index];
        node.left = left;
        node.right = right;
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn dist2(&self, a: &[i32; 3], b: &[i32; 3]) -> i64 {
        (0..self.dims)
            .map(|i| {
                let d = a[i] as i64 - b[i] as i64;
                d * d
            })
            .sum()
    }

    /// Closest point to `query`; `None` only for an empty tree
    pub fn nearest(&self, query: [i32; 3]) -> Option<Nearest> {
        let root = self.root?;
        let mut best = Nearest {
            point: self.nodes[root].point,
            dist2: i64::MAX,
        };
        self.search(root, &query, &mut best);
        Some(best)
    }

    fn search(&self, index: usize, query: &[i32; 3], best: &mut Nearest) {
        let node = &self.nodes[index];

        let d2 = self.dist2(&node.point.pos, query);
        if d2 < best.dist2 {
            *best = Nearest {
                point: node.point,
                dist2: d2,
            };
            if d2 == 0 {
                return;
            }
        }

        let diff = query[node.axis] as i64 - node.point.pos[node.axis] as i64;
        let (near, far) = if diff < 0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, query, best);
        }
        if let Some(far) = far {
            if diff * diff < best.dist2 {
                self.search(far, query, best);
            }
        }
    }
}
