use std::{
    collections::{HashMap, VecDeque},
    fmt::Debug,
    hash::Hash,
};

/// Compute topological order of nodes using BFS.
///
/// Return node list in order and their levels. If the graph contains a cycle,
/// the nodes that could not be ordered are returned as the error.
pub fn topo<Node: Copy + Eq + Hash + Debug>(
    nodes: impl Iterator<Item = Node>,
    edges: impl Iterator<Item = (Node, Node)>,
) -> Result<Vec<(Node, i32)>, Vec<Node>> {
    let mut succ: HashMap<Node, Vec<Node>> = HashMap::default();
    let mut degree_level: HashMap<Node, (i32, i32)> = HashMap::default();
    for (from, to) in edges {
        succ.entry(from).or_default().push(to);
        degree_level.entry(to).or_default().0 += 1;
    }
    let mut que: VecDeque<Node> = VecDeque::new();
    let mut levels = Vec::new();
    for node in nodes {
        let entry = degree_level.entry(node).or_default();
        if entry.0 == 0 {
            que.push_back(node)
        }
    }
    while let Some(head) = que.pop_front() {
        let level = degree_level.remove(&head).map(|o| o.1).unwrap_or(0);
        levels.push((head, level));
        let Some(tos) = succ.get(&head) else { continue };
        for to in tos {
            if let Some(entry) = degree_level.get_mut(to) {
                entry.0 -= 1;
                entry.1 = entry.1.max(level + 1);
                if entry.0 == 0 {
                    que.push_back(*to);
                }
            }
        }
    }

    if !degree_level.is_empty() {
        return Err(degree_level.into_keys().collect());
    }

    Ok(levels)
}

/// Evaluation order of a set of runnable nodes.
#[derive(Debug, Default, Clone)]
pub struct PropOrder {
    pub(crate) order: Vec<usize>,
    /// Length of the longest dependency chain.
    pub(crate) depth: i32,
}

impl PropOrder {
    pub fn order(&self) -> &[usize] {
        &self.order
    }
    pub fn depth(&self) -> i32 {
        self.depth
    }
}

/// Collects runnable nodes together with the signals they read and write, and
/// orders them so that every writer of a signal runs before its readers.
///
/// Nodes that only write a signal without reading anything (e.g. the output
/// of a latch) start a new chain, which is how sequential elements break
/// feedback loops.
#[derive(Debug, Default)]
pub struct PropOrderBuilder {
    reads: Vec<Vec<usize>>,
    writes: Vec<Vec<usize>>,
}

impl PropOrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a runnable node, returning its id.
    pub fn add_node(
        &mut self,
        reads: impl IntoIterator<Item = usize>,
        writes: impl IntoIterator<Item = usize>,
    ) -> usize {
        self.reads.push(reads.into_iter().collect());
        self.writes.push(writes.into_iter().collect());
        self.reads.len() - 1
    }
    pub fn len(&self) -> usize {
        self.reads.len()
    }
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
    /// Compute topological order of nodes. On failure the ids of the nodes
    /// involved in (or blocked by) a cycle are returned.
    pub fn build(self) -> Result<PropOrder, Vec<usize>> {
        let mut writers: HashMap<usize, Vec<usize>> = HashMap::default();
        for (node, signals) in self.writes.iter().enumerate() {
            for signal in signals {
                writers.entry(*signal).or_default().push(node);
            }
        }
        let writers = &writers;
        let edges = self.reads.iter().enumerate().flat_map(move |(node, signals)| {
            signals
                .iter()
                .filter_map(move |s| writers.get(s))
                .flatten()
                .map(move |from| (*from, node))
        });

        let levels = topo(0..self.reads.len(), edges).map_err(|mut rest| {
            rest.sort_unstable();
            rest
        })?;
        let depth = levels.iter().map(|(_, l)| *l).max().unwrap_or(0);
        Ok(PropOrder {
            order: levels.into_iter().map(|(n, _)| n).collect(),
            depth,
        })
    }
}
