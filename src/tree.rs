//! Activity tree: per-process roots with title-segment children
//!
//! The forest is an arena. Nodes refer to each other through [`NodeId`]
//! indices; the parent link is a plain index used for upward traversal and
//! is never serialized. Nodes are only ever appended, so an id handed out
//! by a forest stays valid for the lifetime of that forest.

use chrono::{DateTime, Local};

/// Index of a node inside an [`ActivityForest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A process (at root level) or a window-title segment (below it)
#[derive(Debug, Clone)]
pub struct ActivityNode {
    name: String,
    cumulative_seconds: u64,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    first_seen: DateTime<Local>,
}

impl ActivityNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seconds credited to this node (never decreases while tracking)
    pub fn cumulative_seconds(&self) -> u64 {
        self.cumulative_seconds
    }

    /// Children in display order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Owning node, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// When this node was first observed
    pub fn first_seen(&self) -> DateTime<Local> {
        self.first_seen
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// All observed processes and their context sub-trees
#[derive(Debug, Clone, Default)]
pub struct ActivityForest {
    nodes: Vec<ActivityNode>,
    roots: Vec<NodeId>,
}

impl ActivityForest {
    /// Create an empty forest
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes across all trees
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root nodes in display order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Borrow a node by id
    ///
    /// Ids are only produced by this forest, so lookup cannot miss.
    pub fn node(&self, id: NodeId) -> &ActivityNode {
        &self.nodes[id.0]
    }

    /// Find the root node for a process name
    pub fn find_root(&self, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|&id| self.nodes[id.0].name == name)
    }

    /// Find a direct child of `parent` by name
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes[id.0].name == name)
    }

    /// Return the root for `name`, appending a fresh zero-time root if needed
    pub fn find_or_create_root(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.find_root(name) {
            return id;
        }
        self.push_node(None, name, 0, Local::now())
    }

    /// Walk `segments` downward from `root`, creating missing children
    ///
    /// Returns the deepest node reached, which is `root` itself when
    /// `segments` is empty. No counters are touched.
    pub fn merge_path<S: AsRef<str>>(&mut self, root: NodeId, segments: &[S]) -> NodeId {
        let mut current = root;
        for segment in segments {
            let segment = segment.as_ref();
            current = match self.find_child(current, segment) {
                Some(child) => child,
                None => self.push_node(Some(current), segment, 0, Local::now()),
            };
        }
        current
    }

    /// Add `delta` seconds to a single node
    pub fn increment_time(&mut self, id: NodeId, delta: u64) {
        let node = &mut self.nodes[id.0];
        node.cumulative_seconds = node.cumulative_seconds.saturating_add(delta);
    }

    /// Ids from the root down to `id`, inclusive on both ends
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Depth of a node, roots are depth 0
    pub fn depth(&self, id: NodeId) -> usize {
        self.path_from_root(id).len() - 1
    }

    /// Order roots and every child list by time, descending
    ///
    /// Stable: siblings with equal time keep their relative order.
    pub fn sort_descending_by_time(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        self.sort_ids(&mut roots);
        self.roots = roots;

        for index in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[index].children);
            self.sort_ids(&mut children);
            self.nodes[index].children = children;
        }
    }

    fn sort_ids(&self, ids: &mut [NodeId]) {
        ids.sort_by(|a, b| {
            self.nodes[b.0]
                .cumulative_seconds
                .cmp(&self.nodes[a.0].cumulative_seconds)
        });
    }

    /// Attach a node with known state, as done when rebuilding from disk
    ///
    /// If `parent` already has a child (or the forest a root) with the same
    /// name, the time is folded into that node and its id returned, so sibling
    /// names stay unique even for hand-edited files.
    pub fn attach(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        cumulative_seconds: u64,
        first_seen: DateTime<Local>,
    ) -> NodeId {
        let existing = match parent {
            Some(parent) => self.find_child(parent, name),
            None => self.find_root(name),
        };
        match existing {
            Some(id) => {
                let node = &mut self.nodes[id.0];
                node.cumulative_seconds = node.cumulative_seconds.saturating_add(cumulative_seconds);
                node.first_seen = node.first_seen.min(first_seen);
                id
            }
            None => self.push_node(parent, name, cumulative_seconds, first_seen),
        }
    }

    fn push_node(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        cumulative_seconds: u64,
        first_seen: DateTime<Local>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ActivityNode {
            name: name.to_string(),
            cumulative_seconds,
            children: Vec::new(),
            parent,
            first_seen,
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_names(forest: &ActivityForest, id: NodeId) -> Vec<&str> {
        forest
            .node(id)
            .children()
            .iter()
            .map(|&c| forest.node(c).name())
            .collect()
    }

    #[test]
    fn test_find_or_create_root_is_idempotent() {
        let mut forest = ActivityForest::new();
        let a = forest.find_or_create_root("chrome");
        let b = forest.find_or_create_root("chrome");
        assert_eq!(a, b);
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.node(a).cumulative_seconds(), 0);
        assert!(forest.node(a).is_root());
    }

    #[test]
    fn test_roots_append_in_observation_order() {
        let mut forest = ActivityForest::new();
        forest.find_or_create_root("code");
        forest.find_or_create_root("firefox");
        forest.find_or_create_root("code");

        let names: Vec<_> = forest
            .roots()
            .iter()
            .map(|&id| forest.node(id).name())
            .collect();
        assert_eq!(names, vec!["code", "firefox"]);
    }

    #[test]
    fn test_merge_path_empty_returns_root() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("term");
        let empty: [&str; 0] = [];
        assert_eq!(forest.merge_path(root, &empty), root);
        assert_eq!(forest.node_count(), 1);
    }

    #[test]
    fn test_merge_path_creates_chain() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("firefox");
        let leaf = forest.merge_path(root, &["GitHub", "Pull Requests"]);

        assert_eq!(forest.node(leaf).name(), "Pull Requests");
        assert_eq!(forest.depth(leaf), 2);
        assert_eq!(child_names(&forest, root), vec!["GitHub"]);
        assert_eq!(forest.node(leaf).cumulative_seconds(), 0);
    }

    #[test]
    fn test_merge_path_twice_creates_no_duplicates() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("firefox");
        let first = forest.merge_path(root, &["GitHub", "Issues"]);
        let second = forest.merge_path(root, &["GitHub", "Issues"]);

        assert_eq!(first, second);
        assert_eq!(forest.node_count(), 3);
        assert_eq!(child_names(&forest, root), vec!["GitHub"]);
    }

    #[test]
    fn test_merge_path_branches_at_divergence() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("code");
        forest.merge_path(root, &["main.rs", "crate"]);
        forest.merge_path(root, &["lib.rs", "crate"]);

        assert_eq!(child_names(&forest, root), vec!["main.rs", "lib.rs"]);
        assert_eq!(forest.node_count(), 5);
    }

    #[test]
    fn test_increment_time_touches_only_target() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("code");
        let leaf = forest.merge_path(root, &["main.rs"]);

        forest.increment_time(leaf, 5);

        assert_eq!(forest.node(leaf).cumulative_seconds(), 5);
        assert_eq!(forest.node(root).cumulative_seconds(), 0);
    }

    #[test]
    fn test_increment_time_saturates() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("code");
        forest.increment_time(root, u64::MAX);
        forest.increment_time(root, 1);
        assert_eq!(forest.node(root).cumulative_seconds(), u64::MAX);
    }

    #[test]
    fn test_path_from_root_follows_parent_links() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("code");
        let leaf = forest.merge_path(root, &["a", "b", "c"]);

        let names: Vec<_> = forest
            .path_from_root(leaf)
            .into_iter()
            .map(|id| forest.node(id).name())
            .collect();
        assert_eq!(names, vec!["code", "a", "b", "c"]);
    }

    #[test]
    fn test_sort_descending_is_stable() {
        let mut forest = ActivityForest::new();
        let root = forest.find_or_create_root("code");
        let a = forest.merge_path(root, &["a"]);
        let b = forest.merge_path(root, &["b"]);
        let c = forest.merge_path(root, &["c"]);
        let d = forest.merge_path(root, &["d"]);
        forest.increment_time(a, 1);
        forest.increment_time(b, 3);
        forest.increment_time(c, 1);
        forest.increment_time(d, 3);

        forest.sort_descending_by_time();

        assert_eq!(child_names(&forest, root), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_sort_descending_orders_roots_and_nested_levels() {
        let mut forest = ActivityForest::new();
        let slow = forest.find_or_create_root("slow");
        let fast = forest.find_or_create_root("fast");
        forest.increment_time(fast, 10);
        forest.increment_time(slow, 2);
        let x = forest.merge_path(fast, &["page", "x"]);
        let y = forest.merge_path(fast, &["page", "y"]);
        forest.increment_time(y, 4);
        forest.increment_time(x, 1);

        forest.sort_descending_by_time();

        assert_eq!(forest.roots(), &[fast, slow]);
        let page = forest.find_child(fast, "page").unwrap();
        assert_eq!(child_names(&forest, page), vec!["y", "x"]);
    }

    #[test]
    fn test_attach_folds_duplicate_siblings() {
        let mut forest = ActivityForest::new();
        let now = Local::now();
        let earlier = now - chrono::Duration::hours(1);
        let first = forest.attach(None, "code", 5, now);
        let second = forest.attach(None, "code", 7, earlier);

        assert_eq!(first, second);
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.node(first).cumulative_seconds(), 12);
        assert_eq!(forest.node(first).first_seen(), earlier);
    }

    #[test]
    fn test_attach_sets_parent() {
        let mut forest = ActivityForest::new();
        let now = Local::now();
        let root = forest.attach(None, "code", 5, now);
        let child = forest.attach(Some(root), "main.rs", 2, now);

        assert_eq!(forest.node(child).parent(), Some(root));
        assert_eq!(forest.node(root).children(), &[child]);
    }
}
