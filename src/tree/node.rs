use indexmap::IndexMap;
use serde::Serialize;

/// A value in the localization tree: either a translated string or a nested mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocNode {
    Leaf(String),
    Branch(LocalizationTree),
}

impl LocNode {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            LocNode::Leaf(text) => Some(text),
            LocNode::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&LocalizationTree> {
        match self {
            LocNode::Branch(tree) => Some(tree),
            LocNode::Leaf(_) => None,
        }
    }

    /// Turn this node into a mapping, discarding a leaf that occupied the slot.
    fn make_branch(&mut self) -> &mut LocalizationTree {
        if let LocNode::Leaf(_) = self {
            *self = LocNode::Branch(LocalizationTree::new());
        }
        match self {
            LocNode::Branch(tree) => tree,
            LocNode::Leaf(_) => unreachable!("leaf was replaced by a branch"),
        }
    }
}

/// Nested string mapping keyed by path segments, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocalizationTree {
    entries: IndexMap<String, LocNode>,
}

impl LocalizationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `value` at the end of `path`.
    ///
    /// Interior segments reuse an existing mapping or replace whatever else sits
    /// there with a fresh one; the final segment is assigned unconditionally.
    /// The walk is iterative, so path depth is only bounded by memory. JSON
    /// serialization recurses, so writers reject trees deeper than
    /// [`crate::output::MAX_NESTING`].
    pub fn insert<S: AsRef<str>>(&mut self, path: &[S], value: String) {
        let Some((leaf, parents)) = path.split_last() else {
            return;
        };

        let mut node = self;
        for segment in parents {
            node = node
                .entries
                .entry(segment.as_ref().to_string())
                .or_insert_with(|| LocNode::Branch(LocalizationTree::new()))
                .make_branch();
        }

        node.entries
            .insert(leaf.as_ref().to_string(), LocNode::Leaf(value));
    }

    pub fn get(&self, key: &str) -> Option<&LocNode> {
        self.entries.get(key)
    }

    /// Follow `path` from the root.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&LocNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.entries.get(first.as_ref())?;
        for segment in rest {
            node = node.as_branch()?.entries.get(segment.as_ref())?;
        }
        Some(node)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocNode)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of string values anywhere below this mapping.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(tree) = pending.pop() {
            for node in tree.entries.values() {
                match node {
                    LocNode::Leaf(_) => count += 1,
                    LocNode::Branch(child) => pending.push(child),
                }
            }
        }
        count
    }

    /// Mapping levels on the deepest path; a flat mapping of strings is 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((tree, level)) = pending.pop() {
            deepest = deepest.max(level);
            for node in tree.entries.values() {
                if let LocNode::Branch(child) = node {
                    pending.push((child, level + 1));
                }
            }
        }
        deepest
    }

    pub(crate) fn entries_mut(&mut self) -> &mut IndexMap<String, LocNode> {
        &mut self.entries
    }
}

// Flattened teardown so dropping a pathologically deep tree cannot overflow the stack.
impl Drop for LocalizationTree {
    fn drop(&mut self) {
        let mut pending: Vec<LocalizationTree> = Vec::new();
        detach_branches(&mut self.entries, &mut pending);
        while let Some(mut tree) = pending.pop() {
            detach_branches(&mut tree.entries, &mut pending);
        }
    }
}

fn detach_branches(entries: &mut IndexMap<String, LocNode>, pending: &mut Vec<LocalizationTree>) {
    for (_, node) in entries.drain(..) {
        if let LocNode::Branch(child) = node {
            pending.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_insertion() {
        let mut tree = LocalizationTree::new();
        tree.insert(&["A", "B", "1"], "x".to_string());
        tree.insert(&["A", "B", "2"], "y".to_string());
        tree.insert(&["A", "C"], "z".to_string());

        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"A": {"B": {"1": "x", "2": "y"}, "C": "z"}})
        );
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.lookup(&["A", "B", "2"]).and_then(LocNode::as_leaf), Some("y"));
        assert!(tree.lookup(&["A", "missing"]).is_none());
    }

    #[test]
    fn test_empty_path_is_ignored() {
        let mut tree = LocalizationTree::new();
        tree.insert::<&str>(&[], "x".to_string());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_last_write_wins_for_same_path() {
        let mut tree = LocalizationTree::new();
        tree.insert(&["A", "B"], "first".to_string());
        tree.insert(&["A", "C"], "other".to_string());
        tree.insert(&["A", "B"], "second".to_string());

        assert_eq!(tree.lookup(&["A", "B"]).and_then(LocNode::as_leaf), Some("second"));
        assert_eq!(tree.leaf_count(), 2);
        // Position of the first insertion is kept
        let order: Vec<_> = tree.get("A").and_then(LocNode::as_branch).unwrap().keys().collect();
        assert_eq!(order, vec!["B", "C"]);
    }

    #[test]
    fn test_leaf_replaced_by_branch() {
        let mut tree = LocalizationTree::new();
        tree.insert(&["A", "B"], "leaf".to_string());
        tree.insert(&["A", "B", "C"], "deeper".to_string());

        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"A": {"B": {"C": "deeper"}}})
        );
    }

    #[test]
    fn test_branch_replaced_by_leaf() {
        let mut tree = LocalizationTree::new();
        tree.insert(&["A", "B", "C"], "deeper".to_string());
        tree.insert(&["A", "B"], "leaf".to_string());

        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"A": {"B": "leaf"}})
        );
    }

    #[test]
    fn test_very_deep_path() {
        let path: Vec<String> = (0..10_000).map(|i| format!("s{}", i)).collect();
        let mut tree = LocalizationTree::new();
        tree.insert(&path, "bottom".to_string());

        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.depth(), 10_000);
        assert_eq!(tree.lookup(&path).and_then(LocNode::as_leaf), Some("bottom"));
    }

    #[test]
    fn test_depth() {
        let mut tree = LocalizationTree::new();
        assert_eq!(tree.depth(), 1);
        tree.insert(&["A"], "x".to_string());
        tree.insert(&["B", "C", "D"], "y".to_string());
        assert_eq!(tree.depth(), 3);
    }
}
