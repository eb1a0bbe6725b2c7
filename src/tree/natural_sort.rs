use crate::tree::{LocNode, LocalizationTree};
use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Run<'a> {
    Text(&'a str),
    Digits(&'a str),
}

/// Split `key` into maximal runs of ASCII digits and everything else.
fn runs(key: &str) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut digits = None;

    for (index, c) in key.char_indices() {
        let is_digit = c.is_ascii_digit();
        match digits {
            Some(current) if current != is_digit => {
                runs.push(make_run(&key[start..index], current));
                start = index;
            }
            _ => {}
        }
        digits = Some(is_digit);
    }
    if let Some(current) = digits {
        runs.push(make_run(&key[start..], current));
    }
    runs
}

fn make_run(text: &str, digits: bool) -> Run<'_> {
    if digits {
        Run::Digits(text)
    } else {
        Run::Text(text)
    }
}

fn compare_runs(a: &Run<'_>, b: &Run<'_>) -> Ordering {
    match (a, b) {
        (Run::Digits(a), Run::Digits(b)) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (Run::Text(a), Run::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        // Numbers sort ahead of text at the same position
        (Run::Digits(_), Run::Text(_)) => Ordering::Less,
        (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
    }
}

/// Case-insensitive natural ordering: digit runs compare by numeric value,
/// so `item2` sorts before `item10`.
///
/// Keys that differ only in case or in leading zeros compare equal; callers
/// that need a total order rely on a stable sort to keep their input order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = runs(a);
    let right = runs(b);

    for (a, b) in left.iter().zip(right.iter()) {
        let ordering = compare_runs(a, b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

/// Reorder the direct children of every top-level mapping.
///
/// Top-level keys and anything deeper than one level keep insertion order.
pub fn sort_children(tree: &mut LocalizationTree) {
    for node in tree.entries_mut().values_mut() {
        if let LocNode::Branch(child) = node {
            child
                .entries_mut()
                .sort_by(|a, _, b, _| natural_cmp(a, b));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(keys: &[&str]) -> Vec<String> {
        let mut keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        keys.sort_by(|a, b| natural_cmp(a, b));
        keys
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(natural_cmp("item2", "item10"), Ordering::Less);
        assert_eq!(natural_cmp("item10", "item2"), Ordering::Greater);
        assert_eq!(
            sorted(&["item10", "item2", "item1", "item01a", "item"]),
            vec!["item", "item1", "item01a", "item2", "item10"]
        );
    }

    #[test]
    fn test_case_insensitive_equivalence() {
        assert_eq!(natural_cmp("Alpha", "alpha"), Ordering::Equal);
        assert_eq!(natural_cmp("Beta", "alpha"), Ordering::Greater);
        assert_eq!(natural_cmp("007", "7"), Ordering::Equal);
    }

    #[test]
    fn test_large_numbers_do_not_overflow() {
        let big = "99999999999999999999999999999999";
        assert_eq!(natural_cmp(big, &format!("1{}", big)), Ordering::Less);
        assert_eq!(natural_cmp("0", ""), Ordering::Greater);
    }

    #[test]
    fn test_non_ascii_text() {
        assert_eq!(natural_cmp("Élan2", "élan10"), Ordering::Less);
        assert_eq!(runs("a1b"), vec![Run::Text("a"), Run::Digits("1"), Run::Text("b")]);
    }

    fn keys_of(tree: &LocalizationTree, key: &str) -> Vec<String> {
        tree.get(key)
            .and_then(LocNode::as_branch)
            .map(|branch| branch.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_sorts_one_level_only() {
        let mut tree = LocalizationTree::new();
        tree.insert(&["Zeta", "item10"], "a".to_string());
        tree.insert(&["Zeta", "Item2", "z"], "b".to_string());
        tree.insert(&["Zeta", "Item2", "a"], "c".to_string());
        tree.insert(&["Zeta", "item1"], "d".to_string());
        tree.insert(&["Alpha", "b"], "e".to_string());
        tree.insert(&["Alpha", "A"], "f".to_string());
        tree.insert(&["Root"], "g".to_string());

        sort_children(&mut tree);

        let top: Vec<_> = tree.keys().collect();
        assert_eq!(top, vec!["Zeta", "Alpha", "Root"]);
        assert_eq!(keys_of(&tree, "Zeta"), vec!["item1", "Item2", "item10"]);
        assert_eq!(keys_of(&tree, "Alpha"), vec!["A", "b"]);

        let nested = tree
            .lookup(&["Zeta", "Item2"])
            .and_then(LocNode::as_branch)
            .unwrap();
        assert_eq!(nested.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    }

    #[test]
    fn test_sorting_is_idempotent_and_stable() {
        let mut tree = LocalizationTree::new();
        for key in ["b", "B", "a10", "a9", "A9"] {
            tree.insert(&["Group", key], key.to_string());
        }

        sort_children(&mut tree);
        let once = keys_of(&tree, "Group");
        sort_children(&mut tree);

        assert_eq!(once, vec!["a9", "A9", "a10", "b", "B"]);
        assert_eq!(keys_of(&tree, "Group"), once);
    }
}
