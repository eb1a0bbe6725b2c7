use crate::config::KeyRewriteRule;
use crate::error::{LocresError, Result};
use crate::tree::{LocalizationRow, LocalizationTree};
use regex::Regex;
use std::borrow::Cow;

pub const KEY_SEPARATOR: char = '/';

enum Rewrite {
    Literal { find: String, replace: String },
    Pattern { regex: Regex, replace: String },
}

/// Ordered substring rewrites applied to raw keys before they are split.
#[derive(Default)]
pub struct KeyRewriter {
    rewrites: Vec<Rewrite>,
}

impl KeyRewriter {
    pub fn new(rules: &[KeyRewriteRule]) -> Result<Self> {
        let rewrites = rules
            .iter()
            .map(|rule| {
                if rule.regex {
                    let regex = Regex::new(&rule.find).map_err(|e| LocresError::Config {
                        message: format!("Invalid key rewrite pattern '{}': {}", rule.find, e),
                    })?;
                    Ok(Rewrite::Pattern {
                        regex,
                        replace: rule.replace.clone(),
                    })
                } else {
                    Ok(Rewrite::Literal {
                        find: rule.find.clone(),
                        replace: rule.replace.clone(),
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rewrites })
    }

    pub fn is_empty(&self) -> bool {
        self.rewrites.is_empty()
    }

    pub fn apply<'a>(&self, key: &'a str) -> Cow<'a, str> {
        let mut key = Cow::Borrowed(key);
        for rewrite in &self.rewrites {
            match rewrite {
                Rewrite::Literal { find, replace } => {
                    if !find.is_empty() && key.contains(find.as_str()) {
                        key = Cow::Owned(key.replace(find.as_str(), replace));
                    }
                }
                Rewrite::Pattern { regex, replace } => {
                    if let Cow::Owned(rewritten) = regex.replace_all(&key, replace.as_str()) {
                        key = Cow::Owned(rewritten);
                    }
                }
            }
        }
        key
    }
}

/// Accumulates rows into a [`LocalizationTree`].
pub struct KeyTreeBuilder {
    rewriter: KeyRewriter,
    tree: LocalizationTree,
    rows: usize,
}

impl KeyTreeBuilder {
    pub fn new(rewriter: KeyRewriter) -> Self {
        Self {
            rewriter,
            tree: LocalizationTree::new(),
            rows: 0,
        }
    }

    pub fn push(&mut self, key: &str, value: String) {
        let key = self.rewriter.apply(key);
        let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        self.tree.insert(&segments, value);
        self.rows += 1;
    }

    pub fn push_row(&mut self, row: LocalizationRow) {
        self.push(&row.key, row.value);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> LocalizationTree {
        self.tree
    }
}

impl Default for KeyTreeBuilder {
    fn default() -> Self {
        Self::new(KeyRewriter::default())
    }
}

/// Build a tree from `rows` without any key rewriting.
pub fn build_tree<I>(rows: I) -> LocalizationTree
where
    I: IntoIterator<Item = LocalizationRow>,
{
    let mut builder = KeyTreeBuilder::default();
    for row in rows {
        builder.push_row(row);
    }
    builder.finish()
}
