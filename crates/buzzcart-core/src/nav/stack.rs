//! Per-tab history

use super::tag::ViewTag;

/// Ordered tags for one tab; the first element is the anchor
///
/// Once present, the anchor is never removed by `pop` or `remove_all`;
/// only `reset` and `clear` replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabStack {
    tags: Vec<ViewTag>,
}

impl TabStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: ViewTag) {
        self.tags.push(tag);
    }

    /// Remove the top tag. Returns `None` at depth 1 or less.
    pub fn pop(&mut self) -> Option<ViewTag> {
        if self.tags.len() > 1 {
            self.tags.pop()
        } else {
            None
        }
    }

    pub fn top(&self) -> Option<&ViewTag> {
        self.tags.last()
    }

    /// Remove every non-anchor tag matching `pred`, returning them in stack order
    pub fn remove_all<P>(&mut self, mut pred: P) -> Vec<ViewTag>
    where
        P: FnMut(&ViewTag) -> bool,
    {
        if self.tags.len() <= 1 {
            return Vec::new();
        }
        let rest = self.tags.split_off(1);
        let (removed, kept): (Vec<_>, Vec<_>) = rest.into_iter().partition(|t| pred(t));
        self.tags.extend(kept);
        removed
    }

    /// Make the stack `[anchor]`, returning every other tag that was on it
    pub fn reset(&mut self, anchor: ViewTag) -> Vec<ViewTag> {
        let old = std::mem::replace(&mut self.tags, vec![anchor.clone()]);
        old.into_iter().filter(|t| *t != anchor).collect()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &ViewTag) -> bool {
        self.tags.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewTag> {
        self.tags.iter()
    }

    pub fn first(&self) -> Option<&ViewTag> {
        self.tags.first()
    }
}
