use std::collections::HashSet;

use anyhow::anyhow;

use crate::{
    api::{CommentId, CommentRecord},
    CommentNode,
};

/// All the comments of a thread, newest root first.
///
/// Ids are unique across the whole forest. Lookups walk depth-first, parents
/// before children, and stop at the first match.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Forest {
    roots: Vec<CommentNode>,
}

impl Forest {
    pub fn new() -> Forest {
        Forest { roots: Vec::new() }
    }

    /// Decode a server listing, refusing it if any id appears twice
    pub fn from_records(records: Vec<CommentRecord>) -> anyhow::Result<Forest> {
        let roots = records
            .into_iter()
            .map(CommentNode::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Forest::from_roots(roots)
    }

    pub fn from_roots(roots: Vec<CommentNode>) -> anyhow::Result<Forest> {
        let mut seen = HashSet::new();
        for c in roots.iter().flat_map(|r| r.walk()) {
            if !seen.insert(c.id) {
                return Err(anyhow!("comment {} appears twice in the thread", c.id));
            }
        }
        Ok(Forest { roots })
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of comments, replies included
    pub fn len(&self) -> usize {
        self.roots.iter().map(|r| 1 + r.descendant_count()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommentNode> {
        self.roots.iter().flat_map(|r| r.walk())
    }

    pub fn find(&self, id: CommentId) -> Option<&CommentNode> {
        CommentNode::find_in(&self.roots, id)
    }

    pub fn contains(&self, id: CommentId) -> bool {
        self.find(id).is_some()
    }

    /// Add a new top-level comment in front of the others
    ///
    /// Returns false and leaves the forest untouched if any comment of `node`'s
    /// subtree is already in the forest.
    pub fn push_root(&mut self, node: CommentNode) -> bool {
        if self.collides(&node) {
            return false;
        }
        self.roots.insert(0, node);
        true
    }

    /// Add `node` as the newest reply of `parent_id`
    ///
    /// `node.depth` is taken as is. Returns false and leaves the forest
    /// untouched if the parent is not there or `node` would duplicate an id.
    pub fn insert_reply(&mut self, parent_id: CommentId, node: CommentNode) -> bool {
        if self.collides(&node) {
            return false;
        }
        match CommentNode::find_in_mut(&mut self.roots, parent_id) {
            Some(parent) => {
                parent.replies.insert(0, node);
                true
            }
            None => false,
        }
    }

    /// Overwrite the contents of the comment with `updated.id`
    ///
    /// Replies, depth and parent of the existing comment are kept, as the
    /// server does not send fresh ones along with an update. Returns false if
    /// there is no such comment.
    pub fn update_node(&mut self, updated: CommentNode) -> bool {
        match CommentNode::find_in_mut(&mut self.roots, updated.id) {
            Some(c) => {
                c.text = updated.text;
                c.author = updated.author;
                c.date = updated.date;
                c.likes = updated.likes;
                c.image_url = updated.image_url;
                true
            }
            None => false,
        }
    }

    /// Remove a comment along with all its replies, returning the removed subtree
    pub fn remove_node(&mut self, id: CommentId) -> Option<CommentNode> {
        remove_from(&mut self.roots, id)
    }

    fn collides(&self, node: &CommentNode) -> bool {
        node.walk().any(|c| self.contains(c.id))
    }
}

fn remove_from(comments: &mut Vec<CommentNode>, id: CommentId) -> Option<CommentNode> {
    if let Some(pos) = comments.iter().position(|c| c.id == id) {
        return Some(comments.remove(pos));
    }
    comments
        .iter_mut()
        .find_map(|c| remove_from(&mut c.replies, id))
}
