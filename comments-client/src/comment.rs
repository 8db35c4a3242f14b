use anyhow::Context;

use crate::api::{self, CommentId, CommentRecord, Time};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentNode {
    pub id: CommentId,
    pub text: String,
    pub author: String,
    pub date: Time,
    pub likes: i64,
    pub image_url: Option<String>,

    /// Number of ancestors, 0 for top-level comments
    pub depth: u32,

    pub parent_id: Option<CommentId>,

    /// Child comments, newest first
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn can_reply(&self) -> bool {
        api::can_reply_at(self.depth)
    }

    /// Number of nodes below this one, at any depth
    pub fn descendant_count(&self) -> usize {
        self.replies
            .iter()
            .map(|r| 1 + r.descendant_count())
            .sum()
    }

    /// Pre-order walk of this node and its subtree
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn find_in<'a>(comments: &'a [CommentNode], id: CommentId) -> Option<&'a CommentNode> {
        for c in comments {
            if c.id == id {
                return Some(c);
            }
            if let Some(res) = CommentNode::find_in(&c.replies, id) {
                return Some(res);
            }
        }
        None
    }

    pub fn find_in_mut<'a>(
        comments: &'a mut [CommentNode],
        id: CommentId,
    ) -> Option<&'a mut CommentNode> {
        for c in comments.iter_mut() {
            if c.id == id {
                return Some(c);
            }
            if let Some(res) = CommentNode::find_in_mut(&mut c.replies, id) {
                return Some(res);
            }
        }
        None
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a CommentNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a CommentNode;

    fn next(&mut self) -> Option<&'a CommentNode> {
        let n = self.stack.pop()?;
        self.stack.extend(n.replies.iter().rev());
        Some(n)
    }
}

impl TryFrom<CommentRecord> for CommentNode {
    type Error = anyhow::Error;

    fn try_from(r: CommentRecord) -> anyhow::Result<CommentNode> {
        decode(r, None)
    }
}

/// Nested replies that do not name their parent get the enclosing comment
fn decode(r: CommentRecord, enclosing: Option<CommentId>) -> anyhow::Result<CommentNode> {
    let date = chrono::DateTime::parse_from_rfc3339(&r.date)
        .with_context(|| format!("parsing date {:?} of comment {}", r.date, r.id))?
        .with_timezone(&chrono::Utc);
    let image_url = r.image_ref().map(String::from);
    let replies = r
        .replies
        .unwrap_or_default()
        .into_iter()
        .map(|c| decode(c, Some(r.id)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CommentNode {
        id: r.id,
        text: r.text,
        author: r.author,
        date,
        likes: r.likes,
        image_url,
        depth: r.depth.unwrap_or(0),
        parent_id: r.parent_id.or(enclosing),
        replies,
    })
}
