use chrono::Utc;

mod comment;
pub use comment::{CommentId, CommentList, CommentRecord, CommentUpdate, NewComment};

mod error;
pub use error::Error;

pub type Time = chrono::DateTime<Utc>;

/// Deepest level that can still receive replies: roots are at depth 0, so
/// threads can be at most three levels deep.
pub const MAX_REPLY_DEPTH: u32 = 2;

/// Path of the comments collection, relative to the api root
pub const COMMENTS_PATH: &str = "comments/";

pub fn validate_text(text: &str) -> Result<(), Error> {
    if text.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    Ok(())
}

pub fn can_reply_at(depth: u32) -> bool {
    depth < MAX_REPLY_DEPTH
}
