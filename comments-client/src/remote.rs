use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{CommentId, CommentRecord, CommentUpdate, NewComment};

/// The server side of a comment thread
#[async_trait]
pub trait Remote: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<CommentRecord>>;
    async fn create(&self, c: NewComment) -> anyhow::Result<CommentRecord>;
    async fn update(&self, id: CommentId, u: CommentUpdate) -> anyhow::Result<CommentRecord>;

    /// Replies of the comment are deleted along with it
    async fn delete(&self, id: CommentId) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: Remote + ?Sized> Remote for Arc<T> {
    async fn list(&self) -> anyhow::Result<Vec<CommentRecord>> {
        (**self).list().await
    }

    async fn create(&self, c: NewComment) -> anyhow::Result<CommentRecord> {
        (**self).create(c).await
    }

    async fn update(&self, id: CommentId, u: CommentUpdate) -> anyhow::Result<CommentRecord> {
        (**self).update(id, u).await
    }

    async fn delete(&self, id: CommentId) -> anyhow::Result<()> {
        (**self).delete(id).await
    }
}
