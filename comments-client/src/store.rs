use parking_lot::Mutex;

use crate::{
    api::{self, CommentId, CommentUpdate, NewComment},
    CommentNode, Forest, Remote,
};

const FETCH_FAILED: &str = "Failed to load comments. Please try again later.";
const ADD_FAILED: &str = "Failed to add comment. Please try again.";
const REPLY_FAILED: &str = "Failed to add reply. Please try again.";
const EDIT_FAILED: &str = "Failed to update comment. Please try again.";
const DELETE_FAILED: &str = "Failed to delete comment. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fetching comments: {0:#}")]
    Fetch(anyhow::Error),

    #[error("submitting comment: {0:#}")]
    Submit(anyhow::Error),

    #[error("deleting comment: {0:#}")]
    Delete(anyhow::Error),
}

impl Error {
    pub fn cause(&self) -> &anyhow::Error {
        match self {
            Error::Fetch(e) | Error::Submit(e) | Error::Delete(e) => e,
        }
    }

    /// The api error behind this failure, if it is one
    pub fn api_error(&self) -> Option<&api::Error> {
        self.cause().downcast_ref()
    }
}

#[derive(Debug, Default)]
struct State {
    forest: Forest,
    last_error: Option<String>,
    loading: bool,
}

/// Local copy of a comment thread, kept in sync with a [`Remote`]
///
/// The forest only changes after the server acknowledged an operation, and
/// then only by the matching local tree edit: no operation besides `refresh`
/// refetches the thread. Operations take `&self` and may be in flight
/// together. Their results are applied in completion order, so operations on
/// distinct comments never lose each other's effects. An edit and a delete of
/// the same comment are not ordered: if the delete lands first the edit is
/// dropped, otherwise the comment is deleted with its edit.
///
/// Every failure is both returned and recorded as the last error, for display
/// in a dismissible banner.
pub struct Store<R> {
    remote: R,
    state: Mutex<State>,
}

impl<R: Remote> Store<R> {
    pub fn new(remote: R) -> Store<R> {
        Store {
            remote,
            state: Mutex::new(State::default()),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Snapshot of the current thread
    pub fn forest(&self) -> Forest {
        self.state.lock().forest.clone()
    }

    /// Look at the current thread without cloning it
    ///
    /// The store is locked while `f` runs: calling back into the store from
    /// `f` deadlocks.
    pub fn with_forest<T>(&self, f: impl FnOnce(&Forest) -> T) -> T {
        f(&self.state.lock().forest)
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().last_error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Replace the local thread with the server's
    ///
    /// On failure the previous thread is kept.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.state.lock().loading = true;
        let res = self.remote.list().await.and_then(Forest::from_records);
        let mut state = self.state.lock();
        state.loading = false;
        match res {
            Ok(forest) => {
                tracing::debug!(num_comments = forest.len(), "refreshed comment thread");
                state.forest = forest;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                drop(state);
                Err(self.fail(Error::Fetch(e), FETCH_FAILED))
            }
        }
    }

    /// Post a new top-level comment, returning the id the server gave it
    ///
    /// The comment counts as added once the server accepted it. If its id is
    /// already in the local thread, the local thread is left as is until the
    /// next `refresh`.
    pub async fn add_root(&self, text: &str) -> Result<CommentId, Error> {
        let new = NewComment::root(String::from(text));
        if let Err(e) = new.validate() {
            return Err(self.fail(Error::Submit(e.into()), ADD_FAILED));
        }
        let node = match self.create(new).await {
            Ok(node) => node,
            Err(e) => return Err(self.fail(Error::Submit(e), ADD_FAILED)),
        };
        let id = node.id;
        if !self.state.lock().forest.push_root(node) {
            tracing::warn!(%id, "server returned a comment id that is already in the thread");
        }
        tracing::debug!(%id, "added comment");
        Ok(id)
    }

    /// Post a reply, returning the id the server gave it
    ///
    /// As with `add_root`, success means the server accepted the reply. When
    /// the parent is not in the local thread (or the id already is), the reply
    /// only shows up after the next `refresh`.
    pub async fn add_reply(&self, parent_id: CommentId, text: &str) -> Result<CommentId, Error> {
        let new = NewComment::reply(parent_id, String::from(text));
        let parent_depth = self.with_forest(|f| f.find(parent_id).map(|p| p.depth));
        let valid = new.validate().and_then(|()| match parent_depth {
            Some(d) if !api::can_reply_at(d) => Err(api::Error::MaxDepthReached),
            _ => Ok(()),
        });
        if let Err(e) = valid {
            return Err(self.fail(Error::Submit(e.into()), REPLY_FAILED));
        }
        let mut node = match self.create(new).await {
            Ok(node) => node,
            Err(e) => return Err(self.fail(Error::Submit(e), REPLY_FAILED)),
        };
        let id = node.id;
        let mut state = self.state.lock();
        // place the reply where it was asked for, whatever the server says
        if let Some(d) = state.forest.find(parent_id).map(|p| p.depth) {
            node.depth = d + 1;
            node.parent_id = Some(parent_id);
        }
        if !state.forest.insert_reply(parent_id, node) {
            tracing::warn!(%id, %parent_id, "could not attach reply to the local thread");
        }
        tracing::debug!(%id, %parent_id, "added reply");
        Ok(id)
    }

    pub async fn edit_node(&self, id: CommentId, text: &str) -> Result<(), Error> {
        let update = CommentUpdate {
            text: String::from(text),
        };
        if let Err(e) = update.validate() {
            return Err(self.fail(Error::Submit(e.into()), EDIT_FAILED));
        }
        let node = match self.remote.update(id, update).await {
            Ok(record) => CommentNode::try_from(record),
            Err(e) => Err(e),
        };
        let node = match node {
            Ok(node) => node,
            Err(e) => return Err(self.fail(Error::Submit(e), EDIT_FAILED)),
        };
        if !self.state.lock().forest.update_node(node) {
            tracing::debug!(%id, "edited comment is no longer in the thread");
        }
        Ok(())
    }

    /// Delete a comment and all its replies
    pub async fn delete_node(&self, id: CommentId) -> Result<(), Error> {
        if let Err(e) = self.remote.delete(id).await {
            return Err(self.fail(Error::Delete(e), DELETE_FAILED));
        }
        match self.state.lock().forest.remove_node(id) {
            Some(removed) => tracing::debug!(
                %id,
                num_replies = removed.descendant_count(),
                "deleted comment"
            ),
            None => tracing::debug!(%id, "deleted comment was not in the thread"),
        }
        Ok(())
    }

    async fn create(&self, new: NewComment) -> anyhow::Result<CommentNode> {
        let record = self.remote.create(new).await?;
        CommentNode::try_from(record)
    }

    fn fail(&self, err: Error, banner: &str) -> Error {
        tracing::error!(?err, "{banner}");
        let banner = match err.api_error() {
            Some(e @ (api::Error::EmptyText | api::Error::MaxDepthReached)) => e.to_string(),
            _ => String::from(banner),
        };
        self.state.lock().last_error = Some(banner);
        err
    }
}
