use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use comments_client::{
    api::{self, CommentId, CommentRecord, CommentUpdate, NewComment},
    store::Error as StoreError,
    Remote, Store,
};
use comments_mock_server::{MockServer, SharedMockServer};
use parking_lot::Mutex;
use tokio::sync::oneshot;

fn run<F: std::future::Future<Output = ()>>(f: F) {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed initializing tokio runtime")
        .block_on(f)
}

fn seeded(texts: &[&str]) -> (SharedMockServer, Vec<CommentId>) {
    let mut server = MockServer::new();
    let ids = texts
        .iter()
        .map(|t| {
            server
                .create(NewComment::root(String::from(*t)))
                .expect("seeding comment")
                .id
        })
        .collect();
    (SharedMockServer::new(server), ids)
}

/// The local thread must match what a fresh load from the server gives
async fn assert_in_sync<R: Remote>(store: &Store<R>, server: &SharedMockServer) {
    let fresh = Store::new(server.clone());
    fresh.refresh().await.expect("refreshing fresh store");
    assert_eq!(store.forest(), fresh.forest());
}

#[test]
fn thread_lifecycle_stays_in_sync() {
    run(async {
        let (server, _) = seeded(&[]);
        let store = Store::new(server.clone());
        store.refresh().await.expect("refreshing");
        assert!(store.forest().is_empty());

        let root = store.add_root("first!").await.expect("adding root");
        let other = store.add_root("second").await.expect("adding root");
        assert_eq!(store.forest().roots()[0].id, other);
        assert_in_sync(&store, &server).await;

        let child = store.add_reply(root, "a reply").await.expect("replying");
        let grandchild = store.add_reply(child, "deeper").await.expect("replying");
        assert_eq!(store.forest().find(grandchild).map(|c| c.depth), Some(2));
        assert_in_sync(&store, &server).await;

        store.edit_node(root, "first, edited").await.expect("editing");
        let f = store.forest();
        let r = f.find(root).expect("finding root");
        assert_eq!(r.text, "first, edited");
        assert_eq!(r.replies.len(), 1);
        assert_eq!(r.replies[0].id, child);
        assert_in_sync(&store, &server).await;

        store.delete_node(child).await.expect("deleting");
        assert!(!store.forest().contains(grandchild));
        assert_eq!(store.forest().len(), 2);
        assert_in_sync(&store, &server).await;
        assert_eq!(store.last_error(), None);
    });
}

#[test]
fn reply_then_delete_root_empties_thread() {
    run(async {
        let (server, ids) = seeded(&["root"]);
        let store = Store::new(server.clone());
        store.refresh().await.expect("refreshing");
        let reply = store.add_reply(ids[0], "reply").await.expect("replying");
        let f = store.forest();
        assert_eq!(f.roots()[0].replies.len(), 1);
        assert_eq!(f.roots()[0].replies[0].id, reply);
        assert_eq!(f.roots()[0].replies[0].depth, 1);

        store.delete_node(ids[0]).await.expect("deleting root");
        assert!(store.forest().is_empty());
        assert_eq!(server.lock().test_num_comments(), 0);
    });
}

#[test]
fn too_deep_reply_is_refused_locally() {
    run(async {
        let (server, ids) = seeded(&["root"]);
        let store = Store::new(server.clone());
        store.refresh().await.expect("refreshing");
        let child = store.add_reply(ids[0], "child").await.expect("replying");
        let grandchild = store.add_reply(child, "grandchild").await.expect("replying");

        // a call reaching the server would consume this failure
        server
            .lock()
            .fail_next_call(api::Error::Unknown(String::from("boom")));
        let err = store.add_reply(grandchild, "too deep").await.unwrap_err();
        assert_eq!(err.api_error(), Some(&api::Error::MaxDepthReached));
        assert_eq!(
            store.last_error().as_deref(),
            Some("Maximum comment nesting depth reached")
        );
        assert!(server.lock().list().is_err());
    });
}

#[test]
fn empty_edit_fails_before_network() {
    run(async {
        let (server, ids) = seeded(&["root"]);
        let store = Store::new(server.clone());
        store.refresh().await.expect("refreshing");
        let before = store.forest();

        server
            .lock()
            .fail_next_call(api::Error::Unknown(String::from("boom")));
        let err = store.edit_node(ids[0], "").await.unwrap_err();
        assert!(matches!(err, StoreError::Submit(_)));
        assert_eq!(err.api_error(), Some(&api::Error::EmptyText));
        assert_eq!(store.forest(), before);
        assert!(server.lock().list().is_err());
    });
}

#[test]
fn server_failures_are_returned_and_shown() {
    run(async {
        let (server, ids) = seeded(&["root"]);
        let store = Store::new(server.clone());
        store.refresh().await.expect("refreshing");
        let before = store.forest();

        let boom = || api::Error::Unknown(String::from("boom"));

        server.lock().fail_next_call(boom());
        assert!(matches!(
            store.add_root("hello").await,
            Err(StoreError::Submit(_))
        ));
        assert_eq!(
            store.last_error().as_deref(),
            Some("Failed to add comment. Please try again.")
        );

        server.lock().fail_next_call(boom());
        assert!(store.add_reply(ids[0], "hello").await.is_err());
        assert_eq!(
            store.last_error().as_deref(),
            Some("Failed to add reply. Please try again.")
        );

        server.lock().fail_next_call(boom());
        assert!(store.edit_node(ids[0], "hello").await.is_err());
        assert_eq!(
            store.last_error().as_deref(),
            Some("Failed to update comment. Please try again.")
        );

        server.lock().fail_next_call(boom());
        let err = store.delete_node(ids[0]).await.unwrap_err();
        assert!(matches!(err, StoreError::Delete(_)));
        assert_eq!(err.api_error(), Some(&boom()));
        assert_eq!(
            store.last_error().as_deref(),
            Some("Failed to delete comment. Please try again.")
        );

        assert_eq!(store.forest(), before);
        assert_in_sync(&store, &server).await;
        store.clear_error();
        assert_eq!(store.last_error(), None);
    });
}

/// Runs operations on the server right away but holds their answers back
/// until released
struct Gated {
    inner: SharedMockServer,
    gates: Mutex<HashMap<CommentId, oneshot::Receiver<()>>>,
}

impl Gated {
    fn new(inner: SharedMockServer) -> Gated {
        Gated {
            inner,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, id: CommentId) -> oneshot::Sender<()> {
        let (send, recv) = oneshot::channel();
        self.gates.lock().insert(id, recv);
        send
    }

    async fn wait(&self, id: CommentId) {
        let gate = self.gates.lock().remove(&id);
        if let Some(gate) = gate {
            gate.await.expect("gate sender dropped");
        }
    }
}

#[async_trait]
impl Remote for Gated {
    async fn list(&self) -> anyhow::Result<Vec<CommentRecord>> {
        self.inner.list().await
    }

    async fn create(&self, c: NewComment) -> anyhow::Result<CommentRecord> {
        self.inner.create(c).await
    }

    async fn update(&self, id: CommentId, u: CommentUpdate) -> anyhow::Result<CommentRecord> {
        let res = self.inner.update(id, u).await;
        self.wait(id).await;
        res
    }

    async fn delete(&self, id: CommentId) -> anyhow::Result<()> {
        let res = self.inner.delete(id).await;
        self.wait(id).await;
        res
    }
}

fn text_is<R: Remote>(store: &Store<R>, id: CommentId, text: &str) -> bool {
    store.with_forest(|f| f.find(id).map(|c| c.text == text).unwrap_or(false))
}

async fn concurrent_edits(a_first: bool) {
    let (server, ids) = seeded(&["a", "b"]);
    let (a, b) = (ids[0], ids[1]);
    let remote = Arc::new(Gated::new(server.clone()));
    let store = Store::new(remote.clone());
    store.refresh().await.expect("refreshing");

    let mut gates = HashMap::new();
    gates.insert(a, remote.gate(a));
    gates.insert(b, remote.gate(b));
    let (first, second) = match a_first {
        true => ((a, "a2"), (b, "b2")),
        false => ((b, "b2"), (a, "a2")),
    };

    let release = async {
        gates
            .remove(&first.0)
            .expect("first gate")
            .send(())
            .expect("releasing first edit");
        while !text_is(&store, first.0, first.1) {
            tokio::task::yield_now().await;
        }
        assert!(!text_is(&store, second.0, second.1));
        gates
            .remove(&second.0)
            .expect("second gate")
            .send(())
            .expect("releasing second edit");
    };
    let (ra, rb, ()) = tokio::join!(store.edit_node(a, "a2"), store.edit_node(b, "b2"), release);
    ra.expect("editing a");
    rb.expect("editing b");

    assert!(text_is(&store, a, "a2"));
    assert!(text_is(&store, b, "b2"));
    assert_in_sync(&store, &server).await;
}

#[test]
fn concurrent_edits_both_land_in_order() {
    run(concurrent_edits(true));
}

#[test]
fn concurrent_edits_both_land_out_of_order() {
    run(concurrent_edits(false));
}

// An edit and a delete of the same comment are not ordered by the store: here
// the delete answers first, and the late edit finds nothing to update.
#[test]
fn late_edit_of_deleted_comment_is_dropped() {
    run(async {
        let (server, ids) = seeded(&["a"]);
        let a = ids[0];
        let remote = Arc::new(Gated::new(server.clone()));
        let store = Store::new(remote.clone());
        store.refresh().await.expect("refreshing");

        let edit_gate = remote.gate(a);
        let release = async {
            while store.forest().contains(a) {
                tokio::task::yield_now().await;
            }
            edit_gate.send(()).expect("releasing edit");
        };
        let delete = async {
            // let the edit reach the server and grab the gate first
            tokio::task::yield_now().await;
            store.delete_node(a).await
        };
        let (edit, delete, ()) = tokio::join!(store.edit_node(a, "a2"), delete, release);
        edit.expect("editing");
        delete.expect("deleting");
        assert!(store.forest().is_empty());
        assert_in_sync(&store, &server).await;
    });
}

#[test]
fn refresh_rejects_duplicate_ids() {
    struct Dup;

    #[async_trait]
    impl Remote for Dup {
        async fn list(&self) -> anyhow::Result<Vec<CommentRecord>> {
            let c: CommentRecord = serde_json::from_value(serde_json::json!({
                "id": 1, "text": "a", "author": "b", "date": "2024-01-01T00:00:00Z",
            }))?;
            Ok(vec![c.clone(), c])
        }

        async fn create(&self, _c: NewComment) -> anyhow::Result<CommentRecord> {
            anyhow::bail!("unsupported")
        }

        async fn update(&self, _id: CommentId, _u: CommentUpdate) -> anyhow::Result<CommentRecord> {
            anyhow::bail!("unsupported")
        }

        async fn delete(&self, _id: CommentId) -> anyhow::Result<()> {
            anyhow::bail!("unsupported")
        }
    }

    run(async {
        let store = Store::new(Dup);
        let err = store.refresh().await.unwrap_err();
        assert!(matches!(err, StoreError::Fetch(_)));
        assert!(store.forest().is_empty());
        assert!(!store.is_loading());
        assert_eq!(
            store.last_error().as_deref(),
            Some("Failed to load comments. Please try again later.")
        );
    });
}
