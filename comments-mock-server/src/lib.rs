use std::{collections::BTreeMap, sync::Arc};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use comments_client::{
    api::{
        self, CommentId, CommentList, CommentRecord, CommentUpdate, Error, NewComment, Time,
    },
    Remote,
};
use parking_lot::{Mutex, MutexGuard};

/// Author given to every comment created through the api
pub const DEFAULT_AUTHOR: &str = "Admin";

/// Author given to imported comments that do not name one
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// In-memory stand-in for the comments server
pub struct MockServer {
    comments: BTreeMap<CommentId, Row>,
    next_id: i64,
    fail_next: Option<Error>,
}

#[derive(Clone, Debug)]
struct Row {
    text: String,
    author: String,
    date: Time,
    likes: i64,
    image_url: Option<String>,
    parent: Option<CommentId>,
    depth: u32,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            comments: BTreeMap::new(),
            next_id: 1,
            fail_next: None,
        }
    }

    /// Make the next api call fail with `err`, whatever it is
    pub fn fail_next_call(&mut self, err: Error) {
        self.fail_next = Some(err);
    }

    /// Return the current number of comments, replies included
    pub fn test_num_comments(&self) -> usize {
        self.comments.len()
    }

    pub fn test_contains(&self, id: CommentId) -> bool {
        self.comments.contains_key(&id)
    }

    fn check_failure(&mut self) -> Result<(), Error> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn insert(&mut self, row: Row) -> CommentId {
        let id = CommentId(self.next_id);
        self.next_id += 1;
        self.comments.insert(id, row);
        id
    }

    /// Children of `parent` (roots if `None`), newest first
    fn children_of(&self, parent: Option<CommentId>) -> Vec<CommentId> {
        let mut res = self
            .comments
            .iter()
            .filter(|(_, r)| r.parent == parent)
            .map(|(id, r)| (r.date, *id))
            .collect::<Vec<_>>();
        res.sort_unstable_by(|a, b| b.cmp(a));
        res.into_iter().map(|(_, id)| id).collect()
    }

    /// Serialize a comment the way the server does: replies are only nested
    /// under comments that can still be replied to
    fn record(&self, id: CommentId) -> CommentRecord {
        let row = &self.comments[&id];
        let replies = match api::can_reply_at(row.depth) {
            true => self
                .children_of(Some(id))
                .into_iter()
                .map(|c| self.record(c))
                .collect(),
            false => Vec::new(),
        };
        CommentRecord {
            id,
            text: row.text.clone(),
            author: row.author.clone(),
            date: row.date.to_rfc3339(),
            likes: row.likes,
            image_url: row.image_url.clone(),
            image: None,
            depth: Some(row.depth),
            parent_id: None,
            replies: Some(replies),
        }
    }

    pub fn list(&mut self) -> Result<CommentList, Error> {
        self.check_failure()?;
        Ok(CommentList {
            results: self
                .children_of(None)
                .into_iter()
                .map(|id| self.record(id))
                .collect(),
        })
    }

    pub fn create(&mut self, c: NewComment) -> Result<CommentRecord, Error> {
        self.check_failure()?;
        c.validate()?;
        let depth = match c.parent_id {
            None => 0,
            Some(p) => {
                let parent = self.comments.get(&p).ok_or(Error::NotFound(p))?;
                if !api::can_reply_at(parent.depth) {
                    return Err(Error::MaxDepthReached);
                }
                parent.depth + 1
            }
        };
        let id = self.insert(Row {
            text: c.text,
            author: String::from(DEFAULT_AUTHOR),
            date: Utc::now(),
            likes: 0,
            image_url: None,
            parent: c.parent_id,
            depth,
        });
        Ok(self.record(id))
    }

    pub fn update(&mut self, id: CommentId, u: CommentUpdate) -> Result<CommentRecord, Error> {
        self.check_failure()?;
        u.validate()?;
        let row = self.comments.get_mut(&id).ok_or(Error::NotFound(id))?;
        row.text = u.text;
        Ok(self.record(id))
    }

    /// Delete a comment and, recursively, all its replies
    pub fn delete(&mut self, id: CommentId) -> Result<(), Error> {
        self.check_failure()?;
        if !self.comments.contains_key(&id) {
            return Err(Error::NotFound(id));
        }
        let mut to_remove = vec![id];
        while let Some(id) = to_remove.pop() {
            self.comments.remove(&id);
            to_remove.extend(self.children_of(Some(id)));
        }
        Ok(())
    }

    /// Delete every comment, returning how many there were
    pub fn wipe(&mut self) -> Result<usize, Error> {
        self.check_failure()?;
        let count = self.comments.len();
        self.comments.clear();
        Ok(count)
    }

    /// Import top-level comments from a JSON fixture
    ///
    /// The fixture is either `{"comments": [...]}`, a bare list, or a single
    /// comment. Entries that cannot be imported are skipped. Returns the
    /// number of imported comments.
    pub fn load_fixture(&mut self, json: &[u8]) -> anyhow::Result<usize> {
        let data: serde_json::Value =
            serde_json::from_slice(json).context("parsing comment fixture")?;
        let entries = match data {
            serde_json::Value::Object(mut o) if o.contains_key("comments") => {
                match o.remove("comments") {
                    Some(serde_json::Value::Array(a)) => a,
                    _ => return Err(anyhow!("fixture field `comments` is not a list")),
                }
            }
            serde_json::Value::Array(a) => a,
            other => vec![other],
        };
        let mut imported = 0;
        for entry in entries {
            match row_from_fixture(&entry) {
                Ok(row) => {
                    self.insert(row);
                    imported += 1;
                }
                Err(err) => tracing::warn!(
                    id = ?entry.get("id"),
                    ?err,
                    "skipping comment that failed to import"
                ),
            }
        }
        Ok(imported)
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

fn row_from_fixture(entry: &serde_json::Value) -> anyhow::Result<Row> {
    let o = entry
        .as_object()
        .ok_or_else(|| anyhow!("comment is not a JSON object"))?;
    let str_field = |name: &str| {
        o.get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    };
    let likes = match o.get("likes") {
        None | Some(serde_json::Value::Null) => 0,
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .with_context(|| format!("parsing likes {s:?}"))?,
        Some(v) => v
            .as_i64()
            .ok_or_else(|| anyhow!("likes {v} is not an integer"))?,
    };
    let date = match str_field("date") {
        None => Utc::now(),
        Some(d) => parse_fixture_date(d).unwrap_or_else(|| {
            tracing::warn!(date = d, "invalid date format, using current time");
            Utc::now()
        }),
    };
    Ok(Row {
        text: String::from(str_field("text").unwrap_or("")),
        author: String::from(str_field("author").unwrap_or(ANONYMOUS_AUTHOR)),
        date,
        likes,
        image_url: str_field("image")
            .or_else(|| str_field("image_url"))
            .map(String::from),
        parent: None,
        depth: 0,
    })
}

/// ISO 8601 date, with or without time or offset; a missing offset means UTC
fn parse_fixture_date(d: &str) -> Option<Time> {
    let d = d.trim().replacen(' ', "T", 1);
    if let Ok(t) = chrono::DateTime::parse_from_rfc3339(&d) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(&d, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
        })
        .map(|t| Utc.from_utc_datetime(&t))
}

/// A [`MockServer`] that can be handed to a [`comments_client::Store`]
#[derive(Clone, Default)]
pub struct SharedMockServer(Arc<Mutex<MockServer>>);

impl SharedMockServer {
    pub fn new(server: MockServer) -> SharedMockServer {
        SharedMockServer(Arc::new(Mutex::new(server)))
    }

    pub fn lock(&self) -> MutexGuard<'_, MockServer> {
        self.0.lock()
    }
}

#[async_trait]
impl Remote for SharedMockServer {
    async fn list(&self) -> anyhow::Result<Vec<CommentRecord>> {
        Ok(self.lock().list()?.results)
    }

    async fn create(&self, c: NewComment) -> anyhow::Result<CommentRecord> {
        Ok(self.lock().create(c)?)
    }

    async fn update(&self, id: CommentId, u: CommentUpdate) -> anyhow::Result<CommentRecord> {
        Ok(self.lock().update(id, u)?)
    }

    async fn delete(&self, id: CommentId) -> anyhow::Result<()> {
        Ok(self.lock().delete(id)?)
    }
}
