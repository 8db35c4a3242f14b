use anyhow::{anyhow, Context};
use async_trait::async_trait;
use comments_client::{
    api::{self, CommentId, CommentList, CommentRecord, CommentUpdate, NewComment},
    Remote,
};

/// Talks to a comments server over its REST api
pub struct HttpRemote {
    client: reqwest::Client,
    host: String,
}

impl HttpRemote {
    pub fn new(host: &str) -> HttpRemote {
        HttpRemote {
            client: reqwest::Client::new(),
            host: String::from(host.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}{}", self.host, api::COMMENTS_PATH, path)
    }

    /// Delete every comment on the server, returning how many there were
    pub async fn wipe(&self) -> anyhow::Result<u64> {
        #[derive(serde::Deserialize)]
        struct Wiped {
            deleted: u64,
        }
        let resp = self
            .client
            .delete(self.url("wipe/"))
            .send()
            .await
            .context("sending wipe request")?;
        let wiped: Wiped = check(resp)
            .await?
            .json()
            .await
            .context("parsing wipe response")?;
        Ok(wiped.deleted)
    }
}

async fn check(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .bytes()
        .await
        .with_context(|| format!("reading body of {status} response"))?;
    Err(match api::Error::parse(&body) {
        Ok(err) => anyhow!(err),
        Err(_) => anyhow!(
            "server answered {status}: {}",
            String::from_utf8_lossy(&body)
        ),
    })
}

#[async_trait]
impl Remote for HttpRemote {
    async fn list(&self) -> anyhow::Result<Vec<CommentRecord>> {
        let resp = self
            .client
            .get(self.url(""))
            .send()
            .await
            .context("fetching comment list")?;
        let list: CommentList = check(resp)
            .await?
            .json()
            .await
            .context("parsing comment list")?;
        Ok(list.results)
    }

    async fn create(&self, c: NewComment) -> anyhow::Result<CommentRecord> {
        let resp = self
            .client
            .post(self.url(""))
            .json(&c)
            .send()
            .await
            .context("submitting new comment")?;
        check(resp)
            .await?
            .json()
            .await
            .context("parsing created comment")
    }

    async fn update(&self, id: CommentId, u: CommentUpdate) -> anyhow::Result<CommentRecord> {
        let resp = self
            .client
            .put(self.url(&format!("{id}/")))
            .json(&u)
            .send()
            .await
            .with_context(|| format!("submitting edit of comment {id}"))?;
        check(resp)
            .await?
            .json()
            .await
            .with_context(|| format!("parsing edited comment {id}"))
    }

    async fn delete(&self, id: CommentId) -> anyhow::Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("{id}/")))
            .send()
            .await
            .with_context(|| format!("deleting comment {id}"))?;
        check(resp).await?;
        Ok(())
    }
}
