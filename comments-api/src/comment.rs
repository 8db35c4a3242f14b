use std::fmt;

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A comment as the server sends it.
///
/// Replies may or may not be nested depending on the endpoint, and older
/// servers send the avatar as `image` rather than `image_url`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub text: String,
    pub author: String,

    /// RFC 3339 timestamp
    pub date: String,

    #[serde(default)]
    pub likes: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentRecord>>,
}

impl CommentRecord {
    /// Avatar reference, whichever field name it arrived under
    pub fn image_ref(&self) -> Option<&str> {
        [&self.image_url, &self.image]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .find(|s| !s.is_empty())
    }
}

/// Body of a list response
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentList {
    #[serde(default)]
    pub results: Vec<CommentRecord>,
}

#[derive(Clone, Debug, Eq, PartialEq, bolero::generator::TypeGenerator, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn root(text: String) -> NewComment {
        NewComment {
            text,
            parent_id: None,
        }
    }

    pub fn reply(parent_id: CommentId, text: String) -> NewComment {
        NewComment {
            text,
            parent_id: Some(parent_id),
        }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        crate::validate_text(&self.text)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentUpdate {
    pub text: String,
}

impl CommentUpdate {
    pub fn validate(&self) -> Result<(), crate::Error> {
        crate::validate_text(&self.text)
    }
}
