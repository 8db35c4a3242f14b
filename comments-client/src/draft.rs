use crate::api;

const EMPTY_REPLY: &str = "Reply text cannot be empty";

/// Text being typed in a comment, reply or edit box
///
/// Problems with a draft are shown next to it rather than in the store's
/// banner, and go away as soon as the text changes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Draft {
    original: String,
    text: String,
    error: Option<String>,
    submitting: bool,
    reply: bool,
}

impl Draft {
    /// Draft for editing an existing comment
    pub fn editing(original: &str) -> Draft {
        Draft {
            original: String::from(original),
            text: String::from(original),
            error: None,
            submitting: false,
            reply: false,
        }
    }

    /// Draft for a reply box
    pub fn replying() -> Draft {
        Draft {
            reply: true,
            ..Draft::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.text.trim().is_empty()
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = String::from(text);
        self.error = None;
    }

    /// Back to the text the draft started from
    pub fn reset(&mut self) {
        self.text = self.original.clone();
        self.error = None;
        self.submitting = false;
    }

    /// Check the draft and mark it as submitting, returning the text to send
    ///
    /// Returns `None` if the draft is already being submitted or is blank, in
    /// which case the reason is stored as the draft's error.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.submitting {
            return None;
        }
        if let Err(e) = api::validate_text(&self.text) {
            self.error = Some(match self.reply {
                true => String::from(EMPTY_REPLY),
                false => e.to_string(),
            });
            return None;
        }
        self.error = None;
        self.submitting = true;
        Some(self.text.clone())
    }

    /// Record the outcome of the submission started by `begin_submit`
    ///
    /// A successful new comment or reply clears the box, a successful edit
    /// keeps the new text as the reference one.
    pub fn finish_submit(&mut self, res: Result<(), &str>) {
        self.submitting = false;
        match res {
            Ok(()) => {
                if self.original.is_empty() {
                    self.text.clear();
                } else {
                    self.original = self.text.clone();
                }
            }
            Err(msg) => self.error = Some(String::from(msg)),
        }
    }
}
