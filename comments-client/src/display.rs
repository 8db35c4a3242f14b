use std::fmt::{self, Write};

use chrono::TimeZone;

use crate::{api::Time, CommentNode, Forest};

/// How a comment is set off from its parent, by depth
///
/// Nesting past the second level is not indented any further.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DepthStyle {
    Root,
    Nested,
    DeepNested,
}

impl DepthStyle {
    pub fn for_depth(depth: u32) -> DepthStyle {
        match depth {
            0 => DepthStyle::Root,
            1 => DepthStyle::Nested,
            _ => DepthStyle::DeepNested,
        }
    }

    /// Columns of indentation before the comment's gutter
    pub fn indent(&self) -> usize {
        match self {
            DepthStyle::Root => 0,
            DepthStyle::Nested => 4,
            DepthStyle::DeepNested => 8,
        }
    }

    fn prefix(&self) -> String {
        match self {
            DepthStyle::Root => String::new(),
            _ => format!("{:width$}│ ", "", width = self.indent()),
        }
    }
}

pub fn format_date<Tz: TimeZone>(date: &Time, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    date.with_timezone(tz)
        .format("%B %-d, %Y at %-I:%M %p")
        .to_string()
}

/// Confirmation message shown before deleting `c`
pub fn delete_warning(c: &CommentNode) -> String {
    match c.descendant_count() {
        0 => String::from("Are you sure you want to delete this comment?"),
        n => format!(
            "Are you sure you want to delete this comment? This will also delete all replies ({n})."
        ),
    }
}

pub fn render_comment<Tz: TimeZone>(out: &mut String, c: &CommentNode, tz: &Tz) -> fmt::Result
where
    Tz::Offset: fmt::Display,
{
    let prefix = DepthStyle::for_depth(c.depth).prefix();
    write!(
        out,
        "{prefix}#{} {} · {} · ♥ {}",
        c.id,
        c.author,
        format_date(&c.date, tz),
        c.likes
    )?;
    if let Some(img) = &c.image_url {
        write!(out, " · {img}")?;
    }
    writeln!(out)?;
    for line in c.text.lines() {
        writeln!(out, "{prefix}{line}")?;
    }
    if c.can_reply() {
        writeln!(out, "{prefix}(reply with: reply {} <text>)", c.id)?;
    }
    Ok(())
}

/// Plain-text rendering of a whole thread, replies below their parent
pub fn render_forest<Tz: TimeZone>(forest: &Forest, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    if forest.is_empty() {
        return String::from("No comments yet. Be the first to comment!\n");
    }
    let mut out = String::new();
    for c in forest.iter() {
        if c.depth == 0 && !out.is_empty() {
            out.push('\n');
        }
        render_comment(&mut out, c, tz).expect("writing to a string cannot fail");
    }
    out
}
