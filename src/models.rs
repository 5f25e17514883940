//! Typed views over the raw records the API returns.
//!
//! Raw records are kept verbatim, field order included: [`Post`] and
//! [`Thread`] are projections over a [`RawRecord`], not a re-modeling of
//! it. The server marks "not set" with sentinel literals (empty strings,
//! "无名氏", "无标题"); projections map those to `None`.

use serde_json::{Map, Value};

/// Ordered key-value record exactly mirroring the server payload.
///
/// `serde_json` is built with `preserve_order`, so insertion order is the
/// wire order.
pub type RawRecord = Map<String, Value>;

/// A board listing page: threads in server order.
pub type Board = Vec<Thread>;

/// Server identity that authors housekeeping replies; filtered out of
/// analysis fetches.
pub(crate) const RESERVED_USER_ID: &str = "芦苇";

const NAME_NOT_SET: &str = "无名氏";
const TITLE_NOT_SET: &str = "无标题";
const REPLIES_FIELD: &str = "replys";

/// A single post, read-only view over its raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    raw: RawRecord,
}

impl Post {
    #[must_use]
    pub fn new(raw: RawRecord) -> Self {
        Self { raw }
    }

    /// The backing record, untouched.
    #[must_use]
    pub fn raw(&self) -> &RawRecord {
        &self.raw
    }

    #[must_use]
    pub fn raw_copy(&self) -> RawRecord {
        self.raw.clone()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        int_field(&self.raw, "id")
    }

    #[must_use]
    pub fn attachment_base(&self) -> Option<&str> {
        none_if(str_field(&self.raw, "img"), "")
    }

    #[must_use]
    pub fn attachment_extension(&self) -> Option<&str> {
        none_if(str_field(&self.raw, "ext"), "")
    }

    /// Creation timestamp exactly as the server formats it.
    #[must_use]
    pub fn created_at_raw_text(&self) -> &str {
        str_field(&self.raw, "now")
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        str_field(&self.raw, "userid")
    }

    /// Author name; `None` when the server-side "anonymous" placeholder
    /// is in effect, so the caller applies its own default.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        none_if(str_field(&self.raw, "name"), NAME_NOT_SET)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        none_if(str_field(&self.raw, "email"), "")
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        none_if(str_field(&self.raw, "title"), TITLE_NOT_SET)
    }

    #[must_use]
    pub fn content(&self) -> &str {
        str_field(&self.raw, "content")
    }

    #[must_use]
    pub fn marked_sage(&self) -> bool {
        flag_field(&self.raw, "sage")
    }

    #[must_use]
    pub fn marked_admin(&self) -> bool {
        flag_field(&self.raw, "admin")
    }

    /// Pretty JSON of the raw record, field order preserved.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&Value::Object(self.raw.clone())).unwrap_or_default()
    }
}

/// Whether a thread's reply collection has been detached into typed
/// posts.
///
/// Nothing is decoded until the replies are first touched. Detaching then
/// happens exactly once and the raw collection is never re-read; a null
/// placeholder stays behind in the raw record so the field keeps its
/// original position for serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum RepliesState {
    /// The raw record never carried a reply collection.
    Absent,
    /// The collection still sits undecoded in the raw record, at the
    /// recorded field index.
    Unmaterialized(usize),
    /// Replies detached into typed posts, in server order.
    Materialized(Vec<Post>),
}

/// A thread: its first post plus the replies carried by the fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    post: Post,
    replies: RepliesState,
}

impl Thread {
    /// Build a thread over a raw record. The `replys` collection (if
    /// present) is only located, not decoded; the record stays untouched
    /// until the replies are first accessed.
    #[must_use]
    pub fn new(raw: RawRecord) -> Self {
        let replies = match raw.keys().position(|key| key == REPLIES_FIELD) {
            Some(position) => RepliesState::Unmaterialized(position),
            None => RepliesState::Absent,
        };
        Self {
            post: Post::new(raw),
            replies,
        }
    }

    /// The replies carried by this page, or `None` when the record had no
    /// reply collection at all.
    ///
    /// First access detaches the raw collection (a null placeholder keeps
    /// its slot) and decodes it into typed posts, exactly once.
    #[must_use]
    pub fn replies(&mut self) -> Option<&[Post]> {
        self.materialize();
        match &self.replies {
            RepliesState::Materialized(posts) => Some(posts),
            _ => None,
        }
    }

    #[must_use]
    pub fn replies_state(&self) -> &RepliesState {
        &self.replies
    }

    /// Replace the reply sequence. The raw collection, if still in
    /// place, is dropped unread; only the placeholder keeps its slot.
    pub fn set_replies(&mut self, replies: Vec<Post>) {
        if let Some(slot) = self.post.raw.get_mut(REPLIES_FIELD) {
            *slot = Value::Null;
        }
        self.replies = RepliesState::Materialized(replies);
    }

    /// Keep only the replies the predicate accepts, preserving order.
    /// No-op when the record carried no reply collection.
    pub fn retain_replies<F>(&mut self, predicate: F)
    where
        F: FnMut(&Post) -> bool,
    {
        self.materialize();
        if let RepliesState::Materialized(posts) = &mut self.replies {
            posts.retain(predicate);
        }
    }

    /// Detach and decode the raw collection. Runs at most once; the raw
    /// collection is never re-read afterwards.
    fn materialize(&mut self) {
        if !matches!(self.replies, RepliesState::Unmaterialized(_)) {
            return;
        }
        let posts = match self.post.raw.get_mut(REPLIES_FIELD) {
            Some(slot) => match std::mem::replace(slot, Value::Null) {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(Post::new(map)),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        };
        self.replies = RepliesState::Materialized(posts);
    }

    /// Replies reported by the server across the whole thread, not just
    /// this page. The field arrives as numeric text.
    #[must_use]
    pub fn total_reply_count(&self) -> u64 {
        int_field(self.post.raw(), "replyCount")
    }

    /// Reconstruct the canonical raw record, consulting the replies tag:
    /// a materialized sequence goes back into its original field
    /// position, an unmaterialized collection is still in place and
    /// passes through untouched, and a record that never carried the
    /// field stays without it.
    #[must_use]
    pub fn to_raw(&self) -> RawRecord {
        let mut data = self.post.raw_copy();
        match &self.replies {
            RepliesState::Materialized(posts) => {
                // insert over the placeholder keeps the original slot
                data.insert(
                    REPLIES_FIELD.to_string(),
                    Value::Array(posts.iter().map(|p| Value::Object(p.raw_copy())).collect()),
                );
            }
            RepliesState::Absent | RepliesState::Unmaterialized(_) => {}
        }
        data
    }

    /// Pretty JSON of the reconstructed record.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&Value::Object(self.to_raw())).unwrap_or_default()
    }
}

impl std::ops::Deref for Thread {
    type Target = Post;

    fn deref(&self) -> &Post {
        &self.post
    }
}

fn str_field<'a>(raw: &'a RawRecord, key: &str) -> &'a str {
    raw.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Numeric fields arrive as numbers or numeric text depending on the
/// endpoint; a missing or malformed field projects to zero.
fn int_field(raw: &RawRecord, key: &str) -> u64 {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Flag fields are "0" / non-"0" text, though some endpoints emit plain
/// numbers.
fn flag_field(raw: &RawRecord, key: &str) -> bool {
    match raw.get(key) {
        Some(Value::String(s)) => s != "0",
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

fn none_if<'a>(value: &'a str, sentinel: &str) -> Option<&'a str> {
    if value == sentinel {
        None
    } else {
        Some(value)
    }
}
