//! Client-side projection of fetched feeds and profiles.
//!
//! Pages are flattened into one ordered sequence with an id index, so an optimistic
//! patch touches a single entry. Each optimistic change hands back a patch value that
//! carries the pre-change snapshot; the caller settles it with either the server's
//! answer (`confirm_*`) or a failure (`rollback_*`). While a patch for an id is
//! outstanding, a second toggle for that id is refused.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::models::{Cursor, FeedPage, Profile, TweetView};

/// Flips `liked_by_me` and moves `like_count` with it.
pub fn toggled_like(view: &TweetView) -> TweetView {
    with_like_state(view, !view.liked_by_me)
}

/// Sets `liked_by_me`, adjusting `like_count` only when the state actually changes.
pub fn with_like_state(view: &TweetView, liked: bool) -> TweetView {
    let like_count = match (view.liked_by_me, liked) {
        (false, true) => view.like_count + 1,
        (true, false) => view.like_count.saturating_sub(1),
        _ => view.like_count,
    };
    TweetView {
        like_count,
        liked_by_me: liked,
        ..view.clone()
    }
}

/// Sets `is_following`, adjusting the follower count only when the state changes.
pub fn with_follow_state(profile: &Profile, following: bool) -> Profile {
    let followers_count = match (profile.is_following, following) {
        (false, true) => profile.followers_count + 1,
        (true, false) => profile.followers_count.saturating_sub(1),
        _ => profile.followers_count,
    };
    Profile {
        followers_count,
        is_following: following,
        ..profile.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePatch {
    pub tweet_id: Uuid,
    pub predicted: bool,
    before_count: u64,
    before_liked: bool,
}

#[derive(Debug, Default)]
pub struct FeedCache {
    tweets: VecDeque<TweetView>,
    // Sequence numbers survive prepends; position = seq - front_seq.
    index: HashMap<Uuid, i64>,
    front_seq: i64,
    next_cursor: Option<Cursor>,
    loaded: bool,
    pending: HashSet<Uuid>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tweets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }

    pub fn tweets(&self) -> impl Iterator<Item = &TweetView> {
        self.tweets.iter()
    }

    pub fn get(&self, tweet_id: Uuid) -> Option<&TweetView> {
        let pos = self.position(tweet_id)?;
        self.tweets.get(pos)
    }

    /// `true` until a page without a cursor has been appended.
    pub fn has_more(&self) -> bool {
        !self.loaded || self.next_cursor.is_some()
    }

    /// Cursor to request the next page with; `None` before the first page.
    pub fn next_cursor(&self) -> Option<Cursor> {
        self.next_cursor
    }

    pub fn append_page(&mut self, page: FeedPage) {
        for tweet in page.tweets {
            if self.index.contains_key(&tweet.tweet_id) {
                continue;
            }
            let seq = self.front_seq + self.tweets.len() as i64;
            self.index.insert(tweet.tweet_id, seq);
            self.tweets.push_back(tweet);
        }
        self.next_cursor = page.next_cursor;
        self.loaded = true;
    }

    /// Puts a tweet the viewer just created at the head of the feed.
    pub fn prepend(&mut self, tweet: TweetView) {
        if self.index.contains_key(&tweet.tweet_id) {
            return;
        }
        self.front_seq -= 1;
        self.index.insert(tweet.tweet_id, self.front_seq);
        self.tweets.push_front(tweet);
    }

    /// Drops everything, e.g. when switching between feeds.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_pending(&self, tweet_id: Uuid) -> bool {
        self.pending.contains(&tweet_id)
    }

    /// Optimistically flips the like on a cached tweet.
    ///
    /// Returns `None` if the tweet is not cached or a toggle on it is still in flight.
    pub fn apply_like_toggle(&mut self, tweet_id: Uuid) -> Option<LikePatch> {
        if self.pending.contains(&tweet_id) {
            return None;
        }
        let slot = self.slot_mut(tweet_id)?;
        let patch = LikePatch {
            tweet_id,
            predicted: !slot.liked_by_me,
            before_count: slot.like_count,
            before_liked: slot.liked_by_me,
        };
        *slot = toggled_like(slot);
        self.pending.insert(tweet_id);
        Some(patch)
    }

    /// Settles a toggle with the server's answer, which wins over the prediction.
    pub fn confirm_like(&mut self, patch: &LikePatch, liked: bool) {
        self.pending.remove(&patch.tweet_id);
        if let Some(slot) = self.slot_mut(patch.tweet_id) {
            *slot = with_like_state(slot, liked);
        }
    }

    /// Restores the snapshot taken when the patch was applied.
    pub fn rollback_like(&mut self, patch: &LikePatch) {
        self.pending.remove(&patch.tweet_id);
        if let Some(slot) = self.slot_mut(patch.tweet_id) {
            slot.like_count = patch.before_count;
            slot.liked_by_me = patch.before_liked;
        }
    }

    fn position(&self, tweet_id: Uuid) -> Option<usize> {
        let seq = self.index.get(&tweet_id)?;
        usize::try_from(seq - self.front_seq).ok()
    }

    fn slot_mut(&mut self, tweet_id: Uuid) -> Option<&mut TweetView> {
        let pos = self.position(tweet_id)?;
        self.tweets.get_mut(pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowPatch {
    pub user_id: Uuid,
    pub predicted: bool,
    before_followers: u64,
    before_following: bool,
}

#[derive(Debug, Default)]
pub struct ProfileCache {
    profiles: HashMap<Uuid, Profile>,
    pending: HashSet<Uuid>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: Uuid) -> Option<&Profile> {
        self.profiles.get(&user_id)
    }

    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.user_id, profile);
    }

    pub fn is_pending(&self, user_id: Uuid) -> bool {
        self.pending.contains(&user_id)
    }

    /// Optimistically sets the viewer's follow state on a cached profile.
    pub fn apply_follow_toggle(&mut self, user_id: Uuid, added: bool) -> Option<FollowPatch> {
        if self.pending.contains(&user_id) {
            return None;
        }
        let profile = self.profiles.get_mut(&user_id)?;
        let patch = FollowPatch {
            user_id,
            predicted: added,
            before_followers: profile.followers_count,
            before_following: profile.is_following,
        };
        *profile = with_follow_state(profile, added);
        self.pending.insert(user_id);
        Some(patch)
    }

    pub fn confirm_follow(&mut self, patch: &FollowPatch, following: bool) {
        self.pending.remove(&patch.user_id);
        if let Some(profile) = self.profiles.get_mut(&patch.user_id) {
            *profile = with_follow_state(profile, following);
        }
    }

    pub fn rollback_follow(&mut self, patch: &FollowPatch) {
        self.pending.remove(&patch.user_id);
        if let Some(profile) = self.profiles.get_mut(&patch.user_id) {
            profile.followers_count = patch.before_followers;
            profile.is_following = patch.before_following;
        }
    }
}
