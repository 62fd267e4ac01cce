//! Row to response conversion, including author masking.

use std::collections::HashMap;

use cerita_db::models::{AnnouncementRow, AuthorRow, CommentRow, JournalRow, MoodRow, ReactionRow, StoryRow};
use cerita_types::ReactionType;
use cerita_types::api::{
    AnnouncementResponse, AuthorView, CommentResponse, Counts, JournalResponse, MoodResponse, ReactionResponse,
    ReactionSummary, StoryResponse,
};

use crate::middleware::CurrentUser;

pub const ANONYMOUS_NAME: &str = "Anonim";

/// Masked authors keep only `isSelf`, so the owner still gets edit controls.
pub fn author_view(author: &AuthorRow, masked: bool, viewer: Option<&CurrentUser>) -> AuthorView {
    let is_self = viewer.is_some_and(|v| v.id == author.id);
    if masked {
        return AuthorView {
            id: None,
            name: ANONYMOUS_NAME.to_string(),
            initial: "?".to_string(),
            avatar: None,
            role: None,
            is_self,
        };
    }

    let initial = author
        .name
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string());

    AuthorView {
        id: Some(author.id.clone()),
        name: author.name.clone(),
        initial,
        avatar: author.avatar.clone(),
        role: Some(author.role),
        is_self,
    }
}

pub fn story_response(row: StoryRow, viewer: Option<&CurrentUser>) -> StoryResponse {
    StoryResponse {
        author: author_view(&row.author, row.privacy.masks_author(), viewer),
        counts: Some(Counts {
            reactions: row.reaction_count as u64,
            comments: row.comment_count as u64,
        }),
        id: row.id,
        title: row.title,
        content: row.content,
        thumbnail: row.thumbnail,
        tags: row.tags,
        privacy: row.privacy,
        is_interactive: row.is_interactive,
        view_count: row.view_count as u64,
        created_at: row.created_at,
        updated_at: row.updated_at,
        reactions: None,
        comments: None,
    }
}

pub fn journal_response(row: JournalRow, viewer: Option<&CurrentUser>) -> JournalResponse {
    JournalResponse {
        author: author_view(&row.author, row.privacy.masks_author(), viewer),
        id: row.id,
        title: row.title,
        content: row.content,
        privacy: row.privacy,
        created_at: row.created_at,
        updated_at: row.updated_at,
        comments: None,
    }
}

pub fn announcement_response(row: AnnouncementRow, viewer: Option<&CurrentUser>) -> AnnouncementResponse {
    AnnouncementResponse {
        author: author_view(&row.author, false, viewer),
        id: row.id,
        title: row.title,
        content: row.content,
        created_at: row.created_at,
        updated_at: row.updated_at,
        comment_count: Some(row.comment_count as u64),
        comments: None,
    }
}

pub fn comment_response(row: CommentRow, viewer: Option<&CurrentUser>) -> CommentResponse {
    CommentResponse {
        author: author_view(&row.author, row.is_anonymous, viewer),
        id: row.id,
        content: row.content,
        is_anonymous: row.is_anonymous,
        parent_id: row.parent_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
        replies: Vec::new(),
    }
}

fn root_id<'a>(parent_of: &'a HashMap<String, Option<String>>, id: &'a str) -> &'a str {
    let mut current = id;
    for _ in 0..parent_of.len() {
        match parent_of.get(current) {
            Some(Some(parent)) => current = parent.as_str(),
            _ => break,
        }
    }
    current
}

/// Build a one-level thread from rows in insertion order: top-level comments
/// newest first, each with its replies oldest first. A reply to a reply is
/// shown under the top-level comment it descends from.
pub fn comment_thread(rows: Vec<CommentRow>, viewer: Option<&CurrentUser>) -> Vec<CommentResponse> {
    let parent_of: HashMap<String, Option<String>> =
        rows.iter().map(|c| (c.id.clone(), c.parent_id.clone())).collect();
    let roots_of: Vec<Option<String>> = rows
        .iter()
        .map(|c| c.parent_id.as_ref().map(|_| root_id(&parent_of, &c.id).to_string()))
        .collect();

    let mut top_level = Vec::new();
    let mut replies: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    for (row, root) in rows.into_iter().zip(roots_of) {
        let view = comment_response(row, viewer);
        match root {
            None => top_level.push(view),
            Some(root) => replies.entry(root).or_default().push(view),
        }
    }

    top_level.reverse();
    for comment in &mut top_level {
        if let Some(children) = replies.remove(&comment.id) {
            comment.replies = children;
        }
    }
    top_level
}

/// One entry per reaction type, zero counts included.
pub fn reaction_summary(rows: &[ReactionRow], viewer: Option<&CurrentUser>) -> Vec<ReactionSummary> {
    ReactionType::ALL
        .iter()
        .map(|&kind| {
            let of_kind = rows.iter().filter(|r| r.kind == kind);
            ReactionSummary {
                kind,
                count: of_kind.clone().count() as u64,
                reacted: viewer.is_some_and(|v| of_kind.clone().any(|r| r.user_id == v.id)),
            }
        })
        .collect()
}

pub fn reaction_response(row: ReactionRow) -> ReactionResponse {
    ReactionResponse {
        id: row.id,
        story_id: row.story_id,
        user_id: row.user_id,
        kind: row.kind,
        created_at: row.created_at,
    }
}

pub fn mood_response(row: MoodRow) -> MoodResponse {
    MoodResponse {
        id: row.id,
        kind: row.kind,
        note: row.note,
        mood_date: row.mood_date,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerita_db::models::CommentTarget;
    use cerita_types::Role;
    use chrono::{TimeZone, Utc};

    fn author(id: &str, name: &str) -> AuthorRow {
        AuthorRow {
            id: id.into(),
            name: name.into(),
            avatar: Some("https://cdn/a.png".into()),
            role: Role::Student,
        }
    }

    fn viewer(id: &str) -> CurrentUser {
        CurrentUser {
            id: id.into(),
            email: format!("{id}@sekolah.id"),
            name: id.into(),
            role: Role::Student,
            avatar: None,
            created_at: Utc::now(),
        }
    }

    fn comment(id: &str, parent: Option<&str>, seq: i64) -> CommentRow {
        let at = Utc.with_ymd_and_hms(2026, 10, 14, 8, 0, 0).unwrap() + chrono::Duration::seconds(seq);
        CommentRow {
            id: id.into(),
            seq,
            author: author("u1", "budi"),
            target: CommentTarget::Story("s1".into()),
            parent_id: parent.map(str::to_string),
            content: id.into(),
            is_anonymous: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn masking_strips_identity_but_keeps_is_self() {
        let me = viewer("u1");
        let masked = author_view(&author("u1", "budi"), true, Some(&me));
        assert_eq!(masked.id, None);
        assert_eq!(masked.name, ANONYMOUS_NAME);
        assert_eq!(masked.initial, "?");
        assert_eq!(masked.avatar, None);
        assert_eq!(masked.role, None);
        assert!(masked.is_self);

        let other = author_view(&author("u1", "budi"), true, Some(&viewer("u2")));
        assert!(!other.is_self);

        let plain = author_view(&author("u1", "budi"), false, None);
        assert_eq!(plain.id.as_deref(), Some("u1"));
        assert_eq!(plain.initial, "B");
    }

    #[test]
    fn thread_orders_and_flattens() {
        let rows = vec![
            comment("a", None, 1),
            comment("b", None, 2),
            comment("a1", Some("a"), 3),
            comment("a1x", Some("a1"), 4),
            comment("a2", Some("a"), 5),
        ];
        let thread = comment_thread(rows, None);

        let top: Vec<_> = thread.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(top, vec!["b", "a"]);
        let replies: Vec<_> = thread[1].replies.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(replies, vec!["a1", "a1x", "a2"]);
        assert!(thread[0].replies.is_empty());
    }

    #[test]
    fn summary_lists_every_type() {
        let at = Utc::now();
        let rows = vec![
            ReactionRow {
                id: "r1".into(),
                story_id: "s1".into(),
                user_id: "u1".into(),
                kind: ReactionType::Hug,
                created_at: at,
            },
            ReactionRow {
                id: "r2".into(),
                story_id: "s1".into(),
                user_id: "u2".into(),
                kind: ReactionType::Hug,
                created_at: at,
            },
        ];
        let summary = reaction_summary(&rows, Some(&viewer("u2")));
        assert_eq!(summary.len(), ReactionType::ALL.len());
        let hug = summary.iter().find(|s| s.kind == ReactionType::Hug).unwrap();
        assert_eq!(hug.count, 2);
        assert!(hug.reacted);
        let cheer = summary.iter().find(|s| s.kind == ReactionType::Cheer).unwrap();
        assert_eq!(cheer.count, 0);
        assert!(!cheer.reacted);
    }
}
