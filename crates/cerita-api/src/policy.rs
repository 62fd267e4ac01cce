//! Every role and privacy decision lives here. Handlers ask; they never
//! compare roles themselves.

use cerita_db::models::{AnnouncementRow, CommentRow, JournalRow, StoryRow};
use cerita_types::{Privacy, Role};

#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub id: &'a str,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Story,
    Journal,
    Announcement,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
}

/// The parts of a record that access decisions depend on.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub kind: ResourceKind,
    pub owner_id: &'a str,
    pub privacy: Privacy,
}

impl<'a> Subject<'a> {
    pub fn story(row: &'a StoryRow) -> Self {
        Self {
            kind: ResourceKind::Story,
            owner_id: &row.author.id,
            privacy: row.privacy,
        }
    }

    pub fn journal(row: &'a JournalRow) -> Self {
        Self {
            kind: ResourceKind::Journal,
            owner_id: &row.author.id,
            privacy: row.privacy,
        }
    }

    pub fn announcement(row: &'a AnnouncementRow) -> Self {
        Self {
            kind: ResourceKind::Announcement,
            owner_id: &row.author.id,
            privacy: Privacy::Public,
        }
    }

    pub fn comment(row: &'a CommentRow) -> Self {
        Self {
            kind: ResourceKind::Comment,
            owner_id: &row.author.id,
            privacy: Privacy::Public,
        }
    }

    fn owned_by(&self, actor: Option<Actor<'_>>) -> bool {
        actor.is_some_and(|a| a.id == self.owner_id)
    }
}

pub fn can_view(viewer: Option<Actor<'_>>, subject: Subject<'_>) -> bool {
    if subject.owned_by(viewer) {
        return true;
    }
    match subject.kind {
        ResourceKind::Announcement => viewer.is_some(),
        // Nobody but the owner reads a PRIVATE record, teachers included.
        _ => subject.privacy != Privacy::Private,
    }
}

pub fn can_mutate(actor: Actor<'_>, subject: Subject<'_>, action: Action) -> bool {
    let owner = subject.owned_by(Some(actor));
    let teacher = actor.role.is_teacher();
    match subject.kind {
        ResourceKind::Story => owner || teacher,
        ResourceKind::Journal => owner || (teacher && subject.privacy != Privacy::Private),
        ResourceKind::Announcement => owner && teacher,
        ResourceKind::Comment => match action {
            Action::Edit => owner,
            Action::Delete => owner || teacher,
        },
    }
}

pub fn can_create(actor: Actor<'_>, kind: ResourceKind) -> bool {
    match kind {
        ResourceKind::Announcement => actor.role.is_teacher(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENT: Actor<'static> = Actor {
        id: "siswa-1",
        role: Role::Student,
    };
    const CLASSMATE: Actor<'static> = Actor {
        id: "siswa-2",
        role: Role::Student,
    };
    const TEACHER: Actor<'static> = Actor {
        id: "guru-1",
        role: Role::Teacher,
    };

    fn subject(kind: ResourceKind, owner_id: &str, privacy: Privacy) -> Subject<'_> {
        Subject {
            kind,
            owner_id,
            privacy,
        }
    }

    #[test]
    fn private_records_are_owner_only() {
        for kind in [ResourceKind::Story, ResourceKind::Journal] {
            let private = subject(kind, STUDENT.id, Privacy::Private);
            assert!(can_view(Some(STUDENT), private));
            assert!(!can_view(Some(CLASSMATE), private));
            assert!(!can_view(Some(TEACHER), private));
            assert!(!can_view(None, private));
        }
    }

    #[test]
    fn shared_records_are_open() {
        let anonymous = subject(ResourceKind::Story, STUDENT.id, Privacy::Anonymous);
        assert!(can_view(None, anonymous));
        assert!(can_view(Some(CLASSMATE), anonymous));
    }

    #[test]
    fn announcements_need_a_session() {
        let ann = subject(ResourceKind::Announcement, TEACHER.id, Privacy::Public);
        assert!(!can_view(None, ann));
        assert!(can_view(Some(STUDENT), ann));
    }

    #[test]
    fn mutation_rules() {
        let story = subject(ResourceKind::Story, STUDENT.id, Privacy::Public);
        assert!(can_mutate(STUDENT, story, Action::Edit));
        assert!(can_mutate(TEACHER, story, Action::Delete));
        assert!(!can_mutate(CLASSMATE, story, Action::Edit));

        let shared_journal = subject(ResourceKind::Journal, STUDENT.id, Privacy::Public);
        let private_journal = subject(ResourceKind::Journal, STUDENT.id, Privacy::Private);
        assert!(can_mutate(TEACHER, shared_journal, Action::Edit));
        assert!(!can_mutate(TEACHER, private_journal, Action::Delete));
        assert!(!can_mutate(CLASSMATE, shared_journal, Action::Edit));

        let other_teacher = Actor {
            id: "guru-2",
            role: Role::Teacher,
        };
        let ann = subject(ResourceKind::Announcement, TEACHER.id, Privacy::Public);
        assert!(can_mutate(TEACHER, ann, Action::Edit));
        assert!(!can_mutate(other_teacher, ann, Action::Delete));

        let comment = subject(ResourceKind::Comment, STUDENT.id, Privacy::Public);
        assert!(can_mutate(STUDENT, comment, Action::Edit));
        assert!(!can_mutate(TEACHER, comment, Action::Edit));
        assert!(can_mutate(TEACHER, comment, Action::Delete));
        assert!(!can_mutate(CLASSMATE, comment, Action::Delete));
    }

    #[test]
    fn only_teachers_announce() {
        assert!(can_create(TEACHER, ResourceKind::Announcement));
        assert!(!can_create(STUDENT, ResourceKind::Announcement));
        assert!(can_create(STUDENT, ResourceKind::Story));
    }
}
