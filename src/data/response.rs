//! Response categories and the in-memory tally of who answered what.

use std::collections::HashSet;
use std::fmt::Display;

use serenity::UserId;

use crate::serenity;

/// How a user responded to the daily task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Completed,
    Attempted,
    Skipped,
}

impl Category {
    /// All categories, in the order they are loaded and displayed.
    pub const ALL: [Category; 3] = [Category::Completed, Category::Attempted, Category::Skipped];

    /// Name of the file this category is persisted to.
    pub fn file_name(self) -> &'static str {
        match self {
            Category::Completed => "completed.txt",
            Category::Attempted => "attempted.txt",
            Category::Skipped => "skipped.txt",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Completed => "completed",
            Category::Attempted => "attempted",
            Category::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// The responses of the current cycle.
///
/// Entries are kept in the order they were (last) recorded.
/// A user has at most one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<(UserId, Category)>,
}

impl Tally {
    /// Record `category` for `user`, replacing any earlier answer.
    pub fn record(&mut self, user: UserId, category: Category) {
        self.entries.retain(|(id, _)| *id != user);
        self.entries.push((user, category));
    }

    /// Users who answered with `category`.
    pub fn all(&self, category: Category) -> Vec<UserId> {
        self.entries
            .iter()
            .filter(|(_, c)| *c == category)
            .map(|(id, _)| *id)
            .collect()
    }

    /// The current answer of `user`, if any.
    pub fn category_of(&self, user: UserId) -> Option<Category> {
        self.entries
            .iter()
            .find(|(id, _)| *id == user)
            .map(|(_, c)| *c)
    }

    /// Everyone who answered at all.
    pub fn participants(&self) -> HashSet<UserId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }
}
