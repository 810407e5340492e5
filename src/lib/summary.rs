//! The end-of-cycle report of who did the daily task.

use std::fmt::Write;

use crate::data::Category;
use crate::data::Tally;
use crate::lib::gateway::Gateway;
use crate::lib::gateway::RosterMember;

/// Counts (and names) of the current cycle's responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryReport {
    /// Display names of everyone who completed the task, in answer order.
    pub completed: Vec<String>,
    pub attempted_count: usize,
    pub skipped_count: usize,
    /// Non-bot members of the roster who didn't answer at all.
    pub not_participated_count: usize,
}

impl SummaryReport {
    /// Build the report from a [snapshot](crate::data::ResponseStore::snapshot) of the
    /// responses and a freshly fetched roster.
    /// Names that can't be resolved are replaced by a placeholder.
    pub async fn build(roster: &[RosterMember], tally: &Tally, gateway: &impl Gateway) -> Self {
        let mut completed = Vec::new();
        for user in tally.all(Category::Completed) {
            let name = match gateway.display_name(user).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!("{e}");
                    format!("Unknown User ({user})")
                }
            };
            completed.push(name);
        }

        let attempted_count = tally.all(Category::Attempted).len();
        let skipped_count = tally.all(Category::Skipped).len();

        let participated = tally.participants();
        let not_participated_count = roster
            .iter()
            .filter(|m| !m.is_bot && !participated.contains(&m.id))
            .count();

        Self {
            completed,
            attempted_count,
            skipped_count,
            not_participated_count,
        }
    }

    /// Message text for the summary post.
    pub fn render(&self) -> String {
        let mut text = String::from("📊 **Daily Task Summary**\n\n");

        let completed = if self.completed.is_empty() {
            "nobody yet".to_string()
        } else {
            self.completed.join(", ")
        };
        // Writing to a String can't fail.
        let _ = writeln!(
            text,
            "✅ **Completed ({}):** {completed}",
            self.completed.len()
        );
        let _ = writeln!(text, "💪 **Attempted:** {}", self.attempted_count);
        let _ = writeln!(text, "⏭️ **Skipped:** {}", self.skipped_count);
        let _ = writeln!(
            text,
            "😴 **Didn't participate:** {}",
            self.not_participated_count
        );
        text
    }
}

#[cfg(test)]
mod tests {
    use serenity::UserId;

    use super::*;
    use crate::data::ResponseStore;
    use crate::lib::gateway::mock::MockGateway;
    use crate::serenity;

    fn user(id: u64) -> UserId {
        UserId::new(id)
    }

    #[tokio::test]
    async fn changed_answers_are_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());
        // A, B, C are people, D is a bot.
        let gateway = MockGateway::with_roster(&[(1, false), (2, false), (3, false), (4, true)]);

        store.record(user(1), Category::Completed).await.unwrap();
        store.record(user(2), Category::Attempted).await.unwrap();
        store.record(user(1), Category::Skipped).await.unwrap();

        let tally = store.snapshot().await;
        let report = SummaryReport::build(&gateway.roster, &tally, &gateway).await;

        assert_eq!(
            report,
            SummaryReport {
                completed: vec![],
                attempted_count: 1,
                skipped_count: 1,
                not_participated_count: 1,
            }
        );
    }

    #[tokio::test]
    async fn unknown_users_get_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());
        let gateway = MockGateway::with_roster(&[(1, false)]);

        store.record(user(1), Category::Completed).await.unwrap();
        store.record(user(99), Category::Completed).await.unwrap();

        let tally = store.snapshot().await;
        let report = SummaryReport::build(&gateway.roster, &tally, &gateway).await;

        assert_eq!(report.completed, vec!["user1", "Unknown User (99)"]);
        assert_eq!(report.not_participated_count, 0);
    }

    #[tokio::test]
    async fn never_double_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());
        let members: Vec<(u64, bool)> = (1..=6).map(|id| (id, false)).collect();
        let gateway = MockGateway::with_roster(&members);

        let answers = [
            (1, Category::Completed),
            (2, Category::Completed),
            (2, Category::Attempted),
            (3, Category::Skipped),
            (3, Category::Completed),
            (4, Category::Attempted),
            (4, Category::Attempted),
        ];
        for (id, category) in answers {
            store.record(user(id), category).await.unwrap();
        }

        let tally = store.snapshot().await;
        let report = SummaryReport::build(&gateway.roster, &tally, &gateway).await;
        let total = report.completed.len()
            + report.attempted_count
            + report.skipped_count
            + report.not_participated_count;

        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.attempted_count, 2);
        assert_eq!(report.skipped_count, 0);
        assert_eq!(total, members.len());
    }

    #[test]
    fn render_lists_names_and_counts() {
        let report = SummaryReport {
            completed: vec!["ada".to_string(), "grace".to_string()],
            attempted_count: 3,
            skipped_count: 1,
            not_participated_count: 4,
        };

        let text = report.render();

        assert!(text.contains("Completed (2):** ada, grace"));
        assert!(text.contains("Attempted:** 3"));
        assert!(text.contains("Skipped:** 1"));
        assert!(text.contains("Didn't participate:** 4"));
    }
}
