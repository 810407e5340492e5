//! The bot's view of discord outside of command contexts.
//!
//! Scheduled jobs only talk to discord through [Gateway], so they can be run
//! against [mock::MockGateway] in tests.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::ChannelId;
use serenity::GuildId;
use serenity::Http;
use serenity::UserId;
use tracing::instrument;

use crate::error::GatewayError;
use crate::lib::collector;
use crate::serenity;

/// Max members discord returns per request.
const MEMBER_PAGE: u64 = 1000;

/// A message to broadcast to the configured channel.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
#[builder(on(String, into))]
pub struct Post {
    /// Text of the message.
    pub content: String,
    /// Optional image to attach.
    pub asset: Option<PathBuf>,
    /// Attach the response buttons.
    #[builder(default = false)]
    pub with_collector: bool,
}

/// A guild member as far as the summary cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterMember {
    pub id: UserId,
    pub is_bot: bool,
}

/// Delivers messages to and reads members from the target guild.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send `post` to the target channel.
    async fn broadcast(&self, post: Post) -> Result<(), GatewayError>;

    /// The name `user` is shown with in the target guild.
    async fn display_name(&self, user: UserId) -> Result<String, GatewayError>;

    /// Everyone in the target guild, bots included. Never cached.
    async fn members(&self) -> Result<Vec<RosterMember>, GatewayError>;

    /// Check that discord is still reachable, returning the bot's name.
    async fn heartbeat(&self) -> Result<String, GatewayError>;
}

/// [Gateway] backed by serenity's HTTP client.
#[derive(Debug, Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
    guild: GuildId,
    channel: ChannelId,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, guild: GuildId, channel: ChannelId) -> Self {
        Self {
            http,
            guild,
            channel,
        }
    }
}

#[async_trait]
impl Gateway for SerenityGateway {
    #[instrument(skip_all, fields(channel = %self.channel))]
    async fn broadcast(&self, post: Post) -> Result<(), GatewayError> {
        let mut message = serenity::CreateMessage::new().content(post.content);

        if let Some(path) = post.asset {
            let attachment = serenity::CreateAttachment::path(&path)
                .await
                .map_err(|source| GatewayError::Attachment { path, source })?;
            message = message.add_file(attachment);
        }
        if post.with_collector {
            message = message.components(collector::components());
        }

        self.channel
            .send_message(&self.http, message)
            .await
            .map_err(GatewayError::Delivery)?;
        tracing::debug!("Message delivered.");
        Ok(())
    }

    async fn display_name(&self, user: UserId) -> Result<String, GatewayError> {
        match self.guild.member(&self.http, user).await {
            Ok(member) => Ok(member.display_name().to_string()),
            Err(e) => {
                tracing::debug!("Could not resolve {user}: {e}");
                Err(GatewayError::UnknownUser(user))
            }
        }
    }

    #[instrument(skip_all, fields(guild = %self.guild))]
    async fn members(&self) -> Result<Vec<RosterMember>, GatewayError> {
        let mut roster = Vec::new();
        let mut after = None;

        loop {
            let page = self
                .guild
                .members(&self.http, Some(MEMBER_PAGE), after)
                .await
                .map_err(GatewayError::Roster)?;
            let page_len = page.len();

            after = page.last().map(|m| m.user.id);
            roster.extend(page.into_iter().map(|m| RosterMember {
                id: m.user.id,
                is_bot: m.user.bot,
            }));

            if (page_len as u64) < MEMBER_PAGE {
                break;
            }
        }

        tracing::debug!("Fetched {} members.", roster.len());
        Ok(roster)
    }

    async fn heartbeat(&self) -> Result<String, GatewayError> {
        let me = self
            .http
            .get_current_user()
            .await
            .map_err(GatewayError::Heartbeat)?;
        Ok(me.name.clone())
    }
}

#[cfg(test)]
pub mod mock {
    //! In-memory [Gateway] for tests.

    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use super::*;

    /// Records broadcasts instead of sending them.
    #[derive(Debug, Default)]
    pub struct MockGateway {
        pub posts: Mutex<Vec<Post>>,
        pub names: HashMap<UserId, String>,
        pub roster: Vec<RosterMember>,
        pub fail_broadcast: AtomicBool,
        pub fail_roster: AtomicBool,
    }

    impl MockGateway {
        /// A gateway knowing `members`, named after their ids.
        pub fn with_roster(members: &[(u64, bool)]) -> Self {
            let roster: Vec<RosterMember> = members
                .iter()
                .map(|&(id, is_bot)| RosterMember {
                    id: UserId::new(id),
                    is_bot,
                })
                .collect();
            let names = roster
                .iter()
                .map(|m| (m.id, format!("user{}", m.id)))
                .collect();
            Self {
                names,
                roster,
                ..Default::default()
            }
        }

        pub fn failing_broadcasts(self) -> Self {
            self.fail_broadcast.store(true, Ordering::SeqCst);
            self
        }

        pub fn sent(&self) -> Vec<Post> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn broadcast(&self, post: Post) -> Result<(), GatewayError> {
            if self.fail_broadcast.load(Ordering::SeqCst) {
                return Err(GatewayError::Delivery(serenity::Error::Other("offline")));
            }
            self.posts.lock().unwrap().push(post);
            Ok(())
        }

        async fn display_name(&self, user: UserId) -> Result<String, GatewayError> {
            self.names
                .get(&user)
                .cloned()
                .ok_or(GatewayError::UnknownUser(user))
        }

        async fn members(&self) -> Result<Vec<RosterMember>, GatewayError> {
            if self.fail_roster.load(Ordering::SeqCst) {
                return Err(GatewayError::Roster(serenity::Error::Other("offline")));
            }
            Ok(self.roster.clone())
        }

        async fn heartbeat(&self) -> Result<String, GatewayError> {
            Ok("mock".to_string())
        }
    }
}
