//! In-memory stand-ins for Discord and the activity sink, for unit tests.

use crate::activity::{ActivityKind, ActivityLogger, ActivityRecord, ActivitySink};
use crate::bulk::ThrottlePolicy;
use crate::config::Settings;
use crate::gateway::{ChannelInfo, Gateway, GatewayError, Origin, Reply};
use crate::modules::router::{InboundMessage, Router};
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, ChannelType, GuildId, MessageId, Permissions, UserId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const GUILD: GuildId = GuildId::new(1);
pub const ADMIN: UserId = UserId::new(10);
pub const MEMBER: UserId = UserId::new(20);

/// Records every activity record it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<ActivityKind> {
        self.records().iter().map(|r| r.event).collect()
    }
}

#[async_trait]
impl ActivitySink for MemorySink {
    fn record(&self, record: &ActivityRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

#[derive(Debug, Default)]
struct FakeState {
    channels: Vec<ChannelInfo>,
    next_id: u64,
    admins: HashSet<UserId>,
    member_lookup_fails: bool,
    failing: HashSet<String>,
    failing_ids: HashSet<ChannelId>,
    fatal: HashSet<String>,
    panicking: HashSet<String>,
    deleted_ids: HashSet<ChannelId>,
    member_lookups: usize,
    created: Vec<String>,
    deleted: Vec<String>,
    sent: Vec<(String, String)>,
    replies: Vec<(Origin, Reply)>,
}

/// A guild held in memory. Channel operations mutate it; every call is recorded.
#[derive(Debug, Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().next_id = 1000;
        gateway
    }

    pub fn with_channel(self, name: &str, kind: ChannelType) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id;
            state.next_id += 1;
            let position = state.channels.len() as u16;
            state.channels.push(ChannelInfo {
                id: ChannelId::new(id),
                name: name.to_string(),
                kind,
                position,
            });
        }
        self
    }

    pub fn with_text_channels(self, names: &[&str]) -> Self {
        names
            .iter()
            .fold(self, |gateway, name| gateway.with_channel(name, ChannelType::Text))
    }

    pub fn with_admin(self, user_id: UserId) -> Self {
        self.state.lock().unwrap().admins.insert(user_id);
        self
    }

    pub fn with_failing_member_lookup(self) -> Self {
        self.state.lock().unwrap().member_lookup_fails = true;
        self
    }

    /// Calls that target a channel with this name fail with `Forbidden`.
    pub fn failing_on(self, name: &str) -> Self {
        self.state.lock().unwrap().failing.insert(name.to_string());
        self
    }

    /// Calls that target a channel with this name fail with a fatal `Connection` error.
    pub fn fatal_on(self, name: &str) -> Self {
        self.state.lock().unwrap().fatal.insert(name.to_string());
        self
    }

    /// Deleting or messaging this exact channel fails with `Forbidden`.
    pub fn failing_on_channel(self, channel_id: ChannelId) -> Self {
        self.state.lock().unwrap().failing_ids.insert(channel_id);
        self
    }

    /// Calls that target a channel with this name panic.
    pub fn panicking_on(self, name: &str) -> Self {
        self.state.lock().unwrap().panicking.insert(name.to_string());
        self
    }

    /// Ids of every channel with this name, in position order.
    pub fn channel_ids(&self, name: &str) -> Vec<ChannelId> {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.id)
            .collect()
    }

    pub fn channel_id(&self, name: &str) -> ChannelId {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .expect("no such channel")
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// (channel name, content) for every message sent outside of replies.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.state
            .lock()
            .unwrap()
            .replies
            .iter()
            .map(|(_, reply)| reply.clone())
            .collect()
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.replies()
            .iter()
            .filter_map(|r| r.as_text().map(str::to_string))
            .collect()
    }

    pub fn last_reply(&self) -> Option<String> {
        self.reply_texts().pop()
    }

    pub fn member_lookups(&self) -> usize {
        self.state.lock().unwrap().member_lookups
    }

    /// True when the fake saw no mutation and sent nothing at all.
    pub fn untouched(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.created.is_empty()
            && state.deleted.is_empty()
            && state.sent.is_empty()
            && state.replies.is_empty()
    }
}

impl FakeGateway {
    /// Panics with the state lock released, so later calls still work.
    fn panic_if_configured(&self, name: &str) {
        let panics = self.state.lock().unwrap().panicking.contains(name);
        if panics {
            panic!("fake gateway told to panic on {}", name);
        }
    }

    fn channel_name(&self, channel_id: ChannelId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| c.name.clone())
    }
}

fn check(state: &FakeState, name: &str, channel_id: Option<ChannelId>) -> Result<(), GatewayError> {
    if state.fatal.contains(name) {
        return Err(GatewayError::Connection(format!("lost connection at {}", name)));
    }
    let failing_id = channel_id.map_or(false, |id| state.failing_ids.contains(&id));
    if state.failing.contains(name) || failing_id {
        return Err(GatewayError::Forbidden(format!("cannot touch {}", name)));
    }
    Ok(())
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn member_permissions(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Permissions, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.member_lookups += 1;
        if state.member_lookup_fails {
            return Err(GatewayError::NotFound("member".into()));
        }
        if state.admins.contains(&user_id) {
            Ok(Permissions::ADMINISTRATOR | Permissions::SEND_MESSAGES)
        } else {
            Ok(Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY)
        }
    }

    async fn guild_channels(&self, _guild_id: GuildId) -> Result<Vec<ChannelInfo>, GatewayError> {
        Ok(self.state.lock().unwrap().channels.clone())
    }

    async fn create_text_channel(
        &self,
        _guild_id: GuildId,
        name: &str,
    ) -> Result<ChannelInfo, GatewayError> {
        self.panic_if_configured(name);
        let mut state = self.state.lock().unwrap();
        check(&state, name, None)?;

        let id = state.next_id;
        state.next_id += 1;
        let channel = ChannelInfo {
            id: ChannelId::new(id),
            name: name.to_string(),
            kind: ChannelType::Text,
            position: state.channels.len() as u16,
        };
        state.channels.push(channel.clone());
        state.created.push(name.to_string());
        Ok(channel)
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<(), GatewayError> {
        if let Some(name) = self.channel_name(channel_id) {
            self.panic_if_configured(&name);
        }
        let mut state = self.state.lock().unwrap();
        let index = state
            .channels
            .iter()
            .position(|c| c.id == channel_id)
            .ok_or_else(|| GatewayError::NotFound(format!("channel {}", channel_id)))?;

        let name = state.channels[index].name.clone();
        check(&state, &name, Some(channel_id))?;

        state.channels.remove(index);
        state.deleted_ids.insert(channel_id);
        state.deleted.push(name);
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), GatewayError> {
        if let Some(name) = self.channel_name(channel_id) {
            self.panic_if_configured(&name);
        }
        let mut state = self.state.lock().unwrap();
        let name = state
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| c.name.clone())
            .ok_or_else(|| GatewayError::NotFound(format!("channel {}", channel_id)))?;

        check(&state, &name, Some(channel_id))?;
        state.sent.push((name, content.to_string()));
        Ok(())
    }

    async fn reply(&self, origin: Origin, reply: Reply) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.deleted_ids.contains(&origin.channel_id) {
            return Err(GatewayError::NotFound(format!("channel {}", origin.channel_id)));
        }
        state.replies.push((origin, reply));
        Ok(())
    }
}

/// A router over `gateway` with throttling disabled, plus the sink it logs to.
pub fn test_router(gateway: Arc<FakeGateway>) -> (Router, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let activity = ActivityLogger::new(vec![sink.clone() as Arc<dyn ActivitySink>]);
    let settings = Settings {
        throttle: ThrottlePolicy::none(),
        ..Settings::default()
    };
    (Router::new(gateway, settings, activity), sink)
}

/// A guild message from `author`, posted in `channel_id`.
pub fn message_from(author: UserId, channel_id: ChannelId, content: &str) -> InboundMessage {
    InboundMessage {
        author_id: author,
        author_tag: format!("user{}", author),
        author_is_bot: false,
        guild_id: Some(GUILD),
        guild_name: Some("Test Guild".to_string()),
        channel_id,
        message_id: MessageId::new(5000),
        content: content.to_string(),
    }
}

/// An administrator's message from a channel the fake does not hold.
pub fn admin_message(content: &str) -> InboundMessage {
    message_from(ADMIN, ChannelId::new(1), content)
}
