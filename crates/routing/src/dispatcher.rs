//! Top-level event dispatch: session locking, directive handling, model
//! selection, group-history flushing, and sequential/parallel fan-out.

use std::sync::Arc;

use {dashmap::DashMap, tokio::sync::Mutex};

use {
    hermod_common::{AgentInvocation, AgentReply, ChatType, InboundEvent, ReplyPayload},
    hermod_config::{AgentConfig, BroadcastStrategy, HermodConfig, SupersedeMode},
    hermod_directives::{DirectiveContext, process_directives},
    hermod_models::{ModelRegistry, SelectionArgs, resolve_selection},
    hermod_sessions::{
        ElevatedLevel, ExecDefaults, GroupActivation, SessionEntry, SessionKey, SystemEventQueue,
    },
};

use crate::{
    error::{Error, Result},
    group_history::{GroupHistoryBuffer, GroupMessage},
    reply_filter::{ReplyFilter, ReplyFilterOpts, ReplyMode},
    resolver::{ResolveRequest, resolve},
    stores::StoreManager,
};

/// The downstream agent runtime.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    async fn invoke(&self, invocation: AgentInvocation) -> anyhow::Result<AgentReply>;
}

/// Outcome of one target agent within a dispatch.
#[derive(Debug)]
pub struct TargetResult {
    pub agent_id: String,
    pub session_key: SessionKey,
    /// Filtered payloads from the agent reply, empty when no invocation ran.
    pub payloads: Vec<ReplyPayload>,
    /// Directive response delivered without an agent invocation.
    pub response: Option<String>,
    /// Per-target failure; siblings in the same dispatch are unaffected.
    pub error: Option<String>,
}

struct TargetSpec {
    agent_id: String,
    session_key: SessionKey,
}

/// Routes one inbound event to its target agents.
pub struct Dispatcher {
    config: Arc<HermodConfig>,
    stores: StoreManager,
    registry: Arc<ModelRegistry>,
    runner: Arc<dyn AgentRunner>,
    events: SystemEventQueue,
    history: GroupHistoryBuffer,
    /// One mutex per session key: at most one in-flight turn per session.
    locks: DashMap<String, Arc<Mutex<()>>>,
    reply_mode: ReplyMode,
    reply_opts: ReplyFilterOpts,
}

impl Dispatcher {
    pub fn new(
        config: Arc<HermodConfig>,
        registry: Arc<ModelRegistry>,
        runner: Arc<dyn AgentRunner>,
    ) -> Self {
        Self {
            stores: StoreManager::new(Arc::clone(&config)),
            config,
            registry,
            runner,
            events: SystemEventQueue::new(),
            history: GroupHistoryBuffer::new(),
            locks: DashMap::new(),
            reply_mode: ReplyMode::default(),
            reply_opts: ReplyFilterOpts::default(),
        }
    }

    pub fn with_reply_mode(mut self, mode: ReplyMode, opts: ReplyFilterOpts) -> Self {
        self.reply_mode = mode;
        self.reply_opts = opts;
        self
    }

    pub fn events(&self) -> &SystemEventQueue {
        &self.events
    }

    pub fn history(&self) -> &GroupHistoryBuffer {
        &self.history
    }

    pub fn stores(&self) -> &StoreManager {
        &self.stores
    }

    /// Route one inbound event, fanning out per the broadcast configuration.
    ///
    /// A group message without a mention accumulates in the history buffer
    /// (unless the session opted into always-on replies) and produces no
    /// results. One target's failure never halts its siblings.
    pub async fn dispatch(&self, event: &InboundEvent) -> Vec<TargetResult> {
        let (targets, strategy) = match self.targets_for(event).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(from = %event.from, error = %e, "session resolution failed");
                let primary = self.config.primary_agent();
                let key = SessionKey::for_peer(&primary, &event.provider, &event.from);
                return vec![TargetResult {
                    agent_id: primary,
                    session_key: key,
                    payloads: vec![],
                    response: None,
                    error: Some(e.to_string()),
                }];
            },
        };
        let scope = format!("{}:{}", event.provider, event.from);

        if event.chat_type == ChatType::Group
            && !event.mentioned
            && !self.group_always(&targets).await
        {
            let sender = event
                .sender_name
                .clone()
                .unwrap_or_else(|| event.from.clone());
            self.history.push(&scope, sender, &event.body);
            tracing::debug!(%scope, "buffered group message without mention");
            return vec![];
        }

        match strategy {
            BroadcastStrategy::Sequential => {
                let mut results = Vec::with_capacity(targets.len());
                for target in &targets {
                    results.push(self.run_target(target, event, &scope).await);
                }
                results
            },
            BroadcastStrategy::Parallel => {
                futures::future::join_all(
                    targets
                        .iter()
                        .map(|target| self.run_target(target, event, &scope)),
                )
                .await
            },
        }
    }

    /// Heartbeat turn for one session: no user text, but pending system
    /// events still reach the agent.
    pub async fn heartbeat(
        &self,
        key: &SessionKey,
        model_override: Option<String>,
    ) -> Result<AgentReply> {
        let lock = self.session_lock(key);
        let _guard = lock.lock_owned().await;

        let mut lines: Vec<String> = self
            .events
            .drain(key)
            .into_iter()
            .map(|e| format!("System: {e}"))
            .collect();
        lines.push("Heartbeat.".to_string());

        let invocation = AgentInvocation {
            session_key: key.to_string(),
            prompt: lines.join("\n"),
            model_override: None,
            provider_override: None,
            is_heartbeat: true,
            heartbeat_model_override: model_override,
        };
        self.runner.invoke(invocation).await.map_err(Error::Invocation)
    }

    /// Resolve the target list for an event. Broadcast groups derive one
    /// key per member agent; everything else goes through the session-key
    /// resolver so explicit keys and session-id hints follow one set of
    /// rules.
    async fn targets_for(
        &self,
        event: &InboundEvent,
    ) -> Result<(Vec<TargetSpec>, BroadcastStrategy)> {
        if event.session_key.is_none() {
            if let Some(group) = self.config.broadcast.get(&event.from) {
                let targets = group
                    .agents
                    .iter()
                    .map(|agent_id| TargetSpec {
                        agent_id: agent_id.clone(),
                        session_key: SessionKey::for_peer(agent_id, &event.provider, &event.from),
                    })
                    .collect();
                return Ok((targets, group.strategy));
            }
        }

        let resolution = resolve(
            &self.stores,
            &self.config,
            ResolveRequest {
                session_key: event.session_key.as_deref(),
                session_id: event.session_id.as_deref(),
                peer: Some(&event.from),
                channel: &event.provider,
            },
        )
        .await?;
        let session_key = resolution.session_key.unwrap_or_else(|| {
            // New session: the primary agent owns the peer-derived key.
            SessionKey::for_peer(&resolution.agent_id, &event.provider, &event.from)
        });
        Ok((
            vec![TargetSpec {
                agent_id: resolution.agent_id,
                session_key,
            }],
            BroadcastStrategy::Sequential,
        ))
    }

    /// Whether the first target's session opted into replying to every
    /// group message.
    async fn group_always(&self, targets: &[TargetSpec]) -> bool {
        let Some(target) = targets.first() else {
            return false;
        };
        self.stores
            .with_store(&target.agent_id, |s| {
                s.get(&target.session_key).and_then(|e| e.group_activation)
                    == Some(GroupActivation::Always)
            })
            .await
            .unwrap_or(false)
    }

    async fn run_target(
        &self,
        target: &TargetSpec,
        event: &InboundEvent,
        scope: &str,
    ) -> TargetResult {
        match self.run_target_inner(target, event, scope).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    agent = %target.agent_id,
                    key = %target.session_key,
                    error = %e,
                    "target dispatch failed"
                );
                TargetResult {
                    agent_id: target.agent_id.clone(),
                    session_key: target.session_key.clone(),
                    payloads: vec![],
                    response: None,
                    error: Some(e.to_string()),
                }
            },
        }
    }

    async fn run_target_inner(
        &self,
        target: &TargetSpec,
        event: &InboundEvent,
        scope: &str,
    ) -> Result<TargetResult> {
        let key = &target.session_key;

        let lock = self.session_lock(key);
        let _guard = match self.config.session.supersede {
            SupersedeMode::Queue => lock.lock_owned().await,
            SupersedeMode::Abort => lock
                .try_lock_owned()
                .map_err(|_| Error::SessionBusy(key.clone()))?,
        };

        let agent_cfg = self
            .config
            .agent(&target.agent_id)
            .cloned()
            .unwrap_or_else(|| AgentConfig {
                id: target.agent_id.clone(),
                ..AgentConfig::default()
            });

        let mut entry = self
            .stores
            .with_store(&target.agent_id, |s| s.upsert(key).clone())
            .await?;

        let outcome = self.process_message(event, &mut entry, &agent_cfg);

        if outcome.entry_changed {
            self.write_entry(&target.agent_id, key, &entry).await?;
        }
        for system_event in &outcome.system_events {
            self.events.push(key, system_event.clone());
        }

        if outcome.stripped_text.is_empty() {
            // Directive-only (or empty) message: no agent invocation.
            return Ok(TargetResult {
                agent_id: target.agent_id.clone(),
                session_key: key.clone(),
                payloads: vec![],
                response: outcome.response,
                error: None,
            });
        }

        let selection = resolve_selection(
            SelectionArgs {
                model_override: entry.model_override.as_deref(),
                provider_override: entry.provider_override.as_deref(),
                agent_default: agent_cfg.default_model.as_deref(),
                global_default: self.config.defaults.model.as_deref(),
                default_provider: &self.config.defaults.provider,
                aliases: &agent_cfg.model_aliases,
            },
            &self.registry,
        )?;

        let backlog = self.history.take(scope);
        let invocation = AgentInvocation {
            session_key: key.to_string(),
            prompt: self.build_prompt(key, &backlog, &outcome.stripped_text),
            model_override: Some(selection.model.clone()),
            provider_override: Some(selection.provider.clone()),
            is_heartbeat: false,
            heartbeat_model_override: None,
        };
        tracing::debug!(
            agent = %target.agent_id,
            key = %key,
            model = %selection.model,
            "invoking agent"
        );
        let reply = match self.runner.invoke(invocation).await {
            Ok(reply) => reply,
            Err(e) => {
                // The failed turn never reached the agent; put the backlog
                // back so the next invocation (a sibling target or a later
                // dispatch) still delivers it.
                self.history.restore(scope, backlog);
                return Err(Error::Invocation(e));
            },
        };

        entry.touch(&event.provider, &event.to, &selection.provider, &selection.model);
        self.write_entry(&target.agent_id, key, &entry).await?;

        let mut filter = ReplyFilter::new(self.reply_mode, self.reply_opts);
        let payloads = reply
            .into_payloads()
            .into_iter()
            .map(|p| filter.apply(p))
            .collect();

        Ok(TargetResult {
            agent_id: target.agent_id.clone(),
            session_key: key.clone(),
            payloads,
            response: outcome.response,
            error: None,
        })
    }

    fn process_message(
        &self,
        event: &InboundEvent,
        entry: &mut SessionEntry,
        agent_cfg: &AgentConfig,
    ) -> hermod_directives::DirectiveOutcome {
        let exec_defaults = ExecDefaults {
            host: agent_cfg.exec.host.clone(),
            security: agent_cfg.exec.security.clone(),
            ask: agent_cfg.exec.ask.clone(),
            node: agent_cfg.exec.node.clone(),
        };
        let ctx = DirectiveContext {
            registry: &self.registry,
            aliases: &agent_cfg.model_aliases,
            default_provider: &self.config.defaults.provider,
            agent_default_model: agent_cfg.default_model.as_deref(),
            global_default_model: self.config.defaults.model.as_deref(),
            elevated_default: agent_cfg
                .elevated_default
                .as_deref()
                .and_then(ElevatedLevel::parse),
            exec_config_defaults: &exec_defaults,
            command_authorized: event.command_authorized,
        };
        process_directives(&event.body, entry, &ctx)
    }

    /// Prompt for one invocation: pending system events, then the group
    /// backlog, then the stripped message text. The caller takes the backlog
    /// (atomically, so exactly one target in the dispatch receives it) and
    /// restores it if the invocation never reaches the agent.
    fn build_prompt(&self, key: &SessionKey, backlog: &[GroupMessage], stripped: &str) -> String {
        let mut lines: Vec<String> = self
            .events
            .drain(key)
            .into_iter()
            .map(|e| format!("System: {e}"))
            .collect();
        for message in backlog {
            lines.push(message.render());
        }
        lines.push(stripped.to_string());
        lines.join("\n")
    }

    async fn write_entry(
        &self,
        agent_id: &str,
        key: &SessionKey,
        entry: &SessionEntry,
    ) -> Result<()> {
        let entry = entry.clone();
        self.stores
            .with_store(agent_id, move |s| *s.upsert(key) = entry)
            .await?;
        self.stores.save(agent_id).await
    }

    fn session_lock(&self, key: &SessionKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.as_str().to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use {
        hermod_config::{BroadcastGroup, DefaultsConfig, SessionConfig},
        hermod_sessions::SessionStore,
    };

    use super::*;

    #[derive(Default)]
    struct MockRunner {
        calls: std::sync::Mutex<Vec<AgentInvocation>>,
        fail_for: Option<String>,
        delay: Option<Duration>,
    }

    #[async_trait::async_trait]
    impl AgentRunner for MockRunner {
        async fn invoke(&self, invocation: AgentInvocation) -> anyhow::Result<AgentReply> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push(invocation.clone());
            if let Some(fragment) = &self.fail_for {
                if invocation.session_key.contains(fragment.as_str()) {
                    anyhow::bail!("runner exploded");
                }
            }
            Ok(AgentReply::text("ack"))
        }
    }

    impl MockRunner {
        fn calls(&self) -> Vec<AgentInvocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        runner: Arc<MockRunner>,
        config: Arc<HermodConfig>,
        _dir: tempfile::TempDir,
    }

    fn fixture(strategy: BroadcastStrategy) -> Fixture {
        fixture_with(strategy, SupersedeMode::Queue, MockRunner::default())
    }

    fn fixture_with(
        strategy: BroadcastStrategy,
        supersede: SupersedeMode,
        runner: MockRunner,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(HermodConfig {
            agents: vec![
                AgentConfig {
                    id: "alfred".into(),
                    default_model: Some("anthropic/claude-opus-4-5".into()),
                    model_aliases: HashMap::from([(
                        "opus".to_string(),
                        "anthropic/claude-opus-4-5".to_string(),
                    )]),
                    ..AgentConfig::default()
                },
                AgentConfig {
                    id: "baerbel".into(),
                    default_model: Some("openai/gpt-5-mini".into()),
                    ..AgentConfig::default()
                },
            ],
            defaults: DefaultsConfig::default(),
            broadcast: HashMap::from([(
                "+1000".to_string(),
                BroadcastGroup {
                    agents: vec!["alfred".into(), "baerbel".into()],
                    strategy,
                },
            )]),
            session: SessionConfig {
                store_dir: Some(dir.path().to_path_buf()),
                supersede,
            },
        });
        let runner = Arc::new(runner);
        let dispatcher = Dispatcher::new(
            Arc::clone(&config),
            Arc::new(ModelRegistry::builtin()),
            runner.clone(),
        );
        Fixture {
            dispatcher,
            runner,
            config,
            _dir: dir,
        }
    }

    fn event(from: &str, body: &str) -> InboundEvent {
        InboundEvent {
            body: body.into(),
            from: from.into(),
            to: "+9999".into(),
            provider: "whatsapp".into(),
            command_authorized: true,
            ..InboundEvent::default()
        }
    }

    fn group_event(from: &str, body: &str, mentioned: bool) -> InboundEvent {
        InboundEvent {
            chat_type: ChatType::Group,
            mentioned,
            sender_name: Some("carol".into()),
            ..event(from, body)
        }
    }

    #[tokio::test]
    async fn sequential_broadcast_preserves_configured_order() {
        let fx = fixture(BroadcastStrategy::Sequential);

        let results = fx.dispatcher.dispatch(&event("+1000", "hello both")).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].session_key.as_str().contains("agent:alfred:"));
        assert!(results[1].session_key.as_str().contains("agent:baerbel:"));

        let calls = fx.runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].session_key.contains("agent:alfred:"));
        assert!(calls[1].session_key.contains("agent:baerbel:"));
    }

    #[tokio::test]
    async fn parallel_broadcast_invokes_each_target_once() {
        let fx = fixture(BroadcastStrategy::Parallel);

        let results = fx.dispatcher.dispatch(&event("+1000", "hello both")).await;

        assert_eq!(results.len(), 2);
        let calls = fx.runner.calls();
        assert_eq!(calls.len(), 2);
        let mut keys: Vec<&str> = calls.iter().map(|c| c.session_key.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["agent:alfred:whatsapp:+1000", "agent:baerbel:whatsapp:+1000"]
        );
    }

    #[tokio::test]
    async fn per_target_model_selection() {
        let fx = fixture(BroadcastStrategy::Sequential);

        fx.dispatcher.dispatch(&event("+1000", "hi")).await;

        let calls = fx.runner.calls();
        assert_eq!(calls[0].model_override.as_deref(), Some("claude-opus-4-5"));
        assert_eq!(calls[1].model_override.as_deref(), Some("gpt-5-mini"));
        assert_eq!(calls[1].provider_override.as_deref(), Some("openai"));
    }

    #[tokio::test]
    async fn directive_only_message_skips_the_agent_and_persists() {
        let fx = fixture(BroadcastStrategy::Sequential);

        let results = fx.dispatcher.dispatch(&event("+1000", "/model opus")).await;

        assert!(fx.runner.calls().is_empty());
        assert_eq!(results.len(), 2);
        assert!(results[0].response.is_some());

        // The override reached alfred's store file.
        let store = SessionStore::load(fx.config.store_path("alfred")).unwrap();
        let key = SessionKey::for_peer("alfred", "whatsapp", "+1000");
        assert_eq!(
            store.get(&key).unwrap().model_override.as_deref(),
            Some("claude-opus-4-5")
        );
    }

    #[tokio::test]
    async fn one_failing_target_does_not_halt_the_rest() {
        let fx = fixture_with(
            BroadcastStrategy::Sequential,
            SupersedeMode::Queue,
            MockRunner {
                fail_for: Some("agent:alfred:".into()),
                ..MockRunner::default()
            },
        );

        let results = fx.dispatcher.dispatch(&event("+1000", "hello")).await;

        assert!(results[0].error.as_deref().unwrap().contains("runner exploded"));
        assert!(results[1].error.is_none());
        assert_eq!(results[1].payloads.len(), 1);
    }

    #[tokio::test]
    async fn group_message_without_mention_accumulates() {
        let fx = fixture(BroadcastStrategy::Sequential);

        let results = fx
            .dispatcher
            .dispatch(&group_event("+1000", "random chatter", false))
            .await;

        assert!(results.is_empty());
        assert!(fx.runner.calls().is_empty());
        assert_eq!(fx.dispatcher.history().pending("whatsapp:+1000"), 1);
    }

    #[tokio::test]
    async fn group_backlog_flushes_once_to_the_first_target() {
        let fx = fixture(BroadcastStrategy::Sequential);
        fx.dispatcher
            .dispatch(&group_event("+1000", "first backlog line", false))
            .await;
        fx.dispatcher
            .dispatch(&group_event("+1000", "second backlog line", false))
            .await;

        fx.dispatcher
            .dispatch(&group_event("+1000", "what did I miss?", true))
            .await;

        let calls = fx.runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].prompt.contains("carol: first backlog line"));
        assert!(calls[0].prompt.contains("carol: second backlog line"));
        // Only the first invoked target sees the backlog.
        assert!(!calls[1].prompt.contains("backlog line"));

        // A later reply does not repeat it either.
        fx.dispatcher
            .dispatch(&group_event("+1000", "and now?", true))
            .await;
        let calls = fx.runner.calls();
        assert!(!calls[2].prompt.contains("backlog line"));
    }

    #[tokio::test]
    async fn system_events_reach_the_next_prompt() {
        let fx = fixture(BroadcastStrategy::Sequential);

        fx.dispatcher
            .dispatch(&event("+2000", "please use /elevated off for this"))
            .await;

        let calls = fx.runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("System: Elevated mode set to off."));
        assert!(calls[0].prompt.contains("please use for this"));
    }

    #[tokio::test]
    async fn explicit_session_key_routes_to_its_agent() {
        let fx = fixture(BroadcastStrategy::Sequential);
        let inbound = InboundEvent {
            session_key: Some("agent:baerbel:web:main".into()),
            ..event("+5555", "direct to baerbel")
        };

        let results = fx.dispatcher.dispatch(&inbound).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].agent_id, "baerbel");
        assert_eq!(results[0].session_key.as_str(), "agent:baerbel:web:main");
    }

    #[tokio::test]
    async fn session_id_routes_to_the_owning_store() {
        let fx = fixture(BroadcastStrategy::Sequential);
        let key = SessionKey::for_peer("baerbel", "whatsapp", "+7777");
        let id = {
            let mut store = SessionStore::load(fx.config.store_path("baerbel")).unwrap();
            let id = store.upsert(&key).session_id.clone();
            store.save().await.unwrap();
            id
        };

        let inbound = InboundEvent {
            session_id: Some(id),
            ..event("+7777", "hello again")
        };
        let results = fx.dispatcher.dispatch(&inbound).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].agent_id, "baerbel");
        assert_eq!(results[0].session_key, key);
        assert!(fx.runner.calls()[0].session_key.contains("agent:baerbel:"));
    }

    #[tokio::test]
    async fn failed_target_backlog_reaches_surviving_sibling() {
        let fx = fixture_with(
            BroadcastStrategy::Sequential,
            SupersedeMode::Queue,
            MockRunner {
                fail_for: Some("agent:alfred:".into()),
                ..MockRunner::default()
            },
        );
        fx.dispatcher
            .dispatch(&group_event("+1000", "missed line", false))
            .await;

        let results = fx
            .dispatcher
            .dispatch(&group_event("+1000", "anyone there?", true))
            .await;

        assert!(results[0].error.is_some());
        assert!(results[1].error.is_none());
        let calls = fx.runner.calls();
        assert_eq!(calls.len(), 2);
        // Alfred's invocation failed, so the backlog moved on to baerbel.
        assert!(calls[1].prompt.contains("carol: missed line"));
        assert_eq!(fx.dispatcher.history().pending("whatsapp:+1000"), 0);
    }

    #[tokio::test]
    async fn backlog_survives_when_every_target_fails() {
        let fx = fixture_with(
            BroadcastStrategy::Sequential,
            SupersedeMode::Queue,
            MockRunner {
                fail_for: Some("whatsapp:+1000".into()),
                ..MockRunner::default()
            },
        );
        fx.dispatcher
            .dispatch(&group_event("+1000", "first missed", false))
            .await;
        fx.dispatcher
            .dispatch(&group_event("+1000", "second missed", false))
            .await;

        let results = fx
            .dispatcher
            .dispatch(&group_event("+1000", "hello?", true))
            .await;

        assert!(results.iter().all(|r| r.error.is_some()));
        // Nothing reached an agent, so the backlog is still buffered in full.
        assert_eq!(fx.dispatcher.history().pending("whatsapp:+1000"), 2);
    }

    #[tokio::test]
    async fn abort_supersede_reports_busy() {
        let fx = fixture_with(
            BroadcastStrategy::Sequential,
            SupersedeMode::Abort,
            MockRunner {
                delay: Some(Duration::from_millis(50)),
                ..MockRunner::default()
            },
        );
        let inbound = event("+2000", "slow one");

        let (first, second) =
            tokio::join!(fx.dispatcher.dispatch(&inbound), fx.dispatcher.dispatch(&inbound));

        let busy = first
            .iter()
            .chain(second.iter())
            .filter(|r| r.error.as_deref().is_some_and(|e| e.contains("busy")))
            .count();
        assert_eq!(busy, 1);
        assert_eq!(fx.runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn queue_supersede_runs_both_turns() {
        let fx = fixture_with(
            BroadcastStrategy::Sequential,
            SupersedeMode::Queue,
            MockRunner {
                delay: Some(Duration::from_millis(10)),
                ..MockRunner::default()
            },
        );
        let inbound = event("+2000", "queued");

        let (first, second) =
            tokio::join!(fx.dispatcher.dispatch(&inbound), fx.dispatcher.dispatch(&inbound));

        assert!(first[0].error.is_none());
        assert!(second[0].error.is_none());
        assert_eq!(fx.runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn display_fields_update_without_touching_overrides() {
        let fx = fixture(BroadcastStrategy::Sequential);
        fx.dispatcher.dispatch(&event("+2000", "/model opus")).await;
        fx.dispatcher.dispatch(&event("+2000", "hello")).await;

        let store = SessionStore::load(fx.config.store_path("alfred")).unwrap();
        let key = SessionKey::for_peer("alfred", "whatsapp", "+2000");
        let entry = store.get(&key).unwrap();
        assert_eq!(entry.model_override.as_deref(), Some("claude-opus-4-5"));
        assert_eq!(entry.last_model.as_deref(), Some("claude-opus-4-5"));
        assert_eq!(entry.last_channel.as_deref(), Some("whatsapp"));
        assert_eq!(entry.last_to.as_deref(), Some("+9999"));
    }

    #[tokio::test]
    async fn unresolvable_default_model_is_reported() {
        let fx = fixture(BroadcastStrategy::Sequential);
        let mut config = (*fx.config).clone();
        config.agents[0].default_model = Some("anthropic/claude-nope-9".into());
        let dispatcher = Dispatcher::new(
            Arc::new(config),
            Arc::new(ModelRegistry::builtin()),
            fx.runner.clone(),
        );

        let results = dispatcher.dispatch(&event("+2000", "hello")).await;

        assert!(results[0].error.is_some());
        assert!(results[0].payloads.is_empty());
        assert!(fx.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn heartbeat_carries_pending_events() {
        let fx = fixture(BroadcastStrategy::Sequential);
        let key = SessionKey::for_peer("alfred", "whatsapp", "+2000");
        fx.dispatcher.events().push(&key, "Model switched to opus.");

        let _ = fx.dispatcher.heartbeat(&key, None).await.unwrap();

        let calls = fx.runner.calls();
        assert!(calls[0].is_heartbeat);
        assert!(calls[0].prompt.contains("System: Model switched to opus."));
        // Drained: a second heartbeat is clean.
        let _ = fx.dispatcher.heartbeat(&key, None).await.unwrap();
        assert!(!fx.runner.calls()[1].prompt.contains("Model switched"));
    }
}
