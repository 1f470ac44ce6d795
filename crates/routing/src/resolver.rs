//! Session-key resolution across per-agent stores.

use std::path::PathBuf;

use {hermod_config::HermodConfig, hermod_sessions::SessionKey};

use crate::{error::Result, stores::StoreManager};

/// What we know about the session an event belongs to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveRequest<'a> {
    /// Explicit key supplied by the caller. Always wins when present.
    pub session_key: Option<&'a str>,
    /// Session id to search for when no key or peer candidate matches.
    pub session_id: Option<&'a str>,
    /// Peer address of the conversation.
    pub peer: Option<&'a str>,
    /// Channel provider name, used to derive candidate keys.
    pub channel: &'a str,
}

/// Resolution result. `session_key` of `None` means "new session"; the
/// caller creates the entry lazily under `agent_id`.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub session_key: Option<SessionKey>,
    pub agent_id: String,
    /// Store file that owns (or will own) the entry.
    pub store_path: PathBuf,
}

/// Find the canonical session key for a request.
///
/// 1. An explicit key wins outright; a disagreeing `session_id` is ignored
///    and triggers no search.
/// 2. A peer address derives a candidate key for the primary agent and
///    checks that store.
/// 3. A `session_id` with no candidate hit searches the remaining agents'
///    stores in configured order, never re-checking a store. First match
///    wins.
/// 4. Otherwise the session is new.
///
/// Absence is representational: this never fails on a lookup miss, only on
/// store I/O.
pub async fn resolve(
    stores: &StoreManager,
    config: &HermodConfig,
    request: ResolveRequest<'_>,
) -> Result<Resolution> {
    let primary = config.primary_agent();

    if let Some(raw) = request.session_key {
        let key = SessionKey::from(raw);
        let agent_id = key
            .agent_id()
            .map_or_else(|| primary.clone(), str::to_string);
        return Ok(Resolution {
            store_path: config.store_path(&agent_id),
            session_key: Some(key),
            agent_id,
        });
    }

    let mut searched: Vec<String> = Vec::new();

    if let Some(peer) = request.peer {
        let candidate = SessionKey::for_peer(&primary, request.channel, peer);
        let found_id = stores
            .with_store(&primary, |s| s.get(&candidate).map(|e| e.session_id.clone()))
            .await?;
        searched.push(primary.clone());

        let candidate_matches = match (request.session_id, found_id) {
            (None, _) => true,
            (Some(wanted), Some(found)) => found == wanted,
            (Some(_), None) => false,
        };
        if candidate_matches {
            return Ok(Resolution {
                session_key: Some(candidate),
                store_path: config.store_path(&primary),
                agent_id: primary,
            });
        }
    }

    if let Some(wanted) = request.session_id {
        for agent_id in config.agent_ids() {
            if searched.contains(&agent_id) {
                continue;
            }
            let hit = stores
                .with_store(&agent_id, |s| {
                    s.find_by_session_id(wanted).map(|(key, _)| key.clone())
                })
                .await?;
            searched.push(agent_id.clone());
            if let Some(key) = hit {
                tracing::debug!(agent = %agent_id, key = %key, "session id matched in store");
                return Ok(Resolution {
                    session_key: Some(key),
                    store_path: config.store_path(&agent_id),
                    agent_id,
                });
            }
        }
    }

    Ok(Resolution {
        session_key: None,
        store_path: config.store_path(&primary),
        agent_id: primary,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hermod_config::{AgentConfig, SessionConfig};
    use hermod_sessions::SessionStore;

    use super::*;

    struct Fixture {
        config: HermodConfig,
        stores: StoreManager,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = HermodConfig {
                agents: vec![
                    AgentConfig {
                        id: "alfred".into(),
                        ..AgentConfig::default()
                    },
                    AgentConfig {
                        id: "baerbel".into(),
                        ..AgentConfig::default()
                    },
                ],
                session: SessionConfig {
                    store_dir: Some(dir.path().to_path_buf()),
                    ..SessionConfig::default()
                },
                ..HermodConfig::default()
            };
            let stores = StoreManager::new(Arc::new(config.clone()));
            Self {
                config,
                stores,
                _dir: dir,
            }
        }

        /// Seed one agent's store with an entry, returning its session id.
        async fn seed(&self, agent_id: &str, key: &SessionKey) -> String {
            let mut store = SessionStore::load(self.config.store_path(agent_id)).unwrap();
            let id = store.upsert(key).session_id.clone();
            store.save().await.unwrap();
            id
        }
    }

    #[tokio::test]
    async fn explicit_key_wins_over_conflicting_session_id() {
        let fx = Fixture::new();
        let other_key = SessionKey::for_peer("baerbel", "whatsapp", "+2");
        let other_id = fx.seed("baerbel", &other_key).await;

        let resolution = resolve(
            &fx.stores,
            &fx.config,
            ResolveRequest {
                session_key: Some("agent:alfred:whatsapp:+1"),
                session_id: Some(&other_id),
                channel: "whatsapp",
                ..ResolveRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(
            resolution.session_key.unwrap().as_str(),
            "agent:alfred:whatsapp:+1"
        );
        assert_eq!(resolution.agent_id, "alfred");
        // The conflicting id triggered no cross-store search.
        assert!(fx.stores.loaded().await.is_empty());
    }

    #[tokio::test]
    async fn peer_derives_primary_candidate() {
        let fx = Fixture::new();
        let resolution = resolve(
            &fx.stores,
            &fx.config,
            ResolveRequest {
                peer: Some("+1000"),
                channel: "whatsapp",
                ..ResolveRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(
            resolution.session_key.unwrap().as_str(),
            "agent:alfred:whatsapp:+1000"
        );
    }

    #[tokio::test]
    async fn session_id_found_in_secondary_store() {
        let fx = Fixture::new();
        let key = SessionKey::for_peer("baerbel", "signal", "+7");
        let id = fx.seed("baerbel", &key).await;

        let resolution = resolve(
            &fx.stores,
            &fx.config,
            ResolveRequest {
                session_id: Some(&id),
                channel: "signal",
                ..ResolveRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(resolution.session_key.unwrap(), key);
        assert_eq!(resolution.agent_id, "baerbel");
    }

    #[tokio::test]
    async fn primary_store_is_searched_at_most_once() {
        let fx = Fixture::new();
        let key = SessionKey::for_peer("alfred", "whatsapp", "+1000");
        let id = fx.seed("alfred", &key).await;

        let resolution = resolve(
            &fx.stores,
            &fx.config,
            ResolveRequest {
                session_id: Some(&id),
                peer: Some("+1000"),
                channel: "whatsapp",
                ..ResolveRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(resolution.session_key.unwrap(), key);
        // The candidate matched in the primary store; no other store was
        // touched and the primary was not revisited.
        assert_eq!(fx.stores.loaded().await, vec!["alfred"]);
    }

    #[tokio::test]
    async fn unknown_session_id_means_new_session() {
        let fx = Fixture::new();
        let resolution = resolve(
            &fx.stores,
            &fx.config,
            ResolveRequest {
                session_id: Some("no-such-id"),
                peer: Some("+1000"),
                channel: "whatsapp",
                ..ResolveRequest::default()
            },
        )
        .await
        .unwrap();

        assert!(resolution.session_key.is_none());
        assert_eq!(resolution.agent_id, "alfred");
        // Every configured store was consulted exactly once.
        assert_eq!(fx.stores.loaded().await, vec!["alfred", "baerbel"]);
    }
}
