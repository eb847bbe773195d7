use std::{fmt::Display, net::SocketAddr, str::FromStr};

use anyhow::{Context, anyhow};
use tracing::info;

use crate::backend::Tables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted PostgREST project.
    Supabase,
    /// Process-local tables, gone on restart.
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" | "rest" => Ok(BackendKind::Supabase),
            "memory" => Ok(BackendKind::Memory),
            other => Err(anyhow!("unknown backend {other:?}, expected supabase or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub backend: BackendKind,
    pub supabase_url: String,
    pub supabase_key: String,
    pub tables: Tables,
    pub session_idle_minutes: i64,
    pub secure_cookie: bool,
}

impl Config {
    /// Reads the process environment, after `.env` if there is one.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let backend: BackendKind = try_load(&var, "SOCIALSYNC_BACKEND", "supabase")?;

        let (supabase_url, supabase_key) = match backend {
            BackendKind::Supabase => (
                var("SUPABASE_URL").context("SUPABASE_URL is required for the supabase backend")?,
                var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY is required for the supabase backend")?,
            ),
            BackendKind::Memory => (String::new(), String::new()),
        };

        let defaults = Tables::default();
        let table = |key: &str, default: String| var(key).unwrap_or(default);
        let tables = Tables {
            users: table("TABLE_USERS", defaults.users),
            posts: table("TABLE_POSTS", defaults.posts),
            events: table("TABLE_EVENTS", defaults.events),
            event_participants: table("TABLE_EVENT_PARTICIPANTS", defaults.event_participants),
            friends: table("TABLE_FRIENDS", defaults.friends),
            directory_users: table("TABLE_DIRECTORY_USERS", defaults.directory_users),
            join_event_fn: table("TABLE_JOIN_EVENT_FN", defaults.join_event_fn),
            delete_event_fn: table("TABLE_DELETE_EVENT_FN", defaults.delete_event_fn),
            participation_fn: table("TABLE_PARTICIPATION_FN", defaults.participation_fn),
        };

        Ok(Self {
            bind: try_load(&var, "BIND_ADDR", "0.0.0.0:8080")?,
            backend,
            supabase_url,
            supabase_key,
            tables,
            session_idle_minutes: try_load(&var, "SESSION_IDLE_MINUTES", "60")?,
            secure_cookie: try_load(&var, "SESSION_SECURE_COOKIE", "false")?,
        })
    }
}

fn try_load<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });
    raw.parse().map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
