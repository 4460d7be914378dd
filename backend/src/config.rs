use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use shared::rest::SupabaseConfig;

const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60;

#[derive(Deserialize, Debug)]
pub struct MainConfig {
    #[serde(rename = "gradence_supabase_url")]
    supabase_url: String,
    #[serde(rename = "gradence_supabase_anon_key")]
    supabase_anon_key: String,
    #[serde(rename = "gradence_state_path", default)]
    state_path: Option<PathBuf>,
    #[serde(
        rename = "gradence_watch_interval_secs",
        default = "default_watch_interval"
    )]
    watch_interval_secs: u64,
}

fn default_watch_interval() -> u64 {
    DEFAULT_WATCH_INTERVAL_SECS
}

impl MainConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        envy::from_env::<MainConfig>().context("Missing Supabase environment variables")
    }

    pub fn supabase(&self) -> anyhow::Result<SupabaseConfig> {
        Ok(SupabaseConfig::new(
            self.supabase_url.as_str(),
            self.supabase_anon_key.as_str(),
        )?)
    }

    /// Where device-local state lives, `$XDG_DATA_HOME/gradence/state.json` by default.
    pub fn state_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.state_path {
            return Ok(path.clone());
        }

        let dir = dirs::data_dir().context("No data directory for local state")?;
        Ok(dir.join("gradence").join("state.json"))
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(1))
    }
}
