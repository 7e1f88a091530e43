//! Coordinator configuration: listen address, record store and flows.

use std::net::SocketAddr;

use common::LedgerError;
use orchestrator::config::{env_lookup, ConfigReader, SecretString};
use orchestrator::FlowConfig;

use crate::records::SupabaseConfig;

pub const LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub listen_addr: SocketAddr,
    /// `None` keeps records in memory.
    pub supabase: Option<SupabaseConfig>,
    pub flows: FlowConfig,
}

impl CoordinatorConfig {
    pub fn from_env() -> Result<Self, LedgerError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = ConfigReader::new(lookup);

        let listen_addr =
            reader.parsed_or(LISTEN_ADDR, SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let supabase = match (reader.optional(SUPABASE_URL), reader.optional(SUPABASE_ANON_KEY)) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url,
                anon_key: SecretString::new(anon_key),
            }),
            (None, None) => None,
            _ => {
                return Err(LedgerError::Configuration(format!(
                    "{} and {} must be set together",
                    SUPABASE_URL, SUPABASE_ANON_KEY
                )))
            }
        };

        let flows = FlowConfig::read(&mut reader)?;

        Ok(Self {
            listen_addr,
            supabase,
            flows,
        })
    }
}
