mod settings;

pub use settings::{
    AgentConfig, IpSource, Settings, ZoneConfig, DEFAULT_API_URL, DEFAULT_RESOLVER_URL,
};
