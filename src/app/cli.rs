use clap::Parser;
use std::path::PathBuf;

/// ampdeck - Plexamp controls for the Stream Deck
#[derive(Parser, Debug)]
#[command(name = "ampdeck", version, about)]
pub struct Args {
    /// WebSocket port the Stream Deck app listens on
    #[arg(long, required_unless_present = "generate_config")]
    pub port: Option<u16>,

    /// Plugin instance identifier used for registration
    #[arg(long, required_unless_present = "generate_config")]
    pub plugin_uuid: Option<String>,

    /// Event name to register with (normally "registerPlugin")
    #[arg(long, default_value = "registerPlugin")]
    pub register_event: String,

    /// Host and device info JSON (unused, accepted for compatibility)
    #[arg(long)]
    pub info: Option<String>,

    /// Config file (default: ~/.config/ampdeck/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Generate default config.toml to stdout
    #[arg(long)]
    pub generate_config: bool,
}

/// The Stream Deck app launches plugins with single-dash camelCase flags
/// (`-port 28196 -pluginUUID ...`). Rewrite them to what clap expects.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-port" => "--port".to_string(),
            "-pluginUUID" => "--plugin-uuid".to_string(),
            "-registerEvent" => "--register-event".to_string(),
            "-info" => "--info".to_string(),
            _ => arg,
        })
        .collect()
}
