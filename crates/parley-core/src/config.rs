use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Hard per-message limit of the Discord transport, in characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Top-level config (parley.toml + PARLEY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub format: FormatConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Also read from the plain `DISCORD_TOKEN` variable.
    #[serde(default)]
    pub bot_token: String,
    /// When set, slash commands are registered on this guild only
    /// (instant propagation) instead of globally.
    #[serde(default)]
    pub guild_id: Option<u64>,
    /// Prefix for text commands such as `!stats`.
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    /// Presence status: online, idle, dnd, invisible.
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub activity_name: Option<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            guild_id: None,
            command_prefix: default_prefix(),
            status: default_status(),
            activity_name: None,
        }
    }
}

/// Google Gemini (Generative Language API) provider, API-key authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key. Also read from the plain `GEMINI_API_KEY` variable.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub system_instruction: Option<String>,
    /// Output token cap for `/ask`. `None` leaves it to the model.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_gemini_base_url(),
            system_instruction: None,
            max_output_tokens: None,
        }
    }
}

/// Input bounds checked before any remote call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_ask_max_input")]
    pub ask_max_input: usize,
    #[serde(default = "default_quick_max_input")]
    pub quick_max_input: usize,
    /// Reply length cap for `/quick`, before the truncation marker.
    #[serde(default = "default_quick_max_chars")]
    pub quick_max_chars: usize,
    #[serde(default = "default_quick_max_output_tokens")]
    pub quick_max_output_tokens: u32,
    /// Turns of shared history sent with each request. Older exchanges are
    /// dropped first; 0 disables history.
    #[serde(default = "default_max_transcript_turns")]
    pub max_transcript_turns: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            ask_max_input: default_ask_max_input(),
            quick_max_input: default_quick_max_input(),
            quick_max_chars: default_quick_max_chars(),
            quick_max_output_tokens: default_quick_max_output_tokens(),
            max_transcript_turns: default_max_transcript_turns(),
        }
    }
}

/// Response-size adaptation knobs.
///
/// The file-fallback thresholds are heuristics observed to work for
/// conversational answers; tune them per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Maximum characters per text payload.
    #[serde(default = "default_hard_limit")]
    pub hard_limit: usize,
    /// Maximum text chunks per reply (a notice may follow).
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    /// How far back from a forced cut to look for a boundary.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// A notice is added when the sent text is shorter than the original
    /// by more than this fraction.
    #[serde(default = "default_notice_loss_ratio")]
    pub notice_loss_ratio: f64,
    /// Master switch for the attachment path.
    #[serde(default = "bool_true")]
    pub file_fallback: bool,
    /// Answers longer than this always go out as a file.
    #[serde(default = "default_file_ceiling")]
    pub file_ceiling: usize,
    /// Lines ending in a sentence terminator before the text counts as dense.
    #[serde(default = "default_max_line_terminators")]
    pub max_line_terminators: usize,
    /// List-marker lines before the text counts as dense.
    #[serde(default = "default_max_list_markers")]
    pub max_list_markers: usize,
    /// With more chunks than this and a length above `size_floor`,
    /// the chunked plan is replaced by a file.
    #[serde(default = "default_chunk_count_threshold")]
    pub chunk_count_threshold: usize,
    #[serde(default = "default_size_floor")]
    pub size_floor: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            hard_limit: default_hard_limit(),
            max_chunks: default_max_chunks(),
            lookback: default_lookback(),
            notice_loss_ratio: default_notice_loss_ratio(),
            file_fallback: true,
            file_ceiling: default_file_ceiling(),
            max_line_terminators: default_max_line_terminators(),
            max_list_markers: default_max_list_markers(),
            chunk_count_threshold: default_chunk_count_threshold(),
            size_floor: default_size_floor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Pause between successive text payloads.
    #[serde(default = "default_inter_payload_delay_ms")]
    pub inter_payload_delay_ms: u64,
    /// Prepended to single-message replies when it fits.
    #[serde(default = "default_reply_prefix")]
    pub reply_prefix: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            inter_payload_delay_ms: default_inter_payload_delay_ms(),
            reply_prefix: default_reply_prefix(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_prefix() -> String {
    "!".to_string()
}
fn default_status() -> String {
    "online".to_string()
}
fn default_model() -> String {
    "gemini-pro".to_string()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_ask_max_input() -> usize {
    500
}
fn default_quick_max_input() -> usize {
    300
}
fn default_quick_max_chars() -> usize {
    1500
}
fn default_quick_max_output_tokens() -> u32 {
    400
}

fn default_max_transcript_turns() -> usize {
    40
}
fn default_hard_limit() -> usize {
    DISCORD_MESSAGE_LIMIT
}
fn default_max_chunks() -> usize {
    4
}
fn default_lookback() -> usize {
    100
}
fn default_notice_loss_ratio() -> f64 {
    0.2
}
fn default_file_ceiling() -> usize {
    8000
}
fn default_max_line_terminators() -> usize {
    30
}
fn default_max_list_markers() -> usize {
    20
}
fn default_chunk_count_threshold() -> usize {
    3
}
fn default_size_floor() -> usize {
    4000
}
fn default_inter_payload_delay_ms() -> u64 {
    500
}
fn default_reply_prefix() -> String {
    "\u{1f916} ".to_string()
}

impl ParleyConfig {
    /// Load config from a TOML file with PARLEY_* env var overrides.
    ///
    /// Nested keys use a double underscore: `PARLEY_FORMAT__HARD_LIMIT=1900`.
    /// The conventional `DISCORD_TOKEN` and `GEMINI_API_KEY` variables are
    /// honoured as well and win over the file.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ParleyConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PARLEY_").split("__"))
            .merge(
                Env::raw()
                    .only(&["DISCORD_TOKEN"])
                    .map(|_| "discord.bot_token".into()),
            )
            .merge(
                Env::raw()
                    .only(&["GEMINI_API_KEY"])
                    .map(|_| "gemini.api_key".into()),
            )
            .extract()
            .map_err(|e| crate::error::ParleyError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Reject configs that cannot possibly serve a request.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ParleyError;

        if self.discord.bot_token.trim().is_empty() {
            return Err(ParleyError::Config(
                "discord.bot_token is empty (set DISCORD_TOKEN)".into(),
            ));
        }
        if self.gemini.api_key.trim().is_empty() {
            return Err(ParleyError::Config(
                "gemini.api_key is empty (set GEMINI_API_KEY)".into(),
            ));
        }
        if self.format.hard_limit == 0 || self.format.hard_limit > DISCORD_MESSAGE_LIMIT {
            return Err(ParleyError::Config(format!(
                "format.hard_limit must be within 1..={DISCORD_MESSAGE_LIMIT}"
            )));
        }
        if self.format.max_chunks == 0 {
            return Err(ParleyError::Config("format.max_chunks must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.format.notice_loss_ratio) {
            return Err(ParleyError::Config(
                "format.notice_loss_ratio must be within [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_discord_constraints() {
        let cfg = ParleyConfig::default();
        assert_eq!(cfg.format.hard_limit, 2000);
        assert_eq!(cfg.format.max_chunks, 4);
        assert_eq!(cfg.limits.ask_max_input, 500);
        assert_eq!(cfg.limits.quick_max_input, 300);
        assert_eq!(cfg.limits.max_transcript_turns, 40);
        assert_eq!(cfg.delivery.inter_payload_delay_ms, 500);
        assert_eq!(cfg.gemini.model, "gemini-pro");
    }

    #[test]
    fn file_and_env_are_merged() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "parley.toml",
                r#"
                [discord]
                bot_token = "from-file"

                [format]
                max_chunks = 3
                "#,
            )?;
            jail.set_env("PARLEY_FORMAT__HARD_LIMIT", "1900");
            jail.set_env("GEMINI_API_KEY", "key-from-env");

            let cfg = ParleyConfig::load(Some("parley.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.discord.bot_token, "from-file");
            assert_eq!(cfg.format.max_chunks, 3);
            assert_eq!(cfg.format.hard_limit, 1900);
            assert_eq!(cfg.gemini.api_key, "key-from-env");
            assert_eq!(cfg.limits.ask_max_input, 500);
            Ok(())
        });
    }

    #[test]
    fn discord_token_variable_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("parley.toml", "[discord]\nbot_token = \"stale\"\n")?;
            jail.set_env("DISCORD_TOKEN", "fresh");
            let cfg = ParleyConfig::load(Some("parley.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.discord.bot_token, "fresh");
            Ok(())
        });
    }

    #[test]
    fn validate_requires_credentials() {
        let mut cfg = ParleyConfig::default();
        assert!(cfg.validate().is_err());
        cfg.discord.bot_token = "t".into();
        assert!(cfg.validate().is_err());
        cfg.gemini.api_key = "k".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_hard_limit() {
        let mut cfg = ParleyConfig::default();
        cfg.discord.bot_token = "t".into();
        cfg.gemini.api_key = "k".into();
        cfg.format.hard_limit = 4096;
        assert!(cfg.validate().is_err());
    }
}
