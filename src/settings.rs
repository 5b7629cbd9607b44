use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_QR_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
pub const DEFAULT_CHECK_IN_REWARD: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct Supabase {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Deserialize)]
pub struct Cloudinary {
    pub upload_url: String,
    pub upload_preset: String,
}

#[derive(Debug, Deserialize)]
pub struct Qr {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Rewards {
    pub check_in_reward: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Preferences {
    /// Overrides the platform config directory.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub supabase: Supabase,
    pub cloudinary: Cloudinary,
    pub qr: Qr,
    pub rewards: Rewards,
    #[serde(default)]
    pub preferences: Preferences,
}

impl Settings {
    /// Reads `path`, then lets `ECOPOINTS__SECTION__KEY` variables override it.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(path))
                .add_source(Environment::with_prefix("ECOPOINTS").separator("__")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config = builder
            .set_default("qr.url", DEFAULT_QR_URL)?
            .set_default("rewards.check_in_reward", DEFAULT_CHECK_IN_REWARD)?
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const MINIMAL: &str = r#"
        [supabase]
        url = "https://project.supabase.co"
        anon_key = "anon"

        [cloudinary]
        upload_url = "https://api.cloudinary.com/v1_1/demo/image/upload"
        upload_preset = "avatars"
    "#;

    fn from_str(raw: &str) -> Result<Settings, ConfigError> {
        Settings::from_builder(
            Config::builder().add_source(File::from_str(raw, FileFormat::Toml)),
        )
    }

    #[test]
    fn fills_defaults() {
        let settings = from_str(MINIMAL).unwrap();

        assert_eq!(settings.supabase.anon_key, "anon");
        assert_eq!(settings.qr.url, DEFAULT_QR_URL);
        assert_eq!(settings.rewards.check_in_reward, 10);
        assert!(settings.preferences.dir.is_none());
    }

    #[test]
    fn file_values_win_over_defaults() {
        let raw = format!(
            "{}\n[rewards]\ncheck_in_reward = 25\n[preferences]\ndir = \"/tmp/eco\"\n",
            MINIMAL
        );
        let settings = from_str(&raw).unwrap();

        assert_eq!(settings.rewards.check_in_reward, 25);
        assert_eq!(settings.preferences.dir, Some(PathBuf::from("/tmp/eco")));
    }

    #[test]
    fn missing_section_is_an_error() {
        assert!(from_str("[supabase]\nurl = \"x\"\nanon_key = \"y\"\n").is_err());
    }
}
