use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::languages::Language;
use crate::providers::ProviderOptions;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: String,
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub referer: Option<String>,
    pub base_url: Option<String>,
    pub target_language: Language,
    pub history_display_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: None,
            temperature: 0.1,
            max_tokens: 500,
            timeout_secs: 30,
            referer: None,
            base_url: None,
            target_language: Language::English,
            history_display_limit: 5,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout(),
            base_url: self.base_url.clone(),
            referer: self.referer.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    provider: Option<ProviderSettings>,
    session: Option<SessionSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSettings {
    name: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    referer: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionSettings {
    target_language: Option<String>,
    history_display_limit: Option<usize>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    load_layers(Path::new(""), extra_path)
}

/// Bundled defaults, then `working_dir`, home and the extra path; later layers win.
fn load_layers(working_dir: &Path, extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings
        .merge_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse bundled settings")?;
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        working_dir.join("settings.toml"),
        working_dir.join("settings.local.toml"),
    ];

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    /// Applies one TOML layer. Empty or non-positive values keep the previous layer.
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed)
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(provider) = incoming.provider {
            if let Some(name) = provider.name
                && !name.trim().is_empty()
            {
                let name = name.trim().to_lowercase();
                // A model from an earlier layer belongs to the earlier provider.
                if name != self.provider {
                    self.model = None;
                }
                self.provider = name;
            }
            if let Some(model) = provider.model
                && !model.trim().is_empty()
            {
                self.model = Some(model.trim().to_string());
            }
            if let Some(temperature) = provider.temperature
                && temperature >= 0.0
            {
                self.temperature = temperature;
            }
            if let Some(max_tokens) = provider.max_tokens
                && max_tokens > 0
            {
                self.max_tokens = max_tokens;
            }
            if let Some(timeout) = provider.timeout_secs
                && timeout > 0
            {
                self.timeout_secs = timeout;
            }
            if let Some(referer) = provider.referer
                && !referer.trim().is_empty()
            {
                self.referer = Some(referer);
            }
            if let Some(base_url) = provider.base_url
                && !base_url.trim().is_empty()
            {
                self.base_url = Some(base_url);
            }
        }
        if let Some(session) = incoming.session {
            if let Some(target) = session.target_language
                && !target.trim().is_empty()
            {
                self.target_language = target
                    .parse()
                    .with_context(|| "invalid session.target_language")?;
            }
            if let Some(limit) = session.history_display_limit
                && limit > 0
            {
                self.history_display_limit = limit;
            }
        }
        Ok(())
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, commented_defaults())
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

// The home file starts fully commented so it never masks the working-directory layers.
fn commented_defaults() -> String {
    DEFAULT_SETTINGS_TOML
        .lines()
        .map(|line| {
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                line.to_string()
            } else {
                format!("# {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".llm-cultural-translator"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn bundled_defaults_parse() {
        let mut settings = Settings::default();
        settings.merge_str(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(settings.provider, "openrouter");
        assert_eq!(settings.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(settings.max_tokens, 500);
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert_eq!(settings.referer.as_deref(), Some("localhost:8080"));
        assert_eq!(settings.target_language, Language::English);
        assert_eq!(settings.history_display_limit, 5);
    }

    #[test]
    fn later_layers_override_and_invalid_values_are_ignored() {
        let mut settings = Settings::default();
        settings
            .merge_str("[provider]\nname = \"Claude\"\ntimeout_secs = 10\n")
            .unwrap();
        settings
            .merge_str(
                "[provider]\nname = \" \"\ntimeout_secs = 0\nmax_tokens = 0\n[session]\ntarget_language = \"ja\"\nhistory_display_limit = 0\n",
            )
            .unwrap();
        assert_eq!(settings.provider, "claude");
        assert_eq!(settings.timeout_secs, 10);
        assert_eq!(settings.max_tokens, 500);
        assert_eq!(settings.target_language, Language::Japanese);
        assert_eq!(settings.history_display_limit, 5);
    }

    #[test]
    fn unsupported_target_language_is_an_error() {
        let mut settings = Settings::default();
        let err = settings
            .merge_str("[session]\ntarget_language = \"klingon\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("target_language"));
    }

    #[test]
    fn switching_provider_drops_inherited_model() {
        let mut settings = Settings::default();
        settings.merge_str(DEFAULT_SETTINGS_TOML).unwrap();
        settings.merge_str("[provider]\nname = \"claude\"\n").unwrap();
        assert_eq!(settings.provider, "claude");
        assert!(settings.model.is_none());

        settings
            .merge_str("[provider]\nname = \"claude\"\nmodel = \"claude-3-5-haiku-latest\"\n")
            .unwrap();
        let options = settings.provider_options();
        assert_eq!(options.model.as_deref(), Some("claude-3-5-haiku-latest"));
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn load_creates_home_file_and_reads_extra_path() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            fs::write(&extra, "[session]\ntarget_language = \"german\"\n").unwrap();

            let settings = load_settings(Some(&extra)).unwrap();
            assert_eq!(settings.target_language, Language::German);
            assert!(home.join(".llm-cultural-translator/settings.toml").exists());
        });
    }

    #[test]
    fn working_directory_layer_overrides_defaults() {
        with_temp_home(|home| {
            let project = home.join("project");
            fs::create_dir_all(&project).unwrap();
            fs::write(
                project.join("settings.toml"),
                "[provider]\nname = \"claude\"\n[session]\ntarget_language = \"japanese\"\n",
            )
            .unwrap();

            let settings = load_layers(&project, None).unwrap();
            assert_eq!(settings.provider, "claude");
            assert_eq!(settings.target_language, Language::Japanese);
            assert!(settings.model.is_none());
            assert_eq!(settings.referer.as_deref(), Some("localhost:8080"));

            let home_file =
                fs::read_to_string(home.join(".llm-cultural-translator/settings.toml")).unwrap();
            assert!(home_file.contains("# name = \"openrouter\""));

            // A second load must not be masked by the home file it created.
            let settings = load_layers(&project, None).unwrap();
            assert_eq!(settings.provider, "claude");
        });
    }

    #[test]
    fn home_layer_overrides_working_directory() {
        with_temp_home(|home| {
            let project = home.join("project");
            fs::create_dir_all(&project).unwrap();
            fs::write(
                project.join("settings.toml"),
                "[session]\ntarget_language = \"german\"\n",
            )
            .unwrap();
            let config_dir = home.join(".llm-cultural-translator");
            fs::create_dir_all(&config_dir).unwrap();
            fs::write(
                config_dir.join("settings.local.toml"),
                "[session]\ntarget_language = \"french\"\n",
            )
            .unwrap();

            let settings = load_layers(&project, None).unwrap();
            assert_eq!(settings.target_language, Language::French);
        });
    }

    #[test]
    fn missing_extra_path_is_an_error() {
        with_temp_home(|home| {
            let err = load_settings(Some(&home.join("missing.toml"))).unwrap_err();
            assert!(err.to_string().contains("settings file not found"));
        });
    }
}
