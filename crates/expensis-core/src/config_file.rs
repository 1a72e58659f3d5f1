use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub completion: Option<CompletionSection>,
    pub ocr: Option<OcrSection>,
    pub server: Option<ServerSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionSection {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrSection {
    pub languages: Option<String>,
    pub tesseract_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub max_upload_mb: Option<usize>,
}

/// Platform config directory path: `<config_dir>/expensis/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("expensis").join("config.toml"))
}

/// Load config by cascading CWD `.expensis.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".expensis.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        completion: Some(CompletionSection {
            api_url: pick(&overlay.completion, &base.completion, |c| c.api_url.clone()),
            api_key: pick(&overlay.completion, &base.completion, |c| c.api_key.clone()),
            model: pick(&overlay.completion, &base.completion, |c| c.model.clone()),
            request_timeout_secs: pick(&overlay.completion, &base.completion, |c| {
                c.request_timeout_secs
            }),
        }),
        ocr: Some(OcrSection {
            languages: pick(&overlay.ocr, &base.ocr, |o| o.languages.clone()),
            tesseract_path: pick(&overlay.ocr, &base.ocr, |o| o.tesseract_path.clone()),
        }),
        server: Some(ServerSection {
            port: pick(&overlay.server, &base.server, |s| s.port),
            max_upload_mb: pick(&overlay.server, &base.server, |s| s.max_upload_mb),
        }),
    }
}

/// Resolve the runtime [`Config`]: environment variables override the file,
/// which overrides built-in defaults. `env` is usually `std::env::var(..).ok()`.
pub fn resolve(file: &ConfigFile, env: impl Fn(&str) -> Option<String>) -> Config {
    let var = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let defaults = Config::default();

    let completion = file.completion.clone().unwrap_or_default();
    let ocr = file.ocr.clone().unwrap_or_default();
    let server = file.server.clone().unwrap_or_default();

    Config {
        api_url: var("DEEPSEEK_API_URL").or(completion.api_url),
        api_key: var("DEEPSEEK_API_KEY").or(completion.api_key),
        model: var("EXPENSIS_MODEL")
            .or(completion.model)
            .unwrap_or(defaults.model),
        ocr_languages: var("EXPENSIS_OCR_LANGUAGES")
            .or(ocr.languages)
            .unwrap_or(defaults.ocr_languages),
        tesseract_path: var("TESSERACT_PATH")
            .or(ocr.tesseract_path)
            .map(PathBuf::from)
            .unwrap_or(defaults.tesseract_path),
        port: parsed(&var, "PORT")
            .or(server.port)
            .unwrap_or(defaults.port),
        max_upload_mb: parsed(&var, "EXPENSIS_MAX_UPLOAD_MB")
            .or(server.max_upload_mb)
            .filter(|mb| *mb > 0)
            .unwrap_or(defaults.max_upload_mb),
        request_timeout_secs: parsed(&var, "EXPENSIS_REQUEST_TIMEOUT_SECS")
            .or(completion.request_timeout_secs)
            .filter(|secs| *secs > 0),
    }
}

/// Resolve from [`load_config`] and the process environment.
pub fn resolve_from_env() -> Config {
    resolve(&load_config(), |name| std::env::var(name).ok())
}

fn parsed<T: std::str::FromStr>(var: impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = var(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}
