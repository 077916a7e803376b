use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8001";
const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_MB: usize = 10;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.into(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind_addr: DEFAULT_BIND.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

pub fn load_settings() -> Settings {
    settings_from(|key| std::env::var(key).ok())
}

/// Builds settings from defaults overridden by whatever `lookup` returns.
/// Numeric values that fail to parse keep the default.
fn settings_from(lookup: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(v) = lookup("ALT_TEXT_API_URL") {
        let v = v.trim();
        if !v.is_empty() {
            settings.api_base_url = v.to_string();
        }
    }

    if let Some(v) = lookup("ALT_TEXT_TIMEOUT_SECS") {
        if let Ok(secs) = v.trim().parse::<u64>() {
            if secs > 0 {
                settings.request_timeout = Duration::from_secs(secs);
            }
        }
    }

    if let Some(v) = lookup("ALT_TEXT_BIND") {
        settings.bind_addr = v;
    }

    if let Some(v) = lookup("PORT") {
        if let Ok(port) = v.trim().parse::<u16>() {
            settings.bind_addr = with_port(&settings.bind_addr, port);
        }
    }

    if let Some(v) = lookup("ALT_TEXT_MAX_UPLOAD_MB") {
        if let Ok(mb) = v.trim().parse::<usize>() {
            settings.max_upload_bytes = mb * 1024 * 1024;
        }
    }

    settings
}

fn with_port(bind_addr: &str, port: u16) -> String {
    match bind_addr.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{bind_addr}:{port}"),
    }
}
