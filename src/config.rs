use std::{env, io};

use tracing::debug;

use crate::model::Municipality;

const DEFAULT_API_BASE: &str = "/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// The fixed set of plan categories offered for generation. Static
/// configuration, not server-driven.
pub const PLAN_CATEGORIES: [&str; 11] = [
    "Благоустройство",
    "Окружающая среда",
    "Доступность цифровых услуг",
    "Дороги",
    "Образование",
    "Культура",
    "Здравоохранение",
    "Транспортное обслуживание",
    "ЖКХ",
    "Адаптация участников СВО",
    "Политическое доверие",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base the backend is reached under; a path like `/api` or an absolute
    /// URL, optionally ending in `/api`.
    pub api_base: String,
    /// Deadline applied to every request issued by the client.
    pub request_timeout_secs: u64,
    /// Municipalities to seed the session with when the backend cannot be
    /// reached on first load.
    pub fallback_municipalities: Vec<Municipality>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            api_base: env::var("APPEALS_API_BASE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            request_timeout_secs: parse_u64(
                "APPEALS_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            fallback_municipalities: default_municipalities(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            fallback_municipalities: default_municipalities(),
        }
    }
}

pub fn default_municipalities() -> Vec<Municipality> {
    [
        (1, "Раменский"),
        (2, "Жуковский"),
        (3, "Бронницы"),
        (4, "Люберцы"),
    ]
    .into_iter()
    .map(|(id, name)| Municipality {
        id,
        name: name.to_string(),
    })
    .collect()
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
