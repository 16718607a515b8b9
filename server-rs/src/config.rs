use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub ai: AiConfig,
    pub uploads: UploadConfig,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_expiry_secs: i64,
    pub refresh_expiry_secs: i64,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
    pub suggest_max: u32,
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    /// Empty disables the model; suggestions then use the keyword fallback only.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    /// URL prefix the upload directory is served under.
    pub public_path: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or_parse("PORT", 3000),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "club_hub"),
                user: env_or("DB_USER", "club_hub"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 2),
                pool_max: env_or_parse("DB_POOL_MAX", 20),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "change-me-to-a-secure-random-string"),
                access_expiry_secs: parse_duration_to_secs(&env_or("JWT_ACCESS_EXPIRY", "1h")),
                refresh_expiry_secs: parse_duration_to_secs(&env_or("JWT_REFRESH_EXPIRY", "30d")),
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: env_or_parse("RATE_LIMIT_MAX", 120),
                suggest_max: env_or_parse("RATE_LIMIT_SUGGEST", 10),
            },
            ai: AiConfig {
                api_key: env_or("GEMINI_API_KEY", ""),
                model: env_or("GEMINI_MODEL", "gemini-1.5-flash"),
                base_url: env_or(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta",
                ),
                timeout_secs: env_or_parse("AI_TIMEOUT_SECS", 5),
            },
            uploads: UploadConfig {
                dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
                max_bytes: env_or_parse("UPLOAD_MAX_BYTES", 5 * 1024 * 1024),
                public_path: "/uploads".to_string(),
            },
        }
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }
}

fn parse_duration_to_secs(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return 3600;
    }
    let (num_str, unit) = s.split_at(s.len() - 1);
    let num: i64 = num_str.parse().unwrap_or(1);
    match unit {
        "s" => num,
        "m" => num * 60,
        "h" => num * 3600,
        "d" => num * 86400,
        _ => s.parse().unwrap_or(3600),
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for router tests; never reads the environment.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            cors_origins: vec![],
            db: DbConfig {
                host: "localhost".into(),
                port: 5432,
                database: "club_hub_test".into(),
                user: "test".into(),
                password: String::new(),
                pool_min: 0,
                pool_max: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                access_expiry_secs: 3600,
                refresh_expiry_secs: 86400,
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: 1000,
                suggest_max: 3,
            },
            ai: AiConfig {
                api_key: String::new(),
                model: "test-model".into(),
                base_url: "http://127.0.0.1:9".into(),
                timeout_secs: 1,
            },
            uploads: UploadConfig {
                dir: std::env::temp_dir().join("club-hub-test-uploads"),
                max_bytes: 1024,
                public_path: "/uploads".into(),
            },
        }
    }
}
