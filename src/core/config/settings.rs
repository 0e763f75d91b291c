use super::parsing::{env_optional, env_or_default, parse_bool, parse_environment, parse_u64};
use super::types::{
    ApiSettings, ConfigError, RuntimeSettings, SessionSettings, Settings, StorageSettings,
    TelemetrySettings,
};

const DEFAULT_BASE_URL: &str = "https://testly-server.vercel.app/testly/v1";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("TESTLY_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("TESTLY_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url =
            env_or_default("TESTLY_API_BASE_URL", DEFAULT_BASE_URL).trim_end_matches('/').to_string();
        let connect_timeout_seconds = parse_u64(
            "TESTLY_API_CONNECT_TIMEOUT_SECONDS",
            env_or_default("TESTLY_API_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;
        let request_timeout_seconds = parse_u64(
            "TESTLY_API_TIMEOUT_SECONDS",
            env_or_default("TESTLY_API_TIMEOUT_SECONDS", "30"),
        )?;

        let data_dir = env_or_default("TESTLY_DATA_DIR", ".testly");

        let default_token_ttl_seconds = parse_u64(
            "TESTLY_TOKEN_TTL_SECONDS",
            env_or_default("TESTLY_TOKEN_TTL_SECONDS", "3600"),
        )?;

        let log_level = env_or_default("TESTLY_LOG_LEVEL", "info");
        let json = env_optional("TESTLY_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            api: ApiSettings { base_url, connect_timeout_seconds, request_timeout_seconds },
            storage: StorageSettings { data_dir },
            session: SessionSettings { default_token_ttl_seconds },
            telemetry: TelemetrySettings { log_level, json },
            runtime: RuntimeSettings { environment, strict_config },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let parsed = reqwest::Url::parse(&self.api.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.api.base_url.clone()))?;

        if self.api.connect_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TESTLY_API_CONNECT_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.api.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TESTLY_API_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.session.default_token_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TESTLY_TOKEN_TTL_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "TESTLY_DATA_DIR",
                value: String::from("<empty>"),
            });
        }

        if (self.runtime.strict_config || self.runtime.environment.is_production())
            && parsed.scheme() != "https"
        {
            return Err(ConfigError::InvalidBaseUrl(self.api.base_url.clone()));
        }

        Ok(())
    }
}
