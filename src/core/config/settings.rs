use std::path::PathBuf;

use super::parsing::{
    env_flag, env_number, env_optional, env_or_default, env_temperature, is_supported_image_mime,
    parse_cors_origins, parse_environment, parse_store_backend, parse_string_list,
};
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, RedisSettings, RuntimeSettings,
    ServerSettings, Settings, StoreBackend, StoreSettings, TelemetrySettings, UploadSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("KHTN_HOST", "0.0.0.0");
        let port: u16 = env_number("KHTN_PORT", "8000")?;

        let environment =
            parse_environment(env_optional("KHTN_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_flag("KHTN_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "KHTN Grading API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let store_backend = parse_store_backend(env_optional("STORE_BACKEND"))?;
        let store_data_dir = PathBuf::from(env_or_default("STORE_DATA_DIR", "data"));
        let store_namespace = env_or_default("STORE_NAMESPACE", "khtn");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = env_number("REDIS_PORT", "6379")?;
        let redis_db = env_number("REDIS_DB", "0")?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "");
        let grading_model = env_or_default("GRADING_MODEL", "gpt-4o-mini");
        let generation_model = env_or_default("GENERATION_MODEL", "gpt-4o");
        let grading_temperature = env_temperature("GRADING_TEMPERATURE", "0.1")?;
        let generation_temperature = env_temperature("GENERATION_TEMPERATURE", "0.7")?;
        let ai_max_tokens = env_number("AI_MAX_TOKENS", "8000")?;
        let ai_connect_timeout = env_number("AI_CONNECT_TIMEOUT", "30")?;
        let ai_request_timeout = env_number("AI_REQUEST_TIMEOUT", "180")?;

        let max_image_size_mb = env_number("MAX_IMAGE_SIZE_MB", "8")?;
        let allowed_image_mime_types = parse_string_list(
            env_optional("ALLOWED_IMAGE_MIME_TYPES"),
            &["image/jpeg", "image/png", "image/webp"],
        );

        let log_level = env_or_default("KHTN_LOG_LEVEL", "info");
        let json = env_flag("KHTN_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings { host, port },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            store: StoreSettings {
                backend: store_backend,
                data_dir: store_data_dir,
                namespace: store_namespace,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                grading_model,
                generation_model,
                grading_temperature,
                generation_temperature,
                ai_max_tokens,
                ai_connect_timeout,
                ai_request_timeout,
            },
            uploads: UploadSettings { max_image_size_mb, allowed_image_mime_types },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn store(&self) -> &StoreSettings {
        &self.store
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn uploads(&self) -> &UploadSettings {
        &self.uploads
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() || self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "KHTN_HOST/KHTN_PORT",
                value: format!("{}:{}", self.server.host, self.server.port),
            });
        }

        if self.uploads.allowed_image_mime_types.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_IMAGE_MIME_TYPES",
                value: String::from("<empty>"),
            });
        }

        for mime in &self.uploads.allowed_image_mime_types {
            if !is_supported_image_mime(mime) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_IMAGE_MIME_TYPES",
                    value: mime.clone(),
                });
            }
        }

        if self.uploads.max_image_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_IMAGE_SIZE_MB",
                value: "0".to_string(),
            });
        }

        if self.ai.ai_request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AI_REQUEST_TIMEOUT",
                value: "0".to_string(),
            });
        }

        if self.store.namespace.contains(['/', '\\', ':']) {
            return Err(ConfigError::InvalidValue {
                field: "STORE_NAMESPACE",
                value: self.store.namespace.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.ai.openai_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }
        if self.ai.openai_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_BASE_URL"));
        }
        if self.store.backend == StoreBackend::Redis && self.redis.password.is_empty() {
            return Err(ConfigError::MissingSecret("REDIS_PASSWORD"));
        }

        Ok(())
    }
}
