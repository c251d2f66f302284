use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub env: Environment,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub datastore: DatastoreConfig,
    pub langfuse: LangfuseConfig,
    pub aws: AwsConfig,
    pub elasticsearch: ElasticsearchConfig,
}

/// Deployment profile (`FLASK_CONFIG` / `APP_ENV`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    #[default]
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "DEV",
            Self::Test => "TEST",
            Self::Staging => "STAGING",
            Self::Prod => "PROD",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, Self::Dev | Self::Test)
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, Self::Dev | Self::Test)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEV" => Ok(Self::Dev),
            "TEST" => Ok(Self::Test),
            "STAGING" => Ok(Self::Staging),
            "PROD" => Ok(Self::Prod),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Optional shared API key. When unset every request is accepted.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
}

/// LLM provider settings (OpenAI-compatible API)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub api_base: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub knn_embedding_dimension: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub timeout_secs: u64,
    /// Bedrock guardrail identifier forwarded with chat requests
    pub guardrails_id: Option<String>,
}

/// Embedded analytical store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub url: String,
    /// Reject statements that could modify data
    pub read_only: bool,
    /// Upper bound on rows returned by a single query
    pub max_rows: usize,
    /// Tables retrieved as context for a question
    pub schema_top_k: usize,
    /// Sample rows shown to the LLM per table
    pub sample_rows: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LangfuseConfig {
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub host: Option<String>,
}

impl LangfuseConfig {
    /// Tracing callbacks are only wired when all three settings are present
    pub fn is_enabled(&self) -> bool {
        self.public_key.is_some() && self.secret_key.is_some() && self.host.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AwsConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Command line arguments for configuration overrides
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "textlayer")]
#[command(version, about = "TextLayer Core - chat and text-to-SQL API")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Environment profile: DEV, TEST, STAGING or PROD (overrides FLASK_CONFIG)
    #[arg(long, value_name = "ENV")]
    pub env: Option<String>,

    /// Server host (overrides config file)
    #[arg(long, value_name = "HOST")]
    pub server_host: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Datastore URL (overrides config file, e.g. "sqlite://data/data.db")
    #[arg(long, value_name = "URL")]
    pub datastore_url: Option<String>,

    /// Chat model name (overrides CHAT_MODEL)
    #[arg(long, value_name = "MODEL")]
    pub chat_model: Option<String>,

    /// Logging level (overrides config file, e.g., "info,textlayer_core=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Answer a single question with the text-to-SQL flow and exit
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Run the queue event handler once on a JSON event file and exit
    #[arg(long, value_name = "PATH")]
    pub handle_event: Option<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (a `.env` file is read first when present)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load(cli_args: &CommandLineArgs) -> Result<Self, anyhow::Error> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!("Loaded environment from {}", path.display());
        }

        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.apply_cli_overrides(cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - FLASK_CONFIG / APP_ENV: DEV, TEST, STAGING or PROD
    /// - APP_SERVER_HOST, APP_SERVER_PORT
    /// - LOG_LEVEL / APP_LOG_LEVEL: level name (DEBUG, INFO, ...) or filter directive
    /// - API_KEY: shared key required on every request when set
    /// - OPENAI_API_KEY, OPENAI_API_BASE, CHAT_MODEL, EMBEDDING_MODEL,
    ///   KNN_EMBEDDING_DIMENSION, BEDROCK_GUARDRAILS_ID
    /// - APP_DATASTORE_URL
    /// - LANGFUSE_PUBLIC_KEY, LANGFUSE_SECRET_KEY, LANGFUSE_HOST
    /// - ACCESS_KEY_ID, SECRET_ACCESS_KEY, REGION
    /// - ELASTICSEARCH_URL, ELASTICSEARCH_USER, ELASTICSEARCH_PASSWORD
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = var("FLASK_CONFIG").or_else(|| var("APP_ENV")) {
            match env.parse() {
                Ok(parsed) => {
                    self.env = parsed;
                    tracing::info!("Override env from environment: {}", self.env.as_str());
                },
                Err(e) => tracing::warn!("Invalid FLASK_CONFIG '{}': {} (keep {})", env, e, self.env.as_str()),
            }
        }

        if let Some(host) = var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Some(port) = var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Some(level) = var("APP_LOG_LEVEL").or_else(|| var("LOG_LEVEL")) {
            self.logging.level = normalize_log_level(&level);
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Some(key) = var("API_KEY") {
            self.auth.api_key = Some(key);
            tracing::info!("Override auth.api_key from env");
        }

        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
            tracing::info!("Override llm.api_key from env");
        }

        if let Some(base) = var("OPENAI_API_BASE") {
            self.llm.api_base = base;
            tracing::info!("Override llm.api_base from env: {}", self.llm.api_base);
        }

        if let Some(model) = var("CHAT_MODEL") {
            self.llm.chat_model = model;
            tracing::info!("Override llm.chat_model from env: {}", self.llm.chat_model);
        }

        if let Some(model) = var("EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
            tracing::info!("Override llm.embedding_model from env: {}", self.llm.embedding_model);
        }

        if let Some(dim) = var("KNN_EMBEDDING_DIMENSION") {
            match dim.parse() {
                Ok(val) => {
                    self.llm.knn_embedding_dimension = val;
                    tracing::info!(
                        "Override llm.knn_embedding_dimension from env: {}",
                        self.llm.knn_embedding_dimension
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid KNN_EMBEDDING_DIMENSION '{}': {} (keep {})",
                    dim,
                    e,
                    self.llm.knn_embedding_dimension
                ),
            }
        }

        if let Some(id) = var("BEDROCK_GUARDRAILS_ID") {
            self.llm.guardrails_id = Some(id);
        }

        if let Some(url) = var("APP_DATASTORE_URL") {
            self.datastore.url = url;
            tracing::info!("Override datastore.url from env");
        }

        if let Some(v) = var("LANGFUSE_PUBLIC_KEY") {
            self.langfuse.public_key = Some(v);
        }
        if let Some(v) = var("LANGFUSE_SECRET_KEY") {
            self.langfuse.secret_key = Some(v);
        }
        if let Some(v) = var("LANGFUSE_HOST") {
            self.langfuse.host = Some(v);
        }

        if let Some(v) = var("ACCESS_KEY_ID") {
            self.aws.access_key_id = Some(v);
        }
        if let Some(v) = var("SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = Some(v);
        }
        if let Some(v) = var("REGION") {
            self.aws.region = Some(v);
        }

        if let Some(v) = var("ELASTICSEARCH_URL") {
            self.elasticsearch.url = Some(v);
        }
        if let Some(v) = var("ELASTICSEARCH_USER") {
            self.elasticsearch.user = Some(v);
        }
        if let Some(v) = var("ELASTICSEARCH_PASSWORD") {
            self.elasticsearch.password = Some(v);
        }
    }

    /// Apply command line argument overrides (highest priority)
    pub fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(env) = &args.env {
            match env.parse() {
                Ok(parsed) => {
                    self.env = parsed;
                    tracing::info!("Override env from CLI: {}", self.env.as_str());
                },
                Err(e) => tracing::warn!("Invalid --env '{}': {} (keep {})", env, e, self.env.as_str()),
            }
        }

        if let Some(host) = &args.server_host {
            self.server.host = host.clone();
            tracing::info!("Override server.host from CLI: {}", self.server.host);
        }

        if let Some(port) = args.server_port {
            self.server.port = port;
            tracing::info!("Override server.port from CLI: {}", self.server.port);
        }

        if let Some(url) = &args.datastore_url {
            self.datastore.url = url.clone();
            tracing::info!("Override datastore.url from CLI");
        }

        if let Some(model) = &args.chat_model {
            self.llm.chat_model = model.clone();
            tracing::info!("Override llm.chat_model from CLI: {}", self.llm.chat_model);
        }

        if let Some(level) = &args.log_level {
            self.logging.level = normalize_log_level(level);
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.datastore.url.is_empty() {
            anyhow::bail!("Datastore URL cannot be empty");
        }

        if self.llm.knn_embedding_dimension == 0 {
            anyhow::bail!("llm.knn_embedding_dimension must be > 0");
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be > 0");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be between 0 and 2");
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0");
        }

        if self.llm.enabled && self.llm.api_key.is_none() {
            tracing::warn!("LLM API key is not set; set OPENAI_API_KEY or llm.api_key");
        }

        if self.env == Environment::Prod && self.auth.api_key.is_none() {
            tracing::warn!("Running in PROD without API_KEY; all requests are accepted");
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    pub fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,textlayer_core=debug".to_string(), file: None }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            knn_embedding_dimension: 1536,
            temperature: 0.2,
            max_tokens: 700,
            timeout_secs: 120,
            guardrails_id: None,
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/data.db".to_string(),
            read_only: true,
            max_rows: 1000,
            schema_top_k: 3,
            sample_rows: 3,
        }
    }
}

// =========================
// Helpers for parsing values
// =========================

/// Map level names (DEBUG, INFO, WARNING, ERROR, CRITICAL) to filter
/// directives; anything else is taken as a directive already.
fn normalize_log_level(input: &str) -> String {
    match input.trim().to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => input.trim().to_string(),
    }
}

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

// Custom serde deserializer to support numeric or human-friendly string values
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
