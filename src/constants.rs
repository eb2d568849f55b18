//! Constants for the token metrics tracker
//!
//! All configuration for the metrics tracker is centralized here.
//! No runtime configuration (config.yml) is used - the system operates
//! transparently with these compile-time constants. Credentials are the
//! only runtime input, read from the process environment.

/// How often the tracker runs a full refresh pass over the registry (in seconds)
pub const PASS_INTERVAL_SECS: u64 = 300;

/// Maximum number of history entries retained per token; once the cap is
/// exceeded the oldest entries are dropped, never the newest
pub const HISTORY_RETENTION: usize = 100;

/// HTTP request timeout for provider fetches (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 12;

/// Default file the token registry persists to
pub const TOKENS_FILE: &str = "tokens.json";

/// Default file the analysis history persists to
pub const HISTORY_FILE: &str = "analyses_history.json";

/// Moralis API base URL (market data: name, symbol, market cap, holders)
pub const MORALIS_API_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Environment variable holding the Moralis API key
pub const MORALIS_API_KEY_ENV: &str = "MORALIS_API_KEY";

/// RugCheck API base URL (risk data: rug score, honeypot, LP lock, top holders)
pub const RUGCHECK_API_URL: &str = "https://api.rugcheck.xyz/v1";

/// Environment variable holding the RugCheck API key
pub const RUGCHECK_API_KEY_ENV: &str = "RUGCHECK_API_KEY";

/// OpenAI chat completions endpoint used by the default analyst
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Model requested by the default analyst
pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Telegram Bot API base URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Environment variable holding the Telegram bot token
pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable holding the Telegram chat id notifications go to
pub const TELEGRAM_CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "token-metrics-sdk/0.1.0";
