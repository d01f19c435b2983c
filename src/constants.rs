//! Centralized constants for threadmap.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "threadmap";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "threadmap.toml";

// --- Provider defaults ---

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "moonshot";

/// Default model identifier for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

/// Default model identifier for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default model identifier for Moonshot (Kimi).
pub const DEFAULT_MOONSHOT_MODEL: &str = "moonshot-v1-8k";

/// Default model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "arcee-ai/trinity-large-preview:free";

/// Default model identifier for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

pub const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const MOONSHOT_DEFAULT_BASE_URL: &str = "https://api.moonshot.cn/v1";
pub const OPENROUTER_DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default base URL for local Ollama server (without the `/v1` suffix).
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

// --- Request shaping ---

/// Configured completion budget before the floor is applied.
pub const MAX_TOKENS_DEFAULT: u32 = 1500;

/// Completions never get fewer tokens than this, so the JSON answer can close.
pub const MAX_OUTPUT_TOKENS_FLOOR: u32 = 2000;

/// Sampling temperature for topic analysis.
pub const TEMPERATURE_DEFAULT: f32 = 0.3;

// --- Budget ---

/// Total input token budget for one analysis prompt.
pub const TOKEN_BUDGET_DEFAULT: usize = 6000;

/// Conservative characters-per-token estimate.
pub const CHARS_PER_TOKEN_DEFAULT: f64 = 2.0;

/// Share of the character budget the compressor may fill (15% safety margin).
pub const BUDGET_MARGIN_DEFAULT: f64 = 0.85;

// --- Retry ---

pub const RETRY_MAX_ATTEMPTS_DEFAULT: u32 = 3;
pub const RETRY_DELAY_MS_DEFAULT: u64 = 1000;
pub const FIRST_ATTEMPT_TIMEOUT_SECS_DEFAULT: u64 = 15;
pub const RETRY_ATTEMPT_TIMEOUT_SECS_DEFAULT: u64 = 30;

// --- Compression limits ---

/// Marker appended wherever text is cut.
pub const ELLIPSIS: &str = "...";

/// User turns longer than this are cut during compression.
pub const USER_TEXT_MAX: usize = 150;
pub const USER_TEXT_CUT: usize = 145;

/// Assistant turns longer than this (after structural compression) are cut.
pub const ASSISTANT_TEXT_MAX: usize = 300;
pub const ASSISTANT_TEXT_CUT: usize = 295;
pub const ASSISTANT_MIN_SENTENCE_CUT: usize = 200;

/// Assistant answers at or below this length are never touched.
pub const RESPONSE_KEEP_AS_IS: usize = 250;
pub const RESPONSE_SHORT_MAX: usize = 400;
pub const RESPONSE_SHORT_CUT: usize = 395;
pub const RESPONSE_MAX: usize = 350;
pub const RESPONSE_CUT: usize = 345;
pub const RESPONSE_MIN_BOUNDARY: usize = 250;
pub const RESPONSE_EMPTY_FALLBACK: usize = 200;

/// Number of segments used by the terminal budget strategy.
pub const SEGMENT_COUNT: usize = 3;

// --- Topic targets ---

pub const TOPICS_MIN: usize = 3;
pub const TOPICS_MAX: usize = 6;
pub const TURNS_PER_TOPIC_HINT: usize = 8;
pub const MIN_TURNS_PER_TOPIC: usize = 2;

// --- Fallback navigator ---

pub const FALLBACK_TITLE_MAX: usize = 60;
pub const FALLBACK_SUMMARY_MAX: usize = 120;
pub const FALLBACK_NO_REPLY: &str = "no reply";
