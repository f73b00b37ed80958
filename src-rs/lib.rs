#![deny(clippy::all)]

pub mod config;
pub mod cons;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod session;

#[cfg(feature = "node")]
mod ffi;


use std::sync::Once;

pub use config::AppConfig;
pub use errors::{AttemptError, ChatError};
pub use llm::agents::{AnswerSource, ChatAgent, ChatReply, ReplyMode, StartedSession};
pub use llm::chain::{ChainOutcome, ChainReport, ChainRunner, NoAnswerReason, RemoteAnswer};
pub use llm::fallback::{FallbackCategory, FallbackReply, FallbackResponder};
pub use llm::sanitize::{SanitizeRule, Sanitizer};
pub use llm::utils::network::{HttpTransport, Transport};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use session::{SessionRetention, SessionStore};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        use log::LevelFilter;
        use log4rs::append::file::FileAppender;
        use log4rs::config::{Appender, Config, Root};
        use log4rs::encode::pattern::PatternEncoder;

        // Try to load log4rs configuration from file first
        let config_path = std::env::var("LOG4RS_CONFIG").unwrap_or_else(|_| "log4rs.yaml".to_string());
        let _ = std::fs::create_dir_all("logs");
        if log4rs::init_file(&config_path, Default::default()).is_ok() {
            println!("[INIT] Logger initialized from {}", config_path);
            return;
        }
        println!("[INIT] Failed to load {}, falling back to default config", config_path);

        let pattern = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}";

        let logfile = match FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(pattern)))
            .build("logs/relaychat.log")
        {
            Ok(f) => f,
            Err(e) => {
                println!("[INIT] Failed to create log file: {}", e);
                return;
            }
        };

        let config = match Config::builder()
            .appender(Appender::builder().build("logfile", Box::new(logfile)))
            .build(Root::builder().appender("logfile").build(LevelFilter::Info))
        {
            Ok(c) => c,
            Err(e) => {
                println!("[INIT] Failed to build config: {}", e);
                return;
            }
        };

        match log4rs::init_config(config) {
            Ok(_) => println!("[INIT] Logger initialized successfully"),
            Err(e) => println!("[INIT] Failed to initialize logger: {}", e),
        }
    });
}

/// Effective configuration with the credential redacted, as JSON.
#[cfg_attr(feature = "node", napi_derive::napi)]
pub fn get_app_config() -> String {
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Failed to load config: {:?}", e);
            return "{}".to_string();
        }
    };
    serde_json::to_string(&config.to_public()).unwrap_or_else(|_| "{}".to_string())
}

/// Names of the configured providers in the order they are tried.
#[cfg_attr(feature = "node", napi_derive::napi)]
pub fn list_providers() -> Vec<String> {
    init_logger();
    match AppConfig::load() {
        Ok(cfg) => cfg.ordered_providers().into_iter().map(|p| p.name).collect(),
        Err(e) => {
            log::warn!("Failed to load config: {:?}", e);
            Vec::new()
        }
    }
}

#[cfg(feature = "node")]
pub use ffi::*;
