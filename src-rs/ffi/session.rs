use napi::bindgen_prelude::*;
use napi_derive::napi;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::agents::ChatAgent;
use crate::session::generate_session_id;

#[napi]
pub fn create_session_id() -> String {
    generate_session_id()
}

#[napi(object)]
pub struct ChatAnswer {
    pub answer: String,
    #[napi(js_name = "sessionId")]
    pub session_id: String,
    pub model: String,
    pub source: String,
}

#[napi(object)]
pub struct ChatMetrics {
    #[napi(js_name = "activeSessions")]
    pub active_sessions: u32,
    #[napi(js_name = "totalMessages")]
    pub total_messages: i64,
    #[napi(js_name = "avgResponseTimeMs")]
    pub avg_response_time_ms: f64,
    #[napi(js_name = "errorRate")]
    pub error_rate: String,
    #[napi(js_name = "uptimeSeconds")]
    pub uptime_seconds: i64,
}

/// JavaScript handle over one [`ChatAgent`].
#[napi]
pub struct ChatBridge {
    inner: Arc<ChatAgent>,
}

#[napi]
impl ChatBridge {
    #[napi(constructor)]
    pub fn new() -> Result<Self> {
        crate::init_logger();
        let config = AppConfig::load()
            .map_err(|e| Error::from_reason(format!("Failed to load config: {}", e)))?;
        let agent = ChatAgent::from_config(&config)
            .map_err(|e| Error::from_reason(format!("Failed to start chat agent: {}", e)))?;
        Ok(Self {
            inner: Arc::new(agent),
        })
    }

    #[napi]
    pub fn start_session(&self) -> String {
        self.inner.start_session().session_id
    }

    #[napi]
    pub async fn send_message(&self, session_id: String, message: String) -> Result<ChatAnswer> {
        let reply = self
            .inner
            .send_message(&session_id, &message)
            .await
            .map_err(|e| Error::from_reason(format!("[{}] {}", e.code(), e)))?;
        Ok(ChatAnswer {
            answer: reply.answer,
            session_id: reply.session_id,
            model: reply.model,
            source: match reply.source {
                crate::llm::agents::AnswerSource::Remote => "remote".to_string(),
                crate::llm::agents::AnswerSource::Fallback => "fallback".to_string(),
            },
        })
    }

    #[napi]
    pub fn fetch_metrics(&self) -> ChatMetrics {
        let snapshot = self.inner.fetch_metrics();
        ChatMetrics {
            active_sessions: snapshot.active_sessions as u32,
            total_messages: snapshot.total_messages as i64,
            avg_response_time_ms: snapshot.avg_response_time_ms,
            error_rate: snapshot.error_rate,
            uptime_seconds: snapshot.uptime_seconds as i64,
        }
    }

    #[napi]
    pub fn end_session(&self, session_id: String) -> bool {
        self.inner.end_session(&session_id)
    }
}
