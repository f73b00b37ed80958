use crate::cons::provider_cons::{DEMO_MODE_LABEL, SMART_FALLBACK_LABEL};
use crate::errors::{AttemptError, ChatError};
use crate::llm::agents::agent::*;
use crate::llm::chain::ChainRunner;
use crate::llm::fallback::FallbackResponder;
use crate::session::{SessionRetention, SessionStore, Turn};
use crate::tests::support::{completion, Scripted, ScriptedTransport, BASE_URL};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(transport: ScriptedTransport, key: Option<&str>) -> ChatAgent<ScriptedTransport> {
        let runner = ChainRunner::new(transport, key.map(str::to_string), BASE_URL);
        ChatAgent::new(
            runner,
            vec![completion("a"), completion("b")],
            Arc::new(SessionStore::default()),
        )
        .with_fallback(FallbackResponder::with_rng(StdRng::seed_from_u64(3)))
    }

    #[tokio::test]
    async fn remote_answer_is_returned_and_recorded() {
        let transport = ScriptedTransport::new()
            .on("a", Scripted::Fail(AttemptError::http_status(500, "boom")))
            .on("b", Scripted::Respond(json!([{ "generated_text": "Rust is a language." }])));
        let agent = agent(transport, Some("hf_test"));
        let session = agent.start_session();

        let reply = agent.send_message(&session.session_id, "What is Rust?").await.unwrap();

        assert_eq!(reply.answer, "Rust is a language.");
        assert_eq!(reply.model, "b");
        assert_eq!(reply.source, AnswerSource::Remote);
        assert_eq!(reply.session_id, session.session_id);
        assert_eq!(
            agent.store().recent_context(&session.session_id, 10),
            vec![Turn::user("What is Rust?"), Turn::assistant("Rust is a language.")]
        );

        let metrics = agent.fetch_metrics();
        assert_eq!(metrics.total_messages, 1);
        assert_eq!(metrics.active_sessions, 1);
        assert_eq!(metrics.error_rate, "0.0%");
    }

    #[tokio::test]
    async fn history_feeds_the_next_prompt() {
        let transport = ScriptedTransport::new()
            .on("a", Scripted::Respond(json!({ "generated_text": "Nice to meet you." })));
        let agent = agent(transport, Some("hf_test"));
        let id = agent.start_session().session_id;

        agent.send_message(&id, "I am Sam").await.unwrap();
        agent.send_message(&id, "Who am I?").await.unwrap();

        let payloads = agent.runner().transport().payloads();
        assert_eq!(payloads[0]["inputs"], json!("I am Sam"));
        assert_eq!(
            payloads[1]["inputs"],
            json!("Human: I am Sam\nBot: Nice to meet you.\nHuman: Who am I?\nBot:")
        );
    }

    #[tokio::test]
    async fn no_credential_answers_locally_in_demo_mode() {
        let agent = agent(ScriptedTransport::new(), None);
        let id = agent.start_session().session_id;

        let reply = agent.send_message(&id, "Hello there").await.unwrap();

        assert_eq!(reply.model, DEMO_MODE_LABEL);
        assert_eq!(reply.source, AnswerSource::Fallback);
        assert!(agent.runner().transport().called().is_empty());
        assert_eq!(agent.store().recent_context(&id, 10).len(), 2);
        assert_eq!(agent.fetch_metrics().error_rate, "0.0%");
    }

    #[tokio::test]
    async fn exhausted_chain_uses_smart_fallback_and_counts_as_failure() {
        let agent = agent(ScriptedTransport::new(), Some("hf_test"));
        let id = agent.start_session().session_id;

        let reply = agent.send_message(&id, "asdkjasd").await.unwrap();

        assert_eq!(reply.model, SMART_FALLBACK_LABEL);
        assert!(FallbackResponder::pool(crate::llm::fallback::FallbackCategory::Conversational)
            .contains(&reply.answer.as_str()));
        assert_eq!(agent.runner().transport().called(), vec!["a", "b"]);
        assert_eq!(agent.fetch_metrics().error_rate, "100.0%");
    }

    #[tokio::test]
    async fn strict_mode_surfaces_errors_and_keeps_history_untouched() {
        let agent = agent(ScriptedTransport::new(), Some("hf_test")).with_mode(ReplyMode::Strict);
        let id = agent.start_session().session_id;

        let err = agent.send_message(&id, "hello").await.unwrap_err();
        assert_eq!(err, ChatError::Exhausted { attempted: 2 });
        assert_eq!(err.code(), "GEN-1002");
        assert!(agent.store().recent_context(&id, 10).is_empty());

        let agent = self::agent(ScriptedTransport::new(), None).with_mode(ReplyMode::Strict);
        let id = agent.start_session().session_id;
        assert_eq!(agent.send_message(&id, "hello").await, Err(ChatError::NoCredential));
    }

    #[tokio::test]
    async fn unknown_or_ended_session_is_rejected_without_calls() {
        let transport = ScriptedTransport::new().on("a", Scripted::Respond(json!("fine answer")));
        let agent = agent(transport, Some("hf_test"));

        let err = agent.send_message("session_missing", "hi").await.unwrap_err();
        assert_eq!(err, ChatError::UnknownSession("session_missing".to_string()));

        let id = agent.start_session().session_id;
        assert!(agent.end_session(&id));
        assert!(!agent.end_session(&id));
        assert!(agent.send_message(&id, "hi").await.is_err());
        assert!(agent.runner().transport().called().is_empty());
        assert_eq!(agent.fetch_metrics().active_sessions, 0);
    }

    #[tokio::test]
    async fn expired_session_is_rejected_and_not_counted() {
        let transport = ScriptedTransport::new().on("a", Scripted::Respond(json!("fine answer")));
        let store = Arc::new(SessionStore::new(SessionRetention {
            idle_ttl: Duration::from_millis(20),
            max_sessions: 10,
            max_turns: 10,
        }));
        let runner = ChainRunner::new(transport, Some("hf_test".to_string()), BASE_URL);
        let agent = ChatAgent::new(runner, vec![completion("a")], store);

        let id = agent.start_session().session_id;
        agent.send_message(&id, "hello there").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let err = agent.send_message(&id, "still there?").await.unwrap_err();
        assert_eq!(err, ChatError::UnknownSession(id.clone()));
        assert_eq!(agent.runner().transport().called(), vec!["a"]);
        assert_eq!(agent.fetch_metrics().active_sessions, 0);
    }

    #[tokio::test]
    async fn idle_sessions_drop_out_of_metrics() {
        let store = Arc::new(SessionStore::new(SessionRetention {
            idle_ttl: Duration::from_millis(20),
            max_sessions: 10,
            max_turns: 10,
        }));
        let runner = ChainRunner::new(ScriptedTransport::new(), None, BASE_URL);
        let agent = ChatAgent::new(runner, vec![completion("a")], store);

        agent.start_session();
        assert_eq!(agent.fetch_metrics().active_sessions, 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(agent.fetch_metrics().active_sessions, 0);
    }
}
