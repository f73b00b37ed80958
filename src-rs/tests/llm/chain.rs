use crate::errors::AttemptError;
use crate::llm::chain::*;
use crate::llm::models::provider_handle::PromptInput;
use crate::tests::support::{completion, Scripted, ScriptedTransport, BASE_URL};
use serde_json::json;
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(transport: ScriptedTransport) -> ChainRunner<ScriptedTransport> {
        ChainRunner::new(transport, Some("hf_test".to_string()), BASE_URL)
    }

    #[tokio::test]
    async fn first_usable_answer_wins_and_later_providers_are_skipped() {
        let transport = ScriptedTransport::new()
            .on("a", Scripted::Fail(AttemptError::http_status(503, "loading")))
            .on("b", Scripted::Respond(json!([{ "generated_text": "ok" }])))
            .on("c", Scripted::Respond(json!([{ "generated_text": "ok ok" }])))
            .on("d", Scripted::Respond(json!([{ "generated_text": "never used" }])));
        let runner = runner(transport);
        let providers = vec![completion("a"), completion("b"), completion("c"), completion("d")];

        let report = runner.run(&providers, &PromptInput::new("hello")).await;

        assert_eq!(
            report.outcome,
            ChainOutcome::Answered(RemoteAnswer {
                answer: "ok ok".to_string(),
                provider: "c".to_string(),
            })
        );
        assert_eq!(runner.transport().called(), vec!["a", "b", "c"]);
        assert_eq!(report.attempted_providers(), vec!["a", "b", "c"]);
        assert_eq!(report.final_state, ChainState::Succeeded(2));
        assert!(matches!(
            report.attempts[0].result,
            Err(AttemptError::TransportFailure { status: Some(503), .. })
        ));
        assert_eq!(
            report.attempts[1].result,
            Err(AttemptError::UnusableText("ok".to_string()))
        );
        assert!(report.attempts[2].result.is_ok());
    }

    #[tokio::test]
    async fn exhaustion_tries_each_provider_once_in_order() {
        let transport = ScriptedTransport::new()
            .on("a", Scripted::Fail(AttemptError::transport("connection refused")))
            .on("b", Scripted::Respond(json!({ "generated_text": "an error occurred" })))
            .on("c", Scripted::Respond(json!(null)));
        let runner = runner(transport);
        let providers = vec![completion("a"), completion("b"), completion("c")];

        let report = runner.run(&providers, &PromptInput::new("hello")).await;

        assert_eq!(report.outcome, ChainOutcome::NoRemoteAnswer(NoAnswerReason::Exhausted));
        assert_eq!(report.final_state, ChainState::Exhausted);
        assert_eq!(runner.transport().called(), vec!["a", "b", "c"]);
        assert!(matches!(report.attempts[1].result, Err(AttemptError::UnusableText(_))));
        assert!(report.answer().is_none());
    }

    #[tokio::test]
    async fn empty_generated_text_is_unextractable() {
        let transport = ScriptedTransport::new()
            .on("a", Scripted::Respond(json!([{ "generated_text": "" }])))
            .on("b", Scripted::Respond(json!({ "generated_text": "second try works" })));
        let runner = runner(transport);

        let report = runner.run(&[completion("a"), completion("b")], &PromptInput::new("hello")).await;

        assert_eq!(report.attempts[0].result, Err(AttemptError::UnextractableResponse));
        assert_eq!(report.answer().map(|a| a.provider.as_str()), Some("b"));
    }

    #[tokio::test]
    async fn missing_credential_makes_no_calls() {
        let transport = ScriptedTransport::new().on("a", Scripted::Respond(json!("fine answer")));
        let runner = ChainRunner::new(transport, None, BASE_URL);

        let report = runner.run(&[completion("a")], &PromptInput::new("hello")).await;

        assert_eq!(report.outcome, ChainOutcome::NoRemoteAnswer(NoAnswerReason::NoCredential));
        assert_eq!(report.final_state, ChainState::NotStarted);
        assert!(report.attempts.is_empty());
        assert!(runner.transport().called().is_empty());
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        let runner = ChainRunner::new(ScriptedTransport::new(), Some("   ".to_string()), BASE_URL);
        assert!(!runner.has_credential());
    }

    #[tokio::test]
    async fn empty_provider_list_is_exhausted() {
        let runner = runner(ScriptedTransport::new());
        let report = runner.run(&[], &PromptInput::new("hello")).await;
        assert_eq!(report.outcome, ChainOutcome::NoRemoteAnswer(NoAnswerReason::Exhausted));
        assert!(report.attempts.is_empty());
    }

    #[tokio::test]
    async fn slow_provider_times_out_and_chain_advances() {
        let transport = ScriptedTransport::new()
            .on("slow", Scripted::Hang)
            .on("fast", Scripted::Respond(json!({ "generated_text": "quick reply" })));
        let runner = runner(transport).with_timeout(Duration::from_millis(50));

        let report = runner
            .run(&[completion("slow"), completion("fast")], &PromptInput::new("hello"))
            .await;

        assert_eq!(report.answer().map(|a| a.provider.as_str()), Some("fast"));
        assert!(matches!(
            report.attempts[0].result,
            Err(AttemptError::TransportFailure { status: None, .. })
        ));
        assert!(report.attempts[0].elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn answer_is_sanitized_before_returning() {
        let transport = ScriptedTransport::new()
            .on("a", Scripted::Respond(json!([{ "generated_text": "hello AI: Sure thing\nHuman: and more" }])));
        let runner = runner(transport);

        let report = runner.run(&[completion("a")], &PromptInput::new("hello")).await;

        assert_eq!(report.answer().map(|a| a.answer.as_str()), Some("Sure thing"));
    }
}
