use crate::cons::provider_cons::{DEMO_MODE_LABEL, SMART_FALLBACK_LABEL};
use crate::llm::chain::NoAnswerReason;
use crate::llm::fallback::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> FallbackResponder {
        FallbackResponder::with_rng(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn greeting_is_classified_before_anything_else() {
        let r = seeded(1);
        assert_eq!(r.classify("Hello there"), FallbackCategory::Greeting);
        assert_eq!(r.classify("  good morning!"), FallbackCategory::Greeting);
        assert_eq!(r.classify("hi, how are you?"), FallbackCategory::Greeting);
        assert_eq!(r.classify("Hiya"), FallbackCategory::Greeting);
        assert_eq!(r.classify("heyyy!"), FallbackCategory::Greeting);
    }

    #[test]
    fn unmatched_text_falls_to_conversational_pool() {
        let r = seeded(1);
        assert_eq!(r.classify("asdkjasd"), FallbackCategory::Conversational);
        assert_eq!(r.classify("tell me about rome"), FallbackCategory::Conversational);
        assert_eq!(r.classify(""), FallbackCategory::Conversational);
    }

    #[test]
    fn ordered_rules_pick_the_first_match() {
        let r = seeded(1);
        assert_eq!(r.classify("So, how are you today?"), FallbackCategory::Wellbeing);
        assert_eq!(r.classify("What can you do?"), FallbackCategory::Capabilities);
        assert_eq!(r.classify("Thanks a lot"), FallbackCategory::Gratitude);
        assert_eq!(
            r.classify("what is rust"),
            FallbackCategory::Question(QuestionWord::What)
        );
        assert_eq!(
            r.classify("Why is the sky blue"),
            FallbackCategory::Question(QuestionWord::Why)
        );
        assert_eq!(
            r.classify("who wrote this"),
            FallbackCategory::Question(QuestionWord::Who)
        );
        assert_eq!(
            r.classify("how do magnets work"),
            FallbackCategory::Question(QuestionWord::How)
        );
    }

    #[test]
    fn reply_comes_from_the_matched_pool_with_reason_label() {
        let r = seeded(7);
        let reply = r.respond("Hello there", NoAnswerReason::Exhausted);
        assert_eq!(reply.category, FallbackCategory::Greeting);
        assert_eq!(reply.label, SMART_FALLBACK_LABEL);
        assert!(FallbackResponder::pool(FallbackCategory::Greeting).contains(&reply.text.as_str()));

        let reply = r.respond("asdkjasd", NoAnswerReason::NoCredential);
        assert_eq!(reply.category, FallbackCategory::Conversational);
        assert_eq!(reply.label, DEMO_MODE_LABEL);
        assert!(FallbackResponder::pool(FallbackCategory::Conversational).contains(&reply.text.as_str()));
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let a = seeded(42);
        let b = seeded(42);
        for _ in 0..10 {
            assert_eq!(
                a.respond("asdkjasd", NoAnswerReason::Exhausted).text,
                b.respond("asdkjasd", NoAnswerReason::Exhausted).text
            );
        }
    }

    #[test]
    fn every_pool_is_non_empty() {
        let categories = [
            FallbackCategory::Greeting,
            FallbackCategory::Wellbeing,
            FallbackCategory::Capabilities,
            FallbackCategory::Gratitude,
            FallbackCategory::Question(QuestionWord::What),
            FallbackCategory::Question(QuestionWord::How),
            FallbackCategory::Question(QuestionWord::Why),
            FallbackCategory::Question(QuestionWord::Who),
            FallbackCategory::Conversational,
        ];
        for category in categories {
            assert!(!FallbackResponder::pool(category).is_empty(), "{}", category);
        }
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let r = seeded(1).with_rules(vec![DEFAULT_RULES[0]]);
        assert_eq!(r.classify("what is rust"), FallbackCategory::Conversational);
        assert_eq!(r.classify("hey"), FallbackCategory::Greeting);
    }
}
