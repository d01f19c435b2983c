//! Topic analysis: one dialogue in, one topic list out.
//!
//! [`Analyzer::analyze`] always produces an [`AnalysisOutcome`]. Anything that
//! goes wrong between budgeting and reconciliation is logged and answered by
//! the question navigator instead.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dialogue::Turn;
use crate::error::{AnalysisError, FallbackReason};
use crate::pipeline::{
    assemble, plan, question_navigator, reconcile, AnalysisOutcome, BudgetPlan, BudgetSettings,
    UserIndexMap,
};
use crate::provider::{invoke_with_retry, RetryPolicy, TopicProvider};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisSettings {
    pub budget: BudgetSettings,
    pub retry: RetryPolicy,
}

/// Outcome of a run plus what it took to get there.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub outcome: AnalysisOutcome,
    /// `None` when the provider was never consulted.
    pub plan: Option<BudgetPlan>,
    /// Provider calls made, including the successful one.
    pub attempts: u32,
}

/// Runs analyses against one provider, one at a time.
pub struct Analyzer<P> {
    provider: P,
    settings: AnalysisSettings,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AnalysisError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AnalysisError::AlreadyRunning)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: TopicProvider> Analyzer<P> {
    pub fn new(provider: P, settings: AnalysisSettings) -> Self {
        Self {
            provider,
            settings,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Analyzes `turns` into topic nodes.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::AlreadyRunning`] if another call on this
    /// analyzer has not finished yet. Every other failure ends in the
    /// question navigator with the reason attached.
    pub async fn analyze(
        &self,
        turns: &[Turn],
        cancel: &CancellationToken,
    ) -> Result<AnalysisRun, AnalysisError> {
        let _guard = RunGuard::acquire(&self.in_progress)?;

        let index_map = UserIndexMap::build(turns);
        if index_map.is_empty() {
            let reason = FallbackReason::NoUserTurns;
            info!(turns = turns.len(), "{reason}, skipping provider");
            return Ok(AnalysisRun {
                outcome: AnalysisOutcome::from_fallback(question_navigator(turns), Some(&reason)),
                plan: None,
                attempts: 0,
            });
        }

        let plan = plan(turns, &index_map, &self.settings.budget);
        info!(
            turns = turns.len(),
            user_turns = index_map.len(),
            strategy = %plan.strategy,
            chars = plan.bounded_len(),
            "budget planned"
        );
        let prompt = assemble(&plan.bounded_text, turns.len());

        let call = invoke_with_retry(&self.provider, &prompt, &self.settings.retry, cancel).await;
        let result = call
            .result
            .map_err(FallbackReason::from)
            .and_then(|raw| reconcile(&raw, &index_map, plan.strategy));

        let outcome = match result {
            Ok(nodes) => {
                info!(nodes = nodes.len(), attempts = call.attempts, "topics extracted");
                AnalysisOutcome::from_topics(nodes)
            }
            Err(reason) => {
                warn!(
                    reason = %reason,
                    detail = reason.detail().unwrap_or_default(),
                    "falling back to question navigator"
                );
                AnalysisOutcome::from_fallback(question_navigator(turns), Some(&reason))
            }
        };

        Ok(AnalysisRun {
            outcome,
            plan: Some(plan),
            attempts: call.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    use crate::dialogue::{turns, Role};
    use crate::pipeline::Strategy;
    use crate::provider::testing::{reply, status, Scripted, ScriptedProvider};

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            budget: BudgetSettings::default(),
            retry: RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(5),
                first_timeout: Duration::from_millis(500),
                retry_timeout: Duration::from_millis(500),
            },
        }
    }

    fn dialogue() -> Vec<Turn> {
        turns(&[
            (Role::User, "how do I install rust?"),
            (Role::Assistant, "use rustup"),
            (Role::User, "and update it?"),
            (Role::Assistant, "rustup update"),
            (Role::User, "what about async?"),
            (Role::Assistant, "try tokio"),
        ])
    }

    const TWO_TOPICS: &str = r#"{"nodes":[
        {"id":"1","title":"Toolchain","summary":"install and update",
         "messageIndexes":[0,1],"order":1},
        {"id":"2","title":"Async","summary":"runtimes","messageIndexes":[2],"order":2}
    ]}"#;

    #[tokio::test]
    async fn test_recovers_after_server_error() {
        let analyzer = Analyzer::new(
            ScriptedProvider::new(vec![status(503), reply(TWO_TOPICS)]),
            settings(),
        );
        let run = analyzer
            .analyze(&dialogue(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!run.outcome.is_fallback);
        assert_eq!(run.attempts, 2);
        assert_eq!(run.outcome.nodes.len(), 2);
        assert_eq!(run.outcome.nodes[0].turn_ordinals, vec![0, 2]);
        assert_eq!(run.outcome.nodes[1].turn_ordinals, vec![4]);
        assert_eq!(run.plan.unwrap().strategy, Strategy::None);
    }

    #[tokio::test]
    async fn test_auth_failure_falls_back_once() {
        let analyzer = Analyzer::new(
            ScriptedProvider::new(vec![status(401), reply(TWO_TOPICS)]),
            settings(),
        );
        let run = analyzer
            .analyze(&dialogue(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(run.outcome.is_fallback);
        assert_eq!(run.outcome.fallback_reason.as_deref(), Some("provider rejected"));
        assert_eq!(run.attempts, 1);
        assert_eq!(analyzer.provider().calls(), 1);
        assert_eq!(run.outcome.nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_rate_limited_until_exhausted() {
        let analyzer = Analyzer::new(
            ScriptedProvider::new(vec![status(429), status(429), status(429)]),
            settings(),
        );
        let run = analyzer
            .analyze(&dialogue(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(run.outcome.is_fallback);
        assert_eq!(
            run.outcome.fallback_reason.as_deref(),
            Some("provider unavailable")
        );
        assert_eq!(run.attempts, 3);
    }

    #[tokio::test]
    async fn test_repeated_timeouts_fall_back() {
        let analyzer = Analyzer::new(
            ScriptedProvider::new(vec![
                Scripted::Timeout,
                Scripted::Timeout,
                Scripted::Timeout,
            ]),
            settings(),
        );
        let run = analyzer
            .analyze(&dialogue(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            run.outcome.fallback_reason.as_deref(),
            Some("provider unavailable")
        );
        assert_eq!(run.attempts, 3);
    }

    #[tokio::test]
    async fn test_malformed_answer_falls_back() {
        let analyzer = Analyzer::new(
            ScriptedProvider::new(vec![reply(r#"{"nodes":[{"id":"1","title":"unterminated"#)]),
            settings(),
        );
        let dialogue = dialogue();
        let run = analyzer
            .analyze(&dialogue, &CancellationToken::new())
            .await
            .unwrap();
        assert!(run.outcome.is_fallback);
        assert_eq!(
            run.outcome.fallback_reason.as_deref(),
            Some("malformed response")
        );
        let covered = run.outcome.covered_ordinals(&dialogue);
        assert_eq!(covered, (0..dialogue.len()).collect::<BTreeSet<usize>>());
    }

    #[tokio::test]
    async fn test_cancelled_run_falls_back() {
        let analyzer = Analyzer::new(ScriptedProvider::new(vec![reply(TWO_TOPICS)]), settings());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let run = analyzer.analyze(&dialogue(), &cancel).await.unwrap();
        assert!(run.outcome.is_fallback);
        assert_eq!(
            run.outcome.fallback_reason.as_deref(),
            Some("analysis cancelled")
        );
        assert_eq!(analyzer.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_no_user_turns_skips_provider() {
        let analyzer = Analyzer::new(ScriptedProvider::new(vec![reply(TWO_TOPICS)]), settings());
        let dialogue = turns(&[(Role::Assistant, "welcome")]);
        let run = analyzer
            .analyze(&dialogue, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(run.outcome.fallback_reason.as_deref(), Some("no user turns"));
        assert!(run.plan.is_none());
        assert_eq!(analyzer.provider().calls(), 0);
        assert_eq!(run.outcome.nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_dialogue_yields_empty_outcome() {
        let analyzer = Analyzer::new(ScriptedProvider::new(vec![]), settings());
        let run = analyzer
            .analyze(&[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(run.outcome.nodes.is_empty());
        assert_eq!(analyzer.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_rejected() {
        let provider = ScriptedProvider::new(vec![reply(TWO_TOPICS)])
            .with_delays(vec![Duration::from_millis(50)]);
        let analyzer = Analyzer::new(provider, settings());
        let dialogue = dialogue();
        let cancel = CancellationToken::new();

        let (first, second) = tokio::join!(analyzer.analyze(&dialogue, &cancel), async {
            tokio::task::yield_now().await;
            analyzer.analyze(&dialogue, &cancel).await
        });

        assert!(!first.unwrap().outcome.is_fallback);
        assert!(matches!(second, Err(AnalysisError::AlreadyRunning)));
        // a later run is accepted again
        assert!(analyzer.analyze(&dialogue, &cancel).await.is_ok());
    }
}
