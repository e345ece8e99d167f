//! The tool-calling loop.

use crate::model::{Backend, ModelError, ModelRequest, ModelResponse, ToolCall, Usage};
use crate::tools::{ToolRegistry, execute_round};
use crate::transcript::Transcript;
use crate::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Tool rounds allowed per run unless configured otherwise.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Where a run is between model calls.
///
/// A run ends either `Done` (the `Ok` of [`Agent::run`]) or `Failed` (its
/// `Err`), so those states have no variant here.
#[derive(Debug)]
enum State {
    AwaitingModel,
    AwaitingTools(Vec<ToolCall>),
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    /// The model's final answer.
    pub output: String,
    pub transcript: Transcript,
    /// Tool rounds executed.
    pub rounds: usize,
    pub usage: Usage,
}

/// Builder for [`Agent`].
pub struct AgentBuilder<B> {
    backend: B,
    registry: Arc<ToolRegistry>,
    max_rounds: usize,
}

impl<B: Backend> AgentBuilder<B> {
    /// Maximum number of tool rounds before a run fails.
    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn build(self) -> Agent<B> {
        Agent {
            backend: self.backend,
            registry: self.registry,
            max_rounds: self.max_rounds,
        }
    }
}

/// Alternates between the model and the tool registry until the model
/// answers.
///
/// An agent holds no per-run state; concurrent runs share only the
/// read-only registry.
pub struct Agent<B> {
    backend: B,
    registry: Arc<ToolRegistry>,
    max_rounds: usize,
}

impl<B: Backend> Agent<B> {
    pub fn builder(backend: B, registry: impl Into<Arc<ToolRegistry>>) -> AgentBuilder<B> {
        AgentBuilder {
            backend,
            registry: registry.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Run the loop for one input.
    pub async fn run(&self, input: &str) -> Result<RunOutcome> {
        self.run_with_cancel(input, CancellationToken::new()).await
    }

    /// Run the loop, aborting when `cancel` fires.
    ///
    /// Cancelling drops the in-flight model call and any outstanding tool
    /// calls. The partial transcript is discarded with them.
    pub async fn run_with_cancel(
        &self,
        input: &str,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);

        async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Cancelled),
                result = self.drive(run_id, input) => result,
            };

            match &result {
                Ok(outcome) => info!(
                    rounds = outcome.rounds,
                    input_tokens = outcome.usage.input_tokens,
                    output_tokens = outcome.usage.output_tokens,
                    "run finished"
                ),
                Err(e) => warn!(kind = e.kind(), error = %e, "run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, run_id: Uuid, input: &str) -> Result<RunOutcome> {
        let mut transcript = Transcript::new(input);
        let mut state = State::AwaitingModel;
        let mut rounds = 0;
        let mut usage = Usage::default();

        loop {
            state = match state {
                State::AwaitingModel => {
                    debug!(messages = transcript.len(), "querying model");
                    let output = self
                        .backend
                        .call(ModelRequest {
                            messages: transcript.messages(),
                            tools: self.registry.specs(),
                        })
                        .await?;
                    usage += output.usage;
                    transcript.push_response(&output.response)?;

                    match output.response {
                        ModelResponse::FinalAnswer { text } => {
                            return Ok(RunOutcome {
                                run_id,
                                output: text,
                                transcript,
                                rounds,
                                usage,
                            });
                        }
                        ModelResponse::ToolRequest { calls, .. } => {
                            if calls.is_empty() {
                                return Err(ModelError::Malformed(
                                    "tool request without tool calls".into(),
                                )
                                .into());
                            }
                            if rounds >= self.max_rounds {
                                return Err(Error::MaxRoundsExceeded(self.max_rounds));
                            }
                            State::AwaitingTools(calls)
                        }
                    }
                }
                State::AwaitingTools(calls) => {
                    rounds += 1;
                    debug!(round = rounds, calls = calls.len(), "executing tools");
                    for result in execute_round(&calls, &self.registry).await {
                        transcript.push_result(result)?;
                    }
                    State::AwaitingModel
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Arguments, Message, ScriptedBackend, ToolOutcome, ToolResult};
    use crate::tools::{ParamSpec, ParamType, Tool, ToolError, ToolSpec, arithmetic_registry};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn call(id: &str, tool: &str, arguments: Value) -> ToolCall {
        ToolCall::new(id, tool, arguments)
    }

    fn request(calls: Vec<ToolCall>) -> ModelResponse {
        ModelResponse::ToolRequest {
            text: String::new(),
            calls,
        }
    }

    fn answer(text: &str) -> ModelResponse {
        ModelResponse::FinalAnswer { text: text.into() }
    }

    fn agent(backend: ScriptedBackend) -> Agent<ScriptedBackend> {
        Agent::builder(backend, arithmetic_registry().unwrap()).build()
    }

    #[tokio::test]
    async fn adds_two_and_two() {
        let agent = agent(ScriptedBackend::new([
            request(vec![call("c1", "add", json!({"a": 2, "b": 2}))]),
            answer("4"),
        ]));

        let outcome = agent.run("What is 2 + 2?").await.unwrap();

        assert_eq!(outcome.output, "4");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(
            outcome.transcript.messages(),
            &[
                Message::user("What is 2 + 2?"),
                Message::Assistant {
                    content: String::new(),
                    tool_calls: vec![call("c1", "add", json!({"a": 2, "b": 2}))],
                },
                Message::ToolResult(ToolResult::success("c1", json!(4))),
                Message::assistant("4"),
            ]
        );
    }

    #[tokio::test]
    async fn multiplies_six_and_seven() {
        let agent = agent(ScriptedBackend::new([
            request(vec![call("c1", "multiply", json!({"a": 6, "b": 7}))]),
            answer("42"),
        ]));

        let outcome = agent.run("multiply 6 and 7").await.unwrap();

        assert_eq!(outcome.output, "42");
        let seen = agent.backend().requests();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1].last(),
            Some(&Message::ToolResult(ToolResult::success("c1", json!(42))))
        );
    }

    #[tokio::test]
    async fn direct_answer_needs_no_tools() {
        let agent = agent(ScriptedBackend::new([answer("hello")]));
        let outcome = agent.run("hi").await.unwrap();
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.transcript.len(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_back_to_the_model() {
        let agent = agent(ScriptedBackend::new([
            request(vec![call("c1", "divide", json!({"a": 8, "b": 2}))]),
            answer("I cannot divide."),
        ]));

        let outcome = agent.run("8 / 2?").await.unwrap();

        assert_eq!(outcome.output, "I cannot divide.");
        match &outcome.transcript.messages()[2] {
            Message::ToolResult(ToolResult {
                call_id,
                outcome: ToolOutcome::Error { kind, .. },
            }) => {
                assert_eq!(call_id, "c1");
                assert_eq!(kind, "unknown_tool");
            }
            other => panic!("expected error result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_arguments_are_reported_back_to_the_model() {
        let agent = agent(ScriptedBackend::new([
            request(vec![call("c1", "add", json!({"a": 2}))]),
            request(vec![call("c2", "add", json!({"a": 2, "b": 2}))]),
            answer("4"),
        ]));

        let outcome = agent.run("2 + 2").await.unwrap();

        assert_eq!(outcome.rounds, 2);
        let kinds: Vec<_> = outcome
            .transcript
            .messages()
            .iter()
            .filter_map(|m| match m {
                Message::ToolResult(r) => Some(r.outcome.is_error()),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, [true, false]);
    }

    #[tokio::test]
    async fn endless_tool_requests_hit_the_round_limit() {
        let backend = ScriptedBackend::repeating(request(vec![call(
            "c1",
            "divide",
            json!({"a": 1, "b": 0}),
        )]));
        let agent = Agent::builder(backend, arithmetic_registry().unwrap())
            .max_rounds(3)
            .build();

        // Call ids repeat across rounds; each is answered before the next request.
        let err = agent.run("divide 1 by 0").await.unwrap_err();

        assert!(matches!(err, Error::MaxRoundsExceeded(3)));
        assert_eq!(err.kind(), "max_rounds_exceeded");
        assert_eq!(agent.backend().calls(), 4);
    }

    #[tokio::test]
    async fn zero_rounds_allows_direct_answers_only() {
        let agent = Agent::builder(
            ScriptedBackend::new([request(vec![call("c1", "add", json!({"a": 1, "b": 1}))])]),
            arithmetic_registry().unwrap(),
        )
        .max_rounds(0)
        .build();

        let err = agent.run("1 + 1").await.unwrap_err();
        assert!(matches!(err, Error::MaxRoundsExceeded(0)));
    }

    #[tokio::test]
    async fn model_failures_are_fatal() {
        let agent = agent(
            ScriptedBackend::new([request(vec![call("c1", "add", json!({"a": 1, "b": 1}))])])
                .then_fail(ModelError::Malformed("no content".into())),
        );
        let err = agent.run("1 + 1").await.unwrap_err();
        assert_eq!(err.kind(), "malformed_response");

        let agent = agent_unavailable();
        let err = agent.run("1 + 1").await.unwrap_err();
        assert_eq!(err.kind(), "model_unavailable");
    }

    #[tokio::test]
    async fn tool_request_without_calls_is_malformed() {
        let backend = ScriptedBackend::repeating(request(Vec::new()));
        let agent = Agent::builder(backend, arithmetic_registry().unwrap())
            .max_rounds(3)
            .build();

        let err = agent.run("1 + 1").await.unwrap_err();

        assert_eq!(err.kind(), "malformed_response");
        assert_eq!(agent.backend().calls(), 1);
    }

    fn agent_unavailable() -> Agent<ScriptedBackend> {
        agent(ScriptedBackend::default().then_fail(ModelError::Unavailable("connection refused".into())))
    }

    #[tokio::test]
    async fn results_follow_request_order() {
        let agent = agent(ScriptedBackend::new([
            request(vec![
                call("A", "add", json!({"a": 1, "b": 1})),
                call("B", "divide", json!({})),
                call("C", "multiply", json!({"a": 3, "b": 3})),
            ]),
            answer("done"),
        ]));

        let outcome = agent.run("several").await.unwrap();

        let ids: Vec<_> = outcome.transcript.messages()[2..5]
            .iter()
            .map(|m| match m {
                Message::ToolResult(r) => r.call_id.as_str(),
                other => panic!("expected tool result, got {other:?}"),
            })
            .collect();
        assert_eq!(ids, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn replaying_a_script_gives_the_same_transcript() {
        let script = || {
            ScriptedBackend::new([
                request(vec![
                    call("c1", "add", json!({"a": 2, "b": 2})),
                    call("c2", "multiply", json!({"a": 4, "b": 3})),
                ]),
                request(vec![call("c3", "divide", json!({"a": 1}))]),
                answer("4 and 12"),
            ])
        };

        let first = agent(script()).run("go").await.unwrap();
        let second = agent(script()).run("go").await.unwrap();

        assert_eq!(first.transcript, second.transcript);
        assert_eq!(first.usage, second.usage);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn usage_accumulates_across_rounds() {
        let agent = agent(ScriptedBackend::new([
            request(vec![call("c1", "add", json!({"a": 2, "b": 2}))]),
            answer("4"),
        ]));
        let outcome = agent.run("2 + 2").await.unwrap();
        // The scripted client reports one input token per message shown.
        assert_eq!(outcome.usage.input_tokens, 1 + 3);
        assert_eq!(outcome.usage.output_tokens, 2);
    }

    #[tokio::test]
    async fn cancellation_aborts_an_in_flight_run() {
        let agent = agent(
            ScriptedBackend::new([answer("too late")]).with_latency(Duration::from_secs(30)),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = agent.run_with_cancel("hi", cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Waits `ms` milliseconds, then counts itself finished.
    struct SlowTool {
        spec: ToolSpec,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn call(&self, arguments: &Arguments) -> std::result::Result<Value, ToolError> {
            let ms = arguments["ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(json!("done"))
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_running_tools() {
        let finished = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new()
            .with(SlowTool {
                spec: ToolSpec::new("slow", "Takes its time.")
                    .param(ParamSpec::required("ms", ParamType::Integer)),
                finished: finished.clone(),
            })
            .unwrap();
        let backend = ScriptedBackend::new([
            request(vec![
                call("c1", "slow", json!({"ms": 30_000})),
                call("c2", "slow", json!({"ms": 30_000})),
            ]),
            answer("too late"),
        ]);
        let agent = Agent::builder(backend, registry).build();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = agent.run_with_cancel("wait", cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        // Only the tool request was fetched; the round never completed.
        assert_eq!(agent.backend().calls(), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
