//! The turn driver: alternates model calls and tool execution until the
//! model answers or the run has to stop.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::answer::final_answer;
use crate::config::{Prompts, Settings};
use crate::conversation::{Conversation, Invocation, Turn};
use crate::error::SvarError;
use crate::llm::{GenerationParams, ModelInvoker};
use crate::protocol::{Extraction, PromptFormatter, ToolCallExtractor};
use crate::tools::{ToolDescriptor, ToolRegistry};

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model replied without requesting tools.
    Answered,
    /// The model produced no text at all.
    EmptyGeneration,
    /// The model endpoint could not be reached.
    ModelUnavailable,
    /// The endpoint answered with something other than a generation.
    MalformedResponse,
    /// The model kept calling tools until the iteration budget ran out.
    IterationLimit,
    /// A turn could not be appended to the conversation.
    ProtocolViolation,
}

impl RunOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, RunOutcome::Answered)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunOutcome::Answered => "answered",
            RunOutcome::EmptyGeneration => "empty generation",
            RunOutcome::ModelUnavailable => "model unavailable",
            RunOutcome::MalformedResponse => "malformed response",
            RunOutcome::IterationLimit => "iteration limit",
            RunOutcome::ProtocolViolation => "protocol violation",
        };
        write!(f, "{}", label)
    }
}

enum DriverState {
    AwaitModel,
    ExecuteTools(Vec<Invocation>),
    Done(RunOutcome, String),
}

/// Answers questions with a completion model and a set of tools.
pub struct Agent {
    invoker: Arc<dyn ModelInvoker>,
    tools: ToolRegistry,
    formatter: PromptFormatter,
    params: GenerationParams,
    system_prompt: String,
    max_iterations: usize,
}

impl Agent {
    /// Create an agent with the default prompts and generation parameters.
    pub fn new(invoker: Arc<dyn ModelInvoker>, tools: ToolRegistry) -> Self {
        Self {
            invoker,
            tools,
            formatter: PromptFormatter::default(),
            params: GenerationParams::default(),
            system_prompt: Prompts::default().system_prompt(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Create an agent configured from settings and loaded prompts.
    pub fn from_settings(
        invoker: Arc<dyn ModelInvoker>,
        tools: ToolRegistry,
        settings: &Settings,
        prompts: &Prompts,
    ) -> Self {
        Self::new(invoker, tools)
            .with_system_prompt(&prompts.system_prompt())
            .with_formatter(PromptFormatter::from_prompts(&prompts.tools))
            .with_params(settings.model.generation_params())
            .with_max_iterations(settings.agent.max_iterations)
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set maximum model calls per run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_formatter(mut self, formatter: PromptFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model_name(&self) -> &str {
        self.invoker.name()
    }

    /// The exact prompt the first model call of a run would receive.
    pub fn render_prompt(&self, question: &str) -> String {
        let conversation = Conversation::with_question(&self.system_prompt, question);
        self.formatter.format(&conversation, &self.tools.descriptors())
    }

    /// Answer a question. Always produces a response; failures are reported
    /// through [`AgentResponse::outcome`] and an explanatory `content`.
    #[instrument(skip(self, question), fields(model = %self.invoker.name()))]
    pub async fn run(&self, question: &str) -> AgentResponse {
        let mut conversation = Conversation::with_question(&self.system_prompt, question);
        let descriptors = self.tools.descriptors();
        let mut tool_calls = Vec::new();
        let mut iterations = 0;
        let mut state = DriverState::AwaitModel;

        let (outcome, content) = loop {
            state = match state {
                DriverState::AwaitModel if iterations >= self.max_iterations => DriverState::Done(
                    RunOutcome::IterationLimit,
                    format!("[Agent stopped: reached maximum of {} iterations]", self.max_iterations),
                ),
                DriverState::AwaitModel => {
                    iterations += 1;
                    debug!("Agent iteration {}", iterations);
                    self.await_model(&mut conversation, &descriptors, iterations).await
                }
                DriverState::ExecuteTools(invocations) => {
                    self.execute_tools(&mut conversation, invocations, &mut tool_calls)
                        .await
                }
                DriverState::Done(outcome, content) => break (outcome, content),
            };
        };

        info!("Run finished after {} iteration(s): {}", iterations, outcome);

        let final_answer = if outcome.is_answered() {
            final_answer(&content)
        } else {
            None
        };

        AgentResponse {
            content,
            final_answer,
            outcome,
            tool_calls,
            iterations,
            conversation,
        }
    }

    async fn await_model(
        &self,
        conversation: &mut Conversation,
        descriptors: &[ToolDescriptor],
        iteration: usize,
    ) -> DriverState {
        let prompt = self.formatter.format(conversation, descriptors);
        debug!("Prompt is {} characters", prompt.len());

        let generation = match self.invoker.generate(&prompt, &self.params).await {
            Ok(generation) => generation,
            Err(e) => {
                warn!("Model call failed: {}", e);
                let outcome = match e {
                    SvarError::ModelResponse(_) | SvarError::Json(_) => RunOutcome::MalformedResponse,
                    _ => RunOutcome::ModelUnavailable,
                };
                return DriverState::Done(outcome, format!("Error: {}", e));
            }
        };

        if generation.trim().is_empty() {
            warn!("Model returned an empty generation");
            return DriverState::Done(
                RunOutcome::EmptyGeneration,
                "[Agent stopped: the model returned an empty response]".to_string(),
            );
        }

        let extractor = ToolCallExtractor::with_prefix(format!("call_{}", iteration));
        let (turn, next) = match extractor.extract(&generation) {
            Extraction::FinalAnswer(text) => {
                (Turn::assistant(text.clone()), DriverState::Done(RunOutcome::Answered, text))
            }
            Extraction::Invocations { text, invocations } => (
                Turn::assistant_with_invocations(text, invocations.clone()),
                DriverState::ExecuteTools(invocations),
            ),
        };

        match conversation.push(turn) {
            Ok(()) => next,
            Err(e) => protocol_violation(e.into()),
        }
    }

    /// Run each invocation in order, appending one tool-result turn per call.
    async fn execute_tools(
        &self,
        conversation: &mut Conversation,
        invocations: Vec<Invocation>,
        records: &mut Vec<ToolCallRecord>,
    ) -> DriverState {
        for invocation in invocations {
            info!("Agent calling tool {} ({})", invocation.name, invocation.id);

            let (result, is_error) = match self.tools.execute(&invocation.name, &invocation.arguments).await {
                Ok(output) => (output, false),
                Err(e) => {
                    warn!("Tool {} failed: {}", invocation.name, e);
                    (format!("Error: {}", e), true)
                }
            };

            if let Err(e) = conversation.push(Turn::tool_result(invocation.id.clone(), result.clone())) {
                return protocol_violation(e.into());
            }

            records.push(ToolCallRecord {
                id: invocation.id,
                name: invocation.name,
                arguments: invocation.arguments,
                result,
                is_error,
            });
        }

        DriverState::AwaitModel
    }
}

fn protocol_violation(error: SvarError) -> DriverState {
    warn!("{}", error);
    DriverState::Done(RunOutcome::ProtocolViolation, format!("Error: {}", error))
}

/// Response from an agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    /// The model's last reply, or an explanation of why the run stopped.
    pub content: String,
    /// The `FINAL ANSWER:` value, when the model gave one.
    pub final_answer: Option<String>,
    pub outcome: RunOutcome,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls made.
    pub iterations: usize,
    pub conversation: Conversation,
}

impl AgentResponse {
    /// The short answer if there is one, otherwise the full content.
    pub fn answer(&self) -> &str {
        self.final_answer.as_deref().unwrap_or(&self.content)
    }
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub result: String,
    /// True when `result` is an error message fed back to the model.
    pub is_error: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, Value::Object(self.arguments.clone()))
    }
}
