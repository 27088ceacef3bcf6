use research_agent_model::{
    ModelMessage, ModelRequest, ToolCallRequest, ToolCallResult, ToolChoice,
    TurnBudget,
};
use research_agent_search::ErrorKind;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::Agent;
use crate::answer::{FinalAnswer, Termination, fallback_answer};
use crate::error::{ModelError, RunError};
use crate::event::RunEvent;
use crate::evidence::{Evidence, EvidenceRecord};
use crate::instructions::Instructions;
use crate::model_client::ModelClientResponse;
use crate::search_client::SearchError;
use crate::tool::ToolOutput;

/// Everything a run has accumulated so far.
pub(super) struct RunState {
    query: String,
    messages: Vec<ModelMessage>,
    evidence: Evidence,
    turns: usize,
}

impl RunState {
    pub fn new(instructions: &Instructions, query: &str) -> Self {
        Self {
            query: query.to_owned(),
            messages: vec![
                ModelMessage::System(instructions.as_str().to_owned()),
                ModelMessage::User(query.to_owned()),
            ],
            evidence: Evidence::default(),
            turns: 0,
        }
    }

    fn push_response(&mut self, resp: &ModelClientResponse) {
        match &resp.opaque_msg {
            Some(msg) => self.messages.push(ModelMessage::Opaque(msg.clone())),
            None if !resp.transcript.is_empty() => {
                self.messages
                    .push(ModelMessage::Assistant(resp.transcript.clone()));
            }
            None => {}
        }
    }

    fn complete_turn(
        &mut self,
        turn: usize,
        outputs: Vec<(String, ToolOutput)>,
    ) {
        for (call_id, output) in outputs {
            self.messages.push(ModelMessage::Tool(ToolCallResult {
                id: call_id.clone(),
                content: output.to_model_content(),
            }));
            if let ToolOutput::Search { query, outcome } = output {
                self.evidence.push(EvidenceRecord {
                    turn,
                    call_id,
                    query,
                    outcome,
                });
            }
        }
        self.turns += 1;
    }

    fn finish(self, text: String, termination: Termination) -> FinalAnswer {
        FinalAnswer {
            text,
            termination,
            turns: self.turns,
            evidence: self.evidence,
        }
    }
}

enum Stage {
    Reasoning,
    ToolInvocation(Vec<ToolCallRequest>),
    Synthesis(Termination),
    Done(String, Termination),
}

pub(super) async fn drive(
    agent: &Agent,
    mut state: RunState,
) -> Result<FinalAnswer, RunError> {
    let max_turns = agent.options.max_turns;
    let mut stage = Stage::Reasoning;
    loop {
        stage = match stage {
            Stage::Reasoning if state.turns >= max_turns => {
                warn!(
                    turns = state.turns,
                    max_turns, "turn budget exhausted, forcing synthesis"
                );
                agent.emit(RunEvent::BudgetExhausted { turns: state.turns });
                Stage::Synthesis(Termination::Exhausted)
            }
            Stage::Reasoning => {
                agent.emit(RunEvent::Thinking {
                    turn: state.turns + 1,
                });
                let resp = agent.reason(&state, ToolChoice::Auto).await?;
                debug!(
                    finish_reason = ?resp.finish_reason,
                    tool_calls = resp.tool_calls.len(),
                    "model replied"
                );
                state.push_response(&resp);
                if !resp.tool_calls.is_empty() {
                    Stage::ToolInvocation(resp.tool_calls)
                } else if resp.transcript.trim().is_empty() {
                    debug!("model replied with neither tool calls nor text");
                    Stage::Synthesis(Termination::Completed)
                } else {
                    Stage::Done(resp.transcript, Termination::Completed)
                }
            }
            Stage::ToolInvocation(calls) => {
                let turn = state.turns + 1;
                info!(turn, calls = calls.len(), "running tool calls");
                let outputs = agent
                    .run_tools(turn, calls)
                    .instrument(info_span!("turn", turn))
                    .await;
                state.complete_turn(turn, outputs);
                Stage::Reasoning
            }
            Stage::Synthesis(termination) => {
                let text = agent.synthesize(&mut state, termination).await?;
                Stage::Done(text, termination)
            }
            Stage::Done(text, termination) => {
                info!(%termination, turns = state.turns, "run finished");
                agent.emit(RunEvent::Finished {
                    termination,
                    turns: state.turns,
                });
                return Ok(state.finish(text, termination));
            }
        };
    }
}

fn synthesis_note(turns: usize, max_turns: usize, exhausted: bool) -> String {
    let mut note = String::new();
    if exhausted {
        note.push_str(&format!(
            "The research budget is used up: {turns} of {max_turns} search \
             turns are done. "
        ));
    }
    note.push_str(
        "Do not call any more tools. Write the final answer now, using only \
         the evidence gathered above and citing the source URLs you rely on. \
         If the evidence is insufficient, say so plainly.",
    );
    note
}

impl Agent {
    async fn reason(
        &self,
        state: &RunState,
        tool_choice: ToolChoice,
    ) -> Result<ModelClientResponse, ModelError> {
        let tools = self
            .toolset
            .as_ref()
            .map(|toolset| toolset.definitions())
            .unwrap_or_default();
        let mut req = ModelRequest::new(state.messages.clone(), tools);
        req.tool_choice = tool_choice;
        req.turn_budget = Some(TurnBudget {
            completed: state.turns,
            max: self.options.max_turns,
        });

        let client = &self.model_client;
        let req = &req;
        let on_event = &self.on_event;
        self.options
            .model_retry
            .retry(
                "model request",
                move || {
                    let on_event = on_event.clone();
                    client.send_request(req.clone(), move |delta| {
                        if let Some(on_event) = &on_event {
                            on_event(&RunEvent::MessageDelta(delta));
                        }
                    })
                },
                |err: &ModelError| err.kind().is_transient(),
            )
            .await
    }

    /// Runs every call of one turn concurrently, and returns their outputs
    /// in request order.
    async fn run_tools(
        &self,
        turn: usize,
        calls: Vec<ToolCallRequest>,
    ) -> Vec<(String, ToolOutput)> {
        let mut outputs = Vec::with_capacity(calls.len());
        let mut tasks = JoinSet::new();
        for (idx, call) in calls.into_iter().enumerate() {
            let prepared = match &self.toolset {
                Some(toolset) => toolset
                    .prepare(&call)
                    .map(|invocation| (toolset, invocation)),
                None => Err(format!("unknown tool `{}`", call.name)),
            };
            let (toolset, invocation) = match prepared {
                Ok(prepared) => prepared,
                Err(reason) => {
                    warn!(
                        call_id = %call.id,
                        tool = %call.name,
                        "rejected tool call: {reason}"
                    );
                    outputs.push((call.id, ToolOutput::Rejected(reason)));
                    continue;
                }
            };

            let query = invocation.query().to_owned();
            debug!(call_id = %call.id, %query, "dispatching search");
            self.emit(RunEvent::SearchStarted {
                turn,
                call_id: call.id.clone(),
                query: query.clone(),
            });
            let fut = toolset.execute(invocation);
            tasks.spawn(async move { (idx, fut.await) });

            // Stays in place only if the task never reports back.
            let lost = SearchError::new(
                ErrorKind::Other,
                "search task ended unexpectedly",
            );
            outputs.push((
                call.id,
                ToolOutput::Search {
                    query,
                    outcome: Err(lost),
                },
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            let (idx, output) = match joined {
                Ok(joined) => joined,
                Err(err) => {
                    error!("search task failed: {err}");
                    continue;
                }
            };
            let (call_id, slot) = &mut outputs[idx];
            let hits = output.hit_count();
            debug!(%call_id, ?hits, "search finished");
            self.emit(RunEvent::SearchFinished {
                turn,
                call_id: call_id.clone(),
                hits,
            });
            *slot = output;
        }
        outputs
    }

    async fn synthesize(
        &self,
        state: &mut RunState,
        termination: Termination,
    ) -> Result<String, ModelError> {
        let exhausted = termination == Termination::Exhausted;
        let max_turns = self.options.max_turns;
        let note = synthesis_note(state.turns, max_turns, exhausted);
        state.messages.push(ModelMessage::System(note));

        let resp = self.reason(state, ToolChoice::None).await?;
        if !resp.tool_calls.is_empty() {
            warn!(
                calls = resp.tool_calls.len(),
                "ignoring tool calls requested during forced synthesis"
            );
        }
        if resp.transcript.trim().is_empty() {
            warn!("forced synthesis produced no text, composing a fallback");
            return Ok(fallback_answer(&state.query, &state.evidence));
        }
        Ok(resp.transcript)
    }
}
