//! Tiered triage and dispatch of voice events.
//!
//! Tier order is fixed: reflex (1), then tool-augmented (3) when the
//! classifier flags the utterance, then conversational (2). Every path ends
//! in a directive sent to the body, even if it is only an apology.

use crate::body::{BodyApi, PowerReading};
use crate::classifier::{KeywordSet, ToolNeedClassifier};
use crate::conversation::{ConversationStore, DEFAULT_MAX_EXCHANGES, Role, Turn};
use crate::directive::{Directive, DispatchResult, Tier, VoiceEvent};
use crate::llm_client::{CompletionParams, LLMClient};
use crate::mood::Mood;
use crate::prompts::Prompts;
use crate::reflex::{MatchKind, ReflexTable};
use crate::reply::{ParsedReply, parse_reply};
use chrono::Local;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};

/// Spoken immediately before a tool-augmented call.
pub const FILLER_SPEECH: &str = "One moment, let me check...";

/// Spoken when no language-model tier produced a reply.
pub const APOLOGY_SPEECH: &str =
    "Sorry, my brain is offline right now. Try simple commands like sit or come.";

pub struct Dispatcher {
    reflexes: ReflexTable,
    tool_need: Box<dyn ToolNeedClassifier>,
    vision: KeywordSet,
    conversation: ConversationStore,
    body: Arc<dyn BodyApi>,
    llm: Arc<dyn LLMClient>,
    prompts: Prompts,
}

impl Dispatcher {
    pub fn new(
        reflexes: ReflexTable,
        body: Arc<dyn BodyApi>,
        llm: Arc<dyn LLMClient>,
        prompts: Prompts,
    ) -> Self {
        Self {
            reflexes,
            tool_need: Box::new(KeywordSet::tool_need()),
            vision: KeywordSet::vision(),
            conversation: ConversationStore::new(DEFAULT_MAX_EXCHANGES),
            body,
            llm,
            prompts,
        }
    }

    pub fn with_tool_classifier(mut self, classifier: Box<dyn ToolNeedClassifier>) -> Self {
        self.tool_need = classifier;
        self
    }

    pub fn with_history_limit(mut self, max_exchanges: usize) -> Self {
        self.conversation = ConversationStore::new(max_exchanges);
        self
    }

    pub fn reflexes(&self) -> &ReflexTable {
        &self.reflexes
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    /// Classifies `event`, resolves it through the first tier that succeeds,
    /// and sends the resulting directive to the body.
    pub async fn dispatch(&self, event: VoiceEvent) -> DispatchResult {
        let span = info_span!("dispatch", event_id = %event.id);
        self.dispatch_inner(event).instrument(span).await
    }

    async fn dispatch_inner(&self, event: VoiceEvent) -> DispatchResult {
        let started = Instant::now();
        let text = event.text.as_str();
        info!(%text, "Voice event");

        if let Some(reflex) = self.reflexes.lookup(text) {
            let entry = reflex.entry;
            let directive = Directive::new(entry.actions.clone(), entry.speak.clone(), entry.mood, None);
            info!(
                tier = %Tier::Reflex,
                trigger = reflex.trigger,
                fuzzy = matches!(reflex.kind, MatchKind::Fuzzy { .. }),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Resolved"
            );
            self.deliver(&directive).await;
            return DispatchResult {
                event_id: event.id,
                tier: Tier::Reflex,
                mood: entry.mood,
                directive,
            };
        }

        if self.tool_need.needs_tools(text) {
            info!(tier = %Tier::ToolAugmented, "Escalating");
            if let Err(e) = self.body.speak(FILLER_SPEECH.to_string()).await {
                warn!(error = %e, "Filler acknowledgment not delivered");
            }
            match self.call_tool_agent(text).await {
                Some(reply) => {
                    return self
                        .finish_model_turn(&event, Tier::ToolAugmented, reply, started)
                        .await;
                }
                None => warn!("Tool-augmented tier failed, falling back to conversation"),
            }
        }

        let context = self.gather_context(text).await;
        match self.call_conversation(text, &context).await {
            Some(reply) => {
                self.finish_model_turn(&event, Tier::Conversational, reply, started)
                    .await
            }
            None => {
                error!("Conversational tier failed, sending apology");
                let directive = Directive::new(Vec::new(), APOLOGY_SPEECH, Mood::Sad, None);
                self.deliver(&directive).await;
                DispatchResult {
                    event_id: event.id,
                    tier: Tier::Fallback,
                    mood: Mood::Sad,
                    directive,
                }
            }
        }
    }

    async fn finish_model_turn(
        &self,
        event: &VoiceEvent,
        tier: Tier,
        reply: ParsedReply,
        started: Instant,
    ) -> DispatchResult {
        let directive = Directive::new(reply.actions, reply.speak.clone(), reply.mood, reply.rgb);
        info!(
            %tier,
            speak = %directive.speak,
            actions = ?directive.actions,
            mood = %reply.mood,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resolved"
        );
        self.deliver(&directive).await;
        self.conversation.append(event.text.clone(), reply.speak);
        DispatchResult {
            event_id: event.id,
            tier,
            mood: reply.mood,
            directive,
        }
    }

    async fn call_tool_agent(&self, text: &str) -> Option<ParsedReply> {
        let system_prompt = self.prompts.tool_agent(Local::now());
        let messages = vec![Turn {
            role: Role::User,
            content: text.to_string(),
        }];
        match self
            .llm
            .complete(system_prompt, messages, CompletionParams::TOOL_AGENT)
            .await
        {
            Ok(content) => Some(parse_reply(&content, Mood::Think)),
            Err(e) => {
                warn!(error = %e, "Tool-augmented LLM call failed");
                None
            }
        }
    }

    async fn call_conversation(&self, text: &str, context: &str) -> Option<ParsedReply> {
        let mut messages = self.conversation.snapshot();
        let content = if context.is_empty() {
            text.to_string()
        } else {
            format!("[Context: {context}]\n\nHuman says: {text}")
        };
        messages.push(Turn {
            role: Role::User,
            content,
        });
        match self
            .llm
            .complete(
                self.prompts.conversation().to_string(),
                messages,
                CompletionParams::CONVERSATION,
            )
            .await
        {
            Ok(content) => Some(parse_reply(&content, Mood::Neutral)),
            Err(e) => {
                warn!(error = %e, "Conversational LLM call failed");
                None
            }
        }
    }

    /// Power state, plus a one-shot look when the utterance asks about sight.
    /// Fetch failures leave the corresponding part out.
    async fn gather_context(&self, text: &str) -> String {
        let mut parts = Vec::new();

        if let Ok(status) = self.body.status().await {
            if let Some(power) = PowerReading::from_status(&status) {
                parts.push(if power.charging {
                    format!("Battery: {}V (charging)", power.battery_volts)
                } else {
                    format!("Battery: {}V", power.battery_volts)
                });
            }
        }

        if self.vision.matches(text) {
            match self.body.look().await {
                Ok(look) if look.faces.is_empty() => {
                    parts.push("You see nobody in front of you".to_string());
                }
                Ok(look) => {
                    let names: Vec<&str> = look
                        .faces
                        .iter()
                        .map(|f| f.name.as_deref().unwrap_or("unknown"))
                        .collect();
                    parts.push(format!(
                        "You see {} face(s): {}",
                        names.len(),
                        names.join(", ")
                    ));
                }
                Err(e) => warn!(error = %e, "Look failed, continuing without vision"),
            }
        }

        parts.join(". ")
    }

    async fn deliver(&self, directive: &Directive) {
        if let Err(e) = self.body.combo(directive.clone()).await {
            warn!(error = %e, "Directive not delivered");
        }
    }
}
