//! Entry point for recognized utterances.
//!
//! At most one dispatch runs at a time. Events arriving while one is in
//! flight are dropped, not queued: a stale command executed late is worse
//! than a missed one.

use crate::directive::{DispatchResult, VoiceEvent};
use crate::dispatch::Dispatcher;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const PREVIEW_CHARS: usize = 50;

/// Immediate acknowledgment of a push. Identical whether or not the event
/// was later dropped by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushAck {
    pub accepted: bool,
    pub text_preview: String,
}

pub struct PushReceipt {
    pub ack: PushAck,
    /// The background dispatch, if the event got through the gate.
    pub task: Option<JoinHandle<DispatchResult>>,
}

#[derive(Clone)]
pub struct Ingress {
    dispatcher: Arc<Dispatcher>,
    /// One permit, held by the running dispatch.
    gate: Arc<Semaphore>,
}

impl Ingress {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Reads the permit count without touching the gate.
    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// Accepts an utterance and dispatches it in the background.
    ///
    /// The gate is taken before this returns, so of two pushes the earlier
    /// one always wins. Must be called from within a tokio runtime.
    pub fn push(&self, text: &str) -> PushReceipt {
        let text = text.trim();
        let ack = PushAck {
            accepted: !text.is_empty(),
            text_preview: text.chars().take(PREVIEW_CHARS).collect(),
        };
        if text.is_empty() {
            return PushReceipt { ack, task: None };
        }

        let Ok(permit) = self.gate.clone().try_acquire_owned() else {
            warn!(preview = %ack.text_preview, "Dispatch in flight, dropping voice event");
            return PushReceipt { ack, task: None };
        };

        let event = VoiceEvent::new(text);
        info!(event_id = %event.id, "Voice event accepted");
        let dispatcher = self.dispatcher.clone();
        let task = tokio::spawn(async move {
            let result = dispatcher.dispatch(event).await;
            drop(permit);
            result
        });
        PushReceipt {
            ack,
            task: Some(task),
        }
    }

    pub fn clear_history(&self) {
        self.dispatcher.conversation().clear();
        info!("Conversation history cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyApi, BodyError, LookSnapshot};
    use crate::conversation::Turn;
    use crate::directive::{Directive, Tier};
    use crate::llm_client::{CompletionParams, LLMClient};
    use crate::mood::Light;
    use crate::prompts::Prompts;
    use crate::reflex::ReflexTable;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingBody {
        combos: StdMutex<Vec<Directive>>,
    }

    #[async_trait]
    impl BodyApi for RecordingBody {
        async fn status(&self) -> Result<Value, BodyError> {
            Ok(json!({ "battery_v": 7.4 }))
        }
        async fn look(&self) -> Result<LookSnapshot, BodyError> {
            Ok(LookSnapshot::default())
        }
        async fn speak(&self, _text: String) -> Result<Value, BodyError> {
            Ok(json!({ "ok": true }))
        }
        async fn command(&self, _action: String) -> Result<Value, BodyError> {
            Ok(json!({ "ok": true }))
        }
        async fn rgb(&self, _light: Light) -> Result<Value, BodyError> {
            Ok(json!({ "ok": true }))
        }
        async fn combo(&self, directive: Directive) -> Result<Value, BodyError> {
            self.combos.lock().unwrap().push(directive);
            Ok(json!({ "ok": true }))
        }
    }

    /// Holds every completion until released.
    struct HeldLlm {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl LLMClient for HeldLlm {
        async fn complete(
            &self,
            _system_prompt: String,
            _messages: Vec<Turn>,
            _params: CompletionParams,
        ) -> anyhow::Result<String> {
            self.release.notified().await;
            Ok(r#"{"speak":"Ha, good one."}"#.to_string())
        }
    }

    fn ingress(body: Arc<RecordingBody>, release: Arc<Notify>) -> Ingress {
        let dispatcher = Dispatcher::new(
            ReflexTable::builtin().unwrap(),
            body,
            Arc::new(HeldLlm { release }),
            Prompts::new("be a dog", "now is {now}"),
        );
        Ingress::new(Arc::new(dispatcher))
    }

    #[tokio::test]
    async fn test_second_push_is_dropped_while_busy() {
        let body = Arc::new(RecordingBody::default());
        let release = Arc::new(Notify::new());
        let ingress = ingress(body.clone(), release.clone());

        let first = ingress.push("tell me a joke");
        assert!(first.ack.accepted);
        assert!(ingress.is_busy());

        let second = ingress.push("tell me another joke");
        assert!(second.ack.accepted, "ack does not reveal the drop");
        assert!(second.task.is_none());

        release.notify_one();
        let result = first.task.unwrap().await.unwrap();
        assert_eq!(result.tier, Tier::Conversational);
        assert_eq!(body.combos.lock().unwrap().len(), 1);
        assert!(!ingress.is_busy());
        assert_eq!(ingress.dispatcher().conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_gate_reopens_after_dispatch() {
        let body = Arc::new(RecordingBody::default());
        let ingress = ingress(body.clone(), Arc::new(Notify::new()));

        let first = ingress.push("sitz");
        first.task.unwrap().await.unwrap();
        let second = ingress.push("platz");
        let result = second.task.unwrap().await.unwrap();

        assert_eq!(result.tier, Tier::Reflex);
        assert_eq!(body.combos.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_busy_polling_never_drops_pushes_on_idle_gate() {
        const PUSHES: usize = 2_000;
        let body = Arc::new(RecordingBody::default());
        let ingress = ingress(body.clone(), Arc::new(Notify::new()));

        let stop = Arc::new(AtomicBool::new(false));
        let poller = {
            let ingress = ingress.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let _ = ingress.is_busy();
                }
            })
        };

        let mut dropped = 0;
        for _ in 0..PUSHES {
            match ingress.push("sitz").task {
                Some(task) => {
                    task.await.unwrap();
                }
                None => dropped += 1,
            }
        }
        stop.store(true, Ordering::Relaxed);
        poller.join().unwrap();

        assert_eq!(dropped, 0);
        assert_eq!(body.combos.lock().unwrap().len(), PUSHES);
    }

    #[tokio::test]
    async fn test_blank_push_is_rejected() {
        let body = Arc::new(RecordingBody::default());
        let ingress = ingress(body.clone(), Arc::new(Notify::new()));

        let receipt = ingress.push("   ");
        assert!(!receipt.ack.accepted);
        assert!(receipt.task.is_none());
        assert!(!ingress.is_busy());
    }

    #[tokio::test]
    async fn test_preview_is_trimmed_and_truncated() {
        let body = Arc::new(RecordingBody::default());
        let ingress = ingress(body, Arc::new(Notify::new()));

        let receipt = ingress.push(&format!("  sitz{}  ", "!".repeat(80)));
        assert_eq!(receipt.ack.text_preview.chars().count(), 50);
        assert!(receipt.ack.text_preview.starts_with("sitz!"));
        receipt.task.unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_history() {
        let body = Arc::new(RecordingBody::default());
        let ingress = ingress(body, Arc::new(Notify::new()));
        ingress.dispatcher().conversation().append("hi", "Hello!");

        ingress.clear_history();
        assert!(ingress.dispatcher().conversation().is_empty());
    }
}
