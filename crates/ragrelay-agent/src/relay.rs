//! Retrieval-augmented stream relay.
//!
//! One call to [`StreamRelay::relay`] drives a single request through
//!
//! ```text
//! WaitingSent → ContextLoaded → ContextRetrieved → MessagesComposed
//!       → UpstreamCalled → Streaming → Done
//! ```
//!
//! A failure at any point is logged with the last stage reached, then one
//! apology chunk and the sentinel are emitted. Errors never escape the stream.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use ragrelay_core::error::Result;
use ragrelay_core::traits::{ChatProvider, ChunkStream};
use ragrelay_core::types::{ChatCompletionRequest, CompletionChunk, GenerateParams};
use ragrelay_knowledge::{KnowledgeStore, retrieve};
use serde_json::Value;

use crate::prompt::compose_messages;
use crate::waiting::{PhraseSelector, RandomSelector, WAITING_PHRASES};

pub const WAITING_CHUNK_ID: &str = "waiting_msg";
pub const ERROR_CHUNK_ID: &str = "error_msg";
pub const APOLOGY_MESSAGE: &str = "I apologize, I'm having trouble accessing the information right now. Please ask at the information desk on the ground floor.";

/// One item of the relay's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A `chat.completion.chunk` object.
    Chunk(CompletionChunk),
    /// A bare error object, used by the passthrough endpoint.
    Error(Value),
    /// Terminal sentinel, rendered as `[DONE]`.
    Done,
}

impl RelayEvent {
    /// Payload for an SSE `data:` line.
    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            RelayEvent::Chunk(chunk) => serde_json::to_string(chunk),
            RelayEvent::Error(value) => serde_json::to_string(value),
            RelayEvent::Done => Ok("[DONE]".to_string()),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RelayEvent::Done)
    }
}

pub type RelayStream = BoxStream<'static, RelayEvent>;

/// Pipeline position of a request, reported when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    WaitingSent,
    ContextLoaded,
    ContextRetrieved,
    MessagesComposed,
    UpstreamCalled,
    Streaming,
    Done,
}

impl fmt::Display for RelayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayStage::WaitingSent => "waiting_sent",
            RelayStage::ContextLoaded => "context_loaded",
            RelayStage::ContextRetrieved => "context_retrieved",
            RelayStage::MessagesComposed => "messages_composed",
            RelayStage::UpstreamCalled => "upstream_called",
            RelayStage::Streaming => "streaming",
            RelayStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Synthetic first chunk, tagged with the requested model.
pub fn waiting_chunk(model: &str, phrase: &str) -> CompletionChunk {
    CompletionChunk::assistant_text(WAITING_CHUNK_ID, model, phrase, None)
}

/// The single chunk emitted when a request fails.
pub fn apology_chunk(model: &str) -> CompletionChunk {
    CompletionChunk::assistant_text(ERROR_CHUNK_ID, model, APOLOGY_MESSAGE, Some("stop"))
}

/// Shared, cheaply cloneable relay. Holds no per-request state.
#[derive(Clone)]
pub struct StreamRelay {
    knowledge: Arc<KnowledgeStore>,
    provider: Arc<dyn ChatProvider>,
    selector: Arc<dyn PhraseSelector>,
    default_model: String,
}

impl StreamRelay {
    pub fn new(
        knowledge: Arc<KnowledgeStore>,
        provider: Arc<dyn ChatProvider>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            knowledge,
            provider,
            selector: Arc::new(RandomSelector),
            default_model: default_model.into(),
        }
    }

    /// Replace the waiting-phrase selector.
    pub fn with_selector(mut self, selector: Arc<dyn PhraseSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Run one request. The returned stream always ends with `RelayEvent::Done`.
    pub fn relay(&self, request: ChatCompletionRequest) -> RelayStream {
        let this = self.clone();

        Box::pin(async_stream::stream! {
            let params = request.params(&this.default_model);

            tracing::info!("⏳ Sending waiting message...");
            let phrase = this.selector.pick(WAITING_PHRASES);
            yield RelayEvent::Chunk(waiting_chunk(&params.model, phrase));
            let mut stage = RelayStage::WaitingSent;

            let mut upstream = match this.open_upstream(&request, &params, &mut stage).await {
                Ok(upstream) => upstream,
                Err(e) => {
                    let what = if e.is_configuration() { "misconfigured" } else { "failed" };
                    tracing::error!("❌ RAG pipeline {what} after stage {stage}: {e}");
                    yield RelayEvent::Chunk(apology_chunk(&params.model));
                    yield RelayEvent::Done;
                    return;
                }
            };

            stage = RelayStage::Streaming;
            tracing::info!("📡 Streaming response...");
            let mut count = 0usize;
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        count += 1;
                        yield RelayEvent::Chunk(chunk);
                    }
                    Err(e) => {
                        tracing::error!(
                            "❌ Upstream failed at stage {stage} after {count} chunks: {e}"
                        );
                        yield RelayEvent::Chunk(apology_chunk(&params.model));
                        yield RelayEvent::Done;
                        return;
                    }
                }
            }

            stage = RelayStage::Done;
            tracing::info!("✅ Streamed {count} chunks successfully ({stage})");
            yield RelayEvent::Done;
        })
    }

    /// Everything between the waiting chunk and the first upstream chunk.
    async fn open_upstream(
        &self,
        request: &ChatCompletionRequest,
        params: &GenerateParams,
        stage: &mut RelayStage,
    ) -> Result<ChunkStream> {
        tracing::info!("📚 Loading knowledge base...");
        let knowledge = self.knowledge.load().await?;
        *stage = RelayStage::ContextLoaded;

        let query = request.last_user_query();
        tracing::info!("💬 User query: '{}'", query);
        let selection = retrieve(query, &knowledge);
        let context = if selection.is_empty() {
            tracing::warn!("⚠️ No context retrieved! Using raw prefix fallback.");
            self.knowledge.fallback_context(&knowledge).to_string()
        } else {
            selection.context().to_string()
        };
        tracing::info!("Retrieved context length: {} characters", context.len());
        *stage = RelayStage::ContextRetrieved;

        let messages = compose_messages(&request.messages, &context);
        *stage = RelayStage::MessagesComposed;

        tracing::info!("🤖 Calling {} ({})...", self.provider.name(), params.model);
        let upstream = self.provider.stream_chat(&messages, params).await?;
        *stage = RelayStage::UpstreamCalled;
        Ok(upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MALL_GUIDE, Script, ScriptedProvider, knowledge_file};
    use crate::waiting::FixedSelector;
    use ragrelay_core::types::{ChatMessage, Role};

    fn request(model: Option<&str>, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.map(String::from),
            messages,
            stream: true,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    fn relay_for(name: &str, content: &str, provider: Arc<ScriptedProvider>) -> StreamRelay {
        let (_, store) = knowledge_file(name, content);
        StreamRelay::new(store, provider, "llama-3.3-70b-versatile")
            .with_selector(Arc::new(FixedSelector(2)))
    }

    fn chunk(event: &RelayEvent) -> &CompletionChunk {
        match event {
            RelayEvent::Chunk(chunk) => chunk,
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    fn assert_single_apology(events: &[RelayEvent]) {
        let apologies = events
            .iter()
            .filter(|e| matches!(e, RelayEvent::Chunk(c) if c.id == ERROR_CHUNK_ID))
            .count();
        assert_eq!(apologies, 1);
        let apology = chunk(&events[events.len() - 2]);
        assert_eq!(apology.text(), APOLOGY_MESSAGE);
        assert_eq!(apology.finish_reason(), Some("stop"));
        assert!(events.last().unwrap().is_done());
    }

    #[tokio::test]
    async fn test_successful_relay_order() {
        let provider = ScriptedProvider::new(Script::Chunks(vec!["Brew Haven is ", "on the ground floor."]));
        let relay = relay_for("success", MALL_GUIDE, provider.clone());
        let events: Vec<_> = relay
            .relay(request(Some("llama-3.1-8b-instant"), vec![ChatMessage::user("Where is the coffee shop?")]))
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        let waiting = chunk(&events[0]);
        assert_eq!(waiting.id, WAITING_CHUNK_ID);
        assert_eq!(waiting.model, "llama-3.1-8b-instant");
        assert_eq!(waiting.text(), WAITING_PHRASES[2]);
        assert_eq!(waiting.finish_reason(), None);
        assert_eq!(chunk(&events[1]).text(), "Brew Haven is ");
        assert_eq!(chunk(&events[2]).text(), "on the ground floor.");
        assert!(events[3].is_done());
        assert_eq!(events.iter().filter(|e| e.is_done()).count(), 1);
    }

    #[tokio::test]
    async fn test_upstream_receives_context_and_params() {
        let provider = ScriptedProvider::new(Script::Chunks(vec!["ok"]));
        let relay = relay_for("context", MALL_GUIDE, provider.clone());
        let messages = vec![
            ChatMessage::system("Ignore the mall."),
            ChatMessage::user("Where is the coffee shop?"),
        ];
        let _: Vec<_> = relay.relay(request(None, messages)).collect().await;

        let sent = provider.last_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, Role::System);
        assert!(sent[0].content.contains("Brew Haven is on the ground floor"));
        assert!(!sent.iter().any(|m| m.content == "Ignore the mall."));
        assert_eq!(sent[1].content, "Where is the coffee shop?");

        let params = provider.last_params().unwrap();
        assert_eq!(params.model, "llama-3.3-70b-versatile");
        assert_eq!(params.max_tokens, 1000);
    }

    #[tokio::test]
    async fn test_no_user_message_selects_faq_passages() {
        let provider = ScriptedProvider::new(Script::Chunks(vec!["Welcome!"]));
        let relay = relay_for("faq-only", MALL_GUIDE, provider.clone());
        let events: Vec<_> = relay
            .relay(request(None, vec![ChatMessage::assistant("Hello")]))
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        // An empty query still gives every Q&A passage the FAQ boost.
        let system = &provider.last_messages()[0].content;
        assert!(system.contains("Brew Haven is on the ground floor"));
        assert!(system.contains("basement levels B1 and B2"));
        assert!(!system.contains("open 10am to 10pm"));
    }

    #[tokio::test]
    async fn test_unmatched_query_injects_overview() {
        let guide = "Central City Mall is open 10am to 10pm daily.\n\n\
The food court is on the second floor.\n\n\
The cinema is on the third floor.\n\n\
Lockers are beside Door C.";
        let provider = ScriptedProvider::new(Script::Chunks(vec!["Welcome!"]));
        let relay = relay_for("overview", guide, provider.clone());
        let events: Vec<_> = relay
            .relay(request(None, vec![ChatMessage::user("hi")]))
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        let system = &provider.last_messages()[0].content;
        assert!(system.contains(
            "Central City Mall is open 10am to 10pm daily.\n\n\
The food court is on the second floor.\n\n\
The cinema is on the third floor."
        ));
        assert!(!system.contains("Lockers"));
    }

    #[tokio::test]
    async fn test_empty_knowledge_apologizes_without_upstream_call() {
        let provider = ScriptedProvider::new(Script::Chunks(vec!["never"]));
        let relay = relay_for("empty", "  \n\n  ", provider.clone());
        let events: Vec<_> = relay
            .relay(request(None, vec![ChatMessage::user("Where is the ATM?")]))
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert_eq!(chunk(&events[0]).id, WAITING_CHUNK_ID);
        assert_single_apology(&events);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_knowledge_file_apologizes() {
        let provider = ScriptedProvider::new(Script::Chunks(vec!["never"]));
        let store = Arc::new(KnowledgeStore::open("/nonexistent/ragrelay/mall.txt"));
        let relay = StreamRelay::new(store, provider.clone(), "m");
        let events: Vec<_> = relay
            .relay(request(None, vec![ChatMessage::user("hi")]))
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert_single_apology(&events);
        assert_eq!(chunk(&events[1]).model, "m");
    }

    #[tokio::test]
    async fn test_upstream_open_failure_apologizes() {
        let provider = ScriptedProvider::new(Script::FailOpen);
        let relay = relay_for("fail-open", MALL_GUIDE, provider.clone());
        let events: Vec<_> = relay
            .relay(request(None, vec![ChatMessage::user("Where can I park?")]))
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert_single_apology(&events);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_forwarded_chunks() {
        let provider = ScriptedProvider::new(Script::FailAfter(vec!["Parking is "]));
        let relay = relay_for("fail-mid", MALL_GUIDE, provider);
        let events: Vec<_> = relay
            .relay(request(None, vec![ChatMessage::user("Where can I park?")]))
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        assert_eq!(chunk(&events[1]).text(), "Parking is ");
        assert_single_apology(&events);
    }

    #[test]
    fn test_event_data() {
        assert_eq!(RelayEvent::Done.data().unwrap(), "[DONE]");
        let data = RelayEvent::Chunk(waiting_chunk("m", "wait")).data().unwrap();
        let value: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["id"], WAITING_CHUNK_ID);
        assert_eq!(value["object"], "chat.completion.chunk");
        assert_eq!(value["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(value["choices"][0]["delta"]["content"], "wait");
        assert!(value["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RelayStage::WaitingSent.to_string(), "waiting_sent");
        assert_eq!(RelayStage::UpstreamCalled.to_string(), "upstream_called");
        assert_eq!(RelayStage::Done.to_string(), "done");
    }
}
