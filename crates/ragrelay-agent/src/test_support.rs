//! Scripted provider and knowledge fixtures shared by the relay tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragrelay_core::error::{RelayError, Result};
use ragrelay_core::traits::{ChatProvider, ChunkStream};
use ragrelay_core::types::{ChatMessage, CompletionChunk, GenerateParams};
use ragrelay_knowledge::KnowledgeStore;

pub const MALL_GUIDE: &str = "Central City Mall is open 10am to 10pm daily.\n\n\
Q: Where is the coffee shop?\nAnswer: Brew Haven is on the ground floor near the north entrance.\n\n\
Q: Where can I park?\nAnswer: Parking is in the basement levels B1 and B2.";

pub enum Script {
    Chunks(Vec<&'static str>),
    FailOpen,
    FailAfter(Vec<&'static str>),
}

pub struct ScriptedProvider {
    script: Script,
    pub calls: Mutex<Vec<(Vec<ChatMessage>, GenerateParams)>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self { script, calls: Mutex::new(Vec::new()) })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.calls.lock().unwrap().last().map(|(m, _)| m.clone()).unwrap_or_default()
    }

    pub fn last_params(&self) -> Option<GenerateParams> {
        self.calls.lock().unwrap().last().map(|(_, p)| p.clone())
    }
}

pub fn upstream_chunk(model: &str, text: &str) -> CompletionChunk {
    CompletionChunk::assistant_text("chatcmpl-test", model, text, None)
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerateParams,
    ) -> Result<ChunkStream> {
        self.calls.lock().unwrap().push((messages.to_vec(), params.clone()));
        let model = params.model.clone();
        let items: Vec<Result<CompletionChunk>> = match &self.script {
            Script::FailOpen => {
                return Err(RelayError::Provider("scripted API error 503".into()));
            }
            Script::Chunks(parts) => parts.iter().map(|p| Ok(upstream_chunk(&model, p))).collect(),
            Script::FailAfter(parts) => parts
                .iter()
                .map(|p| Ok(upstream_chunk(&model, p)))
                .chain(std::iter::once(Err(RelayError::Http("connection reset".into()))))
                .collect(),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Write `content` to a unique temp file and open a store on it.
pub fn knowledge_file(name: &str, content: &str) -> (PathBuf, Arc<KnowledgeStore>) {
    let dir = std::env::temp_dir().join("ragrelay-agent-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{name}-{}.txt", std::process::id()));
    std::fs::write(&path, content).unwrap();
    let store = Arc::new(KnowledgeStore::open(path.clone()));
    (path, store)
}
