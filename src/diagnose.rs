//! `ragrelay diagnose`: step-by-step checks against a knowledge file and a
//! running relay, ending with a list of issues and suggested fixes.

use std::path::Path;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use ragrelay_agent::relay::{ERROR_CHUNK_ID, WAITING_CHUNK_ID};
use ragrelay_core::error::RelayError;
use ragrelay_core::traits::ChunkStream;
use ragrelay_providers::sse;

pub const SAMPLE_QUESTION: &str = "Where is the coffee shop?";
const PREVIEW_CHARS: usize = 200;
const MIN_ANSWER_CHARS: usize = 10;

/// Problems found by a diagnostic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    KnowledgeMissing,
    ServerUnreachable,
    KnowledgeNotLoaded,
    UpstreamNotConfigured,
    QueryFailed,
}

impl Issue {
    pub fn describe(&self) -> &'static str {
        match self {
            Issue::KnowledgeMissing => "Knowledge base file missing or unreadable",
            Issue::ServerUnreachable => "RAG server not running or not responding",
            Issue::KnowledgeNotLoaded => "Server reports the knowledge base as not loaded",
            Issue::UpstreamNotConfigured => "Upstream API key not configured",
            Issue::QueryFailed => "Query test failed",
        }
    }

    pub fn fixes(&self) -> &'static [&'static str] {
        match self {
            Issue::KnowledgeMissing => &[
                "Create the knowledge file or point [knowledge].path at it",
            ],
            Issue::ServerUnreachable => &["Run: ragrelay serve"],
            Issue::KnowledgeNotLoaded => &[
                "Check [knowledge].path in the server's config and that the file is not empty",
            ],
            Issue::UpstreamNotConfigured => &[
                "Set [upstream].api_key or the provider's env var (e.g. GROQ_API_KEY)",
                "Get a Groq key from: https://console.groq.com",
            ],
            Issue::QueryFailed => &[
                "Check the server log for error messages",
                "Make sure the upstream API key is valid",
            ],
        }
    }
}

#[derive(Debug, Default)]
pub struct Report {
    pub issues: Vec<Issue>,
    pub server_reachable: bool,
}

impl Report {
    pub fn print_summary(&self) {
        print_section("📋 DIAGNOSTIC SUMMARY");
        if self.issues.is_empty() {
            println!("\n✅ ALL CHECKS PASSED!");
            println!("Your RAG server appears to be working correctly.");
        } else {
            println!("\n⚠️ ISSUES FOUND:");
            for (i, issue) in self.issues.iter().enumerate() {
                println!("   {}. {}", i + 1, issue.describe());
            }
            println!("\n💡 SOLUTIONS:");
            for issue in &self.issues {
                for fix in issue.fixes() {
                    println!("   - {fix}");
                }
            }
        }
        println!("{}", "=".repeat(60));
    }
}

fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("  {title}");
    println!("{}", "=".repeat(60));
}

/// Run every check. Stops after the server check if the server is unreachable.
pub async fn run(base_url: &str, knowledge: &Path) -> Report {
    let base_url = base_url.trim_end_matches('/');
    let mut report = Report::default();

    println!("\n🔍 RAGRELAY DIAGNOSTIC TOOL");

    print_section("Check 1: Knowledge Base File");
    if !check_knowledge_file(knowledge).await {
        report.issues.push(Issue::KnowledgeMissing);
    }

    print_section("Check 2: RAG Server Status");
    match check_server(base_url).await {
        Ok(health) => {
            report.server_reachable = true;
            if !health.knowledge_loaded {
                report.issues.push(Issue::KnowledgeNotLoaded);
            }
            if !health.upstream_configured {
                report.issues.push(Issue::UpstreamNotConfigured);
            }
        }
        Err(e) => {
            println!("❌ {e}");
            println!("\n⚠️ Cannot continue without server. Start it with:");
            println!("   ragrelay serve");
            report.issues.push(Issue::ServerUnreachable);
            return report;
        }
    }

    print_section("Check 3: Test Query");
    match sample_query(base_url).await {
        Ok(answer) if answer.chars().count() >= MIN_ANSWER_CHARS => {}
        Ok(_) => {
            println!("⚠️ WARNING: Response is very short or empty!");
            report.issues.push(Issue::QueryFailed);
        }
        Err(e) => {
            println!("❌ {e}");
            report.issues.push(Issue::QueryFailed);
        }
    }

    report
}

async fn check_knowledge_file(path: &Path) -> bool {
    println!("\n📁 Checking file: {}", path.display());

    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(_) => {
            println!("❌ File NOT found!");
            if let Ok(cwd) = std::env::current_dir() {
                println!("   Current directory: {}", cwd.display());
                list_directory(&cwd);
            }
            return false;
        }
    };
    println!("✅ File exists");
    println!("✅ File size: {} bytes", meta.len());

    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            println!("✅ File readable: {} characters", content.chars().count());
            println!("\nFirst {PREVIEW_CHARS} characters:");
            println!("{}", "-".repeat(60));
            println!("{}", preview(&content));
            println!("{}", "-".repeat(60));
            true
        }
        Err(e) => {
            println!("❌ Error reading file: {e}");
            false
        }
    }
}

fn list_directory(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    println!("   Files in current directory:");
    for entry in entries.flatten() {
        println!("     - {}", entry.file_name().to_string_lossy());
    }
}

fn preview(content: &str) -> &str {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

struct Health {
    knowledge_loaded: bool,
    upstream_configured: bool,
}

async fn check_server(base_url: &str) -> anyhow::Result<Health> {
    println!("\n🌐 Checking RAG server at {base_url}...");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let response = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Cannot connect to server: {e}"))?;
    if !response.status().is_success() {
        anyhow::bail!("Server responded with status: {}", response.status());
    }

    let data: serde_json::Value = response.json().await?;
    let health = Health {
        knowledge_loaded: data["knowledge_base_loaded"].as_bool().unwrap_or(false),
        upstream_configured: data["upstream_api_configured"].as_bool().unwrap_or(false),
    };
    println!("✅ Server is running!");
    println!("   Status: {}", data["status"]);
    println!("   Knowledge base loaded: {}", health.knowledge_loaded);
    println!("   Knowledge base size: {} bytes", data["knowledge_base_size"]);
    println!("   Upstream API configured: {}", health.upstream_configured);
    Ok(health)
}

/// Stream the sample question through the RAG endpoint, echoing content as it
/// arrives. Returns the reassembled answer.
async fn sample_query(base_url: &str) -> anyhow::Result<String> {
    println!("\n🧪 Testing simple query...");
    println!("Question: {SAMPLE_QUESTION}");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let response = client
        .post(format!("{base_url}/rag/chat/completions"))
        .json(&serde_json::json!({
            "messages": [{"role": "user", "content": SAMPLE_QUESTION}],
            "stream": true,
        }))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!("Request timeout! Server is taking too long to respond.")
            } else {
                anyhow::anyhow!("Request failed: {e}")
            }
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Server returned status: {status}\nResponse: {body}");
    }

    println!("\n📡 Streaming response:");
    println!("{}", "-".repeat(60));

    let bytes = response
        .bytes_stream()
        .map_err(|e| RelayError::Http(e.to_string()));
    let (answer, count) = read_answer(sse::chunk_stream(bytes)).await?;

    println!("\n{}", "-".repeat(60));
    println!("\n✅ Received {count} chunks");
    println!("✅ Total response length: {} characters", answer.chars().count());
    Ok(answer)
}

/// Echo streamed content and reassemble the answer, leaving out the waiting
/// phrase. Returns the answer and the number of chunks seen.
async fn read_answer(mut chunks: ChunkStream) -> anyhow::Result<(String, usize)> {
    let mut answer = String::new();
    let mut count = 0usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        count += 1;
        let text = chunk.text();
        print!("{text}");
        if chunk.id == ERROR_CHUNK_ID {
            println!();
            anyhow::bail!("Server streamed the apology message: the RAG pipeline failed");
        }
        if chunk.id != WAITING_CHUNK_ID {
            answer.push_str(&text);
        }
    }
    Ok((answer, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragrelay_core::types::CompletionChunk;

    fn chunks(list: Vec<CompletionChunk>) -> ChunkStream {
        Box::pin(futures::stream::iter(list.into_iter().map(Ok)))
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(300);
        assert_eq!(preview(&text).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_every_issue_has_a_fix() {
        for issue in [
            Issue::KnowledgeMissing,
            Issue::ServerUnreachable,
            Issue::KnowledgeNotLoaded,
            Issue::UpstreamNotConfigured,
            Issue::QueryFailed,
        ] {
            assert!(!issue.describe().is_empty());
            assert!(!issue.fixes().is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_file_fails_check() {
        assert!(!check_knowledge_file(Path::new("/nonexistent/ragrelay/kb.txt")).await);
    }

    #[tokio::test]
    async fn test_unreachable_server_stops_early() {
        let path = std::env::temp_dir().join(format!("ragrelay-diag-{}.txt", std::process::id()));
        std::fs::write(&path, "Q: Where is the ATM?\nAnswer: Ground floor.").unwrap();
        let report = run("http://127.0.0.1:1", &path).await;
        assert!(!report.server_reachable);
        assert_eq!(report.issues, vec![Issue::ServerUnreachable]);
    }

    #[tokio::test]
    async fn test_answer_excludes_waiting_phrase() {
        let stream = chunks(vec![
            CompletionChunk::assistant_text(WAITING_CHUNK_ID, "m", "Just a moment please...", None),
            CompletionChunk::assistant_text("chatcmpl-1", "m", "Ground ", None),
            CompletionChunk::assistant_text("chatcmpl-1", "m", "floor.", Some("stop")),
        ]);
        let (answer, count) = read_answer(stream).await.unwrap();
        assert_eq!(answer, "Ground floor.");
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_waiting_phrase_alone_is_short_answer() {
        let stream = chunks(vec![CompletionChunk::assistant_text(
            WAITING_CHUNK_ID,
            "m",
            "Let me look that up for you...",
            None,
        )]);
        let (answer, _) = read_answer(stream).await.unwrap();
        assert!(answer.chars().count() < MIN_ANSWER_CHARS);
    }

    #[tokio::test]
    async fn test_apology_chunk_fails_query() {
        let stream = chunks(vec![
            CompletionChunk::assistant_text(WAITING_CHUNK_ID, "m", "One moment...", None),
            CompletionChunk::assistant_text(ERROR_CHUNK_ID, "m", "I apologize", None),
        ]);
        assert!(read_answer(stream).await.is_err());
    }
}
