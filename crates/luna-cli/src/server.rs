use std::sync::Arc;

use luna_core::MemoryId;
use luna_store::{Consciousness, Store, StoreError};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

const DEFAULT_LIMIT: usize = 5;

/// One consciousness per process. Every tool call takes the lock, so inputs
/// are processed strictly one after another.
#[derive(Clone)]
pub struct LunaServer {
    state: Arc<Mutex<Consciousness<Store>>>,
    tool_router: ToolRouter<Self>,
}

impl LunaServer {
    pub fn new(consciousness: Consciousness<Store>) -> Self {
        Self {
            state: Arc::new(Mutex::new(consciousness)),
            tool_router: Self::tool_router(),
        }
    }

    /// Save affect and the input counter. Failures are logged.
    pub async fn persist(&self) {
        let state = self.state.lock().await;
        if let Err(e) = state.persist_session() {
            tracing::error!("failed to persist affect state: {e}");
        }
    }
}

fn mcp_error(e: StoreError) -> McpError {
    match e {
        StoreError::InvalidInput(msg) => McpError::invalid_params(msg, None),
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct ProcessRequest {
    /// Text of the input to remember
    text: String,
    /// Language tag such as "en", "ja" or "es-MX". Defaults to "en".
    language: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SimilarRequest {
    /// Text to compare memories against
    text: String,
    /// Maximum number of results (default 5)
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchRequest {
    /// Case-insensitive substring to look for
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GetRequest {
    /// Memory id
    id: i64,
}

#[tool_router]
impl LunaServer {
    #[tool(
        description = "Remember an input. Resolves cultural context for the language, updates the affect state from the text's sentiment, scores importance and stores the input as an experience. Returns the new memory id, importance, sentiment, mood and cultural context."
    )]
    async fn luna_process(
        &self,
        Parameters(req): Parameters<ProcessRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let language = req.language.as_deref().unwrap_or("en");
        let outcome = state.process_input(&req.text, language).map_err(mcp_error)?;

        if let Err(e) = state.persist_session() {
            tracing::error!("failed to persist affect state: {e}");
        }

        Ok(json_result(&to_json(&outcome)?))
    }

    #[tool(
        description = "Find memories similar to a text, most similar first, by word overlap (Jaccard over unique words)."
    )]
    async fn luna_similar(
        &self,
        Parameters(req): Parameters<SimilarRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let limit = req.limit.unwrap_or(DEFAULT_LIMIT);
        let results = state.find_similar_memories(&req.text, limit);
        Ok(json_result(&serde_json::json!({
            "results": to_json(&results)?,
        })))
    }

    #[tool(description = "List memories whose content contains a substring, ignoring case, oldest first.")]
    async fn luna_search(
        &self,
        Parameters(req): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let results = state.search_memories(&req.query);
        Ok(json_result(&serde_json::json!({
            "results": to_json(&results)?,
        })))
    }

    #[tool(description = "Fetch one memory by id and mark it as accessed.")]
    async fn luna_get(
        &self,
        Parameters(req): Parameters<GetRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let id = MemoryId(req.id);
        match state.get_memory(id).map_err(mcp_error)? {
            Some(record) => Ok(json_result(&to_json(&record)?)),
            None => Err(McpError::invalid_params(
                format!("memory {id} not found"),
                None,
            )),
        }
    }

    #[tool(description = "List memories whose importance is above the important threshold.")]
    async fn luna_important(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let memories = state.important_memories();
        Ok(json_result(&serde_json::json!({
            "memories": to_json(&memories)?,
        })))
    }

    #[tool(
        description = "Current affect state: happiness, curiosity, empathy, creativity, mood, cultural awareness and per-language fluency."
    )]
    async fn luna_affect(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        Ok(json_result(&to_json(&state.affect_state())?))
    }

    #[tool(
        description = "Merge near-duplicate memories: similar memories become associated and share the higher importance. Best-effort; reports how many records were updated and how many writes failed."
    )]
    async fn luna_consolidate(&self) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let report = state.consolidate();
        Ok(json_result(&to_json(&report)?))
    }

    #[tool(description = "Memory and affect statistics.")]
    async fn luna_stats(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let stats = state.memory().stats();
        let affect = state.affect_state();
        Ok(json_result(&serde_json::json!({
            "memories": stats.records,
            "important": stats.important,
            "associations": stats.associations,
            "mood": affect.mood,
            "languages": affect.language_fluency.len(),
            "processed": state.processed(),
        })))
    }
}

#[tool_handler]
impl ServerHandler for LunaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Associative memory with an evolving affect state.\n\n\
                 Call luna_process with each substantive user message and its language tag. \
                 Use luna_similar to recall related memories before answering, and luna_affect \
                 to read the current mood. Memories marked important surface through \
                 luna_important. luna_consolidate merges near-duplicates; it also runs on a \
                 schedule as inputs arrive."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
