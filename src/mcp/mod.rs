//! MCP server implementation for blogsearch.
//!
//! Exposes post search as MCP tools for AI editors. The server holds one
//! search session for its whole lifetime, so the index is built on the
//! first query and reused afterwards.

use std::borrow::Cow;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorCode, ErrorData as McpError, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router,
    transport::stdio,
};
use serde::Deserialize;

use crate::commands::{self, DocumentSource, SearchSession};

/// Parameters for `search_posts` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "The search query")]
    pub query: String,
}

/// Parameters for `list_posts` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    #[schemars(description = "Only posts with this tag")]
    pub tag: Option<String>,
    #[schemars(description = "Page number, starting at 1 (default: 1)")]
    pub page: Option<usize>,
    #[schemars(description = "Posts per page (default: 10)")]
    pub page_size: Option<usize>,
}

/// Parameters for `get_post` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetParams {
    #[schemars(description = "Post slug (e.g., 'rust-ownership')")]
    pub slug: String,
}

fn internal_error(message: String) -> McpError {
    McpError {
        code: ErrorCode::INTERNAL_ERROR,
        message: Cow::from(message),
        data: None,
    }
}

/// MCP server exposing blogsearch tools.
#[derive(Clone)]
pub struct BlogSearchServer {
    session: Arc<Mutex<SearchSession>>,
    source: DocumentSource,
    content: PathBuf,
    include_drafts: bool,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BlogSearchServer {
    #[must_use]
    pub fn new(
        session: SearchSession,
        source: DocumentSource,
        content: PathBuf,
        include_drafts: bool,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            source,
            content,
            include_drafts,
            tool_router: Self::tool_router(),
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, SearchSession>, McpError> {
        self.session
            .lock()
            .map_err(|_| internal_error("Search session lock poisoned".to_string()))
    }

    #[tool(description = "Search blog posts by free text, best matches first")]
    async fn search_posts(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut session = self.session()?;

        let output = match session.unavailable_reason() {
            Some(reason) => commands::unavailable_message(reason),
            None => {
                let results = session.search(&params.query);
                commands::render_results(&params.query, &results)
            }
        };

        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(description = "Reload the search documents after posts changed")]
    async fn reload_index(&self) -> Result<CallToolResult, McpError> {
        let mut session = self.session()?;

        match session.reload(&self.source) {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(
                "Search documents reloaded.".to_string(),
            )])),
            Err(e) => Err(internal_error(format!("Reload failed: {e}"))),
        }
    }

    #[tool(description = "List published blog posts, newest first, one page at a time")]
    async fn list_posts(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        let page = commands::list_page(
            &self.content,
            self.include_drafts,
            params.tag.as_deref(),
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(commands::DEFAULT_PAGE_SIZE),
        )
        .map_err(|e| internal_error(format!("List failed: {e}")))?;

        if page.items.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No posts found.".to_string(),
            )]));
        }

        let mut output = String::new();
        for post in &page.items {
            let tags = if post.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", post.tags.join(", "))
            };
            let _ = writeln!(
                output,
                "- **{}** ({}, {}){}\n  `/blog/{}`",
                post.title, post.date, post.reading_time, tags, post.slug
            );
        }
        let _ = write!(
            output,
            "\nPage {} of {} ({} post(s))",
            page.page, page.total_pages, page.total
        );

        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(description = "Get the full body of a blog post by its slug")]
    async fn get_post(
        &self,
        Parameters(params): Parameters<GetParams>,
    ) -> Result<CallToolResult, McpError> {
        match commands::get(&self.content, self.include_drafts, &params.slug) {
            Ok(content) => Ok(CallToolResult::success(vec![Content::text(content)])),
            Err(e) => Err(internal_error(format!("Failed to get post: {e}"))),
        }
    }
}

#[tool_handler]
impl ServerHandler for BlogSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "blogsearch provides search over a blog. Use search_posts to find posts, \
                list_posts to browse, get_post to read a post, and reload_index after \
                posts change."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Start the MCP server with stdio transport.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a fatal error.
pub async fn serve(
    session: SearchSession,
    source: DocumentSource,
    content: PathBuf,
    include_drafts: bool,
) -> anyhow::Result<()> {
    let server = BlogSearchServer::new(session, source, content, include_drafts);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
