//! Model Context Protocol (MCP) server implementation for stepwise
//!
//! Exposes the record-step operation as an MCP tool so AI assistants can lay
//! down reasoning steps through the standardized MCP protocol. The server
//! wraps a [`Core`] directly; there is no network hop.

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Deserialize;

use crate::models::{Core, Failure, StepInput};
use crate::render::Renderer;

/// MCP server wrapping the in-process history store.
#[derive(Clone)]
pub struct StepwiseMcpServer {
    core: Core,
    renderer: Renderer,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

/// Parameters for the `record_step` tool.
///
/// Everything is optional at this layer; the validator decides what is
/// required and reports every offending field at once.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordStepParams {
    /// The content of the reasoning step.
    #[schemars(description = "The content of the reasoning step")]
    pub text: Option<String>,
    /// Whether further sequential reasoning is needed after this step.
    #[schemars(description = "Whether further sequential reasoning is needed after this step")]
    pub sequence_needed: Option<bool>,
    /// The step's position, starting at 1.
    #[schemars(description = "The step's position, starting at 1")]
    pub index: Option<i64>,
    /// Current estimate of how many steps the chain will take; raised
    /// automatically if the index outgrows it.
    #[schemars(description = "Current estimate of the total number of steps")]
    pub estimated_total: Option<i64>,
    /// Marks this step as a revision of an earlier one.
    #[schemars(description = "Marks this step as a revision of an earlier one")]
    pub is_revision: Option<bool>,
    /// Index of the earlier step being revised; must precede this step.
    #[schemars(description = "Index of the earlier step being revised")]
    pub revision_of: Option<i64>,
    /// Index of the earlier step this branch forks from; requires branchLabel.
    #[schemars(description = "Index of the earlier step this branch forks from")]
    pub branch_point: Option<i64>,
    /// Name of the branch; required with branchPoint, forbidden without it.
    #[schemars(description = "Name of the branch this step belongs to")]
    pub branch_label: Option<String>,
    /// Whether more steps are expected on this line of reasoning.
    #[schemars(description = "Whether more steps are expected on this line of reasoning")]
    pub more_steps_needed: Option<bool>,
}

impl From<RecordStepParams> for StepInput {
    fn from(params: RecordStepParams) -> Self {
        StepInput {
            text: params.text,
            sequence_needed: params.sequence_needed,
            index: params.index,
            estimated_total: params.estimated_total,
            is_revision: params.is_revision,
            revision_of: params.revision_of,
            branch_point: params.branch_point,
            branch_label: params.branch_label,
            more_steps_needed: params.more_steps_needed,
        }
    }
}

#[tool_router]
impl StepwiseMcpServer {
    /// Create a new MCP server over the given core and renderer
    pub fn new(core: Core, renderer: Renderer) -> Self {
        Self {
            core,
            renderer,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Record one step in a chain of reasoning. Supports linear steps, revisions of earlier steps (isRevision + revisionOf), and named branches (branchPoint + branchLabel). The response reports the step as accepted, the history length, and the known branch labels."
    )]
    async fn record_step(
        &self,
        params: Parameters<RecordStepParams>,
    ) -> Result<CallToolResult, McpError> {
        match crate::models::validate(params.0.into()) {
            Ok(step) => {
                let recorded = self.core.record(step.clone());
                self.renderer.render(&step);
                let json = serde_json::to_string_pretty(&recorded).map_err(|e| {
                    McpError::internal_error(format!("serialization error: {}", e), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(err) => {
                // A rejected step is a tool-level failure, not a protocol
                // error: the transport stays up and the model sees the payload.
                tracing::debug!(kind = err.kind(), "rejected step: {}", err);
                let failure = Failure::from(&err);
                let json = serde_json::to_string_pretty(&failure).map_err(|e| {
                    McpError::internal_error(format!("serialization error: {}", e), None)
                })?;
                Ok(CallToolResult::error(vec![Content::text(json)]))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for StepwiseMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Step-by-step reasoning recorder. Call record_step once per \
                 reasoning step; set index and estimatedTotal, mark revisions \
                 with isRevision + revisionOf, and fork alternatives with \
                 branchPoint + branchLabel. History is append-only."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
