use std::sync::Arc;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters,
    model::*, tool, tool_handler, tool_router,
    transport::stdio, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

mod apis;
mod classify;
mod config;
mod harvest;
mod pipeline;
mod summary;

use config::Config;
use pipeline::{EnrichedCitationSet, Pipeline, Status};
use summary::{CitationFilter, CitationSummary};

// ── Parameter structs ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct FindTrialCitationsParams {
    #[schemars(description = "DOI of the cited publication, e.g. 10.1136/annrheumdis-2019-216655")]
    doi: String,
    #[schemars(description = "Only return citing works that are clinical trials")]
    only_trials: Option<bool>,
    #[schemars(description = "Earliest publication year to include")]
    year_from: Option<i32>,
    #[schemars(description = "Latest publication year to include")]
    year_to: Option<i32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ResolveDoiParams {
    #[schemars(description = "DOI to resolve to an OpenAlex work id")]
    doi: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ClassifyPmidsParams {
    #[schemars(description = "PubMed ids, bare or as https://pubmed.ncbi.nlm.nih.gov/ URLs")]
    pmids: Vec<String>,
}

#[derive(Serialize)]
struct TrialCitationsResponse<'a> {
    status: Status,
    message: &'static str,
    summary: CitationSummary,
    works: &'a EnrichedCitationSet,
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TrialCitationsServer {
    tool_router: ToolRouter<Self>,
    config: Arc<Config>,
    pipeline: Arc<Pipeline>,
}

#[tool_router]
impl TrialCitationsServer {
    pub fn create() -> anyhow::Result<Self> {
        let config = Config::from_env();
        let pipeline = config.build_pipeline()?;

        tracing::info!(
            "Initialized {} -> {} pipeline (page size {}, retmax {})",
            pipeline.index().name(),
            pipeline.trials().name(),
            config.page_size,
            config.retmax
        );

        Ok(Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }

    #[tool(description = "List the active upstream endpoints and limits")]
    async fn list_settings(&self) -> Result<CallToolResult, McpError> {
        to_json(&self.config.describe())
    }

    #[tool(description = "Find all works citing a DOI and flag which of them are clinical trial reports (PubMed clinicaltrial filter). Returns a per-year summary and the table of citing works.")]
    async fn find_trial_citations(
        &self,
        Parameters(params): Parameters<FindTrialCitationsParams>,
    ) -> Result<CallToolResult, McpError> {
        let doi = params.doi.trim();
        if doi.is_empty() {
            return to_json(&TrialCitationsResponse {
                status: Status::Idle,
                message: Status::Idle.message(),
                summary: EnrichedCitationSet::default().summary(),
                works: &EnrichedCitationSet::default(),
            });
        }

        tracing::info!("{} for {}", Status::InProgress.message(), doi);
        let set = self.pipeline
            .fetch_enriched(doi, &pipeline::log_progress)
            .instrument(tracing::info_span!("find_trial_citations", doi))
            .await;

        let status = if set.is_empty() { Status::NoData } else { Status::Done };
        let filter = CitationFilter {
            only_trials: params.only_trials.unwrap_or(false),
            year_from: params.year_from,
            year_to: params.year_to,
        };
        let shown = set.filtered(&filter);

        to_json(&TrialCitationsResponse {
            status,
            message: status.message(),
            summary: set.summary(),
            works: &shown,
        })
    }

    #[tool(description = "Resolve a DOI to its OpenAlex work id")]
    async fn resolve_doi(
        &self,
        Parameters(params): Parameters<ResolveDoiParams>,
    ) -> Result<CallToolResult, McpError> {
        match harvest::resolve(self.pipeline.index(), &params.doi).await {
            Ok(Some(id)) => Ok(CallToolResult::success(vec![Content::text(id.to_string())])),
            Ok(None) => Ok(CallToolResult::success(vec![Content::text(
                format!("Work not found: {}", params.doi),
            )])),
            Err(e) => Err(McpError::internal_error(format!("Lookup failed: {}", e), None)),
        }
    }

    #[tool(description = "Return which of the given PubMed ids are clinical trial reports, in one batched query")]
    async fn classify_pmids(
        &self,
        Parameters(params): Parameters<ClassifyPmidsParams>,
    ) -> Result<CallToolResult, McpError> {
        let trials = classify::classify(
            self.pipeline.trials(),
            &params.pmids,
            self.pipeline.options().retmax,
        )
        .await
        .map_err(|e| McpError::internal_error(format!("Trial filter failed: {}", e), None))?;

        let mut trials: Vec<String> = trials.into_iter().collect();
        trials.sort();
        to_json(&trials)
    }
}

#[tool_handler]
impl ServerHandler for TrialCitationsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Answers which publications citing a given DOI are clinical trial reports. \
                 Citing works come from OpenAlex; trial status comes from the PubMed \
                 clinicaltrial filter."
                    .into(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting trial-citations MCP server");

    let server = TrialCitationsServer::create()?;
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
