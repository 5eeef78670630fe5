//! MCP Server implementation using rmcp

use crate::fields::{ClientRecord, FormData};
use crate::forms::{FormGenerator, FormKind, FormRequest, GeneratorConfig};
use crate::pdf::coordinate_grid;
use crate::warning::Warning;
use anyhow::Result;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the template directory
pub const TEMPLATE_DIR_ENV: &str = "CLAIM_FORMS_TEMPLATE_DIR";
/// Environment variable listing directories `output_path` may write into
pub const OUTPUT_DIRS_ENV: &str = "CLAIM_FORMS_OUTPUT_DIRS";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the form template PDFs
    pub template_dir: PathBuf,
    /// Directories generated files may be written to. Empty allows any path.
    pub output_dirs: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            template_dir: GeneratorConfig::default().template_dir,
            output_dirs: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from `CLAIM_FORMS_TEMPLATE_DIR` and
    /// `CLAIM_FORMS_OUTPUT_DIRS` (a platform path list).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(TEMPLATE_DIR_ENV).filter(|d| !d.is_empty()) {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(dirs) = std::env::var_os(OUTPUT_DIRS_ENV) {
            config.output_dirs = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_string_lossy().to_string())
                .collect();
        }
        config
    }
}

/// Claim forms MCP Server
#[derive(Clone)]
pub struct FormServer {
    generator: Arc<FormGenerator>,
    tool_router: ToolRouter<Self>,
    config: Arc<ServerConfig>,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Request/Response types for generate_form
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateFormParams {
    /// Form code, e.g. "EE-10", "EN-16", "withdrawal-letter". Case and hyphens are ignored.
    pub form: String,
    /// Client record: {"fields": {"Name": "Last, First - 1234", "Case ID": ..., ...}}
    #[serde(default)]
    pub client_record: Option<serde_json::Value>,
    /// Operator-entered form data; keys depend on the form
    #[serde(default)]
    pub form_data: Option<serde_json::Value>,
    /// Provider/doctor selecting a template variant (e.g. "La Plata", "Dr. Kalcich")
    #[serde(default)]
    pub doctor: Option<String>,
    /// Also write the PDF to this path
    #[serde(default)]
    pub output_path: Option<String>,
    /// Include the PDF as base64 in the response (default: true)
    #[serde(default = "default_true")]
    pub include_pdf: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct GenerateFormResult {
    pub form: String,
    /// Suggested filename
    pub filename: String,
    pub page_count: usize,
    pub size_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Content that did not make it onto the page as entered
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for list_forms
// ============================================================================

#[derive(Debug, Serialize, JsonSchema)]
pub struct TemplateStatus {
    pub file: String,
    pub exists: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FormInfo {
    pub code: String,
    pub description: String,
    pub filename_prefix: String,
    pub templates: Vec<TemplateStatus>,
}

// ============================================================================
// Request/Response types for list_templates
// ============================================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListTemplatesParams {
    /// Filename pattern to filter (e.g., "EE-*.pdf"). Supports glob patterns.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TemplateFileInfo {
    /// Full path to the template
    pub path: String,
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (ISO 8601 format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ListTemplatesResult {
    pub directory: String,
    pub files: Vec<TemplateFileInfo>,
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for coordinate_grid
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CoordinateGridParams {
    /// Template filename inside the template directory
    pub template: String,
    /// Also write the grid PDF to this path
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CoordinateGridResult {
    pub template: String,
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl FormServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let generator = FormGenerator::new(GeneratorConfig {
            template_dir: config.template_dir.clone(),
        });
        Self {
            generator: Arc::new(generator),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Fill a claim form template
    #[tool(
        description = "Generate a filled claim form or letter by overlaying client and form data onto its PDF template.

Forms: EE-1, EE-1a, EE-3, EE-10, EN-11A, EN-16, DESERT-PULM-REFERRAL, IR-NOTICE, WITHDRAWAL-LETTER, ADDRESS-CHANGE, RD-ACCEPT-WAIVER (see list_forms).

Returns the suggested filename, page count, the PDF as base64 (unless include_pdf is false) and any warnings about content that was dropped, truncated or replaced."
    )]
    async fn generate_form(&self, Parameters(params): Parameters<GenerateFormParams>) -> String {
        let result = self.process_generate_form(&params).await.unwrap_or_else(|e| {
            tracing::warn!(form = %params.form, error = %e, "generate_form failed");
            GenerateFormResult {
                form: params.form.clone(),
                filename: String::new(),
                page_count: 0,
                size_bytes: 0,
                pdf_base64: None,
                output_path: None,
                warnings: vec![],
                error: Some(e.client_message()),
            }
        });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    /// List supported forms
    #[tool(
        description = "List every supported form with its code, description, filename prefix and template files, noting which templates are present in the template directory."
    )]
    async fn list_forms(&self) -> String {
        let forms = self.form_infos();
        let response = serde_json::json!({
            "template_dir": self.config.template_dir.to_string_lossy(),
            "forms": forms,
        });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// List template PDFs
    #[tool(
        description = "List PDF templates in the template directory with size and modification time. Supports glob pattern filtering, e.g. \"en*.pdf\"."
    )]
    async fn list_templates(
        &self,
        Parameters(params): Parameters<ListTemplatesParams>,
    ) -> String {
        let result = self.process_list_templates(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "list_templates failed");
            ListTemplatesResult {
                directory: self.config.template_dir.to_string_lossy().to_string(),
                files: vec![],
                total_count: 0,
                error: Some(e.client_message()),
            }
        });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    /// Overlay a calibration grid on a template
    #[tool(
        description = "Draw a labelled 50-point coordinate grid over every page of a template, for calibrating field placements. Origin is bottom-left; x grows right, y grows up."
    )]
    async fn coordinate_grid(
        &self,
        Parameters(params): Parameters<CoordinateGridParams>,
    ) -> String {
        let result = self.process_coordinate_grid(&params).await.unwrap_or_else(|e| {
            tracing::warn!(template = %params.template, error = %e, "coordinate_grid failed");
            CoordinateGridResult {
                template: params.template.clone(),
                page_count: 0,
                pdf_base64: None,
                output_path: None,
                error: Some(e.client_message()),
            }
        });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }
}

impl FormServer {
    async fn process_generate_form(
        &self,
        params: &GenerateFormParams,
    ) -> crate::error::Result<GenerateFormResult> {
        let kind: FormKind = params.form.parse()?;

        let client_record: ClientRecord = match &params.client_record {
            Some(value) => serde_json::from_value(value.clone())?,
            None => ClientRecord::default(),
        };
        let form_data = params
            .form_data
            .clone()
            .map(FormData::from)
            .unwrap_or_default();
        let mut request = FormRequest::new(client_record, form_data);
        if let Some(doctor) = &params.doctor {
            request = request.with_doctor(doctor.clone());
        }

        // Template loading and composition are CPU/file-bound
        let generator = Arc::clone(&self.generator);
        let form = tokio::task::spawn_blocking(move || generator.generate(kind, &request))
            .await
            .map_err(|e| crate::error::Error::Pdf {
                reason: format!("Task join error: {}", e),
            })??;

        let output_path = self.write_output(&params.output_path, &form.pdf)?;
        let pdf_base64 = params
            .include_pdf
            .then(|| base64::engine::general_purpose::STANDARD.encode(&form.pdf));

        Ok(GenerateFormResult {
            form: kind.code().to_string(),
            filename: form.filename,
            page_count: form.page_count,
            size_bytes: form.pdf.len(),
            pdf_base64,
            output_path,
            warnings: form.warnings,
            error: None,
        })
    }

    fn form_infos(&self) -> Vec<FormInfo> {
        FormKind::ALL
            .into_iter()
            .map(|kind| FormInfo {
                code: kind.code().to_string(),
                description: kind.description().to_string(),
                filename_prefix: kind.filename_prefix().to_string(),
                templates: kind
                    .templates()
                    .iter()
                    .map(|file| TemplateStatus {
                        file: file.to_string(),
                        exists: self.generator.template_path(file).is_file(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn process_list_templates(
        &self,
        params: &ListTemplatesParams,
    ) -> crate::error::Result<ListTemplatesResult> {
        let pattern = params
            .pattern
            .as_ref()
            .and_then(|p| glob::Pattern::new(p).ok());

        let mut files = Vec::new();
        Self::collect_templates(&self.config.template_dir, &pattern, &mut files)?;
        files.sort_by(|a, b| a.name.cmp(&b.name));
        let total_count = files.len() as u32;

        Ok(ListTemplatesResult {
            directory: self.config.template_dir.to_string_lossy().to_string(),
            files,
            total_count,
            error: None,
        })
    }

    async fn process_coordinate_grid(
        &self,
        params: &CoordinateGridParams,
    ) -> crate::error::Result<CoordinateGridResult> {
        let path = self.validate_template_access(&params.template)?;

        let (output_data, page_count) = tokio::task::spawn_blocking(move || {
            let data = std::fs::read(&path)?;
            let output = coordinate_grid(&data)?;
            let pages = lopdf::Document::load_mem(&output)?.get_pages().len();
            Ok::<_, crate::error::Error>((output, pages))
        })
        .await
        .map_err(|e| crate::error::Error::Pdf {
            reason: format!("Task join error: {}", e),
        })??;

        let output_path = self.write_output(&params.output_path, &output_data)?;

        Ok(CoordinateGridResult {
            template: params.template.clone(),
            page_count,
            pdf_base64: Some(base64::engine::general_purpose::STANDARD.encode(&output_data)),
            output_path,
            error: None,
        })
    }

    /// Resolve a template name inside the template directory. Names that
    /// escape it are refused.
    fn validate_template_access(&self, name: &str) -> crate::error::Result<PathBuf> {
        let denied = || crate::error::Error::PathAccessDenied {
            path: name.to_string(),
        };

        let candidate = self.config.template_dir.join(name);
        if !candidate.is_file() {
            return Err(crate::error::Error::TemplateNotFound {
                path: candidate.to_string_lossy().to_string(),
            });
        }

        let canonical = std::fs::canonicalize(&candidate).map_err(|_| denied())?;
        let canonical_dir =
            std::fs::canonicalize(&self.config.template_dir).map_err(|_| denied())?;
        if canonical.starts_with(&canonical_dir) {
            Ok(canonical)
        } else {
            Err(denied())
        }
    }

    /// Validate that an output path is within allowed output directories.
    /// Canonicalizes the parent directory since the output file may not exist yet.
    fn validate_output_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.output_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let path_obj = Path::new(path);
        let parent = path_obj.parent().unwrap_or(Path::new("."));
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };

        let canonical_parent = std::fs::canonicalize(parent).map_err(|_| {
            crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            }
        })?;

        let canonical_target =
            canonical_parent.join(path_obj.file_name().unwrap_or(std::ffi::OsStr::new("")));

        for dir in &self.config.output_dirs {
            if let Ok(canonical_dir) = std::fs::canonicalize(dir) {
                if canonical_target.starts_with(&canonical_dir) {
                    return Ok(canonical_target);
                }
            }
        }

        Err(crate::error::Error::PathAccessDenied {
            path: path.to_string(),
        })
    }

    /// Write output data to a file path, with sandbox validation.
    fn write_output(
        &self,
        output_path: &Option<String>,
        data: &[u8],
    ) -> crate::error::Result<Option<String>> {
        if let Some(ref path_str) = output_path {
            self.validate_output_path_access(path_str)?;

            let path = Path::new(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            std::fs::write(path, data)?;
            tracing::info!(path = %path_str, bytes = data.len(), "wrote output");
            Ok(Some(path_str.clone()))
        } else {
            Ok(None)
        }
    }

    fn collect_templates(
        dir: &Path,
        pattern: &Option<glob::Pattern>,
        files: &mut Vec<TemplateFileInfo>,
    ) -> crate::error::Result<()> {
        let entries = std::fs::read_dir(dir).map_err(crate::error::Error::Io)?;

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if !is_pdf {
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if let Some(ref pat) = pattern {
                if !pat.matches(&name) {
                    continue;
                }
            }

            let metadata = std::fs::metadata(&path).ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let modified = metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| {
                    chrono::DateTime::from_timestamp(d.as_secs() as i64, 0)
                        .map(|dt| dt.to_rfc3339())
                        .unwrap_or_default()
                });

            files.push(TemplateFileInfo {
                path: path.to_string_lossy().to_string(),
                name,
                size,
                modified,
            });
        }

        Ok(())
    }
}

impl Default for FormServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for FormServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Claim forms MCP Server fills benefit-claim PDF templates (EE-1, EE-1a, EE-3, \
                 EE-10, EN-11A, EN-16, referrals and letters) from client records and form data. \
                 Use list_forms to see codes and template availability."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server with configuration from the environment
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::from_env()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    tracing::info!(
        template_dir = %config.template_dir.display(),
        output_dirs = config.output_dirs.len(),
        "Claim forms MCP Server ready, waiting for connections..."
    );

    let server = FormServer::with_config(config);
    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
