//! Generator facade
//!
//! One entry point for every form: load the template fresh, let the form's
//! layout build its page overlays, compose them, name the file, and hand back
//! the bytes. Precondition failures (missing template, malformed client name,
//! missing required field) pass through unchanged; anything that breaks while
//! drawing or merging is logged in full and surfaces as a single
//! [`Error::Generation`].

use super::{suggested_filename, FormKind, LayoutContext};
use crate::error::{Error, Result};
use crate::fields::{ClientRecord, FormData, SignaturePayload};
use crate::pdf::{Compositor, FormTemplate};
use crate::warning::{Warning, Warnings};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Directory template PDFs are resolved against
    pub template_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
        }
    }
}

/// Inputs for one generation call
#[derive(Debug, Clone, Default)]
pub struct FormRequest {
    pub client_record: ClientRecord,
    pub form_data: FormData,
    /// Provider selection for forms with per-provider templates
    pub doctor: Option<String>,
    /// Signature supplied out of band; takes precedence over `signature_file`
    pub signature: Option<SignaturePayload>,
}

impl FormRequest {
    pub fn new(client_record: ClientRecord, form_data: FormData) -> Self {
        Self {
            client_record,
            form_data,
            ..Default::default()
        }
    }

    pub fn with_doctor(mut self, doctor: impl Into<String>) -> Self {
        self.doctor = Some(doctor.into());
        self
    }

    pub fn with_signature(mut self, signature: SignaturePayload) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Provider from `doctor`, else form-data `doctor` or `provider`
    pub fn provider(&self) -> String {
        self.doctor
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.form_data.text_any(&["doctor", "provider"]))
    }

    pub fn signature(&self) -> Option<SignaturePayload> {
        self.signature
            .clone()
            .or_else(|| self.form_data.signature())
    }
}

/// A finished document
#[derive(Debug, Clone)]
pub struct GeneratedForm {
    pub kind: FormKind,
    pub filename: String,
    pub pdf: Vec<u8>,
    pub page_count: usize,
    pub warnings: Vec<Warning>,
}

/// Stateless form generator
#[derive(Debug, Clone, Default)]
pub struct FormGenerator {
    config: GeneratorConfig,
}

impl FormGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn template_path(&self, file: &str) -> PathBuf {
        self.config.template_dir.join(file)
    }

    /// Generate a form dated today.
    pub fn generate(&self, kind: FormKind, request: &FormRequest) -> Result<GeneratedForm> {
        self.generate_on(kind, request, chrono::Local::now().date_naive())
    }

    /// Generate a form with an explicit "today". Identical inputs and dates
    /// give byte-identical output.
    pub fn generate_on(
        &self,
        kind: FormKind,
        request: &FormRequest,
        today: NaiveDate,
    ) -> Result<GeneratedForm> {
        let template = self.template_path(kind.template_for(&request.provider()));
        tracing::info!(form = %kind, template = %template.display(), "generating form");

        match self.run(kind, request, today, &template) {
            Ok(form) => {
                tracing::info!(
                    form = %kind,
                    filename = %form.filename,
                    pages = form.page_count,
                    warnings = form.warnings.len(),
                    "form generated"
                );
                Ok(form)
            }
            Err(e) if e.is_precondition() => {
                tracing::warn!(form = %kind, error = %e, "form precondition failed");
                Err(e)
            }
            Err(e) => {
                tracing::error!(form = %kind, error = %e, "form generation failed");
                Err(Error::Generation {
                    form: kind.code().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn run(
        &self,
        kind: FormKind,
        request: &FormRequest,
        today: NaiveDate,
        template_path: &Path,
    ) -> Result<GeneratedForm> {
        let mut template = FormTemplate::load(template_path)?;
        if let Some(max) = kind.max_pages() {
            template.keep_pages(max);
        }

        let mut warnings = Warnings::new();
        let plan = {
            let mut ctx = LayoutContext {
                kind,
                request,
                today,
                page_count: template.page_count(),
                warnings: &mut warnings,
            };
            kind.layout(&mut ctx)?
        };

        let mut compositor = Compositor::new(&mut template);
        for overlay in plan.overlays {
            compositor.compose(overlay, &mut warnings)?;
        }

        let page_count = template.page_count();
        let pdf = template.save_to_vec()?;
        Ok(GeneratedForm {
            kind,
            filename: suggested_filename(kind.filename_prefix(), &plan.subject, today),
            pdf,
            page_count,
            warnings: warnings.into_vec(),
        })
    }
}
