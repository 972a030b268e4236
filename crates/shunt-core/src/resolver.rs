//! Rule-driven routing resolution

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use shunt_store::RuleDb;

use crate::error::RouteError;
use crate::types::{ChatResolution, FileResolution};

/// Upper bound on compiled pattern size; keeps pathological rules from
/// exhausting memory at compile time
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Response text when the effective model has no catalog entry
const FALLBACK_RESPONSE: &str = "Response not available.";

/// Response text when no file rule matches the extension
const UNROUTED_FILE_RESPONSE: &str = "File uploaded successfully.";

/// Resolves chat and file requests to a provider/model pair using stored rules
pub struct RouteResolver {
    db: Arc<RuleDb>,
}

impl RouteResolver {
    pub fn new(db: Arc<RuleDb>) -> Self {
        Self { db }
    }

    /// Resolve a chat completion request.
    ///
    /// The requested model must be in the catalog. Prompt rules are scanned in
    /// insertion order and the first whose pattern matches the prompt redirects
    /// the request to its target model; the provider is never rewritten. A
    /// stored pattern that no longer compiles is skipped.
    ///
    /// A rule's `original_model` is recorded but not consulted: every rule
    /// applies to every request regardless of the model it was filed under.
    pub async fn resolve_chat(
        &self,
        provider: &str,
        model: &str,
        prompt: &str,
    ) -> Result<ChatResolution, RouteError> {
        let requested = self
            .db
            .find_model(model)
            .await?
            .ok_or_else(|| RouteError::UnknownModel { model: model.to_string() })?;

        let mut redirect = None;
        for rule in self.db.list_prompt_rules().await? {
            let re = match compile_pattern(&rule.regex_pattern) {
                Ok(re) => re,
                Err(e) => {
                    warn!(
                        "Skipping prompt rule #{} with invalid pattern {:?}: {}",
                        rule.id, rule.regex_pattern, e
                    );
                    continue;
                }
            };
            if re.is_match(prompt) {
                debug!(
                    "Prompt rule #{} matched, redirecting {} -> {}",
                    rule.id, requested.name, rule.redirect_model
                );
                redirect = Some(rule.redirect_model);
                break;
            }
        }

        match redirect {
            Some(name) => {
                let response = match self.db.find_model(&name).await? {
                    Some(target) => target.description,
                    None => FALLBACK_RESPONSE.to_string(),
                };
                Ok(ChatResolution {
                    provider: provider.to_string(),
                    model: name,
                    response,
                })
            }
            None => Ok(ChatResolution {
                provider: provider.to_string(),
                model: requested.name,
                response: requested.description,
            }),
        }
    }

    /// Resolve an uploaded file by its extension.
    ///
    /// The extension is lower-cased and matched exactly against stored file
    /// rules. No matching rule is not an error: the upload is acknowledged
    /// without a provider/model pair.
    pub async fn resolve_file(&self, extension: &str) -> Result<FileResolution, RouteError> {
        let ext = extension.to_lowercase();
        match self.db.find_file_rule(&ext).await? {
            Some(rule) => {
                let response = format!(
                    "{}: File processed with AI model {}.",
                    rule.redirect_provider, rule.redirect_model
                );
                Ok(FileResolution {
                    provider: Some(rule.redirect_provider),
                    model: Some(rule.redirect_model),
                    response,
                })
            }
            None => Ok(FileResolution {
                provider: None,
                model: None,
                response: UNROUTED_FILE_RESPONSE.to_string(),
            }),
        }
    }

    /// Append a prompt routing rule, validating the pattern first
    pub async fn add_prompt_rule(
        &self,
        original_model: &str,
        regex_pattern: &str,
        redirect_model: &str,
    ) -> Result<i64, RouteError> {
        compile_pattern(regex_pattern).map_err(|e| RouteError::InvalidPattern {
            pattern: regex_pattern.to_string(),
            reason: e.to_string(),
        })?;

        let id = self
            .db
            .append_prompt_rule(original_model, regex_pattern, redirect_model)
            .await?;
        Ok(id)
    }

    /// Append a file routing rule, rejecting duplicate file types.
    /// The file type is lower-cased before storage so lookups stay exact.
    pub async fn add_file_rule(
        &self,
        file_type: &str,
        redirect_provider: &str,
        redirect_model: &str,
    ) -> Result<i64, RouteError> {
        let file_type = file_type.to_lowercase();
        match self
            .db
            .append_file_rule(&file_type, redirect_provider, redirect_model)
            .await?
        {
            Some(id) => Ok(id),
            None => Err(RouteError::DuplicateFileType { file_type }),
        }
    }
}

/// Extension used for file routing: the part after the last dot of the
/// filename, lower-cased. A name without a dot routes on the whole name.
pub fn file_extension(filename: &str) -> String {
    filename.rsplit('.').next().unwrap_or_default().to_lowercase()
}

/// Compile a rule pattern the way matching does: case-insensitive search
/// with a bounded compiled size
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
}
