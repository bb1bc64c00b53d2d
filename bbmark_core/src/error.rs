use miette::Diagnostic;
use thiserror::Error;

/// Configuration-time failures. Markup problems found while parsing are never
/// reported through this type; they end up in
/// [`ParseResult::diagnostics`](crate::ParseResult::diagnostics) instead.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum BbmarkError {
	#[error("invalid rule template: `{0}`")]
	#[diagnostic(
		code(bbmark::invalid_template),
		help("a rule template looks like `[tag attributes]content`, e.g. `[url=$href]$text[/url]`")
	)]
	InvalidTemplate(String),

	#[error("failed to parse config: {0}")]
	#[diagnostic(
		code(bbmark::config_parse),
		help("check that the config is valid TOML with [options], [wrap] and [[rules]] sections")
	)]
	ConfigParse(String),
}

pub type BbmarkResult<T> = Result<T, BbmarkError>;
