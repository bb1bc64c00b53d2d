use std::fmt::Display;

use miette::LabeledSpan;
use miette::SourceCode;
use serde::Deserialize;
use serde::Serialize;

use crate::Pointer;
use crate::Span;

/// The kind of anomaly a [`Diagnostic`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum DiagnosticKind {
	/// A tag without a matching rule, reported under the strict unknown-tag
	/// policy.
	UnknownTag,
	/// A closing tag that did not close anything.
	UnexpectedClosing,
	/// A tag left open at the end of the input under strict closing.
	UnclosedTag,
	/// A tag rejected by a forbidden rule.
	Forbidden,
}

impl DiagnosticKind {
	/// Stable diagnostic code.
	pub fn code(&self) -> &'static str {
		match self {
			Self::UnknownTag => "bbmark::unknown_tag",
			Self::UnexpectedClosing => "bbmark::unexpected_closing",
			Self::UnclosedTag => "bbmark::unclosed_tag",
			Self::Forbidden => "bbmark::forbidden",
		}
	}
}

impl Display for DiagnosticKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::UnknownTag => write!(f, "unknown-tag"),
			Self::UnexpectedClosing => write!(f, "unexpected-closing"),
			Self::UnclosedTag => write!(f, "unclosed-tag"),
			Self::Forbidden => write!(f, "forbidden"),
		}
	}
}

/// A non-fatal problem found while parsing or rendering markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub kind: DiagnosticKind,
	/// Name of the tag the diagnostic is about.
	pub tag_name: String,
	/// Span of the offending tag in the parsed input.
	pub span: Span,
	/// Structural location of the offending node.
	pub pointer: Pointer,
	/// Message supplied by a forbidden rule.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl Diagnostic {
	/// Human-readable description of this diagnostic.
	pub fn summary(&self) -> String {
		match self.kind {
			DiagnosticKind::UnknownTag => format!("unknown tag `{}`", self.tag_name),
			DiagnosticKind::UnexpectedClosing => {
				format!("closing tag `[/{}]` does not match any open tag", self.tag_name)
			}
			DiagnosticKind::UnclosedTag => format!("tag `{}` is never closed", self.tag_name),
			DiagnosticKind::Forbidden => {
				let message = self.message.as_deref().unwrap_or("This is forbidden.");
				format!("tag `{}` is forbidden: {message}", self.tag_name)
			}
		}
	}

	fn help(&self) -> Option<String> {
		match self.kind {
			DiagnosticKind::UnknownTag => {
				Some(format!(
					"add a rule for `{}` or parse with `strict_unknown_tag` disabled to keep it as text",
					self.tag_name
				))
			}
			DiagnosticKind::UnexpectedClosing => {
				Some(format!("remove `[/{}]` or add the matching opening tag", self.tag_name))
			}
			DiagnosticKind::UnclosedTag => Some(format!("add `[/{}]` to close this tag", self.tag_name)),
			DiagnosticKind::Forbidden => None,
		}
	}

	/// Pair this diagnostic with the source it was produced from so it can be
	/// printed as a [`miette`] report.
	pub fn to_report(&self, source: impl Into<String>) -> DiagnosticReport {
		DiagnosticReport {
			diagnostic: self.clone(),
			source: source.into(),
		}
	}
}

impl Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} at {}", self.summary(), self.pointer)
	}
}

/// A [`Diagnostic`] bundled with its source text.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
	diagnostic: Diagnostic,
	source: String,
}

impl DiagnosticReport {
	pub fn diagnostic(&self) -> &Diagnostic {
		&self.diagnostic
	}
}

impl Display for DiagnosticReport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.diagnostic.summary())
	}
}

impl std::error::Error for DiagnosticReport {}

impl miette::Diagnostic for DiagnosticReport {
	fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
		Some(Box::new(self.diagnostic.kind.code()))
	}

	fn severity(&self) -> Option<miette::Severity> {
		Some(match self.diagnostic.kind {
			DiagnosticKind::UnknownTag | DiagnosticKind::UnclosedTag => miette::Severity::Warning,
			DiagnosticKind::UnexpectedClosing | DiagnosticKind::Forbidden => miette::Severity::Error,
		})
	}

	fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
		self.diagnostic
			.help()
			.map(|help| Box::new(help) as Box<dyn Display + 'a>)
	}

	fn source_code(&self) -> Option<&dyn SourceCode> {
		Some(&self.source)
	}

	fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
		let label = LabeledSpan::new_with_span(
			Some(self.diagnostic.kind.to_string()),
			self.diagnostic.span,
		);

		Some(Box::new(std::iter::once(label)))
	}
}
