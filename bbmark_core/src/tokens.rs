use serde::Deserialize;
use serde::Serialize;

use crate::Span;

/// Reserved tag name of the `[*]` list marker.
pub const LIST_MARKER: &str = "*";
/// Tag name that bounds the body of a list item.
pub const LIST_TAG: &str = "list";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
	/// Literal text, including a lone `[` that did not start a tag.
	Text,
	/// `[name]`, `[name=value]` or the list marker `[*]`.
	TagOpen,
	/// `[/name]`
	TagClose,
}

/// A single lexical unit of the input.
///
/// Tag names are trimmed and lower-cased; values are trimmed. Text tokens have
/// an empty `name` and carry their content in `raw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	pub kind: TokenKind,
	pub name: String,
	pub value: Option<String>,
	/// The exact source text of the token.
	pub raw: String,
	pub span: Span,
}

impl Token {
	pub fn text(raw: impl Into<String>, span: Span) -> Self {
		Self {
			kind: TokenKind::Text,
			name: String::new(),
			value: None,
			raw: raw.into(),
			span,
		}
	}

	pub fn is_text(&self) -> bool {
		self.kind == TokenKind::Text
	}

	pub fn is_open(&self, name: &str) -> bool {
		self.kind == TokenKind::TagOpen && self.name == name
	}

	pub fn is_close(&self, name: &str) -> bool {
		self.kind == TokenKind::TagClose && self.name == name
	}

	pub fn is_list_marker(&self) -> bool {
		self.is_open(LIST_MARKER)
	}

	/// Whether this token ends the body of a list item that started before it.
	pub(crate) fn ends_list_item(&self) -> bool {
		self.is_list_marker() || self.is_open(LIST_TAG) || self.is_close(LIST_TAG)
	}
}
