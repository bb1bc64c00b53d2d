use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

use crate::Diagnostic;
use crate::DiagnosticKind;
use crate::Pointer;
use crate::Span;
use crate::tokens::LIST_MARKER;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Deepest tag nesting turned into tree nodes. Opening tags beyond it, and
/// the closing tags that pair with them, are kept as literal text. The limit
/// counts the tags enclosing a nested attribute parse as well.
pub const MAX_NESTING_DEPTH: usize = 128;

/// How closing tags are matched against the open tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingMode {
	/// A closing tag closes the nearest open tag with the same name, silently
	/// closing everything opened after it. Tags left open at the end of the
	/// input stay in the tree without a closing span.
	#[default]
	Lenient,
	/// A closing tag may only close the innermost open tag. Tags left open at
	/// the end of the input are turned back into literal text.
	Strict,
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
	Root(RootNode),
	Text(TextNode),
	Tag(TagNode),
	ListItem(ListItemNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootNode {
	pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNode {
	pub content: String,
	pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNode {
	pub name: String,
	pub value: Option<String>,
	pub children: Vec<Node>,
	/// Span of the opening tag.
	pub span: Span,
	/// Span of the closing tag, present only when one was actually matched.
	pub closing_span: Option<Span>,
}

/// A `[*]` list marker together with the raw tokens that follow it, up to the
/// next marker or the surrounding `[list]` boundary. The tokens are kept as-is
/// and only turned into a subtree when the item is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemNode {
	pub span: Span,
	pub tokens: Vec<Token>,
}

impl ListItemNode {
	/// The source text of the item body.
	pub fn body(&self) -> String {
		self.tokens.iter().map(|token| token.raw.as_str()).collect()
	}
}

impl Node {
	/// Tag name of the node. Text and root nodes have an empty name and list
	/// items report the list marker `*`.
	pub fn name(&self) -> &str {
		match self {
			Self::Tag(tag) => &tag.name,
			Self::ListItem(_) => LIST_MARKER,
			Self::Root(_) | Self::Text(_) => "",
		}
	}

	pub fn value(&self) -> Option<&str> {
		match self {
			Self::Tag(tag) => tag.value.as_deref(),
			_ => None,
		}
	}

	/// Child nodes. List item bodies are raw tokens, not children.
	pub fn children(&self) -> &[Node] {
		match self {
			Self::Root(root) => &root.children,
			Self::Tag(tag) => &tag.children,
			Self::Text(_) | Self::ListItem(_) => &[],
		}
	}

	pub fn span(&self) -> Option<Span> {
		match self {
			Self::Root(_) => None,
			Self::Text(text) => Some(text.span),
			Self::Tag(tag) => Some(tag.span),
			Self::ListItem(item) => Some(item.span),
		}
	}

	pub fn as_tag(&self) -> Option<&TagNode> {
		match self {
			Self::Tag(tag) => Some(tag),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(&text.content),
			_ => None,
		}
	}

	pub fn is_root(&self) -> bool {
		matches!(self, Self::Root(_))
	}
}

/// Format the opening bracket syntax `[name=value]`. Empty values are left
/// out.
pub(crate) fn opening_syntax(name: &str, value: Option<&str>) -> String {
	match value {
		Some(value) if !value.is_empty() => format!("[{name}={value}]"),
		_ => format!("[{name}]"),
	}
}

/// An open tag under construction together with its index in its parent.
struct Frame {
	node: TagNode,
	index: usize,
}

struct TreeBuilder<'t, 'd, F> {
	tokens: &'t [Token],
	cursor: usize,
	mode: ClosingMode,
	origin: &'t [usize],
	depth: usize,
	root: Vec<Node>,
	stack: Vec<Frame>,
	/// Names of opening tags kept as text because they were nested too deep.
	overflow: Vec<String>,
	diagnostics: &'d mut Vec<Diagnostic>,
	serialize: F,
}

impl<F> TreeBuilder<'_, '_, F>
where
	F: Fn(&Node) -> String,
{
	fn current_children(&mut self) -> &mut Vec<Node> {
		match self.stack.last_mut() {
			Some(frame) => &mut frame.node.children,
			None => &mut self.root,
		}
	}

	/// Pointer of the node that would be placed at `index` under the current
	/// top of the stack.
	fn pointer_at(&self, index: usize) -> Pointer {
		let segments: Vec<usize> = self
			.origin
			.iter()
			.copied()
			.chain(self.stack.iter().map(|frame| frame.index))
			.chain(std::iter::once(index))
			.collect();

		Pointer::from_segments(&segments)
	}

	fn build(mut self) -> Node {
		let tokens = self.tokens;

		while self.cursor < tokens.len() {
			let token = &tokens[self.cursor];
			self.cursor += 1;

			match token.kind {
				TokenKind::Text => self.push_literal(token),
				TokenKind::TagOpen if token.name == LIST_MARKER => self.absorb_list_item(token),
				TokenKind::TagOpen if self.depth + self.stack.len() >= MAX_NESTING_DEPTH => {
					trace!(tag = %token.name, "nesting too deep, keeping tag as text");
					self.overflow.push(token.name.clone());
					self.push_literal(token);
				}
				TokenKind::TagOpen => {
					let index = self.current_children().len();
					self.stack.push(Frame {
						node: TagNode {
							name: token.name.clone(),
							value: token.value.clone(),
							children: vec![],
							span: token.span,
							closing_span: None,
						},
						index,
					});
				}
				TokenKind::TagClose => self.close(token),
			}
		}

		self.finish()
	}

	/// Collect the raw tokens following a list marker into a list item.
	fn absorb_list_item(&mut self, marker: &Token) {
		let tokens = self.tokens;
		let start = self.cursor;
		while self.cursor < tokens.len() && !tokens[self.cursor].ends_list_item() {
			self.cursor += 1;
		}

		let item = ListItemNode {
			span: marker.span,
			tokens: tokens[start..self.cursor].to_vec(),
		};
		self.current_children().push(Node::ListItem(item));
	}

	fn push_literal(&mut self, token: &Token) {
		self.current_children().push(Node::Text(TextNode {
			content: token.raw.clone(),
			span: token.span,
		}));
	}

	fn close(&mut self, token: &Token) {
		if let Some(position) = self.matching(&self.overflow, |name| name, &token.name) {
			self.overflow.truncate(position);
			self.push_literal(token);
			return;
		}

		let matched = self.matching(&self.stack, |frame| &frame.node.name, &token.name);

		let Some(position) = matched else {
			self.unexpected_closing(token);
			return;
		};

		while self.stack.len() > position + 1 {
			self.attach_top(None);
		}
		self.attach_top(Some(token.span));
	}

	/// Position of the entry a closing tag named `name` closes, following the
	/// closing mode.
	fn matching<T>(&self, entries: &[T], entry_name: impl Fn(&T) -> &String, name: &str) -> Option<usize> {
		match self.mode {
			ClosingMode::Lenient => entries.iter().rposition(|entry| entry_name(entry) == name),
			ClosingMode::Strict => {
				entries
					.last()
					.filter(|entry| entry_name(entry) == name)
					.map(|_| entries.len() - 1)
			}
		}
	}

	/// Pop the innermost frame and append its node to the new top.
	fn attach_top(&mut self, closing_span: Option<Span>) {
		let Some(mut frame) = self.stack.pop() else {
			return;
		};

		frame.node.closing_span = closing_span;
		self.current_children().push(Node::Tag(frame.node));
	}

	fn unexpected_closing(&mut self, token: &Token) {
		let index = self.current_children().len();
		let pointer = self.pointer_at(index);

		self.current_children().push(Node::Text(TextNode {
			content: format!("[/{}]", token.name),
			span: token.span,
		}));
		self.diagnostics.push(Diagnostic {
			kind: DiagnosticKind::UnexpectedClosing,
			tag_name: token.name.clone(),
			span: token.span,
			pointer,
			message: None,
		});
	}

	fn finish(mut self) -> Node {
		match self.mode {
			ClosingMode::Lenient => {
				while !self.stack.is_empty() {
					self.attach_top(None);
				}
			}
			ClosingMode::Strict => {
				while let Some(frame) = self.stack.pop() {
					self.rewrite_unclosed(frame);
				}
			}
		}

		Node::Root(RootNode {
			children: self.root,
		})
	}

	/// Turn a tag that was never closed back into literal text.
	fn rewrite_unclosed(&mut self, frame: Frame) {
		let pointer = self.pointer_at(frame.index);
		let Frame { node, .. } = frame;
		trace!(tag = %node.name, %pointer, "rewriting unclosed tag as text");

		let mut content = opening_syntax(&node.name, node.value.as_deref());
		for child in &node.children {
			match child {
				Node::Text(text) => content.push_str(&text.content),
				other => content.push_str(&(self.serialize)(other)),
			}
		}

		self.diagnostics.push(Diagnostic {
			kind: DiagnosticKind::UnclosedTag,
			tag_name: node.name,
			span: node.span,
			pointer,
			message: None,
		});
		self.current_children().push(Node::Text(TextNode {
			content,
			span: node.span,
		}));
	}
}

/// Build a tree from `tokens`, appending structural diagnostics to
/// `diagnostics`.
///
/// `origin` is the index chain of the node the tokens belong to and prefixes
/// every pointer produced. `depth` is the number of tags already enclosing
/// the tokens and counts against [`MAX_NESTING_DEPTH`]. `serialize` renders the non-text children of tags
/// that strict mode turns back into text.
pub(crate) fn build_tree<F>(
	tokens: &[Token],
	mode: ClosingMode,
	origin: &[usize],
	depth: usize,
	diagnostics: &mut Vec<Diagnostic>,
	serialize: F,
) -> Node
where
	F: Fn(&Node) -> String,
{
	TreeBuilder {
		tokens,
		cursor: 0,
		mode,
		origin,
		depth,
		root: vec![],
		stack: vec![],
		overflow: vec![],
		diagnostics,
		serialize,
	}
	.build()
}
