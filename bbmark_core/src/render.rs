use std::collections::BTreeMap;

use tracing::trace;

use crate::AttributeBinding;
use crate::Diagnostic;
use crate::DiagnosticKind;
use crate::Engine;
use crate::ParseOptions;
use crate::Pointer;
use crate::Rule;
use crate::RuleBody;
use crate::forbidden;
use crate::parser::ListItemNode;
use crate::parser::Node;
use crate::parser::TagNode;
use crate::parser::TextNode;
use crate::parser::build_tree;
use crate::parser::opening_syntax;
use crate::tokens::LIST_MARKER;

/// Everything a callback can see about the node being rendered.
///
/// Sibling links are relative to the children of the node's parent (the
/// top-level nodes for nodes without a parent).
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
	node: &'a Node,
	parent: Option<&'a Node>,
	root: &'a Node,
	siblings: &'a [Node],
	pointer: Pointer,
	variables: BTreeMap<String, String>,
}

impl<'a> RenderContext<'a> {
	pub fn node(&self) -> &'a Node {
		self.node
	}

	/// The enclosing tag, or `None` for top-level nodes.
	pub fn parent(&self) -> Option<&'a Node> {
		self.parent
	}

	pub fn root(&self) -> &'a Node {
		self.root
	}

	pub fn next(&self) -> Option<&'a Node> {
		self.siblings.get(self.pointer.index + 1)
	}

	pub fn previous(&self) -> Option<&'a Node> {
		self.pointer
			.index
			.checked_sub(1)
			.and_then(|index| self.siblings.get(index))
	}

	pub fn pointer(&self) -> &Pointer {
		&self.pointer
	}

	/// Variables bound for the rule being rendered. Empty for forbidden checks
	/// and line-break callbacks.
	pub fn variables(&self) -> &BTreeMap<String, String> {
		&self.variables
	}

	pub fn variable(&self, name: &str) -> Option<&str> {
		self.variables.get(name).map(String::as_str)
	}

	pub fn tag_name(&self) -> &'a str {
		self.node.name()
	}

	pub fn tag_value(&self) -> Option<&'a str> {
		self.node.value()
	}
}

/// Where a node sits while it is rendered.
struct Scope<'a> {
	parent: Option<&'a Node>,
	root: &'a Node,
	siblings: &'a [Node],
	segments: Vec<usize>,
}

impl<'a> Scope<'a> {
	fn pointer(&self) -> Pointer {
		Pointer::from_segments(&self.segments)
	}

	fn context(&self, node: &'a Node) -> RenderContext<'a> {
		RenderContext {
			node,
			parent: self.parent,
			root: self.root,
			siblings: self.siblings,
			pointer: self.pointer(),
			variables: BTreeMap::new(),
		}
	}

	fn diagnostic(&self, kind: DiagnosticKind, node: &Node, message: Option<String>) -> Diagnostic {
		Diagnostic {
			kind,
			tag_name: node.name().to_string(),
			span: node.span().unwrap_or_default(),
			pointer: self.pointer(),
			message,
		}
	}
}

/// Depth-first interpreter turning a tree into output with the rules of an
/// [`Engine`].
pub(crate) struct Renderer<'e> {
	engine: &'e Engine,
	options: ParseOptions,
	/// Tags enclosing the tree being rendered, when it comes from a tag value.
	depth: usize,
}

impl<'e> Renderer<'e> {
	pub fn new(engine: &'e Engine, options: ParseOptions, depth: usize) -> Self {
		Self {
			engine,
			options,
			depth,
		}
	}

	pub fn render_root(&self, root: &Node, diagnostics: &mut Vec<Diagnostic>) -> String {
		let scope = Scope {
			parent: None,
			root,
			siblings: &[],
			segments: vec![],
		};

		self.render_children(None, root.children(), &scope, diagnostics)
	}

	/// Render a node on its own, outside of any tree, with the strict
	/// unknown-tag policy and without keeping diagnostics. Used to turn the
	/// children of unclosed tags back into text.
	pub fn render_detached(&self, node: &Node) -> String {
		let renderer = Renderer {
			engine: self.engine,
			options: ParseOptions {
				strict_unknown_tag: true,
				strict_closing_tag: false,
				..self.options
			},
			depth: self.depth,
		};
		let scope = Scope {
			parent: None,
			root: node,
			siblings: &[],
			segments: vec![],
		};
		let mut discarded = vec![];

		renderer.render_node(node, &scope, &mut discarded)
	}

	fn render_children<'a>(
		&self,
		parent: Option<&'a Node>,
		children: &'a [Node],
		scope: &Scope<'a>,
		diagnostics: &mut Vec<Diagnostic>,
	) -> String {
		let mut output = String::new();

		for (index, child) in children.iter().enumerate() {
			let mut segments = scope.segments.clone();
			segments.push(index);
			let child_scope = Scope {
				parent,
				root: scope.root,
				siblings: children,
				segments,
			};

			output.push_str(&self.render_node(child, &child_scope, diagnostics));
		}

		output
	}

	fn render_node<'a>(&self, node: &'a Node, scope: &Scope<'a>, diagnostics: &mut Vec<Diagnostic>) -> String {
		match node {
			Node::Root(_) => self.render_root(node, diagnostics),
			Node::Text(text) => self.render_text(node, text, scope),
			Node::Tag(tag) => self.render_tag(node, tag, scope, diagnostics),
			Node::ListItem(item) => self.render_list_item(node, item, scope, diagnostics),
		}
	}

	fn render_text<'a>(&self, node: &'a Node, text: &TextNode, scope: &Scope<'a>) -> String {
		let Some(line_break) = &self.engine.line_break else {
			return text.content.clone();
		};

		let mut lines: Vec<&str> = text.content.split('\n').collect();
		if lines.len() > 1 && lines.iter().all(|line| line.trim().is_empty()) {
			lines.pop();
		}

		let context = scope.context(node);
		let last = lines.len().saturating_sub(1);
		let mut output = String::new();
		for (index, line) in lines.into_iter().enumerate() {
			output.push_str(line);
			if index < last {
				output.push_str(&line_break(&context));
			}
		}

		output
	}

	fn render_tag<'a>(
		&self,
		node: &'a Node,
		tag: &'a TagNode,
		scope: &Scope<'a>,
		diagnostics: &mut Vec<Diagnostic>,
	) -> String {
		let inner = self.render_children(Some(node), &tag.children, scope, diagnostics);

		match self.engine.rule(&tag.name) {
			Some(rule) => self.apply_rule(rule, node, &inner, scope, diagnostics),
			None => self.render_unknown(node, inner, tag.closing_span.is_some(), scope, diagnostics),
		}
	}

	/// List item bodies are kept as raw tokens in the tree and only built into
	/// a subtree here, below the item's own pointer.
	fn render_list_item<'a>(
		&self,
		node: &'a Node,
		item: &ListItemNode,
		scope: &Scope<'a>,
		diagnostics: &mut Vec<Diagnostic>,
	) -> String {
		let body = build_tree(
			&item.tokens,
			self.options.closing_mode(),
			&scope.segments,
			self.depth + scope.segments.len(),
			diagnostics,
			|detached| self.render_detached(detached),
		);
		let inner = self.render_children(Some(node), body.children(), scope, diagnostics);

		match self.engine.rule(LIST_MARKER) {
			Some(rule) => self.apply_rule(rule, node, &inner, scope, diagnostics),
			None => self.render_unknown(node, inner, false, scope, diagnostics),
		}
	}

	fn render_unknown(
		&self,
		node: &Node,
		inner: String,
		closed: bool,
		scope: &Scope<'_>,
		diagnostics: &mut Vec<Diagnostic>,
	) -> String {
		if self.options.strict_unknown_tag {
			trace!(tag = node.name(), pointer = %scope.pointer(), "unknown tag");
			diagnostics.push(scope.diagnostic(DiagnosticKind::UnknownTag, node, None));
			return inner;
		}

		let mut output = opening_syntax(node.name(), node.value());
		output.push_str(&inner);
		if closed {
			output.push_str("[/");
			output.push_str(node.name());
			output.push(']');
		}

		output
	}

	fn apply_rule<'a>(
		&self,
		rule: &Rule,
		node: &'a Node,
		inner: &str,
		scope: &Scope<'a>,
		diagnostics: &mut Vec<Diagnostic>,
	) -> String {
		let mut context = scope.context(node);
		let verdict = forbidden::evaluate(&self.engine.forbidden, &context);

		if verdict.is_forbidden() {
			trace!(
				tag = node.name(),
				pointer = %context.pointer,
				matches = verdict.messages.len(),
				"forbidden tag"
			);

			for message in verdict.messages {
				diagnostics.push(scope.diagnostic(DiagnosticKind::Forbidden, node, Some(message)));
			}

			return verdict.replacement.unwrap_or_default();
		}

		context.variables = self.bind_variables(rule, node.value(), inner, scope);

		match &rule.body {
			RuleBody::Callback(render) => render(&context),
			RuleBody::Template(template) => rule.substitute(template, &context.variables),
		}
	}

	fn bind_variables(
		&self,
		rule: &Rule,
		value: Option<&str>,
		inner: &str,
		scope: &Scope<'_>,
	) -> BTreeMap<String, String> {
		let mut variables = BTreeMap::new();

		if !rule.attr_names.is_empty() {
			let raw = value.unwrap_or_default();
			let bound = match rule.attributes {
				AttributeBinding::Raw => raw.to_string(),
				AttributeBinding::Markup => {
					self.engine
						.parse_nested(raw, &ParseOptions::default(), self.depth + scope.segments.len())
						.output
				}
			};

			for name in &rule.attr_names {
				variables.insert(name.clone(), bound.clone());
			}
		}

		let content = inner.trim();
		for name in &rule.content_names {
			variables.insert(name.clone(), content.to_string());
		}

		variables
	}
}
