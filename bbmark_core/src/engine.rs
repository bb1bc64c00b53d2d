use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::BbmarkResult;
use crate::Diagnostic;
use crate::EngineConfig;
use crate::ForbiddenBatch;
use crate::ForbiddenRule;
use crate::Node;
use crate::ParseOptions;
use crate::RenderContext;
use crate::RenderFn;
use crate::Rule;
use crate::RuleDefinition;
use crate::RuleSet;
use crate::Token;
use crate::WrapTags;
use crate::parser::build_tree;
use crate::render::Renderer;
use crate::tokenize;
use crate::wrap_text;

/// Everything a single [`Engine::parse`] call produced.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
	pub output: String,
	/// Tree builder diagnostics followed by renderer diagnostics.
	pub diagnostics: Vec<Diagnostic>,
	pub tokens: Vec<Token>,
	pub tree: Node,
	/// The input after the optional wrap pass. Spans refer to this text.
	pub preprocessed_input: String,
}

impl ParseResult {
	/// Whether the markup parsed without any diagnostics.
	pub fn is_clean(&self) -> bool {
		self.diagnostics.is_empty()
	}
}

/// A configured markup compiler.
///
/// Configuration happens through `&mut self` methods; [`Engine::parse`] only
/// borrows the engine, so one engine can serve any number of threads.
///
/// ```rust
/// use bbmark_core::Engine;
/// use bbmark_core::ParseOptions;
/// use bbmark_core::RuleDefinition;
///
/// let engine = Engine::new([
/// 	RuleDefinition::template("[b]$content[/b]", "<b>$content</b>"),
/// 	RuleDefinition::template("[url=$href]$text[/url]", "<a href=\"$href\">$text</a>"),
/// ])?;
///
/// let result = engine.parse("[url=/home][b]home[/b][/url]", &ParseOptions::default());
/// assert_eq!(result.output, "<a href=\"/home\"><b>home</b></a>");
/// assert!(result.is_clean());
/// # Ok::<(), bbmark_core::BbmarkError>(())
/// ```
#[derive(Clone, Default)]
pub struct Engine {
	pub(crate) rules: RuleSet,
	pub(crate) forbidden: Vec<ForbiddenRule>,
	pub(crate) line_break: Option<RenderFn>,
	pub(crate) wrap_tags: WrapTags,
}

impl Engine {
	pub fn new(definitions: impl IntoIterator<Item = RuleDefinition>) -> BbmarkResult<Self> {
		let mut engine = Self::default();
		engine.set_rules(definitions)?;

		Ok(engine)
	}

	/// Build an engine from the rules and wrap tags of `config`. The parse
	/// options of the config are left to the caller.
	pub fn from_config(config: &EngineConfig) -> BbmarkResult<Self> {
		let mut engine = Self::new(config.rule_definitions())?;
		engine.set_wrap_tags(config.wrap.clone());

		Ok(engine)
	}

	/// Replace all rules. Nothing changes when any template is invalid.
	pub fn set_rules(&mut self, definitions: impl IntoIterator<Item = RuleDefinition>) -> BbmarkResult<()> {
		self.rules = RuleSet::compile(definitions)?;
		Ok(())
	}

	/// Append a rule. A rule named like an earlier one is kept but never used.
	pub fn add_rule(&mut self, definition: RuleDefinition) -> BbmarkResult<()> {
		let rule = Rule::compile(&definition)?;
		self.rules.push_rule(rule);

		Ok(())
	}

	/// Set the callback inserted between the lines of text nodes.
	pub fn set_line_break<F>(&mut self, line_break: F)
	where
		F: Fn(&RenderContext<'_>) -> String + Send + Sync + 'static,
	{
		self.line_break = Some(Arc::new(line_break));
	}

	pub fn clear_line_break(&mut self) {
		self.line_break = None;
	}

	pub fn set_wrap_tags(&mut self, wrap_tags: WrapTags) {
		self.wrap_tags = wrap_tags;
	}

	pub fn wrap_tags(&self) -> &WrapTags {
		&self.wrap_tags
	}

	/// Register forbidden rules from a setup closure.
	///
	/// ```rust
	/// use bbmark_core::Engine;
	/// use bbmark_core::ParseOptions;
	/// use bbmark_core::RuleDefinition;
	///
	/// let mut engine = Engine::new([RuleDefinition::template("[img]$src[/img]", "<img src=\"$src\">")])?;
	/// engine.forbidden(|batch| {
	/// 	batch
	/// 		.check(|ctx| ctx.parent().is_some(), "Images must be top level.")
	/// 		.then(|_| Some("[image]".to_string()));
	/// });
	///
	/// let result = engine.parse("[quote][img]a.png[/img][/quote]", &ParseOptions {
	/// 	strict_unknown_tag: false,
	/// 	..ParseOptions::default()
	/// });
	/// assert_eq!(result.output, "[quote][image][/quote]");
	/// # Ok::<(), bbmark_core::BbmarkError>(())
	/// ```
	pub fn forbidden<F>(&mut self, setup: F)
	where
		F: FnOnce(&mut ForbiddenBatch),
	{
		let mut batch = ForbiddenBatch::default();
		setup(&mut batch);
		self.forbidden.extend(batch.into_rules());
	}

	pub fn forbid(&mut self, rule: ForbiddenRule) {
		self.forbidden.push(rule);
	}

	pub fn forbidden_rules(&self) -> &[ForbiddenRule] {
		&self.forbidden
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	/// The rule used for tags named `name`: the first one registered.
	pub fn rule(&self, name: &str) -> Option<&Rule> {
		self.rules.find(name)
	}

	/// Compile `input`. Problems with the markup never fail the call; they are
	/// reported in [`ParseResult::diagnostics`].
	pub fn parse(&self, input: &str, options: &ParseOptions) -> ParseResult {
		self.parse_nested(input, options, 0)
	}

	/// Compile `input` as if it sat inside `depth` tags, which count against
	/// [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).
	pub(crate) fn parse_nested(&self, input: &str, options: &ParseOptions, depth: usize) -> ParseResult {
		debug!(input_len = input.len(), ?options, depth, "parsing markup");

		let preprocessed_input = if options.wrap_text {
			wrap_text(input, &self.wrap_tags)
		} else {
			input.to_string()
		};

		let tokens = tokenize(&preprocessed_input);
		let renderer = Renderer::new(self, *options, depth);
		let mut diagnostics = vec![];
		let tree = build_tree(
			&tokens,
			options.closing_mode(),
			&[],
			depth,
			&mut diagnostics,
			|node| renderer.render_detached(node),
		);
		let output = renderer.render_root(&tree, &mut diagnostics);

		debug!(
			tokens = tokens.len(),
			diagnostics = diagnostics.len(),
			output_len = output.len(),
			"parsed markup"
		);

		ParseResult {
			output,
			diagnostics,
			tokens,
			tree,
			preprocessed_input,
		}
	}
}

impl Debug for Engine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Engine")
			.field("rules", &self.rules)
			.field("forbidden", &self.forbidden)
			.field("line_break", &self.line_break.is_some())
			.field("wrap_tags", &self.wrap_tags)
			.finish()
	}
}
