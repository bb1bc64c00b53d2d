use std::fmt::Debug;
use std::sync::Arc;

use crate::RenderContext;

/// Message recorded for a forbidden rule that does not provide its own.
pub const DEFAULT_FORBIDDEN_MESSAGE: &str = "This is forbidden.";

pub type ForbiddenPredicate = Arc<dyn Fn(&RenderContext<'_>) -> bool + Send + Sync>;
pub type ForbiddenHandler = Arc<dyn Fn(&RenderContext<'_>) -> Option<String> + Send + Sync>;

/// A policy check run against every tag that has a rule, before the rule
/// renders.
///
/// When the predicate matches, the tag renders as nothing and a
/// [`DiagnosticKind::Forbidden`](crate::DiagnosticKind::Forbidden) diagnostic
/// carrying `message` is recorded. A handler may supply replacement output.
#[derive(Clone)]
pub struct ForbiddenRule {
	predicate: ForbiddenPredicate,
	message: String,
	handler: Option<ForbiddenHandler>,
}

impl ForbiddenRule {
	pub fn new<P>(predicate: P) -> Self
	where
		P: Fn(&RenderContext<'_>) -> bool + Send + Sync + 'static,
	{
		Self {
			predicate: Arc::new(predicate),
			message: DEFAULT_FORBIDDEN_MESSAGE.to_string(),
			handler: None,
		}
	}

	#[must_use]
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}

	#[must_use]
	pub fn with_handler<H>(mut self, handler: H) -> Self
	where
		H: Fn(&RenderContext<'_>) -> Option<String> + Send + Sync + 'static,
	{
		self.handler = Some(Arc::new(handler));
		self
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn has_handler(&self) -> bool {
		self.handler.is_some()
	}

	pub fn matches(&self, context: &RenderContext<'_>) -> bool {
		(self.predicate)(context)
	}
}

impl Debug for ForbiddenRule {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ForbiddenRule")
			.field("message", &self.message)
			.field("has_handler", &self.has_handler())
			.finish_non_exhaustive()
	}
}

/// Collects the forbidden rules registered by one
/// [`Engine::forbidden`](crate::Engine::forbidden) setup closure.
#[derive(Debug, Default)]
pub struct ForbiddenBatch {
	rules: Vec<ForbiddenRule>,
}

impl ForbiddenBatch {
	/// Register a check. The returned handle can attach a handler with
	/// [`CheckHandle::then`].
	pub fn check<P>(&mut self, predicate: P, message: impl Into<String>) -> CheckHandle<'_>
	where
		P: Fn(&RenderContext<'_>) -> bool + Send + Sync + 'static,
	{
		self.push(ForbiddenRule::new(predicate).with_message(message))
	}

	/// Register a check recorded with [`DEFAULT_FORBIDDEN_MESSAGE`].
	pub fn deny<P>(&mut self, predicate: P) -> CheckHandle<'_>
	where
		P: Fn(&RenderContext<'_>) -> bool + Send + Sync + 'static,
	{
		self.push(ForbiddenRule::new(predicate))
	}

	pub fn push(&mut self, rule: ForbiddenRule) -> CheckHandle<'_> {
		let index = self.rules.len();
		self.rules.push(rule);

		CheckHandle {
			rule: &mut self.rules[index],
		}
	}

	pub(crate) fn into_rules(self) -> Vec<ForbiddenRule> {
		self.rules
	}
}

/// Handle to a freshly registered check.
#[derive(Debug)]
pub struct CheckHandle<'b> {
	rule: &'b mut ForbiddenRule,
}

impl CheckHandle<'_> {
	/// Attach a handler whose `Some` result replaces the forbidden tag's output.
	pub fn then<H>(self, handler: H)
	where
		H: Fn(&RenderContext<'_>) -> Option<String> + Send + Sync + 'static,
	{
		self.rule.handler = Some(Arc::new(handler));
	}
}

/// Outcome of running every forbidden rule against one tag.
#[derive(Debug, Default)]
pub(crate) struct ForbiddenVerdict {
	/// Messages of the matching rules, in registration order.
	pub messages: Vec<String>,
	/// First `Some` returned by a matching rule's handler.
	pub replacement: Option<String>,
}

impl ForbiddenVerdict {
	pub fn is_forbidden(&self) -> bool {
		!self.messages.is_empty()
	}
}

/// Run `rules` in order. Every handler of a matching rule is called, even
/// after a replacement has been found.
pub(crate) fn evaluate(rules: &[ForbiddenRule], context: &RenderContext<'_>) -> ForbiddenVerdict {
	let mut verdict = ForbiddenVerdict::default();

	for rule in rules.iter().filter(|rule| rule.matches(context)) {
		verdict.messages.push(rule.message.clone());

		let Some(handler) = &rule.handler else {
			continue;
		};

		let result = handler(context);
		if verdict.replacement.is_none() {
			verdict.replacement = result;
		}
	}

	verdict
}
