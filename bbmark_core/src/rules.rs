use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::BbmarkError;
use crate::BbmarkResult;
use crate::RenderContext;

/// A callback that renders a node from its [`RenderContext`].
pub type RenderFn = Arc<dyn Fn(&RenderContext<'_>) -> String + Send + Sync>;

/// How a rule produces its output.
#[derive(Clone)]
pub enum RuleBody {
	/// An output string in which every `$name` placeholder is replaced by the
	/// bound variable.
	Template(String),
	/// A callback receiving the full render context.
	Callback(RenderFn),
}

impl Debug for RuleBody {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Template(template) => f.debug_tuple("Template").field(template).finish(),
			Self::Callback(_) => f.write_str("Callback(..)"),
		}
	}
}

impl From<&str> for RuleBody {
	fn from(template: &str) -> Self {
		Self::Template(template.to_string())
	}
}

impl From<String> for RuleBody {
	fn from(template: String) -> Self {
		Self::Template(template)
	}
}

/// What attribute placeholders are bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeBinding {
	/// The output of parsing the tag value as markup with the same engine and
	/// default [`ParseOptions`](crate::ParseOptions), whatever options the
	/// enclosing parse was given. Diagnostics of that parse are dropped.
	#[default]
	Markup,
	/// The tag value exactly as written.
	Raw,
}

/// A rule as supplied by the caller, before compilation.
///
/// ```rust
/// use bbmark_core::AttributeBinding;
/// use bbmark_core::RuleDefinition;
///
/// let bold = RuleDefinition::template("[b]$content[/b]", "<b>$content</b>");
/// let link = RuleDefinition::template("[url=$href]$text[/url]", "<a href=\"$href\">$text</a>")
/// 	.with_attributes(AttributeBinding::Raw);
/// let item = RuleDefinition::callback("[*]$content", |ctx| {
/// 	format!("<li>{}</li>", ctx.variable("content").unwrap_or_default())
/// });
/// # let _ = (bold, link, item);
/// ```
#[derive(Debug, Clone)]
pub struct RuleDefinition {
	/// Overrides the name derived from the template. Used verbatim.
	pub name: Option<String>,
	/// Template of the shape `[tag attributes]content`, declaring the tag and
	/// its placeholders.
	pub template: String,
	pub body: RuleBody,
	pub attributes: AttributeBinding,
}

impl RuleDefinition {
	pub fn new(template: impl Into<String>, body: RuleBody) -> Self {
		Self {
			name: None,
			template: template.into(),
			body,
			attributes: AttributeBinding::default(),
		}
	}

	pub fn template(template: impl Into<String>, render: impl Into<String>) -> Self {
		Self::new(template, RuleBody::Template(render.into()))
	}

	pub fn callback<F>(template: impl Into<String>, render: F) -> Self
	where
		F: Fn(&RenderContext<'_>) -> String + Send + Sync + 'static,
	{
		Self::new(template, RuleBody::Callback(Arc::new(render)))
	}

	#[must_use]
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	#[must_use]
	pub fn with_attributes(mut self, attributes: AttributeBinding) -> Self {
		self.attributes = attributes;
		self
	}
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
	/// Tag name the rule applies to.
	pub name: String,
	/// Placeholders of the attribute part, in first-occurrence order.
	pub attr_names: Vec<String>,
	/// Placeholders of the content part, in first-occurrence order.
	pub content_names: Vec<String>,
	/// `attr_names` followed by `content_names`, without duplicates.
	pub full_vars: Vec<String>,
	pub body: RuleBody,
	pub attributes: AttributeBinding,
}

impl Rule {
	/// Compile a definition, validating its template.
	pub fn compile(definition: &RuleDefinition) -> BbmarkResult<Self> {
		let parts = TemplateParts::parse(&definition.template)
			.ok_or_else(|| BbmarkError::InvalidTemplate(definition.template.clone()))?;

		let attr_names = placeholders(parts.attributes);
		let content_names = placeholders(parts.content);
		let mut full_vars: Vec<String> = vec![];
		for name in attr_names.iter().chain(&content_names) {
			if !full_vars.contains(name) {
				full_vars.push(name.clone());
			}
		}

		Ok(Self {
			name: definition
				.name
				.clone()
				.unwrap_or_else(|| parts.tag.to_lowercase()),
			attr_names,
			content_names,
			full_vars,
			body: definition.body.clone(),
			attributes: definition.attributes,
		})
	}

	/// Replace every `$name` of [`Rule::full_vars`] in `template`. Unbound
	/// variables are replaced with nothing.
	pub fn substitute(&self, template: &str, variables: &BTreeMap<String, String>) -> String {
		let mut output = template.to_string();
		for name in &self.full_vars {
			let value = variables.get(name).map_or("", String::as_str);
			output = output.replace(&format!("${name}"), value);
		}

		output
	}
}

/// Compiled rules in registration order.
///
/// Lookup returns the first rule with a matching name, so a rule added under
/// a name that is already taken is kept but never applied.
#[derive(Debug, Clone, Default, Deref, DerefMut)]
pub struct RuleSet(
	#[deref]
	#[deref_mut]
	Vec<Rule>,
);

impl RuleSet {
	/// Compile every definition. Fails on the first invalid template.
	pub fn compile(definitions: impl IntoIterator<Item = RuleDefinition>) -> BbmarkResult<Self> {
		let mut rules = Self::default();
		for definition in definitions {
			rules.push_rule(Rule::compile(&definition)?);
		}

		Ok(rules)
	}

	pub fn find(&self, name: &str) -> Option<&Rule> {
		self.0.iter().find(|rule| rule.name == name)
	}

	pub fn push_rule(&mut self, rule: Rule) {
		if self.find(&rule.name).is_some() {
			debug!(rule = %rule.name, "rule is shadowed by an earlier rule with the same name");
		}

		self.0.push(rule);
	}
}

/// The three parts of `[tag attributes]content`.
struct TemplateParts<'a> {
	tag: &'a str,
	attributes: &'a str,
	content: &'a str,
}

impl<'a> TemplateParts<'a> {
	fn parse(template: &'a str) -> Option<Self> {
		if template.contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
			return None;
		}

		let rest = template.strip_prefix('[')?;
		let tag_len = rest
			.bytes()
			.take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'*')
			.count();
		if tag_len == 0 {
			return None;
		}

		let (tag, rest) = rest.split_at(tag_len);
		let (attributes, content) = rest.split_once(']')?;

		Some(Self {
			tag,
			attributes,
			content,
		})
	}
}

/// Names of the `$identifier` placeholders in `text`, in first-occurrence
/// order. Repeated names are listed once per occurrence.
fn placeholders(text: &str) -> Vec<String> {
	let mut names = vec![];
	let mut rest = text;

	while let Some(position) = rest.find('$') {
		rest = &rest[position + 1..];
		let len = rest
			.bytes()
			.take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
			.count();

		if len > 0 {
			names.push(rest[..len].to_string());
			rest = &rest[len..];
		}
	}

	names
}
