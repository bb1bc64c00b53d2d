use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::AttributeBinding;
use crate::BbmarkError;
use crate::BbmarkResult;
use crate::ClosingMode;
use crate::RuleDefinition;
use crate::WrapTags;

/// Options of a single [`Engine::parse`](crate::Engine::parse) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
	/// Run the wrap pass over the input before tokenizing.
	pub wrap_text: bool,
	/// Report tags without a rule and drop their brackets, instead of keeping
	/// them as literal text.
	pub strict_unknown_tag: bool,
	/// Only let a closing tag close the innermost open tag and turn tags left
	/// open back into text.
	pub strict_closing_tag: bool,
}

impl Default for ParseOptions {
	fn default() -> Self {
		Self {
			wrap_text: false,
			strict_unknown_tag: true,
			strict_closing_tag: false,
		}
	}
}

impl ParseOptions {
	pub fn closing_mode(&self) -> ClosingMode {
		if self.strict_closing_tag {
			ClosingMode::Strict
		} else {
			ClosingMode::Lenient
		}
	}
}

/// A rule declared in configuration. Only template bodies can be declared
/// this way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRule {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	pub template: String,
	pub render: String,
	#[serde(default)]
	pub attributes: AttributeBinding,
}

impl From<&TemplateRule> for RuleDefinition {
	fn from(rule: &TemplateRule) -> Self {
		let definition =
			RuleDefinition::template(rule.template.as_str(), rule.render.as_str()).with_attributes(rule.attributes);

		match &rule.name {
			Some(name) => definition.named(name.as_str()),
			None => definition,
		}
	}
}

/// Declarative engine setup.
///
/// ```toml
/// [options]
/// wrap_text = true
/// strict_unknown_tag = false
///
/// [wrap]
/// inline = ["b", "i"]
/// recursive = ["quote"]
///
/// [[rules]]
/// template = "[url=$href]$text[/url]"
/// render = "<a href=\"$href\">$text</a>"
/// attributes = "raw"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	pub options: ParseOptions,
	pub wrap: WrapTags,
	pub rules: Vec<TemplateRule>,
}

impl EngineConfig {
	pub fn from_toml(content: &str) -> BbmarkResult<Self> {
		toml::from_str(content).map_err(|e| BbmarkError::ConfigParse(e.to_string()))
	}

	/// The declared rules as definitions, in declaration order.
	pub fn rule_definitions(&self) -> Vec<RuleDefinition> {
		self.rules.iter().map(RuleDefinition::from).collect()
	}
}

impl FromStr for EngineConfig {
	type Err = BbmarkError;

	fn from_str(content: &str) -> Result<Self, Self::Err> {
		Self::from_toml(content)
	}
}
