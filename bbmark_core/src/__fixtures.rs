use rstest::fixture;

use crate::AttributeBinding;
use crate::Engine;
use crate::ParseOptions;
use crate::RuleDefinition;
use crate::Span;
use crate::Token;
use crate::TokenKind;

pub(crate) fn bold_rule() -> RuleDefinition {
	RuleDefinition::template("[b]$content[/b]", "<b>$content</b>")
}

pub(crate) fn forum_rules() -> Vec<RuleDefinition> {
	vec![
		bold_rule(),
		RuleDefinition::template("[i]$content[/i]", "<i>$content</i>"),
		RuleDefinition::template("[url=$href]$text[/url]", "<a href=\"$href\">$text</a>")
			.with_attributes(AttributeBinding::Raw),
		RuleDefinition::template("[quote=$author]$body[/quote]", "<blockquote title=\"$author\">$body</blockquote>"),
		RuleDefinition::template("[img=$src]", "<img src=\"$src\">").with_attributes(AttributeBinding::Raw),
		RuleDefinition::template("[list]$items[/list]", "<ul>$items</ul>"),
		RuleDefinition::template("[*]$content", "<li>$content</li>"),
		RuleDefinition::template("[text]$content[/text]", "<p>$content</p>"),
	]
}

#[fixture]
pub(crate) fn forum_engine() -> Engine {
	Engine::new(forum_rules()).unwrap_or_default()
}

pub(crate) fn lenient_unknown() -> ParseOptions {
	ParseOptions {
		strict_unknown_tag: false,
		..ParseOptions::default()
	}
}

pub(crate) fn strict_closing() -> ParseOptions {
	ParseOptions {
		strict_closing_tag: true,
		..ParseOptions::default()
	}
}

pub(crate) fn text_token(raw: &str, start: usize) -> Token {
	Token::text(raw, Span::new(start, start + raw.len()))
}

pub(crate) fn open_token(raw: &str, name: &str, value: Option<&str>, start: usize) -> Token {
	Token {
		kind: TokenKind::TagOpen,
		name: name.to_string(),
		value: value.map(ToString::to_string),
		raw: raw.to_string(),
		span: Span::new(start, start + raw.len()),
	}
}

pub(crate) fn close_token(raw: &str, name: &str, start: usize) -> Token {
	Token {
		kind: TokenKind::TagClose,
		name: name.to_string(),
		value: None,
		raw: raw.to_string(),
		span: Span::new(start, start + raw.len()),
	}
}
