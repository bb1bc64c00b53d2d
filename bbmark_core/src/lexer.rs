use std::ops::Range;

use logos::Logos;
use tracing::trace;

use crate::Span;
use crate::tokens::LIST_MARKER;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Raw tokens produced by logos. Everything that can matter to the tag reader
/// gets its own token; all other characters are grouped into runs.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
	#[token("[")]
	OpenBracket,
	#[token("]")]
	CloseBracket,
	#[token("/")]
	Slash,
	#[token("=")]
	Equals,
	#[token("*")]
	Star,
	#[regex(r"[^\[\]/=*]+")]
	Run,
}

/// States of the tag reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
	/// Between tags, collecting text.
	Default,
	/// Reading the name of an opening tag.
	InName,
	/// Reading the name of a closing tag (after `[/`).
	InClosingName,
	/// Reading the value after `=`. Brackets nest here.
	InValue { closing: bool },
}

/// Walks the logos token stream and assembles markup tokens with byte spans.
struct TokenWalker<'a> {
	source: &'a str,
	raw_tokens: Vec<(Result<RawToken, ()>, Range<usize>)>,
	cursor: usize,
	state: LexerState,
	tokens: Vec<Token>,
}

impl<'a> TokenWalker<'a> {
	fn new(source: &'a str) -> Self {
		let raw_tokens: Vec<_> = RawToken::lexer(source).spanned().collect();

		Self {
			source,
			raw_tokens,
			cursor: 0,
			state: LexerState::Default,
			tokens: vec![],
		}
	}

	fn raw_at(&self, index: usize) -> Option<RawToken> {
		match self.raw_tokens.get(index) {
			Some((Ok(raw), _)) => Some(*raw),
			_ => None,
		}
	}

	/// Byte offset where the raw token at `index` starts, or the end of the
	/// source when `index` is past the last token.
	fn start_of(&self, index: usize) -> usize {
		self.raw_tokens
			.get(index)
			.map_or(self.source.len(), |(_, span)| span.start)
	}

	fn end_of(&self, index: usize) -> usize {
		self.raw_tokens
			.get(index)
			.map_or(self.source.len(), |(_, span)| span.end)
	}

	fn process(&mut self) {
		while self.cursor < self.raw_tokens.len() {
			if self.raw_at(self.cursor) != Some(RawToken::OpenBracket) {
				self.read_text();
				continue;
			}

			if let Some(token) = self.read_tag() {
				self.tokens.push(token);
			} else {
				// No closing bracket anywhere ahead: the `[` is plain text.
				let start = self.start_of(self.cursor);
				trace!(offset = start, "unterminated tag, keeping `[` as text");
				self.tokens.push(Token::text("[", Span::new(start, start + 1)));
				self.cursor += 1;
			}
		}
	}

	/// Collect everything up to the next `[` into a single text token.
	fn read_text(&mut self) {
		let start = self.start_of(self.cursor);

		while self.cursor < self.raw_tokens.len()
			&& self.raw_at(self.cursor) != Some(RawToken::OpenBracket)
		{
			self.cursor += 1;
		}

		let end = self.start_of(self.cursor);
		self.tokens
			.push(Token::text(&self.source[start..end], Span::new(start, end)));
	}

	/// Try to read a tag starting at the `[` under the cursor. Returns `None`
	/// without moving the cursor when the tag is never terminated.
	fn read_tag(&mut self) -> Option<Token> {
		let start = self.start_of(self.cursor);
		let mut index = self.cursor + 1;

		self.state = LexerState::InName;
		if self.raw_at(index) == Some(RawToken::Slash) {
			self.state = LexerState::InClosingName;
			index += 1;
		}

		// A `*` right after `[` is skipped, so `[*x]` is the tag `x` and only
		// `[*]` on its own is a list marker.
		let starred = self.state == LexerState::InName && self.raw_at(index) == Some(RawToken::Star);
		if starred {
			index += 1;
		}

		if starred && self.raw_at(index) == Some(RawToken::CloseBracket) {
			let end = self.end_of(index);
			self.cursor = index + 1;
			self.state = LexerState::Default;

			return Some(Token {
				kind: TokenKind::TagOpen,
				name: LIST_MARKER.to_string(),
				value: None,
				raw: self.source[start..end].to_string(),
				span: Span::new(start, end),
			});
		}

		let name_start = self.start_of(index);
		let mut name_end = None;
		let mut value_start = None;
		let mut depth = 0_usize;

		while index < self.raw_tokens.len() {
			match (self.state, self.raw_at(index)) {
				(LexerState::InName | LexerState::InClosingName, Some(RawToken::Equals)) => {
					name_end = Some(self.start_of(index));
					value_start = Some(self.end_of(index));
					self.state = LexerState::InValue {
						closing: self.state == LexerState::InClosingName,
					};
				}
				(LexerState::InValue { .. }, Some(RawToken::OpenBracket)) => depth += 1,
				(LexerState::InValue { .. }, Some(RawToken::CloseBracket)) if depth > 0 => {
					depth -= 1;
				}
				(_, Some(RawToken::CloseBracket)) => break,
				_ => {}
			}

			index += 1;
		}

		let closing = matches!(
			self.state,
			LexerState::InClosingName | LexerState::InValue { closing: true }
		);
		self.state = LexerState::Default;

		if index >= self.raw_tokens.len() {
			return None;
		}

		let bracket = self.start_of(index);
		let end = self.end_of(index);
		let name = self.source[name_start..name_end.unwrap_or(bracket)]
			.trim()
			.to_lowercase();
		let value = value_start.map(|value_start| self.source[value_start..bracket].trim().to_string());

		self.cursor = index + 1;

		Some(Token {
			kind: if closing {
				TokenKind::TagClose
			} else {
				TokenKind::TagOpen
			},
			name,
			value,
			raw: self.source[start..end].to_string(),
			span: Span::new(start, end),
		})
	}
}

/// Split `input` into text and tag tokens.
///
/// Malformed tag syntax never fails: a `[` that is not followed by a matching
/// `]` becomes a one byte text token and scanning resumes right after it.
pub fn tokenize(input: &str) -> Vec<Token> {
	let mut walker = TokenWalker::new(input);
	walker.process();
	trace!(tokens = walker.tokens.len(), "tokenized input");

	walker.tokens
}
