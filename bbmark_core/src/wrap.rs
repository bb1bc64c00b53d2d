//! Automatic wrapping of loose text lines into an implicit tag before
//! tokenizing.
//!
//! Consecutive lines that only contain text and inline tags are grouped into
//! one `[text]...[/text]` block. Blank lines, lines with block tags and the
//! boundaries of container tags (`[quote]`, `[box]`, ...) end a group. The
//! bodies of container tags are wrapped on their own.

use serde::Deserialize;
use serde::Serialize;

use crate::MAX_NESTING_DEPTH;
use crate::tokenize;
use crate::tokens::TokenKind;

/// Stands in for line breaks while lines are rearranged, so that line breaks
/// inside already wrapped container bodies survive the split.
const LINE_SENTINEL: char = '\u{1e}';

/// Tag names the wrap pass distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapTags {
	/// Tags that may appear inside a wrapped line.
	pub inline: Vec<String>,
	/// Container tags whose bodies are wrapped separately.
	pub recursive: Vec<String>,
	/// Tag used to wrap groups of inline lines.
	pub implicit: String,
}

impl Default for WrapTags {
	fn default() -> Self {
		Self {
			inline: ["b", "i", "s", "u", "link", "c", "spoiler", "img", "size", "color"]
				.map(String::from)
				.to_vec(),
			recursive: ["box", "quote", "notice", "centre", "spoilerbox"]
				.map(String::from)
				.to_vec(),
			implicit: "text".to_string(),
		}
	}
}

impl WrapTags {
	fn is_inline(&self, name: &str) -> bool {
		name == self.implicit || self.inline.iter().any(|tag| tag == name)
	}

	/// The container name as written at the start of `text` and the length
	/// of the opening tag that follows the `[`. Names are compared ignoring
	/// ASCII case.
	fn container_opening<'t>(&self, text: &'t str) -> Option<(&'t str, usize)> {
		self.recursive.iter().find_map(|tag| {
			let name = text.get(..tag.len())?;
			if !name.eq_ignore_ascii_case(tag) {
				return None;
			}

			attribute_len(&text[tag.len()..]).map(|len| (name, tag.len() + len))
		})
	}

	/// Whether a trimmed line opens a container with `[box=...` or with a
	/// bare `[box` continued on later lines. A lone `[box]` line is an
	/// ordinary block line.
	fn is_container_open(&self, line: &str) -> bool {
		let Some(rest) = line.strip_prefix('[') else {
			return false;
		};

		self.recursive.iter().any(|tag| {
			rest.get(..tag.len()).is_some_and(|name| name.eq_ignore_ascii_case(tag)) && {
				let after = &rest[tag.len()..];
				after.is_empty() || after.starts_with('=')
			}
		})
	}

	/// Whether a trimmed line is exactly a container closing tag.
	fn is_container_close(&self, line: &str) -> bool {
		line.strip_prefix("[/")
			.and_then(|rest| rest.strip_suffix(']'))
			.is_some_and(|name| self.recursive.iter().any(|tag| name.eq_ignore_ascii_case(tag)))
	}

	/// Whether a trimmed line holds only text and inline tags.
	fn is_inline_only(&self, line: &str) -> bool {
		if line.is_empty() || line.starts_with("[*]") {
			return false;
		}

		tokenize(line)
			.iter()
			.filter(|token| token.kind != TokenKind::Text)
			.all(|token| self.is_inline(&token.name))
	}
}

/// Wrap loose text of `input` into the implicit tag of `tags`.
///
/// ```rust
/// use bbmark_core::WrapTags;
/// use bbmark_core::wrap_text;
///
/// let wrapped = wrap_text("one [b]two[/b]\nthree\n\n[quote]four[/quote]", &WrapTags::default());
/// assert_eq!(
/// 	wrapped,
/// 	"[text]one [b]two[/b]\nthree[/text]\n\n[quote][text]four[/text][/quote]"
/// );
/// ```
pub fn wrap_text(input: &str, tags: &WrapTags) -> String {
	wrap_nested(input, tags, 0)
}

/// Wrap `input` found `depth` containers deep. Containers nested deeper than
/// [`MAX_NESTING_DEPTH`] are left as they are.
fn wrap_nested(input: &str, tags: &WrapTags, depth: usize) -> String {
	let text = input
		.replace("\r\n", "\n")
		.replace('\n', &LINE_SENTINEL.to_string());
	let text = if depth < MAX_NESTING_DEPTH {
		expand_containers(&text, tags, depth)
	} else {
		text
	};

	let mut wrapper = LineWrapper::new(tags);
	for line in text.split(LINE_SENTINEL) {
		wrapper.push_line(line);
	}

	wrapper
		.finish()
		.join("\n")
		.replace(LINE_SENTINEL, "\n")
}

/// A container tag found in the text.
struct Container<'t> {
	/// The opening tag as written, including its attribute.
	opening: &'t str,
	name: &'t str,
	body: &'t str,
	/// Byte offset right after the closing tag.
	end: usize,
}

/// Replace every container in `text` with its opening tag, its separately
/// wrapped body and a closing tag.
fn expand_containers(text: &str, tags: &WrapTags, depth: usize) -> String {
	let mut output = String::with_capacity(text.len());
	let mut cursor = 0;

	while let Some(offset) = text[cursor..].find('[') {
		let start = cursor + offset;
		output.push_str(&text[cursor..start]);

		if let Some(container) = match_container(text, start, tags) {
			let body = container.body.replace(LINE_SENTINEL, "\n");
			output.push_str(container.opening);
			output.push_str(&wrap_nested(&body, tags, depth + 1));
			output.push_str("[/");
			output.push_str(container.name);
			output.push(']');
			cursor = container.end;
		} else {
			output.push('[');
			cursor = start + 1;
		}
	}

	output.push_str(&text[cursor..]);
	output
}

/// Match a container tag starting at the `[` at `start`.
///
/// The attribute may contain bracket pairs one level deep. The body ends at
/// the closing tag that balances the opening one, counting nested containers
/// of the same name.
fn match_container<'t>(text: &'t str, start: usize, tags: &WrapTags) -> Option<Container<'t>> {
	let (name, opening_len) = tags.container_opening(&text[start + 1..])?;
	let body_start = start + 1 + opening_len;

	let mut depth = 0_usize;
	let mut cursor = body_start;
	while let Some(offset) = text[cursor..].find('[') {
		let position = cursor + offset;
		let candidate = &text[position..];

		if closes(candidate, name) {
			if depth == 0 {
				return Some(Container {
					opening: &text[start..body_start],
					name,
					body: &text[body_start..position],
					end: position + name.len() + 3,
				});
			}
			depth -= 1;
		} else if opens(candidate, name) {
			depth += 1;
		}

		cursor = position + 1;
	}

	None
}

/// Length of `=attribute]` or `]` at the start of `rest`, including the
/// closing bracket.
fn attribute_len(rest: &str) -> Option<usize> {
	let bytes = rest.as_bytes();
	match bytes.first()? {
		b']' => return Some(1),
		b'=' => {}
		_ => return None,
	}

	let mut index = 1;
	while index < bytes.len() {
		match bytes[index] {
			b']' => return Some(index + 1),
			b'[' => {
				let close = bytes[index + 1..].iter().position(|byte| matches!(byte, b'[' | b']'))?;
				if bytes[index + 1 + close] != b']' {
					return None;
				}
				index += close + 2;
			}
			_ => index += 1,
		}
	}

	None
}

/// Whether `text` starts with an opening tag named `name`.
fn opens(text: &str, name: &str) -> bool {
	text.get(1..=name.len())
		.is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
		&& text
			.as_bytes()
			.get(name.len() + 1)
			.is_some_and(|byte| matches!(byte, b']' | b'='))
}

/// Whether `text` starts with `[/name]`.
fn closes(text: &str, name: &str) -> bool {
	text.strip_prefix("[/")
		.and_then(|rest| rest.get(..name.len()).map(|candidate| (candidate, &rest[name.len()..])))
		.is_some_and(|(candidate, rest)| candidate.eq_ignore_ascii_case(name) && rest.starts_with(']'))
}

/// Groups lines into implicit tags.
struct LineWrapper<'t> {
	tags: &'t WrapTags,
	lines: Vec<String>,
	buffer: Vec<&'t str>,
	/// A container opening tag spread over several lines.
	pending_opening: Option<String>,
	inside_container: bool,
}

impl<'t> LineWrapper<'t> {
	fn new(tags: &'t WrapTags) -> Self {
		Self {
			tags,
			lines: vec![],
			buffer: vec![],
			pending_opening: None,
			inside_container: false,
		}
	}

	fn push_line(&mut self, line: &'t str) {
		let trimmed = line.trim();

		if let Some(pending) = &mut self.pending_opening {
			pending.push(LINE_SENTINEL);
			pending.push_str(line);
			if trimmed.ends_with(']') {
				self.flush();
				if let Some(opening) = self.pending_opening.take() {
					self.lines.push(opening);
				}
				self.inside_container = true;
			}
			return;
		}

		if self.tags.is_container_open(trimmed) {
			if trimmed.ends_with(']') {
				self.flush();
				self.lines.push(line.to_string());
				self.inside_container = true;
			} else {
				self.pending_opening = Some(line.to_string());
			}
		} else if self.tags.is_container_close(trimmed) {
			self.flush();
			self.lines.push(line.to_string());
			self.inside_container = false;
		} else if trimmed.is_empty() {
			self.flush();
			self.lines.push(String::new());
		} else if !self.inside_container && self.tags.is_inline_only(trimmed) {
			self.buffer.push(line);
		} else {
			self.flush();
			self.lines.push(line.to_string());
		}
	}

	fn flush(&mut self) {
		if self.buffer.is_empty() {
			return;
		}

		let separator = LINE_SENTINEL.to_string();
		let joined = self.buffer.join(separator.as_str());
		self.buffer.clear();

		let implicit = &self.tags.implicit;
		if self.inside_container || joined.starts_with(&format!("[{implicit}]")) {
			self.lines.push(joined);
		} else {
			self.lines.push(format!("[{implicit}]{joined}[/{implicit}]"));
		}
	}

	/// Flush what is left. An opening tag that never saw its closing bracket
	/// is kept as written.
	fn finish(mut self) -> Vec<String> {
		self.flush();
		if let Some(pending) = self.pending_opening.take() {
			self.lines.push(pending);
		}

		self.lines
	}
}
