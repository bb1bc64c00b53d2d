use std::fmt::Display;
use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

/// A half-open byte range `start..end` into the parsed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
	pub start: usize,
	pub end: usize,
}

impl Span {
	pub fn new(start: usize, end: usize) -> Self {
		Self { start, end }
	}

	pub fn len(&self) -> usize {
		self.end.saturating_sub(self.start)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The slice of `source` covered by this span, if it lies on character
	/// boundaries.
	pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
		source.get(self.start..self.end)
	}
}

impl From<Range<usize>> for Span {
	fn from(range: Range<usize>) -> Self {
		Self::new(range.start, range.end)
	}
}

impl From<Span> for miette::SourceSpan {
	fn from(span: Span) -> Self {
		(span.start, span.len()).into()
	}
}

impl Display for Span {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}..{}", self.start, self.end)
	}
}

/// Structural coordinates of a node within the tree.
///
/// `path` is the dot-joined chain of sibling indices from the root down to the
/// node itself, so the second child of the first top-level node has the path
/// `"0.1"`, an `index` of `1` and a `depth` of `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
	pub index: usize,
	pub path: String,
	pub depth: usize,
}

impl Pointer {
	/// Build a pointer from the index chain leading to a node. An empty chain
	/// yields the pointer of the first top-level node.
	pub fn from_segments(segments: &[usize]) -> Self {
		let Some(&index) = segments.last() else {
			return Self::default();
		};

		let path = segments
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>()
			.join(".");

		Self {
			index,
			path,
			depth: segments.len() - 1,
		}
	}

	/// The index chain this pointer was built from.
	pub fn segments(&self) -> Vec<usize> {
		self.path
			.split('.')
			.filter_map(|segment| segment.parse().ok())
			.collect()
	}
}

impl Default for Pointer {
	fn default() -> Self {
		Self {
			index: 0,
			path: "0".to_string(),
			depth: 0,
		}
	}
}

impl Display for Pointer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.path)
	}
}
