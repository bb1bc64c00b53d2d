//! `bbmark_core` compiles bracket-tag markup (`[b]bold[/b]`, `[url=/]home[/url]`)
//! into output such as HTML, driven by a caller-supplied set of tag rules.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Markup
//!   → Wrap pass (optional, groups loose lines into an implicit tag)
//!   → Lexer (splits the input into text and tag tokens)
//!   → Tree builder (matches opening and closing tags, recovers from mistakes)
//!   → Renderer (applies rules, forbidden checks and line breaks)
//! ```
//!
//! Malformed markup never fails a parse. Every anomaly is recovered from and
//! reported as a [`Diagnostic`] next to the output. Only invalid
//! configuration, such as a rule template that cannot be parsed, produces a
//! [`BbmarkError`].
//!
//! ## Key Types
//!
//! - [`Engine`]: Compiled rules, forbidden rules, the line-break callback and wrap tags.
//! - [`RuleDefinition`]: A rule template such as `[url=$href]$text[/url]` with its output.
//! - [`ForbiddenRule`]: A policy check that can veto or replace a tag.
//! - [`ParseResult`]: The output together with diagnostics, tokens and tree.
//! - [`EngineConfig`]: Declarative setup loaded from TOML.
//!
//! ## Quick Start
//!
//! ```rust
//! use bbmark_core::Engine;
//! use bbmark_core::ParseOptions;
//! use bbmark_core::RuleDefinition;
//!
//! let mut engine = Engine::new([
//! 	RuleDefinition::template("[b]$content[/b]", "<b>$content</b>"),
//! 	RuleDefinition::template("[quote=$author]$body[/quote]", "<q title=\"$author\">$body</q>"),
//! ])?;
//! engine.set_line_break(|_| "<br>".to_string());
//!
//! let result = engine.parse("[quote=Ann]one\n[b]two[/b][/quote]", &ParseOptions::default());
//! assert_eq!(result.output, "<q title=\"Ann\">one<br><b>two</b></q>");
//! assert!(result.is_clean());
//! # Ok::<(), bbmark_core::BbmarkError>(())
//! ```

pub use config::*;
pub use diagnostic::*;
pub use engine::*;
pub use error::*;
pub use forbidden::*;
pub use lexer::tokenize;
pub use parser::ClosingMode;
pub use parser::ListItemNode;
pub use parser::MAX_NESTING_DEPTH;
pub use parser::Node;
pub use parser::RootNode;
pub use parser::TagNode;
pub use parser::TextNode;
pub use position::*;
pub use render::RenderContext;
pub use rules::*;
pub use tokens::*;
pub use wrap::*;

pub mod config;
mod diagnostic;
mod engine;
#[allow(unused_assignments)]
mod error;
mod forbidden;
pub(crate) mod lexer;
mod parser;
mod position;
mod render;
mod rules;
mod tokens;
pub mod wrap;

#[cfg(test)]
mod __fixtures;
