//! # twtxt
//!
//! Parsing and rendering of the twtxt microblog format.
//!
//! ## Architecture
//!
//! Every record line goes through the same pipeline:
//!
//! ```text
//! Lexer → Parser → Elem sequence → Twt → Render / Hash / Codec
//! ```
//!
//! - [`lexer`]: splits a line into tokens, never fails
//! - [`parser`]: recursive descent with pushback, degrades bad markup to text
//! - [`ast`]: element nodes and their Text/Markdown/HTML/Compact renderers
//! - [`domain`]: `Twt`, its content hash, and whole feeds
//!
//! ## Quick Start
//!
//! ```
//! use twtxt::ast::TextFormat;
//! use twtxt::domain::Twter;
//! use twtxt::parser::parse_line;
//!
//! let alice = Twter::new("alice", "https://a.example/twtxt.txt");
//! let twt = parse_line("2021-01-24T02:19:54Z\thello @bob #rust", &alice).unwrap();
//!
//! assert_eq!(twt.mentions().count(), 1);
//! assert_eq!(twt.render(TextFormat::Html), "hello @bob #rust");
//! assert_eq!(twt.hash().len(), 7);
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Error types, the `TwtManager` capability and `AppContext`
//! - [`ast`]: Element model and renderers
//! - [`codec`]: JSON and tab-separated record codecs
//! - [`config`]: TOML configuration
//! - [`domain`]: Twter, Twt, Twts, TwtFile, header comments
//! - [`lexer`]: Tokenizer
//! - [`opts`]: URL policies used when rendering and expanding links
//! - [`parser`]: Line, file and fragment parsing

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the twt
/// manager and the formatting policy.
pub mod app;

/// Element model.
///
/// - [`Elem`](ast::Elem): closed set of body elements
/// - [`DateTime`](ast::DateTime): timestamp field, keeping its literal
/// - [`TextFormat`](ast::TextFormat): output modes of the renderers
pub mod ast;

/// Serialized twts: JSON and `nick\turl\tavatar\thash\tline` records.
pub mod codec;

/// Configuration management.
///
/// Loads from `~/.config/twtxt/config.toml`, supporting:
/// - Parser strictness and diagnostic limits
/// - Site URLs used to rewrite mentions and tags
pub mod config;

/// Core domain models.
///
/// - [`Twter`](domain::Twter): feed author
/// - [`Twt`](domain::Twt): one record with its derived indices and hash
/// - [`Twts`](domain::Twts): collections, counts and age splitting
/// - [`TwtFile`](domain::TwtFile): a parsed feed with its header metadata
pub mod domain;

pub mod lexer;

pub mod opts;

/// Line, file and fragment parsing.
///
/// - [`parse_line`](parser::parse_line): one `timestamp<TAB>body` record
/// - [`parse_file`](parser::parse_file): a whole feed, collecting diagnostics
/// - [`parse_text`](parser::parse_text): a free-text body fragment
pub mod parser;

pub use app::{AppContext, Result, TwtError};
pub use domain::{Twt, Twter};
