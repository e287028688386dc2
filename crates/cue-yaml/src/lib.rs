/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! # cue-yaml
//!
//! Decodes YAML documents into CUE syntax trees with faithful source
//! positions and comments, so the formatted output reads like
//! hand-written CUE: blank-line sections survive, comments stay attached
//! to the values they describe, and flow collections keep their braces
//! where the source put them.
//!
//! Beyond the structural translation this handles the YAML corners that
//! trip up naive conversions: 1.1 octal literals, `!!binary` payloads,
//! infinities and NaN, timestamp scalars, merge keys (`<<`) with their
//! precedence rules, and anchor/alias expansion with cycle detection.
//!
//! ## Example
//!
//! ```rust
//! use cue_yaml::Decoder;
//!
//! let mut decoder = Decoder::new("config.yaml", "a: 1\nb: [2, 3]\n");
//! let expr = decoder.decode().unwrap().expect("one document");
//! assert!(matches!(expr, cue_syntax::Expr::Struct(_)));
//! assert!(decoder.decode().unwrap().is_none());
//! ```

mod builder;
mod comments;
mod decode;
mod error;
mod node;
mod source;

pub use decode::{unmarshal, Decoder};
pub use error::{Error, ErrorKind, Result};
pub use node::{Document, Node, NodeId, NodeKind, ScalarStyle};
pub use source::SourceMap;
