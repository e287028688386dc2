/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! # cue-syntax
//!
//! CUE syntax-tree building blocks: token positions with
//! relative-whitespace classification, an expression AST with comment
//! attachment, and literal services (quoting, unquoting, numeric
//! validation).
//!
//! This crate holds the target representation for decoders that translate
//! other configuration formats into CUE. It deliberately contains no
//! parser; producers construct the AST directly and a formatter renders
//! it.
//!
//! ## Example
//!
//! ```rust
//! use cue_syntax::ast::{BasicLit, Expr, LitKind};
//! use cue_syntax::token::{Pos, RelPos};
//!
//! let lit = Expr::Basic(BasicLit::new(LitKind::Int, Pos::new(0, RelPos::NoRel), "42"));
//! assert_eq!(lit.pos().offset(), 0);
//! ```

pub mod ast;
pub mod literal;
pub mod token;

pub use ast::{Comment, CommentGroup, Expr, Field, Label, LitKind, Op};
pub use token::{Pos, RelPos};
