//! Convert SVG documents to PDF, PNG, PostScript and SVG pages.
//!
//! Loading a document parses its XML, applies the CSS cascade and attribute inheritance,
//! and builds a tree of nodes whose attributes are fully resolved.  Rendering walks that
//! tree and emits drawing operations to a [`surface::Surface`]; with the `cairo`
//! feature, [`convert`] renders to cairo surfaces and writes the output file.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cairo")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::fs::File;
//!
//! let options = pagesvg::Options::new().with_dpi(150.0);
//! let document = options.load_path("example.svg")?;
//!
//! let output = File::create("example.pdf")?;
//! pagesvg::convert(&document, options.config(), pagesvg::OutputFormat::Pdf, output)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cairo"))]
//! # fn main() {}
//! ```

#![allow(clippy::too_many_arguments)]
#![warn(nonstandard_style, rust_2018_idioms, unused)]
#![warn(trivial_casts, trivial_numeric_casts)]

// The public API is exported here
pub use crate::api::*;

#[cfg(feature = "cairo")]
pub use crate::cairo_backend::{convert, CairoSurface};

mod angle;
mod api;
mod aspect_ratio;
mod bbox;
#[cfg(feature = "cairo")]
mod cairo_backend;
mod color;
mod cond;
mod coord_units;
mod css;
mod dasharray;
mod document;
mod drawing_ctx;
mod element;
mod error;
mod gradient;
mod image;
mod io;
mod length;
mod limits;
mod log;
mod marker;
mod node;
mod number_list;
mod paint_server;
mod parsers;
mod path_builder;
mod path_parser;
mod pattern;
mod rect;
mod session;
mod shapes;
mod structure;
pub mod surface;
mod text;
mod transform;
mod url_resolver;
mod viewbox;
mod xml;

#[doc(hidden)]
pub mod bench_only {
    pub use crate::path_builder::PathBuilder;
}

#[doc(hidden)]
pub mod tests_only {
    pub use crate::bbox::{elliptical_arc, node_bbox, path_bbox};
    pub use crate::document::{AcquiredNodes, LoadOptions};
    pub use crate::drawing_ctx::draw_tree;
    pub use crate::length::NormalizeParams;
    pub use crate::node::{Node, NodeExt};
    pub use crate::path_builder::{Path, PathBuilder, PathCommand};
    pub use crate::rect::Rect;
    pub use crate::transform::Transform;
}

#[doc(hidden)]
pub mod convert_only {
    pub use crate::color::Rgba;
    pub use crate::parsers::Parse;
}
