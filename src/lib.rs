//! Inliner - compose, CSS-inline and minify HTML email templates.
//!
//! A top-level template pulls in a base template, stylesheets and
//! parameterized fragments through `<link>` references. [`inline::Inliner`]
//! flattens all of that into one minified document with per-element `style`
//! attributes. In watch mode the [`pipeline::Pipeline`] keeps every template
//! built and rebuilds exactly the ones a filesystem change affects.

pub mod app;
pub mod cli;
pub mod config;
pub mod dom;
pub mod error;
pub mod index;
pub mod inline;
pub mod instance;
pub mod live;
pub mod logger;
pub mod merge;
pub mod minify;
pub mod pipeline;
pub mod utils;
pub mod watch;
