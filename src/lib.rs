// Lib file to expose modules for testing and external usage.
// This file serves as the root for the library crate.

/// Module defining the error taxonomy.
/// This includes the `Error` enum and the crate-wide `Result` alias.
pub mod error;

/// Module containing shared parsing and position utilities.
/// This includes `LineIndex`, line slicing, and the module parse helper.
pub mod utils;

/// Module containing the comment neutralizer.
/// This rewrites triple-quoted blocks into line comments.
pub mod comments;

/// Module containing the function locator and enumerator.
/// This finds named functions and lambda bindings and extracts their source.
pub mod locator;

/// Module containing the package classifier.
/// This decides whether an import is local, installable, or standard library.
pub mod classifier;

/// Module containing the local module resolver.
/// This maps dotted import names to files near the importing file.
pub mod resolver;

/// Module containing the import graph builder and pip flattener.
/// This builds the transitive import map and extracts installable packages.
pub mod imports;

/// Module containing the code normalizer.
/// This inlines local imports under namespace wrappers and rewrites aliases.
pub mod normalizer;

/// Module containing the analysis-service client.
/// This submits the extracted function and normalized code for analysis.
pub mod client;
