/*!
 * Session manifest parsing and directory resolution
 */

pub mod resolver;
pub mod schema;

pub use resolver::{resolve_directory, ManifestIssue, ResolvedManifest, ResolvedSet};
pub use schema::{SessionManifest, MANIFEST_EXTENSION};
