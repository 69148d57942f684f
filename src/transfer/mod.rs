/*!
 * Multipart transfer protocol driver
 *
 * Drives the four-step chunked upload protocol against the storage
 * endpoint encoded in an upload target: open a transfer session, send the
 * file in fixed-size parts, close the session with the ordered
 * confirmation tags, or abort it on failure. A file moves through
 * NotStarted -> Opened -> PartsInFlight -> Closed, or to Aborted from
 * either intermediate state.
 *
 * The wire protocol lives behind the [`StoreBackend`] trait so the engine
 * can be exercised against an in-memory endpoint.
 */

mod backend;
mod engine;
mod error;
mod http;
mod types;

pub use backend::StoreBackend;
pub use engine::TransferEngine;
pub use error::StoreError;
pub use http::HttpStoreBackend;
pub use types::{part_plan, CompletionRecord, PartSpec, PartTag};
