//! # nb-ssr
//!
//! The SSR development bridge: renders pages on every request through the
//! dev server's server-environment module runner, with cache invalidation
//! tied to the file watcher.
//!
//! The bridge keeps exactly one cached render-function handle. The cache is
//! lazy: the first request (or the startup warm-up) imports the SSR entry
//! point and binds its `render` export. Any relevant file change empties the
//! slot again; the graph node and the runner's module cache are always
//! invalidated before the slot is cleared, so a reload can never observe
//! stale modules.
//!
//! The HTTP surface is two endpoints mounted into the host dev server:
//! a JSON render endpoint and a health endpoint. Every failure on the render
//! path (body reading, JSON parsing, module load, render execution) is
//! contained at the request boundary and reported as a structured `500`
//! body; the dev server itself never goes down because a render threw.

pub mod bridge;
pub mod error;
pub mod http;

pub use bridge::{SsrBridge, SsrBridgeOptions, RENDER_EXPORT};
pub use error::SsrError;
pub use http::router;
