//! # tomolog
//!
//! Publishes a one-slide summary of a tomography reconstruction run to a
//! Google Slides presentation.
//!
//! # Architecture
//!
//! All document editing happens server-side through the Slides
//! `batchUpdate` endpoint. tomolog builds batches of edit operations and
//! submits them one at a time:
//!
//! ```text
//! config  →  auth session  →  report  →  builder  →  service / retry
//! (merge)    (key file)       (walk run)  (Batch)     (HTTP, one call each)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Defaults ← config file ← CLI flags, merged into one immutable [`config::TomologConfig`] |
//! | [`auth`] | Service-account sessions scoped to presentations or drive |
//! | [`slides`] | Edit-operation types, batch builders, submission, image retry |
//! | [`drive`] | Uploads local images to Drive and shares them for embedding |
//! | [`report`] | Walks one run and places its slide elements |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Client-Generated IDs
//!
//! Every created object gets a UUID before submission, so operations later
//! in the same batch (insert text, style, bullets) can target it. The
//! service applies a batch in order and atomically.
//!
//! ## Image Inserts Retry, Everything Else Propagates
//!
//! The service fetches and embeds images itself and that step is flaky.
//! A single image insert is retried up to 40 times and, if it never
//! succeeds, recorded as not created: the run goes on without it. Slide and
//! text box failures stop the run.
//!
//! ## Blocking I/O
//!
//! One request is in flight at a time. The blocking `reqwest` client keeps
//! the control flow linear and the retry loop strictly sequential.

pub mod auth;
pub mod config;
pub mod drive;
pub mod logging;
pub mod output;
pub mod report;
pub mod slides;
