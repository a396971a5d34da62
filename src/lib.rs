// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! GPU-instanced 3D visualization of drillhole assay intervals.
//!
//! Every assay interval is drawn as one instance of a shared unit cylinder:
//! the template is uploaded once and each interval contributes only a small
//! per-instance record (offset, height, width, orientation, pick id and a
//! float-encoded flag field). A second shader variant renders pick ids as
//! colors so the interval under the cursor resolves from a single pixel.
//!
//! # Key entry points
//!
//! - [`data::Property`] - property JSON parsing and interval flattening
//! - [`dispatch::Dispatcher`] - parallel, session-versioned transform solving
//! - [`scene::IntervalScene`] - live buffer plus hover/selection/cull state
//! - [`renderer::IntervalMesh`] - instanced draw assembly
//! - [`renderer::picking::Picking`] - offscreen id pass and readback
//! - [`options::Options`] - runtime configuration
//!
//! # Architecture
//!
//! Interval `k` is solved on worker `k % worker_count`, so each slot of the
//! structure-of-arrays [`instance::InstanceAttributeBuffer`] has exactly
//! one producer. Results are tagged with a session id; a new load bumps the
//! session and late results from the old one are dropped. Workers retire
//! after an idle period and are respawned by the next dispatch.

pub mod data;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod instance;
pub mod options;
pub mod renderer;
pub mod scene;
