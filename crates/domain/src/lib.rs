//! # dynabridge-domain
//!
//! Pure domain model for the climate ↔ DyNet bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **area state** (the five HVAC fields mirrored between both sides)
//!   and the closed HVAC / fan mode vocabularies
//! - Define the **DyNet codec**: fixed-layout command bodies and their hex
//!   rendering
//! - Define **bus frames** and classify them into the closed set of commands
//!   the bridge understands
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod climate;
pub mod dynet;
pub mod frame;
