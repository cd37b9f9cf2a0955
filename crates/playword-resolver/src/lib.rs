//! PlayWord Resolver - From instruction to concrete actions
//!
//! The resolver classifies a free-text instruction into one of three
//! buckets (operation, assertion, query), binds that bucket's fixed tool
//! catalogue, and drives the reasoner's tool-calling turn. Side effects
//! (element retrieval through the index, actuation through the actuator)
//! happen inside the tool bodies, so the reasoner only ever sees tools and
//! their results.

#![forbid(unsafe_code)]

pub mod catalogue;
pub mod resolver;

pub use catalogue::{catalogue_for, full_catalogue};
pub use resolver::{Resolution, Resolver};
