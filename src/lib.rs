//! # Proctor
//!
//! This library provides the proctoring core of the quiz-taking view: it
//! watches a quiz attempt for attempts to leave the quiz context (leaving
//! full-screen mode, switching tabs), escalates warnings, and forces a
//! submission once the warnings are exhausted. The core is sans-IO: timers,
//! browser capabilities, rendering and the network are all supplied by the
//! host.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::Serialize;

pub mod attempt;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod notification;
pub mod proctor;
pub mod quiz;
pub mod session;
pub mod submission;

pub use proctor::{AlarmMessage, Monitor, SyncMessage};

/// Messages sent to update the user's view
///
/// Update messages describe a single change, such as a new notification
/// or the warning modal opening, and are delivered through
/// [`session::Surface::send_message`].
#[derive(Debug, Serialize, Clone, PartialEq, derive_more::From)]
pub enum UpdateMessage {
    /// A transient notification
    Notification(notification::Notification),
    /// A change in the proctored attempt
    Proctor(proctor::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}
