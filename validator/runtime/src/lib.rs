#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use manifest_validator_client as client;
pub use manifest_validator_core as core;

mod allowlist;
mod args;
mod config;
mod duration;
mod focus;
pub mod poller;
pub mod report;
mod source;
mod validator;

pub use self::{
    allowlist::Allowlist,
    args::Args,
    config::{Config, ConfigPaths},
    duration::{HumanDuration, InvalidDuration},
    focus::FocusComponents,
    poller::{Completion, FailedOperation, PendingOperation, PollOutcome, Poller},
    report::{NewViolations, Report, ResourceReport},
    source::{requests_from_manifests, ManifestDir},
    validator::{Cancelled, FailurePolicy, Incomplete, Validator},
};
