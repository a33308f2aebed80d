#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod api;
pub mod operation;
pub mod request;
pub mod violation;

pub use self::{
    api::{ResultSink, Source, ValidationApi},
    operation::{Operation, State, Status},
    request::{
        Content, PayloadTooLarge, RequestObject, ResultObject, REQUEST_SIZE_LIMIT,
        YAML_CONTENT_TYPE,
    },
    violation::{ResourceKey, ResourceRef, Violation},
};
