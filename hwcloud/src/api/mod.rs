//! Huawei Cloud API client and per-service operations

pub mod autoscaling;
pub mod cce;
pub mod client;
pub mod common;
pub mod ecs;
#[cfg(test)]
pub mod test_helpers;
pub mod vpc;

pub use client::Client;
pub use common::{ApiErrorResponse, ApiQueryParams, Tag};
pub use tfreconcile::{ApiError, ApiResult, ErrorKind};
