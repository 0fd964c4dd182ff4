//! Typed async client for the job-queue dashboard API.
//!
//! Covers the datatable resources (`queues`, `workers`, `jobs`, ...), the
//! pool overview, per-job detail endpoints (result, traceback, incremental
//! logs), bulk job actions, and the worker-groups document with its
//! partial-success save protocol.

pub mod client;
pub mod models;

pub use client::{ApiClient, ApiError};
pub use models::{
    DataTablePage, JobAction, JobActionReceipt, JobActionRequest, LogTail, LogTarget,
    PoolOverview, PoolWorker, PoolWorkerConfig, SaveStatus, TracebackResponse, WorkerGroup,
    WorkerGroups, WorkerProfile,
};
