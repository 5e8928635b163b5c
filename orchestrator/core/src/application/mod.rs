// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod commands;
pub mod context;
pub mod operation;
pub mod poller;
pub mod retry;
pub mod rollback;

pub use context::OperationContext;
pub use operation::{Operation, Sequence, Step};
pub use poller::{Poller, Sleeper, TokioSleeper};
pub use retry::{CredentialRetry, OperationExt};
pub use rollback::{Compensable, CompensatingRollback};
