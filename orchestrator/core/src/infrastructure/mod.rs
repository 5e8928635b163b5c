// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod archive;
pub mod http;
pub mod uaa;

pub use archive::ZipArchiver;
pub use http::ReqwestTransport;
pub use uaa::UaaTokenService;
