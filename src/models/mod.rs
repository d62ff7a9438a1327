// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod identity;
pub mod session;
pub mod user;

pub use account::{AuthSource, LinkedProviderAccount};
pub use identity::{NormalizedIdentity, ProviderToken};
pub use session::Session;
pub use user::{PasswordCredential, User, UserResponse};
