// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over a [`Database`](crate::database::Database).

pub mod logins;
pub mod meta;
