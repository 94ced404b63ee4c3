// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! BillSync API Layer
//!
//! One service container wiring the field envelope, the offline mutation
//! queue and reminder scheduling to the platform collaborators.
//!
//! # Example
//!
//! ```ignore
//! use billsync_core::api::BillSync;
//!
//! let sync = BillSync::builder()
//!     .database_path(data_dir.join("billsync.db"))
//!     .remote(remote)
//!     .connectivity(probe)
//!     .notifier(notifier)
//!     .build()?;
//!
//! sync.register_categories().await?;
//! let bills = sync.refresh().await?;
//! ```

mod billsync;
mod error;

pub use billsync::{BillSync, BillSyncBuilder, RefreshOutcome};
pub use error::{BillSyncError, BillSyncResult};
