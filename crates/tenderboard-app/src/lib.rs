// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod filter;
pub mod format;
pub mod ids;
pub mod model;
pub mod state;
pub mod status;

pub use filter::*;
pub use format::*;
pub use ids::*;
pub use model::*;
pub use state::*;
pub use status::*;
