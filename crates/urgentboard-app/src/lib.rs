// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod batch;
pub mod catalog;
pub mod filter;
pub mod forms;
pub mod ids;
pub mod model;
pub mod mutation;
pub mod persistence;
pub mod remote;
pub mod sort;
pub mod state;

pub use batch::*;
pub use catalog::*;
pub use filter::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use mutation::*;
pub use persistence::*;
pub use remote::*;
pub use sort::*;
pub use state::*;
