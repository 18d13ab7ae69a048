#![allow(dead_code)]

pub mod agent;
pub mod arbiter;
pub mod dvonn;

pub mod utils {
    pub mod prelude {
        pub use anyhow::{anyhow, Context, Error};
        pub type Result<T> = anyhow::Result<T, Error>;
    }
}

pub mod prelude {
    pub use super::agent::*;
    pub use super::arbiter::*;
    pub use super::dvonn::prelude::*;
    pub use super::utils::prelude::*;
}
