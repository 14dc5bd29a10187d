//! Community platform adapter (reqwest).

mod gateway;

pub use gateway::{HttpPlatformGateway, PlatformConfig};
