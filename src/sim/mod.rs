pub mod api;
pub mod driver;
#[cfg(feature = "energyplus")]
pub mod energyplus;
pub mod epw_writer;
pub mod replay;
pub mod weather;
