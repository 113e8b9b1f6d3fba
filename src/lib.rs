#[path = "core/params.rs"]
pub mod params;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/substrate.rs"]
pub mod substrate;

#[path = "core/causality.rs"]
pub mod causality;

#[path = "core/world.rs"]
pub mod world;

#[path = "core/snapshot.rs"]
pub mod snapshot;

#[path = "core/driver.rs"]
pub mod driver;
