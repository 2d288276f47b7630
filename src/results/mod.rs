pub mod hits;

pub use hits::{Hit, HitList};
