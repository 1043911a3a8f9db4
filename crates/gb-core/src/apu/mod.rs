#[allow(clippy::module_inception)]
pub mod apu;

pub use apu::Apu;
