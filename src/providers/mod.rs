pub mod replicate;

pub use replicate::Replicate;
