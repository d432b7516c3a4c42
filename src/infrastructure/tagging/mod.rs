//! Tagging infrastructure module

mod lofty;

pub use self::lofty::LoftyTagWriter;
