pub mod diff;
pub mod ids;
pub mod locator;
pub mod merge;
pub mod normalize;
pub mod parse;
pub mod passes;

pub use ids::SectionNumber;
