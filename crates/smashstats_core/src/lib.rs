pub mod catalog;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod normalize;
pub mod protocol;
pub mod record;
pub mod replay;
pub mod traits;

pub mod prelude {
    pub use super::error::*;
    pub use super::identity::*;
    pub use super::metadata::*;
    pub use super::normalize::{ConvertedGame, StatsNormalizer};
    pub use super::protocol::*;
    pub use super::record::*;
    pub use super::replay::ParsedReplay;
    pub use super::traits::*;
}
