pub mod config;
pub mod matching;
pub mod session;
pub mod snapshot;
pub mod traits;

pub use config::{
    AggregationConfig, Config, ErrorInjectionConfig, IdentityConfig, LoggingConfig,
    SimulatorConfig,
};
pub use matching::{
    EmbeddingAck, MatchPair, MatchingStatus, OptInData, OptInResponse, SimilarUser,
    SimilarUsers, UiMatchingStatus, UserAggregatedTraits,
};
pub use session::Session;
pub use snapshot::SyncSnapshot;
pub use traits::{merge_traits, normalize_traits, traits_descriptor, TraitRecord};
