pub mod aggregation;
pub mod correlation;
pub mod sources;

pub use aggregation::AggregationEngine;
pub use correlation::CorrelationEngine;
pub use sources::{
    FetchBatch, FilmSource, GeoapifyClient, PlaceSource, TmdbClient, DEFAULT_PLACE_CATEGORIES,
    DEFAULT_SEARCH_RADIUS_M,
};
