pub mod correlation;
pub mod film;
pub mod job;
pub mod place;

pub use correlation::{
    Correlation, DailyReport, FilmContribution, LocationPreferences, LocationSuccessStats,
    Recommendation, SuccessReport, SuggestedLocation,
};
pub use film::{Film, ProductionLocation, TmdbCountry, TmdbGenre, TmdbMovie, TmdbMovieDetails};
pub use job::{EtlJob, JobResults, JobStatus, JobType};
pub use place::{City, GeoFeature, GeoProperties, Place};
