pub mod candidates;
pub mod data_cleaning;
pub mod embedding;
pub mod merger;
pub mod model_store;
pub mod recommender;
pub mod scrape;

pub use candidates::select_candidates;
pub use model_store::load_model;
pub use recommender::{Recommender, RecommenderModel, RecommenderSettings, WeightPolicy};
