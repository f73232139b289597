pub mod industry_weights;
pub mod portfolio;
