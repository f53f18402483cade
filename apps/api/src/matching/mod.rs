pub mod majors;
pub mod matcher;
pub mod ranker;
pub mod similarity;
pub mod text_index;
pub mod tiers;
