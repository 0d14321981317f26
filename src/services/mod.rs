pub mod predictor;
pub mod wellbeing;
