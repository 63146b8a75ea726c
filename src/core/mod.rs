pub mod config;

// Frame-to-request pipeline
pub mod validator;
pub mod vectorizer;
pub mod throttle;
pub mod prediction_client;
pub mod display;
pub mod frame_pipeline;
