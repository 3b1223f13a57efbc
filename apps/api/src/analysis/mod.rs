// Resume analysis: upload intake, prompt selection, and the render → prompt → model pipeline.
// All model calls go through llm_client; all rasterization goes through render.

pub mod handlers;
pub mod models;
pub mod prompts;
pub mod service;
pub mod upload;
