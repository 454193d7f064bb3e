pub mod analysis_handlers;
