pub mod combine;
pub mod config;
pub mod context;
pub mod date;
pub mod date_column;
pub mod decode;
pub mod filter;
pub mod index_lookup;
pub mod paths;
pub mod pipeline;
pub mod reader;
pub mod runlog;
pub mod text;
pub mod walker;
pub mod warn;
