pub mod answer;
pub mod ingest;
