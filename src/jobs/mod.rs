pub mod pool_stats_ingest;
