use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

lazy_static::lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mayfly_http_requests_total", "Total HTTP requests", &["method", "path", "status"]
    ).unwrap();
    pub static ref DOCUMENTS_INGESTED_TOTAL: IntCounter = register_int_counter!(
        "mayfly_documents_ingested_total", "Documents accepted for indexing"
    ).unwrap();
    pub static ref INGEST_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mayfly_ingest_rejected_total", "Rejected ingestion requests", &["reason"]
    ).unwrap();
    pub static ref QUERIES_TOTAL: IntCounter = register_int_counter!(
        "mayfly_queries_total", "Total queries executed"
    ).unwrap();
    pub static ref QUERY_DURATION: Histogram = register_histogram!(
        "mayfly_query_duration_seconds", "Query duration",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();
    pub static ref UPDATES_APPLIED_TOTAL: IntCounter = register_int_counter!(
        "mayfly_updates_applied_total", "Edits published by maintenance applies"
    ).unwrap();
    pub static ref UPDATES_EXPIRED_TOTAL: IntCounter = register_int_counter!(
        "mayfly_updates_expired_total", "Postings evicted by expiration"
    ).unwrap();
    pub static ref POSTING_COUNT: IntGauge = register_int_gauge!(
        "mayfly_posting_count", "Published postings in the index"
    ).unwrap();
    pub static ref EXPIRE_TABLE_SIZE: IntGauge = register_int_gauge!(
        "mayfly_expire_table_size", "Tracked (term, doc) deadline pairs"
    ).unwrap();
    pub static ref UPDATE_QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "mayfly_update_queue_depth", "Jobs waiting in the update queue"
    ).unwrap();
    pub static ref SNAPSHOTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mayfly_snapshots_total", "Snapshot dumps", &["status"]
    ).unwrap();
    pub static ref MAINTENANCE_TICKS_TOTAL: IntCounter = register_int_counter!(
        "mayfly_maintenance_ticks_total", "Maintenance loop iterations"
    ).unwrap();
}

pub fn init() {
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&DOCUMENTS_INGESTED_TOTAL);
    lazy_static::initialize(&INGEST_REJECTED_TOTAL);
    lazy_static::initialize(&QUERIES_TOTAL);
    lazy_static::initialize(&QUERY_DURATION);
    lazy_static::initialize(&UPDATES_APPLIED_TOTAL);
    lazy_static::initialize(&UPDATES_EXPIRED_TOTAL);
    lazy_static::initialize(&POSTING_COUNT);
    lazy_static::initialize(&EXPIRE_TABLE_SIZE);
    lazy_static::initialize(&UPDATE_QUEUE_DEPTH);
    lazy_static::initialize(&SNAPSHOTS_TOTAL);
    lazy_static::initialize(&MAINTENANCE_TICKS_TOTAL);
}
