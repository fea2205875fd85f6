/// Ordered migration steps: sequences, then tables, then indexes. Every step is idempotent.
pub const MIGRATIONS: &[&str] = &[
    "CREATE SEQUENCE IF NOT EXISTS logs_id_seq START 1",
    "CREATE SEQUENCE IF NOT EXISTS metrics_id_seq START 1",
    r#"
CREATE TABLE IF NOT EXISTS traces (
  trace_id TEXT PRIMARY KEY,
  service_name TEXT NOT NULL,
  operation_name TEXT NOT NULL,
  start_time TIMESTAMP NOT NULL,
  end_time TIMESTAMP NOT NULL,
  duration_ms BIGINT NOT NULL,
  span_count BIGINT NOT NULL,
  error_count BIGINT NOT NULL,
  status_code INTEGER NOT NULL,
  attributes TEXT,
  created_at TIMESTAMP DEFAULT current_timestamp
)"#,
    r#"
CREATE TABLE IF NOT EXISTS spans (
  span_id TEXT PRIMARY KEY,
  trace_id TEXT NOT NULL,
  parent_span_id TEXT,
  service_name TEXT NOT NULL,
  operation_name TEXT NOT NULL,
  span_kind TEXT NOT NULL,
  start_time TIMESTAMP NOT NULL,
  end_time TIMESTAMP NOT NULL,
  duration_ms BIGINT NOT NULL,
  status_code INTEGER NOT NULL,
  status_message TEXT,
  attributes TEXT,
  events TEXT,
  links TEXT
)"#,
    r#"
CREATE TABLE IF NOT EXISTS logs (
  id BIGINT PRIMARY KEY DEFAULT nextval('logs_id_seq'),
  timestamp TIMESTAMP NOT NULL,
  trace_id TEXT,
  span_id TEXT,
  severity_text TEXT NOT NULL,
  severity_number INTEGER NOT NULL,
  body TEXT NOT NULL,
  service_name TEXT NOT NULL,
  attributes TEXT,
  resource_attributes TEXT
)"#,
    r#"
CREATE TABLE IF NOT EXISTS metrics (
  id BIGINT PRIMARY KEY DEFAULT nextval('metrics_id_seq'),
  timestamp TIMESTAMP NOT NULL,
  metric_name TEXT NOT NULL,
  metric_type TEXT NOT NULL,
  service_name TEXT NOT NULL,
  value DOUBLE NOT NULL,
  unit TEXT,
  attributes TEXT,
  exemplars TEXT
)"#,
    "CREATE INDEX IF NOT EXISTS idx_traces_start_time ON traces(start_time)",
    "CREATE INDEX IF NOT EXISTS idx_traces_service ON traces(service_name)",
    "CREATE INDEX IF NOT EXISTS idx_spans_trace_id ON spans(trace_id)",
    "CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_logs_trace_id ON logs(trace_id)",
    "CREATE INDEX IF NOT EXISTS idx_logs_service ON logs(service_name)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_name ON metrics(metric_name)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_service ON metrics(service_name)",
];
