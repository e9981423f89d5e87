//! `log` backend for tests. Records are kept per thread, so each
//! `#[actix_web::test]` only sees what its own requests emitted.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Once;

use log::kv::{self, Key, Value, VisitSource};
use log::{LevelFilter, Log, Metadata, Record};

#[derive(Debug, Clone)]
pub(crate) struct CapturedRecord {
    pub(crate) target: String,
    pub(crate) message: String,
    pub(crate) fields: HashMap<String, String>,
}

impl CapturedRecord {
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

thread_local! {
    static RECORDS: RefCell<Vec<CapturedRecord>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let mut fields = CollectFields::default();
        if record.key_values().visit(&mut fields).is_err() {
            return;
        }

        RECORDS.with(|records| {
            records.borrow_mut().push(CapturedRecord {
                target: record.target().to_string(),
                message: record.args().to_string(),
                fields: fields.0,
            })
        });
    }

    fn flush(&self) {}
}

#[derive(Default)]
struct CollectFields(HashMap<String, String>);

impl<'kvs> VisitSource<'kvs> for CollectFields {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
        self.0.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Install the capturing logger and forget what this thread recorded so far.
pub(crate) fn init() {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Access log records emitted on this thread, in order.
pub(crate) fn access_records() -> Vec<CapturedRecord> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|record| record.fields.contains_key("path"))
            .cloned()
            .collect()
    })
}
