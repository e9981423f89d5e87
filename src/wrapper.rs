pub(crate) mod rust_log {
    use std::fmt;
    use std::panic::Location;

    use log::kv::Value;

    /// Hand one record to whatever `log` backend the host installed.
    pub(crate) fn log(
        level: log::Level,
        target: &str,
        module_path: &'static str,
        loc: &'static Location<'static>,
        message: &dyn fmt::Display,
        kvs: &[(&str, Value<'_>)],
    ) {
        if level > log::max_level() {
            return;
        }

        log::logger().log(
            &log::Record::builder()
                .args(format_args!("{message}"))
                .level(level)
                .target(target)
                .module_path_static(Some(module_path))
                .file_static(Some(loc.file()))
                .line(Some(loc.line()))
                .key_values(&kvs)
                .build(),
        );
    }
}
