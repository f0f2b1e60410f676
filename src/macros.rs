//! Convenience logging macros
//!
//! Thin wrappers over [`QueueHandler::enqueue`] that capture the calling
//! module as the logger name. Enqueue failures are deliberately swallowed:
//! a closed pipeline at shutdown must not turn every late log call into
//! error handling at the call site.
//!
//! [`QueueHandler::enqueue`]: crate::core::QueueHandler::enqueue

/// Log at an explicit severity through a handler.
///
/// ```
/// use log_pipeline::prelude::*;
/// use log_pipeline::log;
///
/// let handle = Pipeline::builder().install("queue_handler");
/// let handler = handle.handler();
/// log!(handler, Severity::Info, "processed {} rows", 128);
/// ```
#[macro_export]
macro_rules! log {
    ($handler:expr, $severity:expr, $($arg:tt)*) => {
        {
            let record = $crate::core::Record::new(
                $severity,
                module_path!(),
                format!($($arg)*),
            );
            let _ = $handler.enqueue(record);
        }
    };
}

#[macro_export]
macro_rules! debug {
    ($handler:expr, $($arg:tt)*) => {
        $crate::log!($handler, $crate::core::Severity::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($handler:expr, $($arg:tt)*) => {
        $crate::log!($handler, $crate::core::Severity::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($handler:expr, $($arg:tt)*) => {
        $crate::log!($handler, $crate::core::Severity::Warning, $($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($handler:expr, $($arg:tt)*) => {
        $crate::log!($handler, $crate::core::Severity::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! critical {
    ($handler:expr, $($arg:tt)*) => {
        $crate::log!($handler, $crate::core::Severity::Critical, $($arg)*)
    };
}
