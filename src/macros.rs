// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros for convenient leveled writes through a channel

/// Write at emergency severity
///
/// # Examples
/// ```ignore
/// log_emergency!(chan, "engine unusable: {}", reason);
/// ```
#[macro_export]
macro_rules! log_emergency {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Emergency, ::std::format_args!($($arg)*))
    };
}

/// Write at alert severity
///
/// # Examples
/// ```ignore
/// log_alert!(chan, "pool nearly exhausted: {} slots left", free);
/// ```
#[macro_export]
macro_rules! log_alert {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Alert, ::std::format_args!($($arg)*))
    };
}

/// Write at critical severity
///
/// # Examples
/// ```ignore
/// log_critical!(chan, "worker {} crashed", id);
/// ```
#[macro_export]
macro_rules! log_critical {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Critical, ::std::format_args!($($arg)*))
    };
}

/// Write at error severity
///
/// # Examples
/// ```ignore
/// log_error!(chan, "bind failed on {}: {}", addr, err);
/// ```
#[macro_export]
macro_rules! log_error {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Error, ::std::format_args!($($arg)*))
    };
}

/// Write at warning severity
///
/// # Examples
/// ```ignore
/// log_warning!(chan, "backlog at {} of {}", used, cap);
/// ```
#[macro_export]
macro_rules! log_warning {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Warning, ::std::format_args!($($arg)*))
    };
}

/// Write at notice severity
///
/// # Examples
/// ```ignore
/// log_notice!(chan, "worker {} restarted", id);
/// ```
#[macro_export]
macro_rules! log_notice {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Notice, ::std::format_args!($($arg)*))
    };
}

/// Write at info severity
///
/// # Examples
/// ```ignore
/// log_info!(chan, "processed {} packets", count);
/// ```
#[macro_export]
macro_rules! log_info {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Info, ::std::format_args!($($arg)*))
    };
}

/// Write at debug severity
///
/// # Examples
/// ```ignore
/// log_debug!(chan, "state: {:?}", state);
/// ```
#[macro_export]
macro_rules! log_debug {
    ($writer:expr, $($arg:tt)*) => {
        $writer.write_fmt($crate::Severity::Debug, ::std::format_args!($($arg)*))
    };
}

/// Write at an explicit severity value
///
/// # Examples
/// ```ignore
/// log_at!(chan, severity, "W{:02} {} => {}", id, seq, index);
/// ```
#[macro_export]
macro_rules! log_at {
    ($writer:expr, $severity:expr, $($arg:tt)*) => {
        $writer.write_fmt($severity, ::std::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineConfig, Severity, SinkKind};

    #[test]
    fn test_log_macros() {
        let engine = Engine::new(EngineConfig {
            min_severity: Severity::Debug,
            sink: SinkKind::Stderr,
            ..Default::default()
        })
        .unwrap();
        engine.init().unwrap();
        let mut chan = engine.acquire_channel(64).unwrap();

        log_emergency!(chan, "emergency {}", 0).unwrap();
        log_alert!(chan, "alert {}", 1).unwrap();
        log_critical!(chan, "critical {}", 2).unwrap();
        log_error!(chan, "error {}", 3).unwrap();
        log_warning!(chan, "warning {}", 4).unwrap();
        log_notice!(chan, "notice {}", 5).unwrap();
        log_info!(chan, "info {}", 6).unwrap();
        log_debug!(chan, "debug {}", 7).unwrap();

        chan.release();
        engine.deinit().unwrap();
    }

    #[test]
    fn test_log_at_macro() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.init().unwrap();
        let mut chan = engine.acquire_channel(8).unwrap();

        let severity = Severity::from_u8(3).unwrap();
        log_at!(chan, severity, "leveled {} of {}", 3, 8).unwrap();

        chan.release();
        engine.deinit().unwrap();
    }
}
