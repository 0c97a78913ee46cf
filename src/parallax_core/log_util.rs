//! Logging utility macros

/// Logs a formatted message at `$level`, unless the same message was already logged from this
/// invocation site on the current thread.
///
/// Meant for conditions that can repeat every pixel or every scanline (unmapped register
/// accesses, bad reprojection input), where logging each occurrence would drown everything else.
/// The message is only formatted if `$level` is enabled.
macro_rules! log_unique {
    ( $level:expr, $($args:tt)+ ) => {{
        let level = $level;
        if log_enabled!(level) {
            thread_local!(
                static LOGGED: ::std::cell::RefCell<::std::collections::HashSet<String>> =
                    ::std::cell::RefCell::new(::std::collections::HashSet::new())
            );

            let msg = format!($($args)+);
            LOGGED.with(|logged| {
                if logged.borrow_mut().insert(msg.clone()) {
                    log!(level, "{}", msg);
                }
            });
        }
    }};
}

/// `log_unique!` at trace level
macro_rules! trace_unique {
    ( $($args:tt)+ ) => { log_unique!(::log::Level::Trace, $($args)+) };
}

/// `log_unique!` at debug level
macro_rules! debug_unique {
    ( $($args:tt)+ ) => { log_unique!(::log::Level::Debug, $($args)+) };
}
