#[macro_export]
macro_rules! env_bool {
    ($key:expr) => {
        std::env::var($key)
            .map(|v| v.trim().to_lowercase())
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false)
    };
    ($key:expr, $default:expr) => {
        std::env::var($key)
            .map(|v| v.trim().to_lowercase())
            .map(|v| v == "1" || v == "true")
            .unwrap_or($default)
    };
}

#[macro_export]
macro_rules! env_str {
    ($key:expr) => {
        std::env::var($key).unwrap_or_default().trim().to_string()
    };
    ($key:expr, $default:expr) => {
        std::env::var($key).unwrap_or_else(|_| $default.to_string()).trim().to_string()
    };
}

#[macro_export]
macro_rules! print_dbg {
    ($debug:expr, $($arg:tt)*) => {
        if $debug {
            eprintln!("{}", format!($($arg)*).blue())
        }
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*).yellow())
    };
}

#[macro_export]
macro_rules! print_err {
    ($($arg:tt)*) => {
        eprintln!("{}", format!($($arg)*).red())
    };
}

#[macro_export]
macro_rules! print_header {
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*).bold().underline())
    };
}

#[macro_export]
macro_rules! console_label {
    (severity: $severity:expr) => {{
        match $severity {
            $crate::enums::Severity::Critical => {
                "   CRITICAL    ".bold().truecolor(255, 255, 255).on_truecolor(255, 0, 0)
            }
            $crate::enums::Severity::High => {
                "     HIGH      ".bold().truecolor(255, 255, 255).on_truecolor(230, 50, 0)
            }
            $crate::enums::Severity::Medium => {
                "    MEDIUM     ".bold().truecolor(255, 255, 255).on_truecolor(255, 100, 0)
            }
            $crate::enums::Severity::Low => {
                "      LOW      ".bold().truecolor(0, 0, 0).on_truecolor(241, 194, 50)
            }
            $crate::enums::Severity::Informational => {
                " INFORMATIONAL ".bold().truecolor(0, 0, 0).on_truecolor(180, 180, 180)
            }
        }
    }};
}

#[macro_export]
macro_rules! console_note {
    ($($arg:tt)*) => {
        format!("{}", format!($($arg)*).dimmed())
    };
}

#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        anyhow::anyhow!($crate::error::PolarisError {
            message: format!($($arg)*),
            sentry: false
        })
    };
}

#[macro_export]
macro_rules! sentry_err {
    ($($arg:tt)*) => {
        anyhow::anyhow!($crate::error::PolarisError {
            message: format!($($arg)*),
            sentry: true
        })
    };
}
