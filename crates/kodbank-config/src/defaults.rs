//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `kodbank_core::defaults`.

use kodbank_core::defaults;

/// Generate default value functions that forward to kodbank_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_starting_balance   => DEFAULT_STARTING_BALANCE: i64,
    default_min_password_len   => DEFAULT_MIN_PASSWORD_LEN: usize,
    default_session_ttl_secs   => DEFAULT_SESSION_TTL_SECS: u64,
    default_sql_max_connections => DEFAULT_SQL_MAX_CONNECTIONS: u32,
    default_sql_connect_timeout_secs => DEFAULT_SQL_CONNECT_TIMEOUT_SECS: u64,
    default_http_timeout_secs  => DEFAULT_HTTP_TIMEOUT_SECS: u64,
}

default_string_fns! {
    default_role         => DEFAULT_ROLE,
    default_session_path => DEFAULT_SESSION_PATH,
}
