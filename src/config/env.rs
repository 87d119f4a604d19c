//! Environment variable overrides.
//!
//! Every `WEBSERVER_*` variable overrides the matching config field. The
//! lookup is injected so overrides can be tested without touching the
//! process environment.

use crate::config::schema::GatewayConfig;
use crate::observability::blacklist::parse_log_blacklist;

/// Read a boolean: true iff the value is exactly `"true"`, `default` when unset.
pub fn bool_var<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value == "true",
        None => default,
    }
}

/// Read an integer from the leading decimal digits of the value.
///
/// A value without a leading digit (including the empty string) reads as 0,
/// an unset variable yields `default`.
pub fn int_var<F>(lookup: &F, name: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => parse_leading_int(&value),
        None => default,
    }
}

fn parse_leading_int(value: &str) -> u64 {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Apply `WEBSERVER_*` overrides on top of `config`.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("WEBSERVER_PORT") {
        let port = parse_leading_int(&port);
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    let web = &mut config.web_server;
    if let Some(base_path) = lookup("WEBSERVER_BASEPATH") {
        web.base_path = base_path;
    }
    if let Some(path) = lookup("WEBSERVER_RESTAPIPATH") {
        web.rest_api_path = path;
    }
    web.ignore_api_operation_ids = bool_var(
        &lookup,
        "WEBSERVER_IGNORE_API_OPERATION_IDS",
        web.ignore_api_operation_ids,
    );
    web.enable_mocking = bool_var(&lookup, "WEBSERVER_ENABLE_MOCKING", web.enable_mocking);
    web.use_messaging = bool_var(&lookup, "WEBSERVER_USE_MESSAGING", web.use_messaging);
    web.use_response_time =
        bool_var(&lookup, "WEBSERVER_USE_RESPONSE_TIME", web.use_response_time);
    if let Some(list) = lookup("WEBSERVER_LOG_BLACKLIST") {
        web.log_black_list = parse_log_blacklist(&list);
    }

    let messaging = &mut config.messaging;
    if let Some(servers) = lookup("WEBSERVER_MESSAGING_SERVERS") {
        messaging.servers = servers
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(prefix) = lookup("WEBSERVER_TOPIC_PREFIX") {
        messaging.topic_prefix = prefix;
    }
    messaging.request_timeout_ms = int_var(
        &lookup,
        "WEBSERVER_MESSAGING_REQUEST_TIMEOUT",
        messaging.request_timeout_ms,
    );
}

/// Apply overrides from the process environment.
pub fn apply_process_env(config: &mut GatewayConfig) {
    apply_env_overrides(config, |name| std::env::var(name).ok());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_bool_var() {
        let unset = env(&[]);
        assert!(!bool_var(&unset, "TEST", false));
        assert!(bool_var(&unset, "TEST", true));

        let empty = env(&[("TEST", "")]);
        assert!(!bool_var(&empty, "TEST", false));
        assert!(!bool_var(&empty, "TEST", true));

        let junk = env(&[("TEST", "x42")]);
        assert!(!bool_var(&junk, "TEST", true));

        let yes = env(&[("TEST", "true")]);
        assert!(bool_var(&yes, "TEST", false));

        let no = env(&[("TEST", "false")]);
        assert!(!bool_var(&no, "TEST", true));
    }

    #[test]
    fn test_int_var() {
        assert_eq!(int_var(&env(&[]), "TEST", 42), 42);
        assert_eq!(int_var(&env(&[("TEST", "")]), "TEST", 42), 0);
        assert_eq!(int_var(&env(&[("TEST", "24")]), "TEST", 42), 24);
        assert_eq!(int_var(&env(&[("TEST", "24ms")]), "TEST", 42), 24);
        assert_eq!(int_var(&env(&[("TEST", "xy24")]), "TEST", 42), 0);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("WEBSERVER_PORT", "8080"),
                ("WEBSERVER_BASEPATH", "/api"),
                ("WEBSERVER_ENABLE_MOCKING", "true"),
                ("WEBSERVER_USE_MESSAGING", "true"),
                ("WEBSERVER_IGNORE_API_OPERATION_IDS", "true"),
                ("WEBSERVER_LOG_BLACKLIST", "/health,/currencies/[a-zA-Z]{3}$"),
                ("WEBSERVER_TOPIC_PREFIX", "easer"),
                ("WEBSERVER_MESSAGING_REQUEST_TIMEOUT", "500"),
                ("WEBSERVER_MESSAGING_SERVERS", "nats://a:4222, nats://b:4222"),
            ]),
        );

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.web_server.base_path, "/api");
        assert!(config.web_server.enable_mocking);
        assert!(config.web_server.use_messaging);
        assert!(config.web_server.ignore_api_operation_ids);
        assert_eq!(config.web_server.log_black_list.len(), 2);
        assert_eq!(config.messaging.topic_prefix, "easer");
        assert_eq!(config.messaging.request_timeout_ms, 500);
        assert_eq!(
            config.messaging.servers,
            vec!["nats://a:4222".to_string(), "nats://b:4222".to_string()]
        );
    }

    #[test]
    fn test_unset_keeps_file_values() {
        let mut config = GatewayConfig::default();
        config.web_server.enable_mocking = true;
        apply_env_overrides(&mut config, env(&[]));
        assert!(config.web_server.enable_mocking);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3007");
    }
}
