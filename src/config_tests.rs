// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for settings deserialization and validation.

#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use std::io::Write;

    const MINIMAL_YAML: &str = r"
domain: example.com
topology:
  source: topology.example.com
  resolver: 192.0.2.53:53
directory:
  api_url: http://directory.test/api
  api_token: secret-a
zone:
  api_url: http://zone.test/api
  api_token: secret-b
monitoring:
  output_path: /tmp/monitoring.yaml
";

    fn parse(yaml: &str) -> Settings {
        serde_yaml::from_str(yaml).expect("settings should parse")
    }

    #[test]
    fn test_minimal_settings_parse_with_defaults() {
        let settings = parse(MINIMAL_YAML);

        assert_eq!(settings.domain, "example.com");
        assert!(settings.directory.organization_id.is_none());
        assert!(settings.zone.zone_id.is_none());
        assert!(settings.reconciler.keep_records.is_empty());
        assert!(settings.reconciler.ignore_subdomains.is_empty());
        assert_eq!(settings.monitoring.allowed_status_codes, vec![200]);
        assert!(settings.monitoring.skip_technical_cnames);
        assert!(!settings.monitoring.aggressive_host_filter);
        assert_eq!(settings.monitoring.interval, "60s");
    }

    #[test]
    fn test_minimal_settings_validate() {
        parse(MINIMAL_YAML).validate().expect("should validate");
    }

    #[test]
    fn test_full_settings_parse() {
        let yaml = r"
domain: example.com
topology:
  source: topology.example.com
  resolver: 192.0.2.53:53
directory:
  api_url: http://directory.test/api
  organization_id: org-1
zone:
  api_url: http://zone.test/api
  zone_id: z-9
reconciler:
  keep_records: [legacy, mail]
  ignore_subdomains: [internal]
  root_aliases: ['@', www]
monitoring:
  output_path: /etc/gatus/config.yaml
  name_overrides:
    app: Application
  port_overrides:
    gitea: 3000
  allowed_status_codes: [200, 301]
  extra_status_codes:
    401: [auth, sso]
  interval: 30s
  client_timeout: 10s
  alerts:
    - type: discord
      send_on_resolved: true
";
        let settings = parse(yaml);

        assert_eq!(settings.directory.organization_id.as_deref(), Some("org-1"));
        assert_eq!(settings.zone.zone_id.as_deref(), Some("z-9"));
        assert_eq!(settings.reconciler.keep_records, vec!["legacy", "mail"]);
        assert_eq!(settings.monitoring.port_overrides.get("gitea"), Some(&3000));
        assert_eq!(
            settings.monitoring.extra_status_codes.get(&401),
            Some(&vec!["auth".to_string(), "sso".to_string()])
        );
        assert_eq!(settings.monitoring.alerts.len(), 1);
        assert_eq!(settings.monitoring.alerts[0].kind, "discord");
    }

    #[test]
    fn test_validate_rejects_empty_domain() {
        let mut settings = parse(MINIMAL_YAML);
        settings.domain = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_resolver() {
        let mut settings = parse(MINIMAL_YAML);
        settings.topology.resolver = "not-a-socket-addr".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_api_url() {
        let mut settings = parse(MINIMAL_YAML);
        settings.zone.api_url = "::nope::".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(MINIMAL_YAML.as_bytes()).expect("write");

        let settings = Settings::load(file.path()).expect("should load");
        assert_eq!(settings.domain, "example.com");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(std::path::Path::new("/nonexistent/zonesync.yaml"));
        assert!(err.is_err());
    }
}
