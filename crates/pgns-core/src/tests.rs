#[cfg(test)]
mod tests {
    use crate::error::ProxyError;
    use crate::types::{BackendCredentials, StartupParameters, TextRow};
    use std::collections::HashMap;

    #[test]
    fn startup_parameters_accessors() {
        let mut raw = HashMap::new();
        raw.insert("user".to_string(), "alice".to_string());
        raw.insert("database".to_string(), "app".to_string());
        raw.insert("application_name".to_string(), "tenant1".to_string());
        let params = StartupParameters::from(raw);
        assert_eq!(params.len(), 3);
        assert_eq!(params.user(), Some("alice"));
        assert_eq!(params.database(), Some("app"));
        assert_eq!(params.application_name(), Some("tenant1"));
        assert_eq!(params.get("User"), None);
    }

    #[test]
    fn text_row_renders_nulls() {
        let row = TextRow::new(vec![Some("1".into()), Some("alice".into()), None]);
        assert_eq!(row.render(), "[1 alice NULL]");
        assert_eq!(TextRow::default().render(), "[]");
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = BackendCredentials {
            host: "db".into(),
            port: 5432,
            user: "alice".into(),
            password: "hunter2".into(),
            database: "app".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
        assert_eq!(creds.display_string(), "alice@db:5432/app");
    }

    #[test]
    fn only_query_errors_keep_session_alive() {
        let query_err = ProxyError::BackendQuery {
            code: "42P01".into(),
            message: "relation \"users\" does not exist".into(),
        };
        assert!(!query_err.ends_session());
        assert_eq!(query_err.sqlstate(), "42P01");
        assert!(ProxyError::Protocol("bad tag".into()).ends_session());
        assert!(ProxyError::BackendConnection("refused".into()).ends_session());
    }
}
