use colored::*;
use grex_core::GetInfoError;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct ServiceList(pub Vec<String>);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<GetInfoError> for FormattedString {
    fn from(err: GetInfoError) -> Self {
        let header = match &err {
            GetInfoError::Connect(_) => "Connection Error:",
            GetInfoError::Reflection(_) => "Schema Resolution Failed:",
        };
        FormattedString(format!("{}\n\n'{}'", header.red().bold(), err))
    }
}

impl From<serde_json::Error> for FormattedString {
    fn from(err: serde_json::Error) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to render JSON:".red().bold(),
            err
        ))
    }
}

impl From<ServiceList> for FormattedString {
    fn from(ServiceList(services): ServiceList) -> Self {
        if services.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Available Services:\n");
        for svc in services {
            out.push_str(&format!("  - {}\n", svc.green()));
        }
        FormattedString(out.trim_end().to_string())
    }
}
