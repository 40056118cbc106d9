//! Diagnostics sink
//!
//! Plugin failures and lifecycle warnings go through one injectable
//! [`Diagnostics`] implementation. The host resolves [`diagnostics_token`] from
//! the component injector and falls back to the manager's default, a
//! [`TracingDiagnostics`].

use std::cell::RefCell;
use std::fmt;

use halcyon_di::Token;
use serde::{Deserialize, Serialize};

/// Report severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	/// Detailed progress.
	Debug,
	/// Notable events.
	Info,
	/// Recoverable problems.
	Warn,
	/// Failures.
	Error,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Severity::Debug => "debug",
			Severity::Info => "info",
			Severity::Warn => "warn",
			Severity::Error => "error",
		})
	}
}

/// One diagnostic report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
	/// Severity of the report.
	pub severity: Severity,
	/// Component the report is about.
	pub component: String,
	/// Plugin that produced the report, if any.
	pub plugin: Option<String>,
	/// Human readable description.
	pub message: String,
}

impl Report {
	/// Creates a report.
	pub fn new(severity: Severity, component: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			severity,
			component: component.into(),
			plugin: None,
			message: message.into(),
		}
	}

	/// Attributes the report to a plugin.
	pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
		self.plugin = Some(plugin.into());
		self
	}
}

/// Receiver of diagnostic reports.
pub trait Diagnostics {
	/// Handles one report.
	fn report(&self, report: &Report);
}

/// Token under which a component injector may provide its own sink.
pub fn diagnostics_token() -> Token<dyn Diagnostics> {
	Token::of()
}

/// Forwards reports to `tracing`, dropping those below a minimum severity.
#[derive(Debug, Clone, Copy)]
pub struct TracingDiagnostics {
	min_severity: Severity,
}

impl TracingDiagnostics {
	/// Creates a sink that drops reports below `min_severity`.
	pub fn new(min_severity: Severity) -> Self {
		Self { min_severity }
	}
}

impl Default for TracingDiagnostics {
	fn default() -> Self {
		Self::new(Severity::Warn)
	}
}

impl Diagnostics for TracingDiagnostics {
	fn report(&self, report: &Report) {
		if report.severity < self.min_severity {
			return;
		}
		let plugin = report.plugin.as_deref().unwrap_or("-");
		match report.severity {
			Severity::Debug => {
				tracing::debug!(component = %report.component, plugin, "{}", report.message)
			}
			Severity::Info => {
				tracing::info!(component = %report.component, plugin, "{}", report.message)
			}
			Severity::Warn => {
				tracing::warn!(component = %report.component, plugin, "{}", report.message)
			}
			Severity::Error => {
				tracing::error!(component = %report.component, plugin, "{}", report.message)
			}
		}
	}
}

/// Records reports in memory.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
	reports: RefCell<Vec<Report>>,
}

impl MemoryDiagnostics {
	/// Creates an empty recorder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Every report received so far.
	pub fn reports(&self) -> Vec<Report> {
		self.reports.borrow().clone()
	}

	/// Number of reports with exactly `severity`.
	pub fn count(&self, severity: Severity) -> usize {
		self.reports
			.borrow()
			.iter()
			.filter(|report| report.severity == severity)
			.count()
	}

	/// Forgets recorded reports.
	pub fn clear(&self) {
		self.reports.borrow_mut().clear();
	}
}

impl Diagnostics for MemoryDiagnostics {
	fn report(&self, report: &Report) {
		self.reports.borrow_mut().push(report.clone());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use halcyon_di::{Injector, Provider};
	use rstest::rstest;
	use std::rc::Rc;

	#[rstest]
	fn test_memory_diagnostics_records() {
		let sink = MemoryDiagnostics::new();

		sink.report(&Report::new(Severity::Error, "Clock", "tick failed").with_plugin("mount"));
		sink.report(&Report::new(Severity::Warn, "Clock", "slow"));

		assert_eq!(sink.count(Severity::Error), 1);
		assert_eq!(sink.reports()[0].plugin.as_deref(), Some("mount"));
		sink.clear();
		assert!(sink.reports().is_empty());
	}

	#[rstest]
	fn test_severity_ordering_and_serde() {
		assert!(Severity::Debug < Severity::Error);
		assert_eq!(serde_json::to_string(&Severity::Warn).unwrap(), "\"warn\"");
		assert_eq!(
			serde_json::from_str::<Severity>("\"info\"").unwrap(),
			Severity::Info
		);
	}

	#[rstest]
	fn test_diagnostics_token_resolves_custom_sink() {
		let sink = Rc::new(MemoryDiagnostics::new());
		let injector = Injector::new([Provider::value_rc(
			&diagnostics_token(),
			Rc::clone(&sink) as Rc<dyn Diagnostics>,
		)]);

		let resolved = injector.get(&diagnostics_token(), None).unwrap();
		resolved.report(&Report::new(Severity::Info, "App", "hello"));

		assert_eq!(sink.count(Severity::Info), 1);
	}
}
