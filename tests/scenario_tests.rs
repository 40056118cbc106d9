//! End-to-end scenarios through the `halcyon` facade.

#![cfg(feature = "full")]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use halcyon::di::{
	Arguments, DiError, DiResult, ErasedToken, Injectable, Injector, Provider, Token, provide_as,
};
use halcyon::lifecycle::{
	CanActivate, Component, ComponentContext, ComponentDescriptor, ComponentHost, Diagnostics,
	GuardResult, HookError, LifecycleError, LifecycleManager, MemoryDiagnostics, RenderState,
	Severity, WatchValues, diagnostics_token,
};
use halcyon::reactive::{MemoryAdapter, PersistenceAdapter, Signal};
use halcyon::settings::Settings;
use rstest::{fixture, rstest};
use serde_json::json;

trait Logger {
	fn log(&self, message: &str);
}

#[derive(Default)]
struct RecordingLogger {
	lines: RefCell<Vec<String>>,
}

impl Logger for RecordingLogger {
	fn log(&self, message: &str) {
		self.lines.borrow_mut().push(message.to_string());
	}
}

impl Injectable for RecordingLogger {
	fn construct(_args: &mut Arguments<'_>) -> DiResult<Self> {
		Ok(Self::default())
	}
}

provide_as!(RecordingLogger => dyn Logger);

struct GreetingService {
	logger: Rc<dyn Logger>,
}

impl GreetingService {
	fn greet(&self, name: &str) -> String {
		let greeting = format!("Hello, {name}!");
		self.logger.log(&greeting);
		greeting
	}
}

impl Injectable for GreetingService {
	fn dependencies() -> Vec<ErasedToken> {
		vec![Token::<dyn Logger>::of().erased()]
	}

	fn construct(args: &mut Arguments<'_>) -> DiResult<Self> {
		Ok(Self {
			logger: args.next()?,
		})
	}
}

struct Greeter {
	service: Rc<GreetingService>,
	name: Signal<String>,
	greeting: RefCell<String>,
}

impl Component for Greeter {
	type View = String;

	fn render(&self) -> String {
		self.greeting.borrow().clone()
	}

	fn render_loading(&self) -> Option<String> {
		Some("...".to_string())
	}
}

#[fixture]
fn root() -> Injector {
	Injector::builder()
		.name("root")
		.provider(Provider::class_as::<dyn Logger, RecordingLogger>(&Token::of()))
		.provider(Provider::class(&Token::<GreetingService>::of()))
		.build()
}

fn greeter_descriptor() -> ComponentDescriptor<Greeter> {
	ComponentDescriptor::<Greeter>::builder("Greeter")
		.property("name", |greeter: &Greeter| greeter.name.erase_json())
		.handler("greet", |greeter: &Greeter, values: &WatchValues| {
			let name = values.get::<String>(0).unwrap_or_default();
			*greeter.greeting.borrow_mut() = greeter.service.greet(&name);
			Ok(())
		})
		.watch("name", "greet")
		.build()
		.unwrap()
}

fn create_greeter(
	manager: &LifecycleManager<Greeter>,
	parent: &Injector,
) -> ComponentHost<Greeter> {
	manager
		.create(&Rc::new(greeter_descriptor()), Some(parent), |cx| {
			Ok(Greeter {
				service: cx.inject(&Token::of())?,
				name: Signal::new("Ada".to_string()),
				greeting: RefCell::new(String::new()),
			})
		})
		.unwrap()
}

#[rstest]
fn test_logger_service_scenario(root: Injector) {
	// Arrange
	let manager = LifecycleManager::with_defaults();
	let host = create_greeter(&manager, &root);

	// Act
	host.mount();
	host.component().name.set("Grace".to_string());

	// Assert
	assert_eq!(host.view().as_deref(), Some("Hello, Grace!"));
	let logger = root.get(&Token::<dyn Logger>::of(), None).unwrap();
	assert!(Rc::ptr_eq(&host.component().service.logger, &logger));
	let service = root.get(&Token::<GreetingService>::of(), None).unwrap();
	assert!(Rc::ptr_eq(&service, &host.component().service));
}

#[rstest]
fn test_missing_service_fails_creation() {
	let manager = LifecycleManager::<Greeter>::with_defaults();
	let empty = Injector::builder().build();

	let err = manager
		.create(&Rc::new(greeter_descriptor()), Some(&empty), |cx| {
			Ok(Greeter {
				service: cx.inject(&Token::of())?,
				name: Signal::new(String::new()),
				greeting: RefCell::new(String::new()),
			})
		})
		.unwrap_err();

	assert!(matches!(
		err,
		LifecycleError::Creation {
			source: DiError::ProviderNotFound { .. },
			..
		}
	));
}

struct SlowDeny;

impl CanActivate for SlowDeny {
	fn can_activate(&self, _context: &ComponentContext) -> GuardResult {
		GuardResult::deferred(async {
			tokio::time::sleep(Duration::from_millis(10)).await;
			false
		})
	}
}

#[rstest]
#[tokio::test]
async fn test_async_false_guard_falls_back(root: Injector) {
	// Arrange
	let guard: Token<dyn CanActivate> = Token::new("SlowDeny");
	let diagnostics = Rc::new(MemoryDiagnostics::new());
	let parent = root
		.child()
		.provider(Provider::value_rc(&guard, Rc::new(SlowDeny) as Rc<dyn CanActivate>))
		.provider(Provider::value_rc(
			&diagnostics_token(),
			Rc::clone(&diagnostics) as Rc<dyn Diagnostics>,
		))
		.build();
	let descriptor = Rc::new(
		ComponentDescriptor::<Greeter>::builder("Greeter")
			.guard_with_fallback(guard, |_: &Greeter| "please sign in".to_string())
			.build()
			.unwrap(),
	);
	let manager = LifecycleManager::with_defaults();
	let host = manager
		.create(&descriptor, Some(&parent), |cx| {
			Ok(Greeter {
				service: cx.inject(&Token::of())?,
				name: Signal::new("Ada".to_string()),
				greeting: RefCell::new("welcome".to_string()),
			})
		})
		.unwrap();
	let local = tokio::task::LocalSet::new();

	// Act
	let while_pending = local
		.run_until(async {
			host.mount();
			let view = host.view();
			tokio::time::sleep(Duration::from_millis(100)).await;
			view
		})
		.await;

	// Assert
	assert_eq!(while_pending.as_deref(), Some("..."));
	assert_eq!(host.render_state(), RenderState::Blocked { guard: 0 });
	assert_eq!(host.view().as_deref(), Some("please sign in"));
	assert!(!host.context().mounted().is_initialized());
	assert_eq!(diagnostics.count(Severity::Info), 1);
}

#[rstest]
fn test_component_state_persists_until_unmount(root: Injector) {
	// Arrange
	let adapter = MemoryAdapter::new();
	adapter.set_external("greeter.name", json!("Linus"));
	let manager = LifecycleManager::with_defaults();
	let host = create_greeter(&manager, &root);
	adapter
		.link("greeter.name", &host.component().name, host.context().unmount())
		.unwrap();

	// Act
	host.mount();
	let restored = host.view();
	host.component().name.set("Barbara".to_string());
	let stored = adapter.get("greeter.name");
	host.unmount();
	host.component().name.set("Ken".to_string());

	// Assert
	assert_eq!(restored.as_deref(), Some("Hello, Linus!"));
	assert_eq!(stored, Some(json!("Barbara")));
	assert!(adapter.linked_keys().is_empty());
	assert_eq!(adapter.get("greeter.name"), Some(json!("Barbara")));
}

#[rstest]
fn test_settings_configure_manager(root: Injector) {
	// Arrange
	let settings = Settings::from_toml_str(
		r#"
		[lifecycle]
		forward_errors_to_component = false
		diagnostics_level = "error"
		"#,
	)
	.unwrap();
	let diagnostics = Rc::new(MemoryDiagnostics::new());
	let manager = LifecycleManager::with_defaults()
		.with_config(settings.lifecycle_config())
		.with_diagnostics(Rc::clone(&diagnostics) as Rc<dyn Diagnostics>);
	let descriptor = Rc::new(
		ComponentDescriptor::<Greeter>::builder("Greeter")
			.mount("explode", |_: &Greeter, _: &Rc<ComponentContext>| {
				Err(HookError::new("boom"))
			})
			.build()
			.unwrap(),
	);

	// Act
	let host = manager
		.create(&descriptor, Some(&root), |cx| {
			Ok(Greeter {
				service: cx.inject(&Token::of())?,
				name: Signal::new(String::new()),
				greeting: RefCell::new("ok".to_string()),
			})
		})
		.unwrap();
	host.mount();

	// Assert
	assert_eq!(manager.config().diagnostics_level, Severity::Error);
	assert_eq!(diagnostics.count(Severity::Error), 1);
	assert_eq!(host.view().as_deref(), Some("ok"));
}
