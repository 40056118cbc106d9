//! Watchers
//!
//! Watch declarations are grouped by handler. The sources of a handler are
//! combined with combine-latest semantics: the handler fires once every source
//! has emitted, then once per emission of any source, with the latest value of
//! each. Subscriptions are closed when the component unmounts.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use halcyon_reactive::{AnySignal, Observer, combine_latest};
use serde_json::Value;

use crate::component::Component;
use crate::descriptor::{ComponentDescriptor, HandlerDecl, WatchDecl};
use crate::error::PluginExecutionError;
use crate::phase::Phase;
use crate::plugin::{DecoratorPlugin, PluginContext, PluginFlow};

use super::WATCH_PLUGIN_ID;

/// Latest value of one watched source.
#[derive(Clone)]
pub struct WatchEntry {
	property: String,
	path: Option<String>,
	value: Rc<dyn Any>,
	json: Option<Value>,
}

impl WatchEntry {
	/// Watched property.
	pub fn property(&self) -> &str {
		&self.property
	}

	/// Nested path, if the watch selected one.
	pub fn path(&self) -> Option<&str> {
		self.path.as_deref()
	}

	/// The raw value.
	pub fn value(&self) -> &Rc<dyn Any> {
		&self.value
	}

	/// The value, if it has type `T`.
	pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
		Rc::clone(&self.value).downcast::<T>().ok()
	}

	/// JSON view of the value, when the property carries one.
	pub fn json(&self) -> Option<&Value> {
		self.json.as_ref()
	}
}

impl std::fmt::Debug for WatchEntry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WatchEntry")
			.field("property", &self.property)
			.field("path", &self.path)
			.field("json", &self.json)
			.finish_non_exhaustive()
	}
}

/// Values handed to a watch handler, in declaration order of its watches.
#[derive(Debug, Clone, Default)]
pub struct WatchValues {
	entries: Vec<WatchEntry>,
}

impl WatchValues {
	/// All entries.
	pub fn entries(&self) -> &[WatchEntry] {
		&self.entries
	}

	/// Number of watched sources.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if no source is watched.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Value of source `index`, if it has type `T`.
	pub fn get<T: 'static>(&self, index: usize) -> Option<Rc<T>> {
		self.entries.get(index)?.downcast::<T>()
	}

	/// JSON view of source `index`.
	pub fn json(&self, index: usize) -> Option<&Value> {
		self.entries.get(index)?.json()
	}

	/// First entry watching `property`.
	pub fn by_property(&self, property: &str) -> Option<&WatchEntry> {
		self.entries.iter().find(|entry| entry.property == property)
	}
}

struct Source {
	decl: WatchDecl,
	signal: AnySignal,
}

/// Subscribes watch handlers to their properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct WatchPlugin;

impl<C: Component> DecoratorPlugin<C> for WatchPlugin {
	fn id(&self) -> &str {
		WATCH_PLUGIN_ID
	}

	fn phase(&self) -> Phase {
		Phase::AfterMount
	}

	fn execute(&self, cx: &PluginContext<'_, C>) -> Result<PluginFlow, PluginExecutionError> {
		for (handler, watches) in group_by_handler(cx.descriptor()) {
			match sources(cx, &watches) {
				Ok(sources) => subscribe(cx, handler, sources),
				Err(error) => cx.error_sink().report(error),
			}
		}
		Ok(PluginFlow::Continue)
	}
}

fn group_by_handler<C: Component>(
	descriptor: &ComponentDescriptor<C>,
) -> Vec<(&HandlerDecl<C>, Vec<&WatchDecl>)> {
	let mut groups: Vec<(&HandlerDecl<C>, Vec<&WatchDecl>)> = Vec::new();
	for watch in descriptor.watches() {
		if let Some((_, group)) = groups
			.iter_mut()
			.find(|(handler, _)| handler.name() == watch.handler())
		{
			group.push(watch);
		} else if let Some(handler) = descriptor.handler(watch.handler()) {
			groups.push((handler, vec![watch]));
		}
	}
	groups
}

fn sources<C: Component>(
	cx: &PluginContext<'_, C>,
	watches: &[&WatchDecl],
) -> Result<Vec<Source>, PluginExecutionError> {
	let component = cx.component();
	watches
		.iter()
		.map(|watch| {
			let property = cx.descriptor().property(watch.property()).ok_or_else(|| {
				PluginExecutionError::new(
					WATCH_PLUGIN_ID,
					cx.context().name(),
					format!("unknown property '{}'", watch.property()),
				)
			})?;
			let signal = (property.read)(&**component);
			let signal = match watch.path() {
				Some(path) => signal.select(path).map_err(|error| {
					PluginExecutionError::new(
						WATCH_PLUGIN_ID,
						cx.context().name(),
						format!("cannot watch '{}.{path}': {error}", watch.property()),
					)
				})?,
				None => signal,
			};
			Ok(Source {
				decl: (*watch).clone(),
				signal,
			})
		})
		.collect()
}

fn subscribe<C: Component>(cx: &PluginContext<'_, C>, handler: &HandlerDecl<C>, sources: Vec<Source>) {
	let combined = combine_latest(sources.iter().map(|source| source.signal.values().clone()));
	let establishing = Rc::new(Cell::new(true));
	let skip_initial = handler.skip_initial();
	let call = Rc::clone(&handler.call);
	let label = format!("watch handler '{}'", handler.name());
	let sink = cx.error_sink();

	let observer = Observer::new({
		let establishing = Rc::clone(&establishing);
		move |values: &Vec<Rc<dyn Any>>| {
			if skip_initial && establishing.get() {
				return;
			}
			let values = WatchValues {
				entries: sources
					.iter()
					.zip(values)
					.map(|(source, value)| WatchEntry {
						property: source.decl.property().to_string(),
						path: source.decl.path().map(str::to_string),
						value: Rc::clone(value),
						json: source.signal.to_json(&**value),
					})
					.collect(),
			};
			sink.run(&label, |component| call(component, &values));
		}
	});

	let subscription = combined.subscribe_with(observer);
	establishing.set(false);
	tracing::debug!(
		component = cx.context().name(),
		handler = handler.name(),
		"watch established"
	);
	cx.context().track(subscription);
}
