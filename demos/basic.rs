//! A plugin host in miniature.
//!
//! The host registers framework building blocks, a plugin overrides one of
//! them, and soft errors raised while the plugin runs are intercepted and
//! printed with the plugin's label.
//!
//! Run with `PLUGINBASE_MARKUP=ansi` to see the emphasized labels.

use pluginbase::{
    interception,
    prelude::*,
    resolver::{RegistrationError, ResolutionError},
};

const FRAMEWORK: &str = "app.framework";

trait Greeter {
    fn greet(&self, name: &str) -> String;
}

struct FrameworkGreeter;

impl Greeter for FrameworkGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}.")
    }
}

struct Farewell;

impl Greeter for Farewell {
    fn greet(&self, name: &str) -> String {
        format!("Goodbye, {name}.")
    }
}

struct Cheerful {
    exclamations: usize,
}

impl Greeter for Cheerful {
    fn greet(&self, name: &str) -> String {
        format!("Hi {name}{}", "!".repeat(self.exclamations))
    }
}

struct DemoPlugin;

impl Owner for DemoPlugin {
    const NAME: &'static str = "Demo";
    const SCOPE: &'static str = "app.plugins.demo";
}

fn register_building_blocks(
    registry: &TypeRegistry<dyn Greeter, usize>,
) -> Result<(), RegistrationError> {
    registry.register(FRAMEWORK, "Greeter", |_| -> Box<dyn Greeter> {
        Box::new(FrameworkGreeter)
    })?;
    registry.register(Scope::Global, "Farewell", |_| -> Box<dyn Greeter> {
        Box::new(Farewell)
    })?;
    registry.register(DemoPlugin::SCOPE, "Greeter", |exclamations| -> Box<dyn Greeter> {
        Box::new(Cheerful { exclamations })
    })?;
    Ok(())
}

fn run_plugin(registry: &TypeRegistry<dyn Greeter, usize>) -> Result<(), ResolutionError> {
    let _interception = interception::intercept::<DemoPlugin>();
    let chain = ScopeChain::for_owner::<DemoPlugin>(FRAMEWORK);

    println!("{}", registry.resolve("Greeter", &chain, 3)?.greet("world"));
    println!("{}", registry.resolve("Farewell", &chain, 0)?.greet("world"));

    interception::trigger(&ErrorEvent::from_owner::<DemoPlugin>(
        Severity::Notice,
        "greeting delivered",
    ));
    interception::trigger(&ErrorEvent::from_owner::<DemoPlugin>(
        Severity::Deprecated,
        "the Farewell building block is going away",
    ));

    registry.resolve("Translator", &chain, 0).map(|_| ())
}

fn main() {
    let registry = TypeRegistry::new();
    if let Err(error) = register_building_blocks(&registry) {
        eprintln!("{error}");
        return;
    }

    registry.debug_factories(|factory| println!("{factory}"));

    match run_plugin(&registry) {
        Ok(()) => println!("plugin finished"),
        Err(error) => println!("plugin stopped: {error}"),
    }

    println!(
        "interceptions left after the plugin: {}",
        interception::global().depth()
    );
}
