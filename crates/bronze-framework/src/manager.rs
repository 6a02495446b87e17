//! Property-driven configuration.
//!
//! [`PropertiesManager`] maps property types to configurators. While a tree
//! is built, every command builder and parameter config whose flattened
//! property map carries a bound property type has the matching configurator
//! applied once. This is the only place properties are interpreted; the rest
//! of the framework reads the fields the configurators set.
//!
//! ```rust,ignore
//! struct Cooldown(u64);
//! impl Property for Cooldown {}
//!
//! let mut manager = PropertiesManager::with_builtins();
//! manager.on_command::<Cooldown, _>(|cooldown, builder| {
//!     builder.add_preprocessor(cooldown_preprocessor(cooldown.0));
//! });
//! ```

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::parameter::ParameterConfig;
use crate::preprocessor::{GUILD_ONLY, guild_only};
use crate::property::{
    Contiguous, GuildOnly, Hex, Index, Name, Optional, Persistent, Property, PropertyMap, Strict,
    Width,
};
use crate::tree::CommandBuilder;

type Configure<T> = Arc<dyn Fn(&PropertyMap, &mut T) + Send + Sync>;

struct Binding<T> {
    property: TypeId,
    type_name: &'static str,
    configure: Configure<T>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property,
            type_name: self.type_name,
            configure: Arc::clone(&self.configure),
        }
    }
}

/// Property type to configurator bindings, applied in registration order.
#[derive(Clone, Default)]
pub struct PropertiesManager {
    commands: Vec<Binding<CommandBuilder>>,
    parameters: Vec<Binding<ParameterConfig>>,
}

impl PropertiesManager {
    /// A manager with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager interpreting the built-in properties.
    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        manager
            .on_command::<GuildOnly, _>(|_, builder| {
                if !builder.has_preprocessor(GUILD_ONLY) {
                    builder.add_preprocessor(guild_only());
                }
            })
            .on_command::<Persistent, _>(|_, builder| builder.set_persistent(true));
        manager
            .on_parameter::<Index, _>(|index, config| config.index = Some(index.0))
            .on_parameter::<Width, _>(|width, config| config.width = Some(width.0))
            .on_parameter::<Contiguous, _>(|_, config| config.contiguous = true)
            .on_parameter::<Optional, _>(|_, config| config.optional = true)
            .on_parameter::<Hex, _>(|_, config| config.hex = true)
            .on_parameter::<Strict, _>(|_, config| config.strict = true)
            .on_parameter::<Name, _>(|name, config| config.name = Some(name.0.clone()));
        manager
    }

    /// Binds a configurator to commands carrying `P`, replacing any earlier
    /// command binding for `P`.
    pub fn on_command<P, F>(&mut self, configure: F) -> &mut Self
    where
        P: Property,
        F: Fn(&P, &mut CommandBuilder) + Send + Sync + 'static,
    {
        bind(&mut self.commands, configure);
        self
    }

    /// Binds a configurator to parameters carrying `P`, replacing any earlier
    /// parameter binding for `P`.
    pub fn on_parameter<P, F>(&mut self, configure: F) -> &mut Self
    where
        P: Property,
        F: Fn(&P, &mut ParameterConfig) + Send + Sync + 'static,
    {
        bind(&mut self.parameters, configure);
        self
    }

    pub fn handles_command<P: Property>(&self) -> bool {
        self.commands.iter().any(|b| b.property == TypeId::of::<P>())
    }

    pub fn handles_parameter<P: Property>(&self) -> bool {
        self.parameters.iter().any(|b| b.property == TypeId::of::<P>())
    }

    pub(crate) fn configure_command(&self, properties: &PropertyMap, builder: &mut CommandBuilder) {
        apply(&self.commands, properties, builder);
    }

    pub(crate) fn configure_parameter(
        &self,
        properties: &PropertyMap,
        config: &mut ParameterConfig,
    ) {
        apply(&self.parameters, properties, config);
    }
}

fn bind<T, P, F>(bindings: &mut Vec<Binding<T>>, configure: F)
where
    T: 'static,
    P: Property,
    F: Fn(&P, &mut T) + Send + Sync + 'static,
{
    let binding = Binding {
        property: TypeId::of::<P>(),
        type_name: std::any::type_name::<P>(),
        configure: Arc::new(move |properties: &PropertyMap, target: &mut T| {
            if let Some(property) = properties.get::<P>() {
                configure(property, target);
            }
        }),
    };
    match bindings.iter_mut().find(|b| b.property == binding.property) {
        Some(existing) => *existing = binding,
        None => bindings.push(binding),
    }
}

fn apply<T>(bindings: &[Binding<T>], properties: &PropertyMap, target: &mut T) {
    for binding in bindings {
        (binding.configure)(properties, target);
    }
}

impl fmt::Debug for PropertiesManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertiesManager")
            .field(
                "commands",
                &self.commands.iter().map(|b| b.type_name).collect::<Vec<_>>(),
            )
            .field(
                "parameters",
                &self.parameters.iter().map(|b| b.type_name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
