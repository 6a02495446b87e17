//! Command registration.
//!
//! Commands are declared with [`CommandBuilder`] and assembled into a
//! [`CommandTree`] by [`CommandTreeBuilder::build`], which validates the whole
//! hierarchy up front. Every failure is a [`BuildError`] and nothing is
//! partially built.
//!
//! ```rust,ignore
//! let tree = CommandTree::builder()
//!     .property(Category("General".into()))
//!     .command(
//!         CommandBuilder::new(["remind", "r"])
//!             .function(remind)
//!             .property(Description("Sets a reminder".into()))
//!             .param(0, ParameterConfig::new().name("in").width(0)),
//!     )
//!     .command(
//!         CommandBuilder::new(["counter"])
//!             .method(Counter::bump)
//!             .class::<Counter>()
//!             .persistent(),
//!     )
//!     .build()?;
//! ```

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use bronze_core::{ParseOptions, TypeRegistry};

use super::{CommandNode, CommandTree, NodeId};
use crate::error::{BoxError, BuildError, BuildResult};
use crate::handler::{FunctionSlot, Handler, HandlerSlot, InstanceSource, Method, MethodSlot};
use crate::help;
use crate::manager::PropertiesManager;
use crate::parameter::{Parameter, ParameterConfig, short_type_name};
use crate::preprocessor::{Preprocessor, PriorityOrder};
use crate::property::{Property, PropertyMap};

// ============================================================================
// CommandBuilder
// ============================================================================

/// Declares one command and its subcommands.
pub struct CommandBuilder {
    keys: Vec<String>,
    handler: Option<Box<dyn HandlerSlot>>,
    source: Option<Box<dyn Any + Send>>,
    persistent: bool,
    preprocessors: Vec<Preprocessor>,
    properties: PropertyMap,
    params: BTreeMap<usize, ParameterConfig>,
    children: Vec<CommandBuilder>,
    help: bool,
}

impl CommandBuilder {
    /// Starts a command answering to `keys`; the first key is the primary
    /// name, the rest are aliases.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            handler: None,
            source: None,
            persistent: false,
            preprocessors: Vec::new(),
            properties: PropertyMap::new(),
            params: BTreeMap::new(),
            children: Vec::new(),
            help: false,
        }
    }

    /// A help command answering to `keys`.
    ///
    /// It renders help for the command named by its arguments, for its
    /// parent command when it has no arguments, or lists the root commands.
    pub fn help_command<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(keys).function(help::show).help()
    }

    /// Uses a plain function as the command body.
    pub fn function<H, A>(mut self, handler: H) -> Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.handler = Some(Box::new(FunctionSlot::new(handler)));
        self
    }

    /// Uses a method as the command body. The instance comes from
    /// [`instance`](Self::instance), [`shared`](Self::shared),
    /// [`supplier`](Self::supplier) or [`class`](Self::class).
    pub fn method<C, M, A>(mut self, method: M) -> Self
    where
        C: Send + Sync + 'static,
        M: Method<C, A>,
        A: 'static,
    {
        self.handler = Some(Box::new(MethodSlot::<C, M, A>::new(method)));
        self
    }

    /// One instance shared by every invocation.
    pub fn instance<C: Send + Sync + 'static>(self, instance: C) -> Self {
        self.shared(Arc::new(instance))
    }

    pub fn shared<C: Send + Sync + 'static>(mut self, instance: Arc<C>) -> Self {
        self.source = Some(Box::new(InstanceSource::shared(instance)));
        self
    }

    /// A fresh instance per invocation, or one lazily created instance when
    /// the command is [`persistent`](Self::persistent).
    pub fn supplier<C, F, E>(mut self, supplier: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn() -> Result<C, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.source = Some(Box::new(InstanceSource::supplier(supplier)));
        self
    }

    /// Instances created with `C::default()`.
    pub fn class<C: Default + Send + Sync + 'static>(mut self) -> Self {
        self.source = Some(Box::new(InstanceSource::<C>::class()));
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    pub fn preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.add_preprocessor(preprocessor);
        self
    }

    pub fn add_preprocessor(&mut self, preprocessor: Preprocessor) {
        self.preprocessors.push(preprocessor);
    }

    pub fn has_preprocessor(&self, id: &str) -> bool {
        self.preprocessors.iter().any(|p| p.id() == id)
    }

    pub fn property<P: Property>(mut self, property: P) -> Self {
        self.properties.insert(property);
        self
    }

    /// Adjusts the handler parameter at `index` (counting from zero,
    /// excluding the invocation argument).
    pub fn param(mut self, index: usize, config: ParameterConfig) -> Self {
        self.params.insert(index, config);
        self
    }

    pub fn child(mut self, child: CommandBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Marks this command as a help command for help-mode resolution.
    pub fn help(mut self) -> Self {
        self.help = true;
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("keys", &self.keys)
            .field("handler", &self.handler.is_some())
            .field("persistent", &self.persistent)
            .field("preprocessors", &self.preprocessors)
            .field("properties", &self.properties)
            .field("params", &self.params)
            .field("children", &self.children)
            .field("help", &self.help)
            .finish()
    }
}

// ============================================================================
// CommandTreeBuilder
// ============================================================================

/// Collects root commands and the build-time collaborators: the type
/// registry, the properties manager and the preprocessor order.
pub struct CommandTreeBuilder {
    registry: TypeRegistry,
    manager: PropertiesManager,
    order: PriorityOrder,
    scope: PropertyMap,
    commands: Vec<CommandBuilder>,
}

impl Default for CommandTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTreeBuilder {
    /// A builder with the built-in parsers and property configurators.
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::with_builtins(),
            manager: PropertiesManager::with_builtins(),
            order: PriorityOrder::default(),
            scope: PropertyMap::new(),
            commands: Vec::new(),
        }
    }

    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// For registering custom parameter types.
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn manager(mut self, manager: PropertiesManager) -> Self {
        self.manager = manager;
        self
    }

    pub fn manager_mut(&mut self) -> &mut PropertiesManager {
        &mut self.manager
    }

    pub fn order(mut self, order: PriorityOrder) -> Self {
        self.order = order;
        self
    }

    /// A property every root command inherits, if inheritable.
    pub fn property<P: Property>(mut self, property: P) -> Self {
        self.scope.insert(property);
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.add(command);
        self
    }

    pub fn add(&mut self, command: CommandBuilder) {
        self.commands.push(command);
    }

    pub fn build(self) -> BuildResult<CommandTree> {
        let Self {
            registry,
            manager,
            order,
            scope,
            commands,
        } = self;
        let mut build = Build {
            registry: &registry,
            manager: &manager,
            order: &order,
            nodes: Vec::new(),
        };

        let mut roots = HashMap::new();
        let mut root_order = Vec::new();
        for command in commands {
            let id = build.node(command, None, "", &scope)?;
            link(&mut roots, &build.nodes[id.0], id, "<root>")?;
            root_order.push(id);
        }

        debug!(commands = build.nodes.len(), roots = root_order.len(), "command tree built");
        Ok(CommandTree {
            nodes: build.nodes,
            roots,
            root_order,
        })
    }
}

impl fmt::Debug for CommandTreeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTreeBuilder")
            .field("registry", &self.registry)
            .field("order", &self.order)
            .field("scope", &self.scope)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

/// Registers every key of `node` in a sibling map.
fn link(
    siblings: &mut HashMap<String, NodeId>,
    node: &CommandNode,
    id: NodeId,
    parent: &str,
) -> BuildResult<()> {
    for key in &node.keys {
        if siblings.insert(key.to_lowercase(), id).is_some() {
            return Err(BuildError::DuplicateKey {
                parent: parent.to_string(),
                key: key.clone(),
            });
        }
    }
    Ok(())
}

struct Build<'b> {
    registry: &'b TypeRegistry,
    manager: &'b PropertiesManager,
    order: &'b PriorityOrder,
    nodes: Vec<CommandNode>,
}

impl Build<'_> {
    fn node(
        &mut self,
        mut builder: CommandBuilder,
        parent: Option<NodeId>,
        parent_path: &str,
        scope: &PropertyMap,
    ) -> BuildResult<NodeId> {
        builder.keys.retain(|key| !key.trim().is_empty());
        let Some(name) = builder.keys.first() else {
            return Err(BuildError::MissingKeys {
                path: join_path(parent_path, "<unnamed>"),
            });
        };
        let path = join_path(parent_path, name);

        let properties = scope.flatten(&builder.properties);
        self.manager.configure_command(&properties, &mut builder);

        let handler = builder.handler.take().ok_or_else(|| BuildError::MissingHandler {
            command: path.clone(),
        })?;
        let parameters = self.parameters(&path, &*handler, &mut builder, &properties)?;
        let invoker = handler
            .into_invoker(builder.source.take(), builder.persistent)
            .map_err(|instance_type| BuildError::NoInstanceSource {
                command: path.clone(),
                instance_type,
            })?;

        let mut preprocessors = std::mem::take(&mut builder.preprocessors);
        self.order.sort(&mut preprocessors);

        let id = NodeId(self.nodes.len());
        self.nodes.push(CommandNode {
            keys: std::mem::take(&mut builder.keys),
            parent,
            children: HashMap::new(),
            child_order: Vec::new(),
            parameters,
            invoker,
            preprocessors,
            properties,
            help: builder.help,
        });

        let mut children = HashMap::new();
        let mut child_order = Vec::new();
        for child in builder.children {
            let scope = self.nodes[id.0].properties.clone();
            let child_id = self.node(child, Some(id), &path, &scope)?;
            link(&mut children, &self.nodes[child_id.0], child_id, &path)?;
            child_order.push(child_id);
        }
        let node = &mut self.nodes[id.0];
        node.children = children;
        node.child_order = child_order;
        Ok(id)
    }

    fn parameters(
        &self,
        path: &str,
        handler: &dyn HandlerSlot,
        builder: &mut CommandBuilder,
        properties: &PropertyMap,
    ) -> BuildResult<Vec<Parameter>> {
        let specs = handler.parameters();
        if let Some((&index, _)) = builder.params.range(specs.len()..).next() {
            return Err(BuildError::invalid_parameter(
                path,
                index,
                format!("handler takes {} parameters", specs.len()),
            ));
        }

        let mut parameters = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let mut config = builder.params.remove(&index).unwrap_or_default();
            let param_properties = properties.flatten(&config.properties);
            self.manager.configure_parameter(&param_properties, &mut config);

            let parser = self.registry.erased_by_id(spec.value_type).ok_or_else(|| {
                BuildError::NoParser {
                    command: path.to_string(),
                    index,
                    type_name: spec.type_name,
                }
            })?;
            if config.optional && !spec.nullable {
                return Err(BuildError::invalid_parameter(
                    path,
                    index,
                    "only Option<Arg<T>>, Args<T> and ArgStream<T> can be optional",
                ));
            }

            let name = config
                .name
                .take()
                .unwrap_or_else(|| short_type_name(spec.type_name).to_lowercase());
            let mut parameter = Parameter::new(name, parser)
                .with_collection(spec.collection)
                .with_width(config.width.unwrap_or(1))
                .with_options(ParseOptions {
                    hex: config.hex,
                    strict: config.strict,
                })
                .with_properties(param_properties);
            if let Some(index) = config.index {
                parameter = parameter.with_index(index);
            }
            if config.contiguous {
                parameter = parameter.contiguous();
            }
            if config.optional || !spec.required {
                parameter = parameter.optional();
            }
            if let Some(fallback) = config.fallback {
                parameter = parameter.with_fallback(fallback);
            }
            parameters.push(parameter);
        }
        Ok(parameters)
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent} {name}")
    }
}
