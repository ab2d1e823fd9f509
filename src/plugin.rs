//! Registration bundle for dependency-injection containers.
//!
//! Purely declarative: the bundle lists what a container should register,
//! under which name, and what it must inject. Nothing here builds a driver.

/// How a container should register one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// Name the module is registered under.
    pub name: &'static str,
    /// Whether the container calls the module as a factory instead of
    /// constructing it.
    pub factory: bool,
    /// Names of the collaborators passed to the constructor, in order.
    pub deps: &'static [&'static str],
}

/// Registration of [`HttpDriver`](crate::HttpDriver): constructed once, with
/// the error factory as its only dependency.
pub const HTTP_DRIVER: Injection = Injection {
    name: "$httpDriver",
    factory: false,
    deps: &["StoreError"],
};

/// One exported module of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleEntry {
    pub export: &'static str,
    pub injection: Injection,
}

/// A set of modules handed to a container in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plugin {
    modules: Vec<ModuleEntry>,
}

impl Plugin {
    pub fn new(modules: Vec<ModuleEntry>) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    /// Looks a module up by its registration name.
    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.iter().find(|m| m.injection.name == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// The plugin exporting the HTTP driver.
pub fn http() -> Plugin {
    Plugin::new(vec![ModuleEntry {
        export: "HttpDriver",
        injection: HTTP_DRIVER,
    }])
}
