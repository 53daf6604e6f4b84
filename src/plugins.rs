use crate::session::PluginPort;

/// A loadable extension. Only the three lifecycle call-ins are part of the
/// session contract; anything else a plugin does is its own business.
pub(crate) trait Plugin {
    fn name(&self) -> &'static str;
    fn on_start(&mut self) {}
    fn on_tick(&mut self) {}
    fn on_shutdown(&mut self) {}
}

pub(crate) struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
    pub(crate) fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, plugin: Box<dyn Plugin>) {
        tracing::debug!(plugin = plugin.name(), "plugin registered");
        self.plugins.push(plugin);
    }
}

impl PluginPort for PluginManager {
    fn on_start(&mut self) {
        for plugin in &mut self.plugins {
            tracing::debug!(plugin = plugin.name(), "plugin start");
            plugin.on_start();
        }
    }

    fn on_tick(&mut self) {
        for plugin in &mut self.plugins {
            plugin.on_tick();
        }
    }

    fn on_shutdown(&mut self) {
        // Reverse of start order.
        for plugin in self.plugins.iter_mut().rev() {
            tracing::debug!(plugin = plugin.name(), "plugin shutdown");
            plugin.on_shutdown();
        }
    }
}
