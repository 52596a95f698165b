use super::catalog::Catalog;
use super::options::QueryOptions;
use super::template::Token;
use std::sync::Arc;
use tracing::warn;

/// Turns a named template plus query options into a backend expression
#[derive(Debug, Clone)]
pub struct Compiler {
    catalog: Arc<Catalog>,
}

impl Compiler {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Compile `name` for `opts`
    ///
    /// Returns an empty string when the name is not part of the catalog
    /// section the options select.
    pub fn compile(&self, name: &str, opts: &QueryOptions) -> String {
        let key = opts.catalog_key();
        let Some(template) = self.catalog.template(key, name) else {
            warn!(metric = %name, catalog = ?key, "unknown metric template");
            return String::new();
        };

        let mut subs = opts.selectors(name).substitutions();
        if let Some(meter) = &opts.meter {
            let hours = meter.window_hours();
            subs.set(Token::Step, format!("{hours}h"))
                .set(Token::Factor, hours.to_string());
        }
        subs.render(template)
    }
}
