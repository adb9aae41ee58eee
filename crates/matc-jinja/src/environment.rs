//! Jinja environment setup for query rendering

use crate::context::RunContext;
use crate::error::JinjaResult;
use crate::filters;
use minijinja::{Environment, UndefinedBehavior};

/// Anything that can expand template placeholders in a query.
pub trait Renderer: Send + Sync {
    /// Render a template string
    fn render(&self, template: &str) -> JinjaResult<String>;

    /// Renderer for the same run with `this` bound to `asset_name`
    fn clone_for_asset(&self, asset_name: &str) -> Box<dyn Renderer>;
}

/// Strict Jinja renderer bound to one [`RunContext`].
///
/// Referencing a variable the context does not define is a render error
/// rather than an empty string.
pub struct QueryRenderer {
    env: Environment<'static>,
    context: RunContext,
}

impl QueryRenderer {
    /// Create a renderer for the given run
    pub fn new(context: RunContext) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        filters::register(&mut env);
        Self { env, context }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }
}

impl Renderer for QueryRenderer {
    fn render(&self, template: &str) -> JinjaResult<String> {
        let rendered = self
            .env
            .render_str(template, self.context.to_template_value())?;
        Ok(rendered)
    }

    fn clone_for_asset(&self, asset_name: &str) -> Box<dyn Renderer> {
        Box::new(Self::new(self.context.for_asset(asset_name)))
    }
}

impl Default for QueryRenderer {
    fn default() -> Self {
        Self::new(RunContext::yesterday(""))
    }
}

#[cfg(test)]
#[path = "environment_test.rs"]
mod tests;
