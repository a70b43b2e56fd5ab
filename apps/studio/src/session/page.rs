//! HTML rendering of a `View`.

use minijinja::Environment;

use crate::errors::AppError;
use crate::session::View;

const PAGE_TEMPLATE: &str = include_str!("../../templates/page.html");

/// Holds the compiled page template. `.html` templates are auto-escaped.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, AppError> {
        let mut env = Environment::new();
        env.add_template("page.html", PAGE_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, view: &View) -> Result<String, AppError> {
        Ok(self.env.get_template("page.html")?.render(view)?)
    }
}
