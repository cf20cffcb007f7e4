//! Template renderer
//!
//! Writes evaluated values back between the literal text, printed the way
//! Jinja prints them: `5000.0`, `None`, `True`.

use crate::ast::{Segment, Template};
use gauge_core::Value;

/// Template renderer
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `template`, taking one value per block in order
    pub fn render(&self, template: &Template, values: &[Value]) -> String {
        let mut values = values.iter();
        let mut output = String::new();
        for segment in &template.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Expr { .. } => {
                    if let Some(value) = values.next() {
                        output.push_str(&self.render_value(value));
                    }
                }
            }
        }
        output
    }

    fn render_value(&self, value: &Value) -> String {
        match value {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
