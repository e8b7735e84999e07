//! Template rendering
//!
//! Tera templates loaded from a directory at startup. Base templates are
//! registered first so `{% extends %}` chains resolve, mirroring how the
//! templates directory is laid out (`base.html`, `blog/*.html`,
//! `registration/*.html`).

use anyhow::{Context as AnyhowContext, Result};
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

use crate::models::User;

/// Loaded template set
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Load every `.html` file under `dir`, named by its path relative to
    /// `dir` with forward slashes (`blog/index.html`).
    pub fn load(dir: &Path) -> Result<Self> {
        let mut templates: Vec<(String, String)> = Vec::new();
        collect_templates(dir, dir, &mut templates)
            .with_context(|| format!("Failed to read templates from {:?}", dir))?;

        // Base templates first so inheritance chains build
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in &templates {
            tera.add_raw_template(name, content)
                .with_context(|| format!("Failed to add template {}", name))?;
        }
        tera.build_inheritance_chains()
            .context("Failed to build template inheritance")?;

        Ok(Self { tera })
    }

    /// Render a template with the given context
    pub fn render(&self, name: &str, context: &Context) -> Result<String, tera::Error> {
        self.tera.render(name, context)
    }
}

fn collect_templates(
    base: &Path,
    current: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    if !current.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_templates(base, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let name = path
                .strip_prefix(base)
                .context("Failed to get relative template path")?
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((name, content));
        }
    }

    Ok(())
}

/// Context shared by every page: the signed-in user, when there is one
pub fn base_context(user: Option<&User>) -> Context {
    let mut ctx = Context::new();
    if let Some(user) = user {
        ctx.insert("user", user);
    }
    ctx
}
