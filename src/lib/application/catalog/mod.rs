//! Tool catalog advertised to the model.
//!
//! The catalog is rebuilt from scratch every time the set of live sessions
//! changes. Declarations for the model are recomputed on every request so a
//! rebuild is always visible to the next model call.

mod schema;

pub use schema::{SchemaError, translate, validate_arguments};

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A tool as reported by a tool server's `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Name of the session that serves this tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Provider-form parameter schema.
    pub input_schema: Value,
}

/// Model-form function declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub descriptor: ToolDescriptor,
    /// Model-form schema computed when the catalog was built; used for
    /// argument validation at dispatch time.
    pub model_schema: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Builds a catalog. Duplicate names resolve last-write-wins; tools
    /// whose schema cannot be translated are left out.
    pub fn build(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let mut catalog = ToolCatalog::default();
        for descriptor in descriptors {
            let model_schema = match translate(&descriptor.input_schema) {
                Ok(schema) => schema,
                Err(err) => {
                    warn!(
                        tool = %descriptor.name,
                        server = descriptor.server.as_deref().unwrap_or("-"),
                        %err,
                        "Excluding tool with untranslatable schema"
                    );
                    continue;
                }
            };

            let entry = CatalogEntry {
                descriptor,
                model_schema,
            };
            match catalog.index.get(&entry.descriptor.name).copied() {
                Some(position) => {
                    warn!(
                        tool = %entry.descriptor.name,
                        previous = catalog.entries[position].descriptor.server.as_deref().unwrap_or("-"),
                        replacement = entry.descriptor.server.as_deref().unwrap_or("-"),
                        "Duplicate tool name; later definition wins"
                    );
                    catalog.entries[position] = entry;
                }
                None => {
                    catalog
                        .index
                        .insert(entry.descriptor.name.clone(), catalog.entries.len());
                    catalog.entries.push(entry);
                }
            }
        }
        debug!(tools = catalog.entries.len(), "Tool catalog built");
        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.descriptor.name.as_str())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Declarations in the shape function-calling backends expect.
    pub fn translated_for_model(&self) -> Vec<FunctionDeclaration> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let parameters = translate(&entry.descriptor.input_schema).ok()?;
                Some(FunctionDeclaration {
                    name: entry.descriptor.name.clone(),
                    description: entry.descriptor.description.clone(),
                    parameters,
                })
            })
            .collect()
    }
}
