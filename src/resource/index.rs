//! # Resource Index
//!
//! Registry of bound resources, built once at startup and shared read-only.
//!
//! Sub-resources hang below a parent and are addressed as
//! `/parent/{pid}/child[/{id}]`. Each one names the field of its own schema
//! that stores the parent id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::schema::{FieldKind, Schema, SchemaError};

use super::conf::Conf;
use super::storer::Storer;

/// Result type for binding
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised while binding resources
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("invalid resource name: {0:?}")]
    InvalidName(String),

    #[error("resource already bound: {0}")]
    DuplicateResource(String),

    #[error("resource {resource}: {source}")]
    Schema {
        resource: String,
        #[source]
        source: SchemaError,
    },

    #[error("resource {resource}: parent field {field} is not declared")]
    UnknownParentField { resource: String, field: String },

    #[error("resource {resource}: default sort field {field} is not sortable")]
    InvalidDefaultSort { resource: String, field: String },
}

/// Binding of a schema, an optional storer and a configuration
pub struct Resource {
    name: String,
    schema: Schema,
    storer: Option<Arc<dyn Storer>>,
    conf: Conf,
    parent_field: Option<String>,
    children: BTreeMap<String, Resource>,
}

impl Resource {
    /// Compiles the schema and checks the configuration against it.
    ///
    /// A resource without a storer is valid; every request to it answers 501.
    pub fn bind(
        name: impl Into<String>,
        schema: Schema,
        storer: Option<Arc<dyn Storer>>,
        conf: Conf,
    ) -> IndexResult<Self> {
        let name = name.into();
        if name.is_empty() || name.contains('/') || name.starts_with('$') {
            return Err(IndexError::InvalidName(name));
        }
        let schema = schema.compile().map_err(|source| IndexError::Schema {
            resource: name.clone(),
            source,
        })?;
        for field in conf.default_sort.fields() {
            if !schema.get(&field.name).is_some_and(|def| def.sortable) {
                return Err(IndexError::InvalidDefaultSort {
                    resource: name,
                    field: field.name.clone(),
                });
            }
        }
        Ok(Self {
            name,
            schema,
            storer,
            conf,
            parent_field: None,
            children: BTreeMap::new(),
        })
    }

    /// Attaches `child` below this resource.
    ///
    /// `parent_field` is the child field that stores this resource's ids.
    pub fn with_sub_resource(
        mut self,
        parent_field: impl Into<String>,
        mut child: Resource,
    ) -> IndexResult<Self> {
        let parent_field = parent_field.into();
        if child.schema.get(&parent_field).is_none() {
            return Err(IndexError::UnknownParentField {
                resource: child.name,
                field: parent_field,
            });
        }
        if self.children.contains_key(&child.name) {
            return Err(IndexError::DuplicateResource(format!(
                "{}/{}",
                self.name, child.name
            )));
        }
        child.parent_field = Some(parent_field);
        self.children.insert(child.name.clone(), child);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn conf(&self) -> &Conf {
        &self.conf
    }

    pub fn storer(&self) -> Option<&Arc<dyn Storer>> {
        self.storer.as_ref()
    }

    /// Field holding the parent id, for sub-resources
    pub fn parent_field(&self) -> Option<&str> {
        self.parent_field.as_deref()
    }

    pub fn sub_resources(&self) -> impl Iterator<Item = &Resource> {
        self.children.values()
    }

    /// Converts a raw path segment into an id value of this resource
    pub fn parse_id(&self, raw: &str) -> Value {
        match self.schema.id_field() {
            Some(def) => def.kind.parse_path_value(raw),
            None => FieldKind::Any.parse_path_value(raw),
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("bound", &self.storer.is_some())
            .field("conf", &self.conf)
            .field("parent_field", &self.parent_field)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A parent segment of a sub-resource path
#[derive(Debug)]
pub struct ParentRef<'a> {
    pub resource: &'a Resource,
    pub id: Value,
}

/// Result of resolving a request path
#[derive(Debug)]
pub struct Route<'a> {
    /// Ancestors, outermost first
    pub parents: Vec<ParentRef<'a>>,
    pub resource: &'a Resource,
    /// Item id when the path addresses one item
    pub id: Option<Value>,
}

impl Route<'_> {
    /// Dotted resource path for logging, e.g. `users.posts`
    pub fn path(&self) -> String {
        let mut names: Vec<&str> = self.parents.iter().map(|p| p.resource.name()).collect();
        names.push(self.resource.name());
        names.join(".")
    }
}

/// Registry of top-level resources
#[derive(Debug, Default)]
pub struct Index {
    resources: BTreeMap<String, Resource>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bound resource at `/{name}`
    pub fn bind(&mut self, resource: Resource) -> IndexResult<()> {
        if self.resources.contains_key(&resource.name) {
            return Err(IndexError::DuplicateResource(resource.name));
        }
        info!(
            resource = %resource.name,
            storage = resource.storer.is_some(),
            sub_resources = resource.children.len(),
            "resource bound"
        );
        self.resources.insert(resource.name.clone(), resource);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Resolves path segments (`["users", "1", "posts"]`) to a route
    pub fn lookup<'a>(&'a self, segments: &[&str]) -> Option<Route<'a>> {
        let (first, mut rest) = segments.split_first()?;
        let mut resource = self.resources.get(*first)?;
        let mut parents = Vec::new();
        loop {
            match rest {
                [] => {
                    return Some(Route {
                        parents,
                        resource,
                        id: None,
                    })
                }
                [id] => {
                    return Some(Route {
                        parents,
                        resource,
                        id: Some(resource.parse_id(id)),
                    })
                }
                [id, child, tail @ ..] => {
                    let next = resource.children.get(*child)?;
                    parents.push(ParentRef {
                        resource,
                        id: resource.parse_id(id),
                    });
                    resource = next;
                    rest = tail;
                }
            }
        }
    }
}
