//! Tool/Resource Registry
//!
//! Built once at startup with [`RegistryBuilder`] and shared read-only
//! afterwards. `invoke` resolves a tool, validates arguments against its
//! schema, runs it, and folds every failure into a [`ToolError`]. Resources
//! are matched against URI templates such as `sec://submissions/{cik}{/path}`.

use crate::config::Limits;
use crate::events::EventPublisher;
use async_trait::async_trait;
use edgar_core::{Error, ErrorKind, Result, SizeGuard, Upstream, UpstreamPath};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub description: &'static str,
}

/// Declared tool arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, ty: FieldType, description: &'static str) -> Self {
        self.fields.push(FieldSpec { name, ty, required: true, description });
        self
    }

    pub fn optional(mut self, name: &'static str, ty: FieldType, description: &'static str) -> Self {
        self.fields.push(FieldSpec { name, ty, required: false, description });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.to_string(),
                    json!({ "type": f.ty, "description": f.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.fields.iter().filter(|f| f.required).map(|f| f.name).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Absent arguments count as `{}`. Null is treated as absent. Unknown
    /// keys pass through untouched.
    pub fn validate(&self, args: Option<Value>) -> std::result::Result<Value, ToolError> {
        let args = match args {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ToolError::bad_input("Arguments must be a JSON object")),
        };

        for field in &self.fields {
            match args.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ToolError::bad_input(format!("Missing required field '{}'", field.name)))
                }
                None | Some(Value::Null) => {}
                Some(value) if !field.ty.matches(value) => {
                    return Err(ToolError::bad_input(format!(
                        "Field '{}' must be {}",
                        field.name, field.ty
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(Value::Object(args))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Uniform failure envelope returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
}

impl From<Error> for ToolError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        let message = match &err {
            Error::UpstreamUnavailable(msg)
            | Error::DataIntegrity(msg)
            | Error::BadInput(msg)
            | Error::NotFound(msg)
            | Error::Fatal(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self { kind, message }
    }
}

/// Per-call state handed to tools and resources.
#[derive(Clone)]
pub struct ToolContext {
    pub upstream: Arc<dyn Upstream>,
    pub limits: Limits,
    pub events: EventPublisher,
    pub session_id: String,
}

impl ToolContext {
    pub fn guard(&self) -> SizeGuard {
        SizeGuard::new(self.limits.max_response_bytes)
    }

    /// Fetch and announce the resource on the session's event stream.
    pub async fn fetch(&self, path: &UpstreamPath) -> Result<Value> {
        match self.upstream.fetch_json(path).await {
            Ok(value) => {
                self.events.resource_update(path.render());
                Ok(value)
            }
            Err(e) => {
                self.events.error(e.kind(), e.to_string(), path.render());
                Err(e)
            }
        }
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("limits", &self.limits)
            .finish()
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> InputSchema;
    /// `args` is always an object that passed [`InputSchema::validate`].
    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Var(String),
    /// `{/name}`: absent, or `/` followed by the rest of the path.
    OptionalPath(String),
}

/// RFC 6570-style template limited to `{var}` and a trailing `{/var}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    #[serde(skip)]
    segments: Vec<Segment>,
}

/// A concrete URI matched against a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceUri {
    pub uri: String,
    pub params: HashMap<String, String>,
    pub query: Vec<(String, String)>,
}

impl ResourceUri {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ResourceTemplate {
    pub fn new(uri_template: &str, name: &str, description: &str) -> Self {
        Self {
            uri_template: uri_template.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: "application/json".to_string(),
            segments: parse_template(uri_template),
        }
    }

    pub fn matches(&self, uri: &str) -> Option<ResourceUri> {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let mut rest = path;
        let mut params = HashMap::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => rest = rest.strip_prefix(lit.as_str())?,
                Segment::Var(name) => {
                    let end = rest.find('/').unwrap_or(rest.len());
                    if end == 0 {
                        return None;
                    }
                    params.insert(name.clone(), rest[..end].to_string());
                    rest = &rest[end..];
                }
                Segment::OptionalPath(name) => {
                    if let Some(tail) = rest.strip_prefix('/') {
                        let tail = tail.trim_end_matches('/');
                        if !tail.is_empty() {
                            params.insert(name.clone(), tail.to_string());
                        }
                        rest = "";
                    }
                }
            }
        }
        if !rest.is_empty() {
            return None;
        }

        let query = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Some(ResourceUri {
            uri: uri.to_string(),
            params,
            query,
        })
    }
}

fn parse_template(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|c| open + c) else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let inner = &rest[open + 1..close];
        segments.push(match inner.strip_prefix('/') {
            Some(name) => Segment::OptionalPath(name.to_string()),
            None => Segment::Var(inner.to_string()),
        });
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    segments
}

#[async_trait]
pub trait Resource: Send + Sync {
    fn template(&self) -> &ResourceTemplate;
    async fn read(&self, ctx: &ToolContext, uri: &ResourceUri) -> Result<Value>;
}

struct ToolEntry {
    descriptor: ToolDescriptor,
    schema: InputSchema,
    tool: Arc<dyn Tool>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
    resources: Vec<Arc<dyn Resource>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn resource(mut self, resource: impl Resource + 'static) -> Self {
        self.resources.push(Arc::new(resource));
        self
    }

    pub fn build(self) -> Result<Registry> {
        let mut tools = Vec::with_capacity(self.tools.len());
        let mut index = HashMap::new();
        for tool in self.tools {
            let name = tool.name().to_string();
            if index.insert(name.clone(), tools.len()).is_some() {
                return Err(Error::fatal(format!("Tool '{}' registered twice", name)));
            }
            let schema = tool.input_schema();
            tools.push(ToolEntry {
                descriptor: ToolDescriptor {
                    name,
                    description: tool.description().to_string(),
                    input_schema: schema.to_json_schema(),
                },
                schema,
                tool,
            });
        }

        let mut seen = std::collections::HashSet::new();
        for resource in &self.resources {
            let template = &resource.template().uri_template;
            if !seen.insert(template.clone()) {
                return Err(Error::fatal(format!("Resource '{}' registered twice", template)));
            }
        }

        info!(tools = tools.len(), resources = self.resources.len(), "Registry built");
        Ok(Registry {
            tools,
            index,
            resources: self.resources,
        })
    }
}

/// Immutable name → handler catalog.
pub struct Registry {
    tools: Vec<ToolEntry>,
    index: HashMap<String, usize>,
    resources: Vec<Arc<dyn Resource>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Descriptors in registration order.
    pub fn describe(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn resource_templates(&self) -> Vec<ResourceTemplate> {
        self.resources.iter().map(|r| r.template().clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub async fn invoke(
        &self,
        name: &str,
        args: Option<Value>,
        ctx: &ToolContext,
    ) -> std::result::Result<Value, ToolError> {
        let result = self.dispatch(name, args, ctx).await;
        match &result {
            Ok(_) => debug!(tool = %name, session = %ctx.session_id, "Tool succeeded"),
            Err(e) => {
                warn!(tool = %name, session = %ctx.session_id, kind = %e.kind, error = %e.message, "Tool failed");
                ctx.events.error(e.kind, e.message.clone(), name);
            }
        }
        result
    }

    async fn dispatch(
        &self,
        name: &str,
        args: Option<Value>,
        ctx: &ToolContext,
    ) -> std::result::Result<Value, ToolError> {
        let entry = self
            .index
            .get(name)
            .and_then(|&i| self.tools.get(i))
            .ok_or_else(|| ToolError::not_found(format!("Unknown tool: {}", name)))?;

        let args = entry.schema.validate(args)?;
        let result = entry.tool.execute(ctx, &args).await.map_err(ToolError::from);
        ctx.events.tool_call(name, result.is_ok());
        result
    }

    pub async fn read_resource(&self, uri: &str, ctx: &ToolContext) -> std::result::Result<Value, ToolError> {
        let matched = self
            .resources
            .iter()
            .find_map(|r| r.template().matches(uri).map(|m| (r, m)));

        let result = match matched {
            Some((resource, parsed)) => resource.read(ctx, &parsed).await.map_err(ToolError::from),
            None => Err(ToolError::not_found(format!("Resource not found: {}", uri))),
        };
        if let Err(e) = &result {
            warn!(uri = %uri, session = %ctx.session_id, kind = %e.kind, error = %e.message, "Resource read failed");
            ctx.events.error(e.kind, e.message.clone(), uri);
        }
        result
    }
}
