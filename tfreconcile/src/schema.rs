//! Schema descriptors for resources and data sources
//!
//! A schema lists every attribute with its type, mutability class
//! (required / optional / computed / force-new) and validators, plus any
//! nested blocks. Everything here is free of side effects: checking the
//! descriptor itself, materializing defaults and validating a configuration
//! bag all happen before a reconciler touches the remote API.

use crate::error::{ReconcileError, Result};
use crate::types::{AttributePath, Diagnostics};
use crate::validator::Validator;
use crate::value::{AttributeBag, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// AttributeType defines the static type tag of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Int,
    Float,
    Bool,
    List(Box<AttributeType>), // Ordered, allows duplicates
    Set(Box<AttributeType>),  // Unordered, no duplicates
    Map(Box<AttributeType>),  // String keys only
}

impl AttributeType {
    pub fn list_of(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn set_of(inner: AttributeType) -> Self {
        AttributeType::Set(Box::new(inner))
    }

    pub fn map_of(inner: AttributeType) -> Self {
        AttributeType::Map(Box::new(inner))
    }

    /// Whether `value` has the shape this type describes. Unknown values match
    /// any type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Unknown) => true,
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Int, v) => v.as_int().is_some(),
            (AttributeType::Float, v) => v.as_float().is_some(),
            (AttributeType::Bool, Value::Bool(_)) => true,
            (AttributeType::List(inner), Value::List(items) | Value::Set(items))
            | (AttributeType::Set(inner), Value::List(items) | Value::Set(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            (AttributeType::Map(inner), Value::Map(entries)) => {
                entries.values().all(|item| inner.accepts(item))
            }
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AttributeType::String => "string".to_string(),
            AttributeType::Int => "int".to_string(),
            AttributeType::Float => "float".to_string(),
            AttributeType::Bool => "bool".to_string(),
            AttributeType::List(inner) => format!("list of {}", inner.describe()),
            AttributeType::Set(inner) => format!("set of {}", inner.describe()),
            AttributeType::Map(inner) => format!("map of {}", inner.describe()),
        }
    }
}

/// Schema is returned by resources and data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// Block represents a configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Any change requires destroying and recreating the resource
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub validators: Vec<Arc<dyn Validator>>,
}

// Manual Debug implementation since validators don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .field("sensitive", &self.sensitive)
            .field("default", &self.default)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .finish()
    }
}

impl Attribute {
    /// Set only by Read, never by the user
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    pub fn is_user_settable(&self) -> bool {
        self.required || self.optional
    }
}

/// NestedBlock represents a repeated configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: usize,
    /// Zero means unbounded
    pub max_items: usize,
    pub force_new: bool,
    /// Also populated by Read when not configured
    pub computed: bool,
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    List,
    Set,
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                force_new: false,
                sensitive: false,
                default: None,
                validators: Vec::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.attribute.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Builder for nested blocks
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn list(name: &str) -> Self {
        Self::with_nesting(name, NestingMode::List)
    }

    pub fn set(name: &str) -> Self {
        Self::with_nesting(name, NestingMode::Set)
    }

    fn with_nesting(name: &str, nesting: NestingMode) -> Self {
        Self {
            nested: NestedBlock {
                type_name: name.to_string(),
                block: Block::default(),
                nesting,
                min_items: 0,
                max_items: 0,
                force_new: false,
                computed: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.nested.block.block_types.push(block);
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.nested.force_new = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.nested.computed = true;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block.block_types.iter().find(|b| b.type_name == name)
    }

    /// Top-level attribute and block names whose change forces replacement
    pub fn force_new_names(&self) -> Vec<&str> {
        let attrs = self
            .block
            .attributes
            .iter()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str());
        let blocks = self
            .block
            .block_types
            .iter()
            .filter(|b| b.force_new)
            .map(|b| b.type_name.as_str());
        attrs.chain(blocks).collect()
    }

    /// Checks the descriptor invariants: required attributes carry no default,
    /// computed-only attributes are neither defaulted nor force-new, and names
    /// are unique
    pub fn check_definition(&self, type_name: &str) -> Result<()> {
        check_block(&self.block, "").map_err(|message| ReconcileError::Schema {
            type_name: type_name.to_string(),
            message,
        })
    }

    /// Fills declared defaults for optional attributes that are absent
    pub fn apply_defaults(&self, bag: &mut AttributeBag) {
        apply_block_defaults(&self.block, bag);
    }

    /// Validates user configuration against this schema without side effects
    pub fn validate_config(&self, bag: &AttributeBag) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        validate_block(&self.block, bag, &AttributePath::root(), &mut diagnostics);
        diagnostics
    }
}

fn check_block(block: &Block, prefix: &str) -> std::result::Result<(), String> {
    let mut seen = BTreeSet::new();

    for attr in &block.attributes {
        let name = format!("{}{}", prefix, attr.name);
        if !seen.insert(attr.name.as_str()) {
            return Err(format!("duplicate attribute '{}'", name));
        }
        if attr.required && attr.optional {
            return Err(format!("'{}' cannot be both required and optional", name));
        }
        if !attr.required && !attr.optional && !attr.computed {
            return Err(format!(
                "'{}' must be required, optional or computed",
                name
            ));
        }
        if attr.required && attr.computed {
            return Err(format!("'{}' cannot be both required and computed", name));
        }
        if attr.required && attr.default.is_some() {
            return Err(format!("required attribute '{}' cannot have a default", name));
        }
        if attr.is_computed_only() && attr.default.is_some() {
            return Err(format!("computed attribute '{}' cannot have a default", name));
        }
        if attr.is_computed_only() && attr.force_new {
            return Err(format!("computed attribute '{}' cannot be force-new", name));
        }
        if let Some(default) = &attr.default {
            if !attr.r#type.accepts(default) {
                return Err(format!(
                    "default for '{}' is not a {}",
                    name,
                    attr.r#type.describe()
                ));
            }
        }
    }

    for nested in &block.block_types {
        let name = format!("{}{}", prefix, nested.type_name);
        if !seen.insert(nested.type_name.as_str()) {
            return Err(format!("duplicate attribute '{}'", name));
        }
        if nested.max_items > 0 && nested.min_items > nested.max_items {
            return Err(format!("block '{}' has min_items > max_items", name));
        }
        check_block(&nested.block, &format!("{}.", name))?;
    }

    Ok(())
}

fn apply_block_defaults(block: &Block, bag: &mut AttributeBag) {
    for attr in &block.attributes {
        if let Some(default) = &attr.default {
            if !bag.is_set(&attr.name) {
                bag.set(&attr.name, default.clone());
            }
        }
    }

    for nested in &block.block_types {
        let elements = match bag.get(&nested.type_name).and_then(Value::as_list) {
            Some(elements) => elements.to_vec(),
            None => continue,
        };
        let updated: Vec<Value> = elements
            .into_iter()
            .map(|element| match element {
                Value::Map(values) => {
                    let mut inner = AttributeBag::from_map(values);
                    apply_block_defaults(&nested.block, &mut inner);
                    Value::from(inner)
                }
                other => other,
            })
            .collect();
        let value = match nested.nesting {
            NestingMode::List => Value::List(updated),
            NestingMode::Set => Value::Set(updated),
        };
        bag.set(&nested.type_name, value);
    }
}

fn validate_block(
    block: &Block,
    bag: &AttributeBag,
    path: &AttributePath,
    diagnostics: &mut Diagnostics,
) {
    for name in bag.keys() {
        let known = block.attributes.iter().any(|a| &a.name == name)
            || block.block_types.iter().any(|b| &b.type_name == name);
        if !known {
            diagnostics.add_attribute_error(
                &path.clone().attribute(name),
                "unsupported argument",
                Some(format!("An argument named '{}' is not expected here", name)),
            );
        }
    }

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let value = bag.get(&attr.name).unwrap_or(&Value::Null);

        if value.is_null() {
            if attr.required {
                diagnostics.add_attribute_error(
                    &attr_path,
                    "missing required argument",
                    Some(format!("The argument '{}' is required", attr.name)),
                );
            }
            continue;
        }

        if value.is_unknown() {
            continue;
        }

        if attr.is_computed_only() {
            diagnostics.add_attribute_error(
                &attr_path,
                "value for unconfigurable attribute",
                Some(format!("'{}' is computed and cannot be set", attr.name)),
            );
            continue;
        }

        if !attr.r#type.accepts(value) {
            diagnostics.add_attribute_error(
                &attr_path,
                "incorrect attribute value type",
                Some(format!(
                    "expected {}, got {}",
                    attr.r#type.describe(),
                    value.type_name()
                )),
            );
            continue;
        }

        for validator in &attr.validators {
            validator.validate(value, &attr_path, diagnostics);
        }
    }

    for nested in &block.block_types {
        let block_path = path.clone().attribute(&nested.type_name);
        let value = bag.get(&nested.type_name).unwrap_or(&Value::Null);

        if value.is_unknown() {
            continue;
        }

        let elements = match value {
            Value::Null => &[][..],
            other => match other.as_list() {
                Some(items) => items,
                None => {
                    diagnostics.add_attribute_error(
                        &block_path,
                        "incorrect block type",
                        Some(format!("expected list of blocks, got {}", other.type_name())),
                    );
                    continue;
                }
            },
        };

        if elements.len() < nested.min_items {
            diagnostics.add_attribute_error(
                &block_path,
                format!("at least {} '{}' blocks are required", nested.min_items, nested.type_name),
                Some(format!("Got {}", elements.len())),
            );
        }
        if nested.max_items > 0 && elements.len() > nested.max_items {
            diagnostics.add_attribute_error(
                &block_path,
                format!("no more than {} '{}' blocks are allowed", nested.max_items, nested.type_name),
                Some(format!("Got {}", elements.len())),
            );
        }

        for (idx, element) in elements.iter().enumerate() {
            let element_path = block_path.clone().index(idx);
            match element {
                Value::Map(values) => validate_block(
                    &nested.block,
                    &AttributeBag::from_map(values.clone()),
                    &element_path,
                    diagnostics,
                ),
                Value::Unknown => {}
                other => diagnostics.add_attribute_error(
                    &element_path,
                    "incorrect block type",
                    Some(format!("expected block, got {}", other.type_name())),
                ),
            }
        }
    }
}
