//! # Block Type Registry
//!
//! Explicit, injectable map of block type → schema. The validator and the
//! palette read from a registry value handed to them; there is no global table.

use crate::{Block, BlockId, BlockType};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Longest text payload accepted, in characters
pub const MAX_TEXT_CHARS: usize = 5_000;

const TEXT_VARIANTS: &[&str] = &["heading", "paragraph", "caption"];
const CONTAINER_DIRECTIONS: &[&str] = &["row", "column"];

/// Schema for one block type
pub trait BlockSchema: Send + Sync {
    /// Type tag this schema validates
    fn type_name(&self) -> &str;

    /// Newest payload version this build understands
    fn current_version(&self) -> u32 {
        1
    }

    /// Whether blocks of this type hold children
    fn holds_children(&self) -> bool {
        false
    }

    /// Payload for a block freshly added from the palette
    fn default_data(&self) -> Map<String, Value>;

    /// Append one message per schema violation
    fn check(&self, block: &Block, problems: &mut Vec<String>);
}

/// Registry of known block types
pub struct BlockRegistry {
    schemas: HashMap<String, Box<dyn BlockSchema>>,
}

impl BlockRegistry {
    /// Registry with no known types; everything validates permissively
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Registry with text, image and container
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(TextSchema));
        registry.register(Box::new(ImageSchema));
        registry.register(Box::new(ContainerSchema));
        registry
    }

    /// Register a schema, returning the one it replaced
    pub fn register(&mut self, schema: Box<dyn BlockSchema>) -> Option<Box<dyn BlockSchema>> {
        self.schemas.insert(schema.type_name().to_string(), schema)
    }

    pub fn get(&self, block_type: &BlockType) -> Option<&dyn BlockSchema> {
        self.schemas.get(block_type.as_str()).map(|s| s.as_ref())
    }

    pub fn is_known(&self, block_type: &BlockType) -> bool {
        self.schemas.contains_key(block_type.as_str())
    }

    /// Known type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a palette block of a known type
    pub fn create_block(&self, block_type: &BlockType, id: BlockId) -> Option<Block> {
        let schema = self.get(block_type)?;
        let mut block = Block::new(id, block_type.clone(), schema.default_data());
        block.version = schema.current_version();
        block.children = schema.holds_children().then(Vec::new);
        Some(block)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Plain text with an optional presentation variant
pub struct TextSchema;

impl BlockSchema for TextSchema {
    fn type_name(&self) -> &str {
        BlockType::TEXT
    }

    fn default_data(&self) -> Map<String, Value> {
        object(json!({"text": "New text", "variant": "paragraph"}))
    }

    fn check(&self, block: &Block, problems: &mut Vec<String>) {
        match block.data.get("text") {
            None => problems.push("text block needs a `text` field".to_string()),
            Some(Value::String(text)) => {
                let chars = text.chars().count();
                if chars > MAX_TEXT_CHARS {
                    problems.push(format!(
                        "text is {} characters, limit is {}",
                        chars, MAX_TEXT_CHARS
                    ));
                }
            }
            Some(_) => problems.push("`text` must be a string".to_string()),
        }

        check_enum(block, "variant", TEXT_VARIANTS, problems);
    }
}

/// Image referenced by URL or inline data URI
pub struct ImageSchema;

fn image_src_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(https?://\S+|data:image/[a-z0-9.+-]+;base64,[A-Za-z0-9+/=]+)$")
            .expect("image src pattern is valid")
    })
}

impl BlockSchema for ImageSchema {
    fn type_name(&self) -> &str {
        BlockType::IMAGE
    }

    fn default_data(&self) -> Map<String, Value> {
        object(json!({"src": "https://placehold.co/600x400", "alt": ""}))
    }

    fn check(&self, block: &Block, problems: &mut Vec<String>) {
        match block.data.get("src") {
            Some(Value::String(src)) if src.trim().is_empty() => {
                problems.push("image block needs a `src`".to_string())
            }
            Some(Value::String(src)) => {
                if !image_src_pattern().is_match(src) {
                    problems.push("`src` must be an http(s) URL or a data:image URI".to_string());
                }
            }
            Some(_) => problems.push("`src` must be a string".to_string()),
            None => problems.push("image block needs a `src`".to_string()),
        }

        if let Some(alt) = block.data.get("alt") {
            if !alt.is_string() {
                problems.push("`alt` must be a string".to_string());
            }
        }
    }
}

/// Layout box holding an ordered list of children
pub struct ContainerSchema;

impl BlockSchema for ContainerSchema {
    fn type_name(&self) -> &str {
        BlockType::CONTAINER
    }

    fn holds_children(&self) -> bool {
        true
    }

    fn default_data(&self) -> Map<String, Value> {
        object(json!({"direction": "column"}))
    }

    fn check(&self, block: &Block, problems: &mut Vec<String>) {
        if block.children.is_none() {
            problems.push("container block is missing its children list".to_string());
        }
        check_enum(block, "direction", CONTAINER_DIRECTIONS, problems);
    }
}

/// Optional string field restricted to a fixed set of values
fn check_enum(block: &Block, field: &str, allowed: &[&str], problems: &mut Vec<String>) {
    match block.data.get(field) {
        None => {}
        Some(Value::String(value)) if allowed.contains(&value.as_str()) => {}
        Some(other) => problems.push(format!(
            "`{}` must be one of {}, got {}",
            field,
            allowed.join(", "),
            other
        )),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
