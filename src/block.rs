use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key under which a container's children live in the serialized `data` payload
pub const CHILDREN_KEY: &str = "children";

/// Opaque block identifier, unique across the whole forest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of the widget a config belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Block type tag. The set is open: unknown tags are carried as opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockType(String);

impl BlockType {
    pub const TEXT: &'static str = "text";
    pub const IMAGE: &'static str = "image";
    pub const CONTAINER: &'static str = "container";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn text() -> Self {
        Self::new(Self::TEXT)
    }

    pub fn image() -> Self {
        Self::new(Self::IMAGE)
    }

    pub fn container() -> Self {
        Self::new(Self::CONTAINER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node in the widget's content forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub struct Block {
    /// Stable identifier, never reassigned
    pub id: BlockId,

    /// Type tag, fixed at creation (retyping is delete + insert)
    pub block_type: BlockType,

    /// Schema version of the payload for this type (>= 1)
    pub version: u32,

    /// Type-specific payload, without the children list
    pub data: Map<String, Value>,

    /// Ordered child blocks. `Some` marks a block that can hold children.
    pub children: Option<Vec<Block>>,
}

impl Block {
    /// Create a block at schema version 1. Containers start with an empty child list.
    pub fn new(id: impl Into<BlockId>, block_type: BlockType, data: Map<String, Value>) -> Self {
        let children = block_type.is(BlockType::CONTAINER).then(Vec::new);
        Self {
            id: id.into(),
            block_type,
            version: 1,
            data,
            children,
        }
    }

    /// Create a text block
    pub fn text(id: impl Into<BlockId>, text: impl Into<String>) -> Self {
        Self::new(id, BlockType::text(), Map::new()).with_data("text", text.into())
    }

    /// Create an image block
    pub fn image(id: impl Into<BlockId>, src: impl Into<String>) -> Self {
        Self::new(id, BlockType::image(), Map::new()).with_data("src", src.into())
    }

    /// Create a container holding the given children
    pub fn container(id: impl Into<BlockId>, children: Vec<Block>) -> Self {
        let mut block = Self::new(id, BlockType::container(), Map::new());
        block.children = Some(children);
        block
    }

    /// Set a payload field (builder style)
    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Set the schema version (builder style)
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Whether children can be inserted into this block
    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    /// Child blocks, empty for leaf blocks
    pub fn children(&self) -> &[Block] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// The `text` payload field, if present and a string
    pub fn text_content(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }
}

/// Serialized shape: children travel inside `data`
#[derive(Serialize, Deserialize)]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    block_type: BlockType,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    data: RawData,
}

#[derive(Default, Serialize, Deserialize)]
struct RawData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Block>>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

fn default_version() -> u32 {
    1
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        Self {
            id: raw.id,
            block_type: raw.block_type,
            version: raw.version,
            data: raw.data.fields,
            children: raw.data.children,
        }
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        Self {
            id: block.id,
            block_type: block.block_type,
            version: block.version,
            data: RawData {
                children: block.children,
                fields: block.data,
            },
        }
    }
}

/// Render-agnostic styling knobs for a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub primary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub font_family: String,
    /// Corner radius in pixels
    pub border_radius: u32,

    /// Knobs this version does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#4f46e5".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#111827".to_string(),
            font_family: "system-ui".to_string(),
            border_radius: 8,
            extra: Map::new(),
        }
    }
}

/// The editor's top-level document: the unit that is validated, saved and published
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl WidgetConfig {
    pub fn new(theme: Theme, blocks: Vec<Block>) -> Self {
        Self { theme, blocks }
    }

    /// Config generated for a widget that has no draft yet
    pub fn starter(heading_id: BlockId) -> Self {
        let heading =
            Block::text(heading_id, "Tell us what you think").with_data("variant", "heading");
        Self::new(Theme::default(), vec![heading])
    }

    /// Replace the whole root list, keeping the theme
    pub fn with_blocks(&self, blocks: Vec<Block>) -> Self {
        Self {
            theme: self.theme.clone(),
            blocks,
        }
    }

    /// Size of the JSON wire form in bytes
    pub fn byte_size(&self) -> Result<usize, serde_json::Error> {
        serde_json::to_vec(self).map(|bytes| bytes.len())
    }
}
