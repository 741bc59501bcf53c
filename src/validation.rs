use crate::registry::BlockRegistry;
use crate::tree::{self, Path};
use crate::{Block, BlockId, Theme, WidgetConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Deepest nesting accepted; root blocks sit at depth 1
pub const MAX_NESTING_DEPTH: usize = 8;

/// Largest corner radius accepted, in pixels
pub const MAX_BORDER_RADIUS: u32 = 64;

/// Where an issue was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueLocation {
    /// A block, by its path at validation time and its id
    Block { path: Path, id: BlockId },
    /// A theme field
    Theme { field: String },
}

/// Validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub location: IssueLocation,
    pub message: String,
    pub issue_type: ValidationIssueType,
}

/// Types of validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssueType {
    DuplicateId,
    EmptyId,
    InvalidVersion,
    UnsupportedVersion,
    TooDeep,
    UnexpectedChildren,
    Schema,
    Theme,
}

/// Complete validation result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// True when no issue was found
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues located on the given block
    pub fn for_block(&self, id: &BlockId) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| matches!(&i.location, IssueLocation::Block { id: at, .. } if at == id))
            .collect()
    }

    /// Issues of one type
    pub fn of_type(&self, issue_type: ValidationIssueType) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.issue_type == issue_type)
            .collect()
    }
}

/// Validator for widget configs
pub struct Validator;

impl Validator {
    /// Run all checks on a config: theme, then every block
    pub fn validate(config: &WidgetConfig, registry: &BlockRegistry) -> ValidationResult {
        let mut result = ValidationResult::new();
        Self::check_theme(&config.theme, &mut result);
        Self::check_blocks(&config.blocks, registry, &mut result);
        result
    }

    /// Check a block list on its own. Paths in the result are relative to `blocks`.
    pub fn validate_blocks(blocks: &[Block], registry: &BlockRegistry) -> ValidationResult {
        let mut result = ValidationResult::new();
        Self::check_blocks(blocks, registry, &mut result);
        result
    }

    fn check_blocks(blocks: &[Block], registry: &BlockRegistry, result: &mut ValidationResult) {
        let mut seen: HashSet<&BlockId> = HashSet::new();

        tree::walk(blocks, &mut |block, path| {
            let mut push = |issue_type, message: String| {
                result.add_issue(ValidationIssue {
                    location: IssueLocation::Block {
                        path: path.to_vec(),
                        id: block.id.clone(),
                    },
                    message,
                    issue_type,
                });
            };

            if block.id.is_empty() {
                push(ValidationIssueType::EmptyId, "block id is empty".to_string());
            } else if !seen.insert(&block.id) {
                push(
                    ValidationIssueType::DuplicateId,
                    format!("block id `{}` is used more than once", block.id),
                );
            }

            if path.len() > MAX_NESTING_DEPTH {
                push(
                    ValidationIssueType::TooDeep,
                    format!(
                        "nested {} levels deep, limit is {}",
                        path.len(),
                        MAX_NESTING_DEPTH
                    ),
                );
            }

            if block.version == 0 {
                push(
                    ValidationIssueType::InvalidVersion,
                    "version must be at least 1".to_string(),
                );
            }

            // Unknown types are opaque; only their structure above is checked
            let Some(schema) = registry.get(&block.block_type) else {
                return;
            };

            if block.version > schema.current_version() {
                push(
                    ValidationIssueType::UnsupportedVersion,
                    format!(
                        "{} version {} is newer than supported version {}",
                        block.block_type,
                        block.version,
                        schema.current_version()
                    ),
                );
            }

            if !schema.holds_children() && block.children.is_some() {
                push(
                    ValidationIssueType::UnexpectedChildren,
                    format!("{} blocks cannot hold children", block.block_type),
                );
            }

            let mut problems = Vec::new();
            schema.check(block, &mut problems);
            for message in problems {
                push(ValidationIssueType::Schema, message);
            }
        });
    }

    fn check_theme(theme: &Theme, result: &mut ValidationResult) {
        let mut push = |field: &str, message: String| {
            result.add_issue(ValidationIssue {
                location: IssueLocation::Theme {
                    field: field.to_string(),
                },
                message,
                issue_type: ValidationIssueType::Theme,
            });
        };

        for (field, value) in [
            ("primary_color", &theme.primary_color),
            ("background_color", &theme.background_color),
            ("text_color", &theme.text_color),
        ] {
            if !hex_color_pattern().is_match(value) {
                push(field, format!("`{}` is not a hex colour like #1a2b3c", value));
            }
        }

        if theme.font_family.trim().is_empty() {
            push("font_family", "font family is empty".to_string());
        }

        if theme.border_radius > MAX_BORDER_RADIUS {
            push(
                "border_radius",
                format!(
                    "border radius {}px exceeds {}px",
                    theme.border_radius, MAX_BORDER_RADIUS
                ),
            );
        }
    }
}

fn hex_color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("hex colour pattern is valid")
    })
}

/// Extension trait for WidgetConfig to add validation
pub trait ValidatedConfig {
    /// Validate the config
    fn validate(&self, registry: &BlockRegistry) -> ValidationResult;

    /// Issue count per block id
    fn blocks_with_issues(&self, result: &ValidationResult) -> HashMap<BlockId, usize>;
}

impl ValidatedConfig for WidgetConfig {
    fn validate(&self, registry: &BlockRegistry) -> ValidationResult {
        Validator::validate(self, registry)
    }

    fn blocks_with_issues(&self, result: &ValidationResult) -> HashMap<BlockId, usize> {
        let mut blocks = HashMap::new();

        for issue in &result.issues {
            if let IssueLocation::Block { id, .. } = &issue.location {
                *blocks.entry(id.clone()).or_insert(0) += 1;
            }
        }

        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockType;
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    fn registry() -> BlockRegistry {
        BlockRegistry::with_builtins()
    }

    #[test]
    fn test_valid_config() {
        let config = WidgetConfig::new(
            Theme::default(),
            vec![
                Block::text("a", "Hello"),
                Block::container("b", vec![Block::image("c", "https://x.io/c.png")]),
            ],
        );

        let result = config.validate(&registry());
        assert!(result.is_valid());
        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_duplicate_id_reported_on_later_occurrence() {
        let blocks = vec![
            Block::text("a", "1"),
            Block::container("b", vec![Block::text("a", "2")]),
        ];

        let result = Validator::validate_blocks(&blocks, &registry());
        let dups = result.of_type(ValidationIssueType::DuplicateId);
        assert_eq!(dups.len(), 1);
        assert_eq!(
            dups[0].location,
            IssueLocation::Block {
                path: vec![1, 0],
                id: BlockId::from("a")
            }
        );
    }

    #[test]
    fn test_unknown_types_are_permissive() {
        let video = Block::new("v", BlockType::new("video"), Map::new()).with_version(7);
        let result = Validator::validate_blocks(&[video], &registry());
        assert!(result.is_valid());
    }

    #[test]
    fn test_unknown_type_children_are_still_checked() {
        let mut carousel = Block::new("car", BlockType::new("carousel"), Map::new());
        carousel.children = Some(vec![Block::image("i", "")]);

        let result = Validator::validate_blocks(&[carousel], &registry());
        assert_eq!(result.for_block(&BlockId::from("i")).len(), 1);
    }

    #[test]
    fn test_version_checks() {
        let zero = Block::text("z", "").with_version(0);
        let future = Block::text("f", "").with_version(2);

        let result = Validator::validate_blocks(&[zero, future], &registry());
        assert_eq!(result.of_type(ValidationIssueType::InvalidVersion).len(), 1);
        assert_eq!(result.of_type(ValidationIssueType::UnsupportedVersion).len(), 1);
    }

    #[test]
    fn test_leaf_with_children() {
        let mut text = Block::text("t", "hi");
        text.children = Some(vec![]);

        let result = Validator::validate_blocks(&[text], &registry());
        assert_eq!(result.of_type(ValidationIssueType::UnexpectedChildren).len(), 1);
    }

    #[test]
    fn test_nesting_limit() {
        let mut block = Block::text("leaf", "deep");
        for depth in 0..MAX_NESTING_DEPTH {
            block = Block::container(format!("c{}", depth), vec![block]);
        }

        let result = Validator::validate_blocks(&[block], &registry());
        let too_deep = result.of_type(ValidationIssueType::TooDeep);
        assert_eq!(too_deep.len(), 1);
        assert_eq!(
            too_deep[0].location,
            IssueLocation::Block {
                path: vec![0; MAX_NESTING_DEPTH + 1],
                id: BlockId::from("leaf")
            }
        );
    }

    #[test]
    fn test_theme_checks() {
        let theme = Theme {
            primary_color: "blue".to_string(),
            font_family: "  ".to_string(),
            border_radius: 500,
            ..Theme::default()
        };
        let config = WidgetConfig::new(theme, vec![]);

        let result = config.validate(&registry());
        assert_eq!(result.of_type(ValidationIssueType::Theme).len(), 3);
        assert!(result.issues.iter().any(|i| i.location
            == IssueLocation::Theme {
                field: "primary_color".to_string()
            }));
    }

    #[test]
    fn test_blocks_with_issues() {
        let config = WidgetConfig::new(
            Theme::default(),
            vec![Block::image("i", ""), Block::text("t", "ok")],
        );

        let result = config.validate(&registry());
        let blocks = config.blocks_with_issues(&result);

        assert_eq!(blocks.get(&BlockId::from("i")), Some(&1));
        assert!(!blocks.contains_key(&BlockId::from("t")));
    }

    #[test]
    fn test_empty_registry_only_checks_structure() {
        let blocks = vec![Block::image("i", ""), Block::image("i", "")];
        let result = Validator::validate_blocks(&blocks, &BlockRegistry::empty());
        assert_eq!(result.len(), 1);
        assert_eq!(result.issues[0].issue_type, ValidationIssueType::DuplicateId);
    }
}
