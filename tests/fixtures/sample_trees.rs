// Helper functions to generate block trees and configs for integration tests
#![allow(dead_code)]

use widget_block_editor::{Block, Theme, WidgetConfig};

/// Three root-level text blocks: A, B, C
pub fn flat_abc() -> Vec<Block> {
    vec![
        Block::text("A", "first"),
        Block::text("B", "second"),
        Block::text("C", "third"),
    ]
}

/// a, b{c, d{e}}, f
pub fn nested_sample() -> Vec<Block> {
    vec![
        Block::text("a", "A"),
        Block::container(
            "b",
            vec![
                Block::text("c", "C"),
                Block::container("d", vec![Block::text("e", "E")]),
            ],
        ),
        Block::text("f", "F"),
    ]
}

/// A text block `a` next to a container `b` holding `c`
pub fn drop_inside_scenario() -> Vec<Block> {
    vec![
        Block::text("a", "A"),
        Block::container("b", vec![Block::text("c", "C")]),
    ]
}

/// A feedback form: heading, a row with prompt and illustration, a caption
pub fn feedback_form() -> WidgetConfig {
    WidgetConfig::new(
        Theme::default(),
        vec![
            Block::text("heading", "Tell us what you think").with_data("variant", "heading"),
            Block::container(
                "row",
                vec![
                    Block::text("prompt", "How was your visit?"),
                    Block::image("art", "https://cdn.example.com/smile.png").with_data("alt", "smile"),
                ],
            )
            .with_data("direction", "row"),
            Block::text("caption", "Thanks!").with_data("variant", "caption"),
        ],
    )
}

/// `depth` nested containers wrapping a single text block
pub fn deep_chain(depth: usize) -> Block {
    let mut block = Block::text("leaf", "deep");
    for level in 0..depth {
        block = Block::container(format!("level-{}", level), vec![block]);
    }
    block
}
