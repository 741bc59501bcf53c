// End-to-end editing sessions against the stores

#[path = "fixtures/sample_trees.rs"]
mod fixtures;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use widget_block_editor::store::load_or_default;
use widget_block_editor::tree;
use widget_block_editor::{
    AuthScope, AutosavePublisher, Block, BlockId, BlockRegistry, BlockType, DragGesture,
    DragOutcome, DropTarget, EditorSession, EditorSettings, FileStore, FocusTarget, IdGenerator,
    Key, KeyEvent, MemoryStore, Modifiers, PersistenceError, Platform, PublishError, SaveState,
    Theme, ValidationIssueType, WidgetConfig, WidgetId, WidgetStore, ROOT_ID,
};

fn session_with(blocks: Vec<Block>) -> EditorSession {
    EditorSession::with_defaults(
        WidgetId::new("form"),
        WidgetConfig::new(Theme::default(), blocks),
    )
}

fn root_ids(session: &EditorSession) -> Vec<&str> {
    session.blocks().iter().map(|b| b.id.as_str()).collect()
}

#[test]
fn test_drop_inside_container_scenario() {
    let mut session = session_with(fixtures::drop_inside_scenario());

    let outcome = session.drag(&DragGesture::new("a", DropTarget::Inside(BlockId::from("b"))));
    assert_matches!(outcome, DragOutcome::Moved { .. });

    assert_eq!(root_ids(&session), vec!["b"]);
    let children: Vec<&str> = session.blocks()[0]
        .children()
        .iter()
        .map(|b| b.id.as_str())
        .collect();
    assert_eq!(children, vec!["c", "a"]);
    assert_eq!(session.history().undo_depth(), 2);

    assert!(session.undo());
    assert_eq!(session.config().blocks, fixtures::drop_inside_scenario());
}

#[test]
fn test_slot_drop_uses_post_removal_index() {
    let mut session = session_with(fixtures::flat_abc());
    session.drag(&DragGesture::new("A", DropTarget::root_slot(2)));
    assert_eq!(root_ids(&session), vec!["B", "C", "A"]);

    // Dragging onto the block already there changes nothing
    let outcome = session.drag(&DragGesture::new("A", DropTarget::Block(BlockId::from("A"))));
    assert_eq!(outcome, DragOutcome::NoOp);
    assert_eq!(session.history().undo_depth(), 2);
}

#[test]
fn test_root_sentinel_slot() {
    let mut session = session_with(fixtures::nested_sample());
    let gesture = DragGesture::new(
        "e",
        DropTarget::Slot {
            parent: BlockId::from(ROOT_ID),
            index: 0,
        },
    );
    assert_matches!(session.drag(&gesture), DragOutcome::Moved { .. });
    assert_eq!(root_ids(&session), vec!["e", "a", "b", "f"]);
    assert!(session.is_valid());
}

#[test]
fn test_keyboard_session() {
    let platform = Platform::Mac;
    let mut session = session_with(fixtures::flat_abc());
    let cmd = Modifiers::command(platform);

    session.select(&BlockId::from("B"));
    session.handle_key(&KeyEvent::plain(Key::ArrowDown), platform);
    assert_eq!(session.selected(), Some(&BlockId::from("C")));

    session.handle_key(&KeyEvent::plain(Key::Backspace), platform);
    assert_eq!(root_ids(&session), vec!["A", "B"]);
    assert_eq!(session.selected(), None);

    session.handle_key(&KeyEvent::new(Key::Char('z'), cmd, FocusTarget::Canvas), platform);
    assert_eq!(root_ids(&session), vec!["A", "B", "C"]);

    session.handle_key(
        &KeyEvent::new(Key::Char('z'), cmd.with_shift(), FocusTarget::Canvas),
        platform,
    );
    assert_eq!(root_ids(&session), vec!["A", "B"]);

    // Shortcuts typed into a text field belong to the field
    session.handle_key(&KeyEvent::new(Key::Char('z'), cmd, FocusTarget::TextEntry), platform);
    assert_eq!(root_ids(&session), vec!["A", "B"]);
}

#[test]
fn test_validation_tracks_every_change() {
    let mut session = EditorSession::with_defaults(WidgetId::new("form"), fixtures::feedback_form());
    assert!(session.is_valid());

    session.update_block_data(&BlockId::from("art"), |data| {
        data.insert("src".to_string(), json!("ftp://nope"));
    });
    let issues = session.issues().for_block(&BlockId::from("art"));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue_type, ValidationIssueType::Schema);

    session.insert_block(None, None, fixtures::deep_chain(8));
    assert_eq!(session.issues().of_type(ValidationIssueType::TooDeep).len(), 1);

    session.undo();
    session.undo();
    assert!(session.is_valid());
}

#[test]
fn test_autosave_and_publish_with_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let widget = WidgetId::new("feedback");
    let scope = AuthScope::new("acme");
    let registry = Arc::new(BlockRegistry::with_builtins());
    let settings = EditorSettings {
        data_dir: temp_dir.path().to_path_buf(),
        ..EditorSettings::default()
    };

    let mut store = FileStore::open(&settings.data_dir).unwrap();
    store.register_widget(&widget, "acme").unwrap();

    let config = load_or_default(&store, &widget, &mut IdGenerator::new()).unwrap();
    let mut session = EditorSession::new(widget.clone(), config, registry.clone(), &settings);
    let mut autosave = AutosavePublisher::from_settings(&settings);
    let t0 = Instant::now();

    let heading = session.blocks()[0].id.clone();
    session.update_block_data(&heading, |data| {
        data.insert("text".to_string(), json!("Rate us"));
    });
    session.add_from_palette(&BlockType::image(), None, None);

    autosave.observe(&session, t0);
    assert_eq!(autosave.run_due_save(&mut session, &mut store, t0 + Duration::from_millis(100)), None);
    assert_matches!(
        autosave.run_due_save(&mut session, &mut store, t0 + settings.autosave_debounce()),
        Some(Ok(_))
    );
    assert_eq!(autosave.state(), &SaveState::Idle);
    assert!(!session.is_dirty());

    let v1 = autosave.publish(&mut store, &widget, &scope, &registry).unwrap();
    assert_eq!(v1.version, 1);

    // Later edits only reach the draft
    session.remove_block(&heading);
    let t1 = t0 + Duration::from_secs(5);
    autosave.observe(&session, t1);
    autosave.run_due_save(&mut session, &mut store, t1 + settings.autosave_debounce());

    let reopened = FileStore::open(temp_dir.path()).unwrap();
    let draft = reopened.load_draft(&widget).unwrap().unwrap();
    assert_eq!(draft.config.blocks.len(), 1);

    let published = reopened.fetch_version(&widget, 1).unwrap().unwrap();
    assert_eq!(published.config.blocks.len(), 2);
    assert_eq!(published.config.blocks[0].text_content(), Some("Rate us"));

    // A fresh session picks up the saved draft
    let restored = load_or_default(&reopened, &widget, &mut IdGenerator::new()).unwrap();
    assert_eq!(&restored, session.config());
}

#[test]
fn test_publish_gated_by_validation_and_auth() {
    let widget = WidgetId::new("form");
    let registry = BlockRegistry::with_builtins();
    let mut store = MemoryStore::new();
    store.register_widget(widget.clone(), "acme");

    let mut session = session_with(vec![Block::image("i", "https://a.example/x.png")]);
    let mut autosave = AutosavePublisher::attach(&session, Duration::from_millis(800));
    let t0 = Instant::now();

    session.update_block_data(&BlockId::from("i"), |data| {
        data.insert("alt".to_string(), json!("x"));
    });
    autosave.observe(&session, t0);
    autosave.run_due_save(&mut session, &mut store, t0 + Duration::from_secs(1));
    assert_eq!(store.save_calls(), 1);

    let denied = autosave.publish(&mut store, &widget, &AuthScope::new("globex"), &registry);
    assert_eq!(
        denied,
        Err(PublishError::Persistence(PersistenceError::Unauthorized("globex".to_string())))
    );

    // An invalid in-memory state is never saved, so the published copy stays valid
    session.update_block_data(&BlockId::from("i"), |data| {
        data.insert("src".to_string(), json!(""));
    });
    autosave.observe(&session, t0 + Duration::from_secs(2));
    assert_eq!(
        autosave.run_due_save(&mut session, &mut store, t0 + Duration::from_secs(10)),
        None
    );
    assert!(autosave.blocked_by_validation());

    let record = autosave
        .publish(&mut store, &widget, &AuthScope::new("acme"), &registry)
        .unwrap();
    assert_eq!(record.config.blocks[0].data.get("src"), Some(&json!("https://a.example/x.png")));
}

#[test]
fn test_paste_keeps_ids_unique() {
    let mut session = session_with(fixtures::nested_sample());
    assert!(session.copy_block(&BlockId::from("b")));
    session.paste(Some(&BlockId::from("f")));
    session.paste(Some(&BlockId::from("e")));
    session.duplicate_block(&BlockId::from("d"));

    let ids = tree::collect_ids(session.blocks());
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(ids.len(), unique.len());
    assert_eq!(tree::count_blocks(session.blocks()), 6 + 4 + 4 + 2);
    assert!(session.issues().of_type(ValidationIssueType::DuplicateId).is_empty());
}
