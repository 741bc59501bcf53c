use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use widget_block_editor::store::load_or_default;
use widget_block_editor::tree;
use widget_block_editor::{
    AuthScope, AutosavePublisher, BlockId, BlockRegistry, BlockType, DragGesture, DragOutcome,
    DropTarget, EditorSession, EditorSettings, FileStore, IdGenerator, Key, KeyEvent, Platform,
    WidgetId, WidgetStore,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "widget_block_editor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let widget_id = WidgetId::new(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| "demo-feedback".to_string()),
    );
    let org = AuthScope::new("demo-org");

    println!("Widget Block Editor");
    println!("===================\n");

    let settings = EditorSettings::from_env();
    let mut store = FileStore::open(&settings.data_dir)
        .with_context(|| format!("opening widget store at {}", settings.data_dir.display()))?;
    store.register_widget(&widget_id, org.org_id.clone())?;

    let config = load_or_default(&store, &widget_id, &mut IdGenerator::new())?;
    let registry = Arc::new(BlockRegistry::with_builtins());
    let mut session =
        EditorSession::new(widget_id.clone(), config, registry.clone(), &settings);
    let mut autosave = AutosavePublisher::attach(&session, settings.autosave_debounce());

    println!("✓ Loaded `{}` from {}", widget_id, store.root_dir().display());
    println!("  Root blocks: {}", session.blocks().len());

    // Build a small form: a container with a paragraph and an image
    let container = session
        .add_from_palette(&BlockType::container(), None, None)
        .context("container is a builtin block type")?;
    let paragraph = session
        .add_from_palette(&BlockType::text(), Some(&container), None)
        .context("text is a builtin block type")?;
    session.add_from_palette(&BlockType::image(), Some(&container), None);
    session.update_block_data(&paragraph, |data| {
        data.insert("text".to_string(), "How was your visit?".into());
    });

    println!("\n✓ Added container with paragraph and image");
    println!("  History entries: {}", session.history().undo_depth());

    // Move the paragraph below the image
    let outcome = session.drag(&DragGesture::new(
        paragraph.clone(),
        DropTarget::Inside(container.clone()),
    ));
    println!(
        "\n✓ Dragged paragraph to the end of the container: {}",
        outcome_label(&outcome)
    );

    // Delete the image with the keyboard, then undo it
    let image: Option<BlockId> = session
        .blocks()
        .last()
        .and_then(|b| b.children().first())
        .map(|b| b.id.clone());
    if let Some(image) = image {
        session.select(&image);
        session.handle_key(&KeyEvent::plain(Key::Delete), Platform::current());
        println!("\n✓ Deleted selected image; undo available: {}", session.can_undo());
        session.undo();
        println!(
            "✓ Undo restored it; blocks now: {}",
            tree::count_blocks(session.blocks())
        );
    }

    println!("\n🔎 Validation: {} issue(s)", session.issues().len());
    if let Some(warning) = session.size_warning() {
        println!(
            "  Size warning: {} bytes (threshold {})",
            warning.bytes, warning.threshold
        );
    }

    // Autosave once the debounce has passed
    let now = Instant::now();
    autosave.observe(&session, now);
    match autosave.run_due_save(&mut session, &mut store, now + autosave.debounce()) {
        Some(Ok(draft)) => println!("\n💾 Draft saved at {}", draft.updated_at),
        Some(Err(err)) => println!("\n⚠ Autosave failed: {}", err),
        None => println!("\n⏸ Nothing to save (state: {:?})", autosave.state()),
    }

    // Publish the persisted draft
    let published = autosave.publish(&mut store, &widget_id, &org, &registry)?;
    println!("\n🚀 Published version {}", published.version);
    println!("  Versions on record: {}", store.list_versions(&widget_id)?.len());
    println!("  Events logged: {}\n", session.events().len());

    Ok(())
}

fn outcome_label(outcome: &DragOutcome) -> &'static str {
    match outcome {
        DragOutcome::Moved { .. } => "moved",
        DragOutcome::NoOp => "no-op",
        DragOutcome::Rejected(_) => "rejected",
    }
}
