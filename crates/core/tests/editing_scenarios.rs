use pdf_retouch_core::{
    analyze, to_screen, DocumentEngine, EditorSession, FormattingProfile, HitTester,
    InMemoryEngine, MemoryPage, Point, Rect, RegionEditor, RegionRegistry, Rgb, Selection,
};

fn invoice_document() -> InMemoryEngine {
    InMemoryEngine::new()
        .with_page(
            MemoryPage::letter()
                .with_line(100.0, 100.0, "Invoice", "Helvetica", 12.0, Rgb::BLACK)
                .with_line(100.0, 300.0, "Amount due", "Times-Roman", 10.0, Rgb::BLACK),
        )
        .with_page(MemoryPage::letter())
}

#[test]
fn select_rectangle_containing_invoice() {
    let engine = invoice_document();
    let registry = RegionRegistry::new();
    let rect = Rect::new(100.0, 100.0, 200.0, 120.0);

    let selection = HitTester::default()
        .select_region(&engine, &registry, 0, &rect)
        .unwrap();

    assert_eq!(
        selection,
        Some(Selection {
            text: "Invoice".to_string(),
            rect,
            page_index: 0,
        })
    );
}

#[test]
fn replace_invoice_with_facture() {
    let mut engine = invoice_document();
    let mut registry = RegionRegistry::new();
    let editor = RegionEditor::default();
    let original = Rect::new(100.0, 100.0, 200.0, 120.0);

    let outcome = editor
        .replace_text_area(&mut engine, &mut registry, 0, &original, "Facture")
        .unwrap();

    let mask = outcome.mask_rect;
    assert!(mask.x0 <= 99.0 && mask.y0 <= 99.0);
    assert!(mask.x1 >= 201.0 && mask.y1 >= 121.0);
    assert!(registry.is_hidden(0, original));

    // The probe around (150, 110) no longer finds the masked word
    let word = HitTester::default()
        .select_word_at(&engine, &registry, 0, Point::new(150.0, 110.0))
        .unwrap();
    assert!(word.map_or(true, |w| w.text != "Invoice"));

    // Text outside the mask is untouched
    let words = registry.filtered_words(0, engine.words(0).unwrap());
    let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(texts, vec!["Amount", "due"]);
}

#[test]
fn zoom_to_125_percent() {
    assert_eq!(to_screen(100.0, 100.0, 1.25), (125.0, 125.0));

    let mut session = EditorSession::default();
    session.load(invoice_document());
    assert_eq!(session.zoom_in().unwrap(), 1.25);
    assert_eq!(
        session.converter().document_to_screen(Point::new(100.0, 100.0)),
        (125.0, 125.0)
    );
}

#[test]
fn hide_then_undo_restores_page() {
    let mut engine = invoice_document();
    let mut registry = RegionRegistry::new();
    let editor = RegionEditor::default();
    let region = Rect::new(100.0, 100.0, 142.0, 115.0);

    editor
        .hide_text_area(&mut engine, &mut registry, 0, &region)
        .unwrap();
    assert!(registry.is_hidden(0, Point::new(120.0, 107.0)));
    assert_eq!(engine.list_annotations(0).unwrap().len(), 1);

    editor.undo_page(&mut engine, &mut registry, 0).unwrap();
    assert!(!registry.is_hidden(0, Point::new(120.0, 107.0)));
    assert!(engine.list_annotations(0).unwrap().is_empty());

    // A second undo is a no-op
    editor.undo_page(&mut engine, &mut registry, 0).unwrap();
    assert!(registry.is_page_clean(0));
}

#[test]
fn analyze_empty_page_returns_baseline() {
    let engine = invoice_document();
    let blocks = engine.text_structure(1).unwrap();
    let profile = analyze(&blocks, &Rect::new(0.0, 0.0, 612.0, 792.0));

    assert_eq!(profile, FormattingProfile::default());
    assert_eq!(profile.font_size, 12.0);
    assert_eq!(profile.color, Rgb::BLACK);
}

#[test]
fn session_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("invoice.json");
    let edited = dir.path().join("invoice-edited.json");

    let mut engine = invoice_document();
    engine.save(&source).unwrap();

    let mut session: EditorSession<InMemoryEngine> = EditorSession::default();
    session.open(&source).unwrap();
    assert_eq!(session.path(), Some(source.as_path()));

    session.pointer_down(100.0, 100.0).unwrap();
    session.pointer_up(200.0, 120.0).unwrap();
    session.replace_selection("Facture").unwrap();
    assert_eq!(session.extract_page_text(0).unwrap(), "Amount due\n");
    session.save(&edited).unwrap();

    let reopened = InMemoryEngine::open(&edited).unwrap();
    assert_eq!(reopened.list_annotations(0).unwrap().len(), 3);
}
