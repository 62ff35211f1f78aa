//! Flattened and single-page exports, plus slide discovery, against an in-memory engine

mod common;

use common::{fake, Call};
use slidepress::deck::{self, Slide, SlideTable};
use slidepress::export::{export_flattened, export_flattened_loaded, export_page, FlattenOptions};
use slidepress::{Error, PrintOptions};

#[test]
fn flattened_export_prints_once() {
    let mut engine = fake(40, 30).reply("document.body.innerHTML", "18");
    let deck = SlideTable::builtin().unwrap();
    let options = FlattenOptions {
        load_wait_ms: 7,
        settle_wait_ms: 9,
        ..Default::default()
    };

    let pdf = export_flattened(&mut engine, "file:///talk/index.html", &deck, &options).unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let calls = engine.calls();
    assert_eq!(calls[0], Call::Load("file:///talk/index.html".into()));
    assert_eq!(calls[1], Call::Wait(7));
    assert!(matches!(&calls[2], Call::Eval(js) if js.contains(r#""handler":"handlePartsSlideState""#)));
    assert_eq!(calls[3], Call::Wait(9));
    assert_eq!(calls[4], Call::Pdf(PrintOptions::flattened()));
    assert_eq!(calls.len(), 5);
}

#[test]
fn flattening_a_loaded_page_skips_the_reload() {
    let mut engine = fake(40, 30).reply("document.body.innerHTML", "2");
    let deck = SlideTable::new(vec![Slide::new("slide-0", 1), Slide::new("slide-1.0", 2)]).unwrap();
    let options = FlattenOptions {
        settle_wait_ms: 9,
        ..Default::default()
    };

    export_flattened_loaded(&mut engine, &deck, &options).unwrap();
    assert_eq!(engine.count(|c| matches!(c, Call::Load(_))), 0);
    assert_eq!(engine.count(|c| *c == Call::Wait(3000)), 0);
    assert_eq!(engine.count(|c| matches!(c, Call::Pdf(_))), 1);
}

#[test]
fn throwing_flatten_script_prints_nothing() {
    let mut engine = fake(40, 30);
    engine.script_error = true;
    let deck = SlideTable::builtin().unwrap();

    let err = export_flattened(&mut engine, "file:///talk/index.html", &deck, &FlattenOptions::default()).unwrap_err();
    assert!(matches!(err, Error::ScriptError(_)));
    assert_eq!(engine.count(|c| matches!(c, Call::Pdf(_))), 0);
}

#[test]
fn page_export_waits_then_prints() {
    let mut engine = fake(40, 30);
    let pdf = export_page(&mut engine, "https://example.com/", 2000, &PrintOptions::page()).unwrap();
    assert!(!pdf.is_empty());
    assert_eq!(
        engine.calls(),
        vec![
            Call::Load("https://example.com/".into()),
            Call::Wait(2000),
            Call::Pdf(PrintOptions::page()),
        ]
    );
}

#[test]
fn empty_print_is_an_error() {
    let mut engine = fake(40, 30);
    engine.empty_pdf = true;
    let err = export_page(&mut engine, "https://example.com/", 0, &PrintOptions::page()).unwrap_err();
    assert!(matches!(err, Error::EmptyPdf(_)));
}

#[test]
fn discovery_reads_page_globals() {
    let mut engine = fake(10, 10).reply(
        "dom_slides",
        r#"[
            {"id": "slide-0", "title": "Welcome", "states": 1, "dom_slides": 3},
            {"id": "slide-1.0", "title": null, "states": 3, "dom_slides": 3},
            {"id": null, "title": "Outro", "states": 0, "dom_slides": 3}
        ]"#,
    );
    let table = deck::discover(&mut engine).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.display_name(0), "Welcome");
    assert_eq!(table.slides[1].states, 3);
    // bogus state counts fall back to one
    assert_eq!(table.slides[2].states, 1);
    assert_eq!(table.expected_pages(), 5);
}

#[test]
fn discovery_of_empty_page_fails() {
    let mut engine = fake(10, 10).reply("dom_slides", "[]");
    let err = deck::discover(&mut engine).unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}
