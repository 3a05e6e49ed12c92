// Phase 1: 設定ファイル・指示ファイル解析テスト

use std::io::Write;
use std::path::Path;

use layered_pdf::config::instructions::{InstructionFile, load_pages, resolve_path};
use layered_pdf::config::load_settings_for_instructions;
use layered_pdf::config::merged::{Overrides, RunConfig};
use layered_pdf::config::settings::{Mode, PlainEncoding, Settings};
use layered_pdf::error::LayerError;
use layered_pdf::layers::segmenter::{FillStyle, KnockoutColor};

const LETTER: (f64, f64) = (612.0, 792.0);

// ============================================================
// 1. Settings 構造体のデシリアライズ
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
mode: background_only
page_width: 595.0
page_height: 842.0
jpeg_quality: 60
dilation: 3
foreground_grow: 1
knockout_color: dominant
highlight_color: [255, 0, 0]
highlight: true
classify_foreground: true
plain_encoding: lossy
bilevel:
  max_colors: 2
  threshold: 0.95
quantizable:
  max_colors: 16
  threshold: 0.9
layer_dir: /tmp/layers
parallel_workers: 4
"#;
    let s = Settings::from_yaml(yaml).expect("should parse full YAML");
    assert_eq!(s.mode, Mode::BackgroundOnly);
    assert_eq!(s.page_width, 595.0);
    assert_eq!(s.page_height, 842.0);
    assert_eq!(s.jpeg_quality, 60);
    assert_eq!(s.dilation, 3);
    assert_eq!(s.foreground_grow, 1);
    assert_eq!(s.knockout_color, KnockoutColor::Dominant);
    assert_eq!(s.highlight_color, [255, 0, 0]);
    assert!(s.highlight);
    assert!(s.classify_foreground);
    assert_eq!(s.plain_encoding, PlainEncoding::Lossy);
    assert_eq!(s.bilevel.threshold, 0.95);
    assert_eq!(s.quantizable.max_colors, 16);
    assert_eq!(s.layer_dir.as_deref(), Some(Path::new("/tmp/layers")));
    assert_eq!(s.parallel_workers, 4);
}

#[test]
fn test_settings_defaults() {
    let s = Settings::from_yaml("{}").expect("empty mapping uses defaults");
    assert_eq!(s.mode, Mode::Compound);
    assert_eq!((s.page_width, s.page_height), LETTER);
    assert_eq!(s.jpeg_quality, 25);
    assert_eq!(s.dilation, 2);
    assert_eq!(s.knockout_color, KnockoutColor::White);
    assert!(!s.highlight);
    assert!(!s.classify_foreground);
    assert_eq!(s.bilevel.max_colors, 2);
    assert_eq!(s.bilevel.threshold, 0.99);
    assert_eq!(s.quantizable.max_colors, 255);
    assert!(s.layer_dir.is_none());
}

#[test]
fn test_settings_invalid_yaml_is_config_error() {
    let result = Settings::from_yaml("mode: sideways\n");
    match result {
        Err(LayerError::ConfigError(msg)) => {
            assert!(msg.contains("settings YAML"), "got: {msg}")
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

// ============================================================
// 2. Mode と RunConfig のマージ
// ============================================================

#[test]
fn test_mode_parse() {
    assert_eq!(Mode::parse("plain").unwrap(), Mode::Plain);
    assert_eq!(Mode::parse("bgd").unwrap(), Mode::BackgroundOnly);
    assert_eq!(Mode::parse("background_only").unwrap(), Mode::BackgroundOnly);
    assert_eq!(Mode::parse("fgd").unwrap(), Mode::ForegroundOnly);
    assert_eq!(Mode::parse("compound").unwrap(), Mode::Compound);
    assert!(matches!(Mode::parse("mrc"), Err(LayerError::ConfigError(_))));
}

#[test]
fn test_mode_emits() {
    assert!(Mode::Compound.emits_background() && Mode::Compound.emits_foreground());
    assert!(Mode::BackgroundOnly.emits_background() && !Mode::BackgroundOnly.emits_foreground());
    assert!(!Mode::ForegroundOnly.emits_background() && Mode::ForegroundOnly.emits_foreground());
    assert!(!Mode::Plain.emits_background() && !Mode::Plain.emits_foreground());
}

#[test]
fn test_run_config_override_wins() {
    let settings = Settings {
        mode: Mode::BackgroundOnly,
        ..Settings::default()
    };
    let run = RunConfig::new(&settings, &Overrides::default());
    assert_eq!(run.mode, Mode::BackgroundOnly);

    let run = RunConfig::new(
        &settings,
        &Overrides {
            mode: Some(Mode::Plain),
        },
    );
    assert_eq!(run.mode, Mode::Plain);
}

#[test]
fn test_run_config_carries_settings() {
    let settings = Settings {
        highlight: true,
        dilation: 5,
        jpeg_quality: 90,
        classify_foreground: true,
        ..Settings::default()
    };
    let run = RunConfig::new(&settings, &Overrides::default());
    assert_eq!(run.fill, FillStyle::Highlight);
    assert_eq!(run.segmenter.dilation, 5);
    assert_eq!(run.policy.jpeg_quality, 90);
    assert!(run.policy.classify_foreground);

    assert_eq!(RunConfig::default().fill, FillStyle::Knockout);
}

// ============================================================
// 3. 指示ファイル: 矩形のみの形式
// ============================================================

#[test]
fn test_rects_shape() {
    let json = r#"{
        "scan/p1.png": [{"X0": 356, "X1": 2148, "Y0": 1432, "Y1": 2935}],
        "scan/p2.png": []
    }"#;
    let file = InstructionFile::from_json(json).expect("parse");
    let pages = file.into_pages(Path::new("/base"), LETTER);
    assert_eq!(pages.len(), 2);

    let p1 = &pages[0];
    assert_eq!(p1.id, "scan/p1.png");
    assert_eq!(p1.source.as_deref(), Some(Path::new("/base/scan/p1.png")));
    assert_eq!((p1.width, p1.height), LETTER);
    assert_eq!(p1.rects.len(), 1);
    assert_eq!(p1.rects[0].x1, 2148);
    assert!(p1.images.is_empty());
    assert!(p1.validate().is_ok());

    assert!(pages[1].rects.is_empty());
    assert!(pages[1].validate().is_ok(), "no rects still renders the source");
}

#[test]
fn test_rects_shape_keeps_inverted_rect_for_page_check() {
    // 反転矩形はパースでは弾かず、ページ単位で InvalidGeometry にする
    let json = r#"{"a.png": [{"X0": 30, "Y0": 30, "X1": 10, "Y1": 10}]}"#;
    let pages = InstructionFile::from_json(json)
        .expect("parse")
        .into_pages(Path::new("."), LETTER);
    assert_eq!(pages[0].rects[0].x0, 30);
}

// ============================================================
// 4. 指示ファイル: ページ形式
// ============================================================

#[test]
fn test_layered_shape() {
    let json = r#"{
        "Pages": [
            {"W": 595, "H": 842, "Rotate": 90, "Source": "scan.png",
             "Rects": [{"X0": 0, "Y0": 0, "X1": 10, "Y1": 10}]},
            {"W": 612, "H": 792, "Images": [
                {"ImagePath": "/abs/photo.jpg", "X": 10, "Y": 20, "W": 100, "H": 50,
                 "Theta": 15, "Lossy": true,
                 "Mask": {"ImagePath": "mask.png"}}
            ]}
        ]
    }"#;
    let pages = InstructionFile::from_json(json)
        .expect("parse")
        .into_pages(Path::new("/docs"), LETTER);
    assert_eq!(pages.len(), 2);

    assert_eq!(pages[0].id, "page 1");
    assert_eq!((pages[0].width, pages[0].height), (595.0, 842.0));
    assert_eq!(pages[0].rotate, 90);
    assert_eq!(pages[0].source.as_deref(), Some(Path::new("/docs/scan.png")));
    assert!(pages[0].validate().is_ok());

    let img = &pages[1].images[0];
    assert_eq!(pages[1].id, "page 2");
    assert_eq!(img.path, Path::new("/abs/photo.jpg"));
    assert_eq!((img.x, img.y, img.w, img.h, img.theta), (10.0, 20.0, 100.0, 50.0, 15.0));
    assert_eq!(img.color_components, 3);
    assert_eq!(img.bits_per_component, 8);
    assert!(img.lossy);
    let mask = img.mask.as_ref().expect("mask");
    assert_eq!(mask.path, Path::new("/docs/mask.png"));
    assert_eq!((mask.color_components, mask.bits_per_component), (1, 1));
    assert!(pages[1].validate().is_ok());
}

#[test]
fn test_malformed_json_is_malformed_instructions() {
    for json in ["not json", "[1, 2, 3]", r#"{"Pages": {"W": 612}}"#] {
        assert!(
            matches!(
                InstructionFile::from_json(json),
                Err(LayerError::MalformedInstructions(_))
            ),
            "{json} should be rejected"
        );
    }
}

#[test]
fn test_malformed_page_entry_is_isolated() {
    let json = r#"{"Pages": [
        {"W": 612, "H": 792, "Source": "a.png"},
        {"W": "wide", "H": 792, "Source": "b.png"}
    ]}"#;
    let pages = InstructionFile::from_json(json)
        .expect("top level is well formed")
        .into_pages(Path::new("/d"), LETTER);
    assert_eq!(pages.len(), 2);
    assert!(pages[0].validate().is_ok());

    assert_eq!(pages[1].id, "page 2");
    match pages[1].validate() {
        Err(LayerError::MalformedInstructions(msg)) => {
            assert!(msg.contains("cannot parse page entry"), "got: {msg}")
        }
        other => panic!("expected MalformedInstructions, got {other:?}"),
    }
}

#[test]
fn test_malformed_rects_entry_is_isolated() {
    let json = r#"{
        "a.png": [{"X0": "left"}],
        "b.png": [{"X0": 0, "Y0": 0, "X1": 5, "Y1": 5}]
    }"#;
    let pages = InstructionFile::from_json(json)
        .expect("top level is well formed")
        .into_pages(Path::new("/d"), LETTER);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].id, "a.png");
    assert_eq!(pages[0].source.as_deref(), Some(Path::new("/d/a.png")));
    assert!(matches!(
        pages[0].validate(),
        Err(LayerError::MalformedInstructions(_))
    ));
    assert!(pages[1].validate().is_ok());
}

fn single_page(json: &str) -> layered_pdf::config::instructions::PageSpec {
    InstructionFile::from_json(json)
        .expect("parse")
        .into_pages(Path::new("/d"), LETTER)
        .remove(0)
}

fn assert_invalid(json: &str, needle: &str) {
    match single_page(json).validate() {
        Err(LayerError::MalformedInstructions(msg)) => {
            assert!(msg.contains(needle), "expected '{needle}' in: {msg}")
        }
        other => panic!("expected MalformedInstructions for {json}, got {other:?}"),
    }
}

#[test]
fn test_validate_rejects_bad_pages() {
    assert_invalid(r#"{"Pages": [{"W": 0, "H": 792, "Source": "a.png"}]}"#, "page size");
    assert_invalid(
        r#"{"Pages": [{"W": 612, "H": 792, "Rotate": 45, "Source": "a.png"}]}"#,
        "rotation",
    );
    assert_invalid(
        r#"{"Pages": [{"W": 612, "H": 792, "Rects": [{"X0":0,"Y0":0,"X1":1,"Y1":1}]}]}"#,
        "without a source",
    );
    assert_invalid(r#"{"Pages": [{"W": 612, "H": 792}]}"#, "nothing to draw");
}

#[test]
fn test_validate_rejects_bad_images() {
    assert_invalid(
        r#"{"Pages": [{"W": 612, "H": 792, "Images": [{"ImagePath": "a.png", "X": 0, "Y": 0, "W": 0, "H": 5}]}]}"#,
        "size must be positive",
    );
    assert_invalid(
        r#"{"Pages": [{"W": 612, "H": 792, "Images": [{"ImagePath": "a.png", "X": 0, "Y": 0, "W": 5, "H": 5, "ColorComponents": 4}]}]}"#,
        "color components",
    );
    assert_invalid(
        r#"{"Pages": [{"W": 612, "H": 792, "Images": [{"ImagePath": "a.png", "X": 0, "Y": 0, "W": 5, "H": 5, "BitsPerComponent": 1}]}]}"#,
        "single component",
    );
    assert_invalid(
        r#"{"Pages": [{"W": 612, "H": 792, "Images": [{"ImagePath": "a.png", "X": 0, "Y": 0, "W": 5, "H": 5,
            "Mask": {"ImagePath": "m.png", "ColorComponents": 3, "BitsPerComponent": 8}}]}]}"#,
        "mask must have 1 color component",
    );
}

#[test]
fn test_resolve_path() {
    assert_eq!(resolve_path(Path::new("/a/b"), "c.png"), Path::new("/a/b/c.png"));
    assert_eq!(resolve_path(Path::new("/a/b"), "/x/c.png"), Path::new("/x/c.png"));
}

// ============================================================
// 5. ファイルからの読込
// ============================================================

#[test]
fn test_load_pages_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("doc.json");
    std::fs::write(&path, r#"{"p.png": []}"#).expect("write");

    let pages = load_pages(&path, LETTER).expect("load");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].source.as_deref(), Some(dir.path().join("p.png").as_path()));
}

#[test]
fn test_load_pages_missing_file_is_io_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = load_pages(&dir.path().join("missing.json"), LETTER);
    assert!(matches!(result, Err(LayerError::IoFailure(_))));
}

#[test]
fn test_load_settings_for_instructions_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut f = std::fs::File::create(dir.path().join("settings.yaml")).expect("create");
    writeln!(f, "mode: foreground_only").expect("write");
    writeln!(f, "jpeg_quality: 70").expect("write");

    let s = load_settings_for_instructions(&dir.path().join("doc.json")).expect("load");
    assert_eq!(s.mode, Mode::ForegroundOnly);
    assert_eq!(s.jpeg_quality, 70);
}

#[test]
fn test_load_settings_for_instructions_defaults_when_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let s = load_settings_for_instructions(&dir.path().join("doc.json")).expect("load");
    assert_eq!(s.mode, Mode::Compound);
}
